use bizkit_web::prelude::*;

pub struct HealthController;

impl HealthController {
    fn routes() -> Router {
        Router::new()
            .route("/", get(health))
            .route("/version", get(version))
    }
}

async fn health() -> View {
    View::new(json!({"status": "UP"}))
}

async fn version() -> View {
    View::new(json!({"name": env!("CARGO_PKG_NAME"), "version": env!("CARGO_PKG_VERSION")}))
}

bizkit_web::controller!(HealthController, routes = HealthController::routes, RoutePrefix("/health"));
