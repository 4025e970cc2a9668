use axum::extract::State;
use bizkit_web::prelude::*;
use std::sync::Arc;

use crate::models::{CreateUserRequest, SearchQuery};
use crate::service::UserService;

pub struct UserController;

impl UserController {
    fn routes() -> Router {
        Router::new()
            .route("/", get(list_users).post(create_user))
            .route("/:id", get(get_user).delete(delete_user))
            .route("/:id/greeting", get(greeting))
            .with_state(Arc::new(UserService::new()))
    }
}

async fn list_users(
    State(service): State<Arc<UserService>>,
    QueryParam(query): QueryParam<SearchQuery>,
) -> ControllerResult {
    View::json(&service.search(&query))
}

async fn get_user(
    State(service): State<Arc<UserService>>,
    PathVariable(id): PathVariable<u32>,
) -> ControllerResult {
    let user = service.get(id)?;
    View::json(&user)
}

async fn create_user(
    State(service): State<Arc<UserService>>,
    RequestBody(request): RequestBody<CreateUserRequest>,
) -> ControllerResult {
    let user = service.create(request)?;
    View::json(&user)
}

async fn delete_user(
    State(service): State<Arc<UserService>>,
    PathVariable(id): PathVariable<u32>,
) -> ControllerResult {
    service.delete(id)?;
    Ok(View::new(json!({"deleted": id})))
}

/// 返回纯字符串，演示非结构化返回值会变成 500
async fn greeting(
    State(service): State<Arc<UserService>>,
    PathVariable(id): PathVariable<u32>,
) -> ControllerResult {
    let user = service.get(id)?;
    Ok(View::new(json!(format!("Hello, {}!", user.name))))
}

bizkit_web::controller!(UserController, routes = UserController::routes, RoutePrefix("/users"));
