use bizkit_core::prelude::*;
use bizkit_web::WebApplication;

mod controller;
mod models;
mod service;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = BizApplication::new("web-demo")
        .config_file(concat!(env!("CARGO_MANIFEST_DIR"), "/application.toml"))
        .run()?;

    tracing::info!(
        namespace = controller::NAMESPACE,
        directory = controller::DIRECTORY,
        "Discovering controllers"
    );

    WebApplication::new(env)?
        .mount(controller::NAMESPACE, controller::DIRECTORY)
        .run()
        .await?;

    Ok(())
}
