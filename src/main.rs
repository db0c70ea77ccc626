use anyhow::Context;
use bookstore_app::Application;
use bookstore_kernel::settings::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().with_context(|| "failed to load bookstore settings")?;
    bookstore_telemetry::init(&settings.telemetry)?;

    tracing::info!(
        env = ?settings.environment,
        bind = %settings.server.bind_address(),
        "bookstore-app bootstrap starting"
    );

    let app = Application::build(settings).await?;

    tracing::info!("bookstore-app bootstrap complete");
    app.serve().await
}
