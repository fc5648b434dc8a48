use btbili::BiliServerExt;
use btserver::{ConfigExt, ServerBuilder};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // ========== PHASE 1 : Infrastructure HTTP ==========

    let mut server = ServerBuilder::new_configured().build();
    server.init_logging().await;

    // Route d'information de l'application
    server
        .add_route("/info", || async {
            serde_json::json!({"version": "1.0.0"})
        })
        .await;

    // API REST de configuration (Swagger inclus)
    server
        .init_config_api()
        .await
        .expect("Failed to initialize configuration API");

    // ========== PHASE 2 : Source Bilibili ==========

    info!("🎵 Registering Bilibili audio source...");
    let state = server.init_bilibili().await?;

    if state.client.has_credential() {
        info!("🔑 Bilibili credential configured, full-quality streams enabled");
    } else {
        info!("👤 No Bilibili credential configured, anonymous access only");
    }

    // ========== PHASE 3 : Démarrage du serveur ==========

    info!("🌐 Starting HTTP server...");
    server.start().await;

    info!("✅ BiliTune is ready!");
    info!("Press Ctrl+C to stop...");
    server.wait().await;

    Ok(())
}
