//! Extension de btserver::Server pour intégrer la source audio Bilibili
//!
//! Ce module fournit un trait d'extension permettant d'ajouter facilement
//! le résolveur et le relais Bilibili à un serveur btserver.
//!
//! # Architecture
//!
//! - `btserver` définit un serveur HTTP générique
//! - `btbili` étend ce serveur avec les routes audio via ce trait
//! - Le serveur n'a pas besoin de connaître `btbili`

use crate::api_rest::{create_router, BiliState};
use crate::client::BiliClient;
use crate::config_ext::BiliConfigExt;
use crate::relay::StreamRelay;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// Trait d'extension pour ajouter le support Bilibili à un serveur btserver
///
/// # Exemple
///
/// ```rust,no_run
/// use btbili::BiliServerExt;
/// use btserver::ServerBuilder;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let mut server = ServerBuilder::new_configured().build();
///
///     // Initialise le client et le relais depuis la config
///     server.init_bilibili().await?;
///
///     server.start().await;
///     server.wait().await;
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait BiliServerExt {
    /// Initialise la source Bilibili et enregistre les routes HTTP
    ///
    /// Cette méthode :
    /// - Construit le client API et le relais depuis `btconfig`
    /// - Enregistre les routes de résolution et de relais
    ///
    /// # Routes enregistrées
    ///
    /// - `GET /audio/url?avid=..&cid=..` - Liste des variantes audio DASH
    /// - `GET /audio/parts?avid=..` - Parties lisibles d'un contenu
    /// - `GET /play/url?url=..` - Relais des octets audio (Range passthrough)
    ///
    /// # Returns
    ///
    /// L'état partagé (client + relais), réutilisable par l'appelant
    async fn init_bilibili(&mut self) -> Result<BiliState>;
}

#[async_trait]
impl BiliServerExt for btserver::Server {
    async fn init_bilibili(&mut self) -> Result<BiliState> {
        let config = btconfig::get_config();

        let client = BiliClient::new(config.bili_api_config()?)
            .context("Failed to create Bilibili client")?;
        let relay = StreamRelay::new(config.bili_relay_config()?)
            .context("Failed to create stream relay")?;

        let state = BiliState {
            client: Arc::new(client),
            relay: Arc::new(relay),
        };

        self.add_router("/", create_router(state.clone())).await;

        info!("✅ Bilibili audio routes registered (/audio/url, /audio/parts, /play/url)");

        Ok(state)
    }
}
