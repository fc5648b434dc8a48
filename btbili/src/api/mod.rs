//! Couche d'accès à l'API REST Bilibili
//!
//! Ce module fournit une interface bas-niveau pour communiquer avec l'API Bilibili.

pub mod playurl;

use crate::error::{BiliError, Result};
use crate::models::Envelope;
use reqwest::{header, Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

/// URL de base de l'API Bilibili
pub const DEFAULT_API_BASE_URL: &str = "https://api.bilibili.com";

/// User-Agent de navigateur exigé par l'upstream
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Referer exigé par l'upstream (les requêtes sans lui sont rejetées)
pub const DEFAULT_REFERER: &str = "https://www.bilibili.com";

/// Configuration explicite du client API
///
/// Passée à la construction plutôt que lue dans un état global, ce qui
/// permet aux tests de pointer vers un upstream de fixture.
#[derive(Debug, Clone)]
pub struct BiliApiConfig {
    /// URL de base de l'API (sans slash final)
    pub base_url: String,
    pub user_agent: String,
    pub referer: String,
    /// Cookie `SESSDATA` optionnel (accès anonyme sinon)
    pub sessdata: Option<String>,
    /// Timeout global des requêtes API
    pub timeout: Duration,
}

impl Default for BiliApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            referer: DEFAULT_REFERER.to_string(),
            sessdata: None,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Client API bas-niveau pour communiquer avec Bilibili
pub struct BiliApi {
    /// Client HTTP
    client: Client,
    config: BiliApiConfig,
}

impl BiliApi {
    /// Crée une nouvelle instance de l'API
    pub fn new(config: BiliApiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self { client, config })
    }

    /// Retourne l'URL de base configurée
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Vérifie si un credential SESSDATA est configuré
    pub fn has_credential(&self) -> bool {
        self.config
            .sessdata
            .as_deref()
            .is_some_and(|s| !s.is_empty())
    }

    /// Effectue une requête GET et décode la section `data` de l'enveloppe
    pub(crate) async fn get_data<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<T> {
        let url = format!("{}{}", self.config.base_url, endpoint);

        debug!("GET {} with {} params", url, params.len());

        let mut request = self
            .client
            .get(&url)
            .header(header::REFERER, &self.config.referer)
            .query(params);

        if let Some(sessdata) = self.config.sessdata.as_deref().filter(|s| !s.is_empty()) {
            request = request.header(header::COOKIE, format!("SESSDATA={}", sessdata));
        }

        let response = request.send().await?;
        self.handle_response(response).await
    }

    /// Traite la réponse HTTP et vérifie l'enveloppe Bilibili
    async fn handle_response<T: DeserializeOwned>(&self, response: Response) -> Result<T> {
        let status = response.status();

        debug!("Response status: {}", status);

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!("API error ({}): {}", status.as_u16(), error_text);
            return Err(BiliError::UpstreamStatus(status.as_u16()));
        }

        let text = response.text().await?;

        let envelope: Envelope<T> = serde_json::from_str(&text).map_err(|e| {
            warn!("Failed to parse response: {}", e);
            BiliError::Json(e)
        })?;

        if envelope.code != 0 {
            warn!(
                "Bilibili API error (code {}): {}",
                envelope.code, envelope.message
            );
            return Err(BiliError::Api {
                code: envelope.code,
                message: envelope.message,
            });
        }

        envelope
            .data
            .ok_or_else(|| BiliError::malformed("response envelope has no data"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_creation() {
        let api = BiliApi::new(BiliApiConfig::default()).unwrap();
        assert_eq!(api.base_url(), DEFAULT_API_BASE_URL);
        assert!(!api.has_credential());
    }

    #[test]
    fn test_empty_sessdata_is_not_a_credential() {
        let config = BiliApiConfig {
            sessdata: Some(String::new()),
            ..Default::default()
        };
        let api = BiliApi::new(config).unwrap();
        assert!(!api.has_credential());
    }

    #[test]
    fn test_configured_credential() {
        let config = BiliApiConfig {
            sessdata: Some("abc123".to_string()),
            ..Default::default()
        };
        let api = BiliApi::new(config).unwrap();
        assert!(api.has_credential());
    }
}
