//! Relais de flux audio avec passthrough des requêtes Range
//!
//! Ce module relaie les octets d'une URL média résolue vers le client, en
//! transmettant l'en-tête `Range` entrant tel quel à l'upstream pour que
//! l'élément média du navigateur puisse se positionner sans retélécharger
//! le fichier. Le relais est un tuyau direct : pas de transcodage, pas de
//! mise en mémoire du corps, pas de retry — une URL résolue est de toute
//! façon à durée de vie courte et le navigateur re-demande de lui-même.

use crate::error::{BiliError, Result};
use axum::body::Bytes;
use futures::stream::BoxStream;
use futures::StreamExt;
use reqwest::{header, Client};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Configuration explicite du relais
///
/// Construite une fois et passée au relais ; les tests la pointent vers une
/// fixture locale au lieu des CDN de la plateforme.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// User-Agent transmis à l'upstream média
    pub user_agent: String,
    /// Referer exigé par les CDN de la plateforme
    pub referer: String,
    /// Type MIME fixe des réponses audio (jamais déduit du contenu)
    pub audio_mime_type: String,
    /// Timeout d'établissement de la connexion upstream
    pub connect_timeout: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            user_agent: crate::api::DEFAULT_USER_AGENT.to_string(),
            referer: crate::api::DEFAULT_REFERER.to_string(),
            audio_mime_type: "audio/mpeg".to_string(),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// Réponse du relais : métadonnées de statut et flux d'octets
///
/// Le flux est consommé chunk par chunk ; le jeter (déconnexion du client)
/// libère la réponse reqwest sous-jacente et ferme donc la connexion
/// upstream. Chaque appel au relais possède exactement une connexion
/// upstream et une connexion client.
pub struct RelayedStream {
    /// true si l'upstream a répondu avec un `Content-Range` (=> 206)
    pub partial: bool,
    /// Type MIME à renvoyer au client (fixé par la configuration)
    pub content_type: String,
    /// `Content-Length` upstream, copié tel quel s'il est présent
    pub content_length: Option<String>,
    /// `Content-Range` upstream, copié tel quel s'il est présent
    pub content_range: Option<String>,
    /// `Accept-Ranges` upstream, copié tel quel s'il est présent
    pub accept_ranges: Option<String>,
    /// Octets upstream, dans l'ordre d'arrivée
    pub stream: BoxStream<'static, std::io::Result<Bytes>>,
}

impl std::fmt::Debug for RelayedStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayedStream")
            .field("partial", &self.partial)
            .field("content_type", &self.content_type)
            .field("content_length", &self.content_length)
            .field("content_range", &self.content_range)
            .field("accept_ranges", &self.accept_ranges)
            .field("stream", &"<BoxStream>")
            .finish()
    }
}

/// Relais HTTP vers les URLs média résolues
pub struct StreamRelay {
    client: Client,
    config: RelayConfig,
}

impl StreamRelay {
    /// Crée un relais à partir d'une configuration explicite
    pub fn new(config: RelayConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .connect_timeout(config.connect_timeout)
            .build()?;

        Ok(Self { client, config })
    }

    /// Ouvre le flux upstream et prépare la réponse à relayer
    ///
    /// # Arguments
    ///
    /// * `upstream_url` - URL média absolue obtenue du résolveur
    /// * `client_range` - Valeur verbatim de l'en-tête `Range` du client
    ///
    /// # Errors
    ///
    /// `InvalidParameter` si l'URL n'est pas une URL http(s) absolue,
    /// `Http` si la connexion échoue, `UpstreamStatus` si l'upstream répond
    /// avec un statut non-2xx avant le premier octet.
    pub async fn fetch(
        &self,
        upstream_url: &str,
        client_range: Option<&str>,
    ) -> Result<RelayedStream> {
        let url = Url::parse(upstream_url).map_err(|e| BiliError::InvalidParameter {
            name: "url",
            reason: e.to_string(),
        })?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(BiliError::InvalidParameter {
                name: "url",
                reason: format!("unsupported scheme '{}'", url.scheme()),
            });
        }

        let mut request = self
            .client
            .get(url)
            .header(header::REFERER, &self.config.referer);

        if let Some(range) = client_range {
            debug!("forwarding client range: {}", range);
            request = request.header(header::RANGE, range);
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            warn!(
                "media upstream returned {} for {}",
                status.as_u16(),
                upstream_url
            );
            return Err(BiliError::UpstreamStatus(status.as_u16()));
        }

        let content_range = header_value(&response, header::CONTENT_RANGE);
        let content_length = header_value(&response, header::CONTENT_LENGTH);
        let accept_ranges = header_value(&response, header::ACCEPT_RANGES);
        let partial = content_range.is_some();

        // Boucle de copie explicite : chaque chunk upstream est relayé dans
        // l'ordre d'arrivée ; fin et erreur du flux sont des branches à part
        // entière, et jeter le flux (client parti) ferme l'upstream.
        let upstream = response.bytes_stream();
        let stream = futures::stream::unfold((upstream, false), |(mut upstream, done)| async move {
            if done {
                return None;
            }

            match upstream.next().await {
                Some(Ok(chunk)) => Some((Ok(chunk), (upstream, false))),
                Some(Err(e)) => {
                    warn!("relay stream interrupted: {}", e);
                    Some((
                        Err(std::io::Error::new(std::io::ErrorKind::Other, e)),
                        (upstream, true),
                    ))
                }
                None => {
                    debug!("relay stream completed");
                    None
                }
            }
        })
        .boxed();

        Ok(RelayedStream {
            partial,
            content_type: self.config.audio_mime_type.clone(),
            content_length,
            content_range,
            accept_ranges,
            stream,
        })
    }
}

/// Copie un en-tête de la réponse upstream sous forme de chaîne
fn header_value(response: &reqwest::Response, name: header::HeaderName) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rejects_relative_url() {
        let relay = StreamRelay::new(RelayConfig::default()).unwrap();
        let err = relay.fetch("/not/absolute", None).await.unwrap_err();
        assert!(err.is_client_error());
    }

    #[tokio::test]
    async fn test_rejects_non_http_scheme() {
        let relay = StreamRelay::new(RelayConfig::default()).unwrap();
        let err = relay.fetch("ftp://example.com/a.m4s", None).await.unwrap_err();
        assert!(err.is_client_error());
    }

    #[test]
    fn test_default_config() {
        let config = RelayConfig::default();
        assert_eq!(config.audio_mime_type, "audio/mpeg");
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
    }
}
