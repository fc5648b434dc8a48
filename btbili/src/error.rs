//! Gestion des erreurs pour le client Bilibili

use thiserror::Error;

/// Type Result personnalisé pour btbili
pub type Result<T> = std::result::Result<T, BiliError>;

/// Erreurs possibles lors de l'utilisation du client Bilibili
#[derive(Error, Debug)]
pub enum BiliError {
    /// Paramètre obligatoire absent de la requête
    #[error("missing required parameter: {0}")]
    MissingParameter(&'static str),

    /// Paramètre présent mais invalide
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter {
        name: &'static str,
        reason: String,
    },

    /// Contenu verrouillé en mode "essai" (试看) par Bilibili
    #[error("content is only available as a trial preview")]
    PreviewOnly,

    /// Erreur applicative renvoyée par l'API Bilibili (code != 0)
    #[error("Bilibili API error (code {code}): {message}")]
    Api { code: i64, message: String },

    /// Manifeste playurl absent ou incomplet
    #[error("malformed playurl manifest: {0}")]
    MalformedManifest(String),

    /// L'upstream a répondu avec un statut HTTP non-2xx
    #[error("upstream returned HTTP {0}")]
    UpstreamStatus(u16),

    /// Erreur HTTP (connexion, timeout, etc.)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Erreur de parsing JSON
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// Erreur de configuration (anyhow)
    #[error("Configuration error: {0}")]
    Config(#[from] anyhow::Error),
}

impl BiliError {
    /// Crée une erreur de manifeste malformé
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedManifest(msg.into())
    }

    /// Vérifie si l'erreur est imputable au client (paramètres)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            BiliError::MissingParameter(_) | BiliError::InvalidParameter { .. }
        )
    }

    /// Vérifie si l'erreur correspond au verrouillage "essai"
    pub fn is_preview_only(&self) -> bool {
        matches!(self, BiliError::PreviewOnly)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_parameter_names_the_field() {
        let err = BiliError::MissingParameter("cid");
        assert_eq!(err.to_string(), "missing required parameter: cid");
        assert!(err.is_client_error());
    }

    #[test]
    fn test_preview_only_predicate() {
        assert!(BiliError::PreviewOnly.is_preview_only());
        assert!(!BiliError::MissingParameter("avid").is_preview_only());
    }
}
