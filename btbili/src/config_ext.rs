//! Extension pour intégrer la configuration Bilibili dans btconfig
//!
//! Ce module fournit le trait `BiliConfigExt` qui permet d'ajouter facilement
//! des méthodes de gestion du credential et des paramètres upstream à
//! `btconfig::Config`, et de construire les structures de configuration
//! explicites consommées par le client et le relais.

use crate::api::{BiliApiConfig, DEFAULT_API_BASE_URL, DEFAULT_REFERER, DEFAULT_USER_AGENT};
use crate::relay::RelayConfig;
use anyhow::Result;
use btconfig::Config;
use serde_yaml::Value;

/// Trait d'extension pour gérer la configuration Bilibili dans btconfig
///
/// # Exemple
///
/// ```rust,ignore
/// use btconfig::get_config;
/// use btbili::BiliConfigExt;
///
/// let config = get_config();
/// let api_config = config.bili_api_config()?;
/// ```
pub trait BiliConfigExt {
    /// Récupère le cookie SESSDATA depuis la configuration
    ///
    /// # Returns
    ///
    /// Le credential configuré, ou None si absent ou vide (accès anonyme)
    fn get_bili_sessdata(&self) -> Result<Option<String>>;

    /// Définit le cookie SESSDATA dans la configuration
    fn set_bili_sessdata(&self, sessdata: &str) -> Result<()>;

    /// Récupère l'URL de base de l'API upstream
    fn get_bili_api_base(&self) -> String;

    /// Récupère le User-Agent à présenter à l'upstream
    fn get_bili_user_agent(&self) -> String;

    /// Récupère le Referer à présenter à l'upstream
    fn get_bili_referer(&self) -> String;

    /// Récupère le type MIME audio servi par le relais
    fn get_bili_audio_mime(&self) -> String;

    /// Construit la configuration explicite du client API
    fn bili_api_config(&self) -> Result<BiliApiConfig>;

    /// Construit la configuration explicite du relais
    fn bili_relay_config(&self) -> Result<RelayConfig>;
}

/// Lit une chaîne de configuration avec valeur par défaut
fn string_or(config: &Config, path: &[&str], default: &str) -> String {
    match config.get_value(path) {
        Ok(Value::String(s)) if !s.is_empty() => s,
        _ => default.to_string(),
    }
}

impl BiliConfigExt for Config {
    fn get_bili_sessdata(&self) -> Result<Option<String>> {
        match self.get_value(&["accounts", "bilibili", "sessdata"]) {
            Ok(Value::String(s)) if !s.is_empty() => Ok(Some(s)),
            Ok(Value::String(_)) => Ok(None), // Empty string
            Ok(_) => Ok(None),                // Wrong type
            Err(_) => Ok(None),               // Not configured
        }
    }

    fn set_bili_sessdata(&self, sessdata: &str) -> Result<()> {
        self.set_value(
            &["accounts", "bilibili", "sessdata"],
            Value::String(sessdata.to_string()),
        )
    }

    fn get_bili_api_base(&self) -> String {
        string_or(
            self,
            &["upstream", "bilibili", "api_base_url"],
            DEFAULT_API_BASE_URL,
        )
    }

    fn get_bili_user_agent(&self) -> String {
        string_or(
            self,
            &["upstream", "bilibili", "user_agent"],
            DEFAULT_USER_AGENT,
        )
    }

    fn get_bili_referer(&self) -> String {
        string_or(self, &["upstream", "bilibili", "referer"], DEFAULT_REFERER)
    }

    fn get_bili_audio_mime(&self) -> String {
        string_or(
            self,
            &["upstream", "bilibili", "audio_mime_type"],
            "audio/mpeg",
        )
    }

    fn bili_api_config(&self) -> Result<BiliApiConfig> {
        Ok(BiliApiConfig {
            base_url: self.get_bili_api_base(),
            user_agent: self.get_bili_user_agent(),
            referer: self.get_bili_referer(),
            sessdata: self.get_bili_sessdata()?,
            ..Default::default()
        })
    }

    fn bili_relay_config(&self) -> Result<RelayConfig> {
        Ok(RelayConfig {
            user_agent: self.get_bili_user_agent(),
            referer: self.get_bili_referer(),
            audio_mime_type: self.get_bili_audio_mime(),
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_config() -> (tempfile::TempDir, Config) {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_config(dir.path().to_str().unwrap()).unwrap();
        (dir, config)
    }

    #[test]
    fn test_sessdata_roundtrip() {
        let (_dir, config) = temp_config();
        assert!(config.get_bili_sessdata().unwrap().is_none());

        config.set_bili_sessdata("token123").unwrap();
        assert_eq!(
            config.get_bili_sessdata().unwrap().as_deref(),
            Some("token123")
        );
    }

    #[test]
    fn test_api_config_uses_defaults() {
        let (_dir, config) = temp_config();
        let api_config = config.bili_api_config().unwrap();
        assert_eq!(api_config.base_url, DEFAULT_API_BASE_URL);
        assert_eq!(api_config.referer, DEFAULT_REFERER);
    }

    #[test]
    fn test_relay_config_reads_mime_override() {
        let (_dir, config) = temp_config();
        config
            .set_value(
                &["upstream", "bilibili", "audio_mime_type"],
                Value::String("audio/mp4".to_string()),
            )
            .unwrap();
        let relay_config = config.bili_relay_config().unwrap();
        assert_eq!(relay_config.audio_mime_type, "audio/mp4");
    }
}
