//! Client principal pour résoudre les flux audio Bilibili
//!
//! Ce module fournit un client haut-niveau au-dessus de la couche API :
//! résolution d'un manifeste typé, sélection d'une URL de flux, liste des
//! parties lisibles.

use crate::api::{BiliApi, BiliApiConfig};
use crate::error::{BiliError, Result};
use crate::models::{DashAudio, Manifest, VideoPart};
use tracing::{debug, info};

/// Client Bilibili haut-niveau
pub struct BiliClient {
    /// API bas-niveau
    api: BiliApi,
}

impl BiliClient {
    /// Crée un nouveau client à partir d'une configuration explicite
    ///
    /// # Exemple
    ///
    /// ```rust,no_run
    /// use btbili::api::BiliApiConfig;
    /// use btbili::client::BiliClient;
    ///
    /// let client = BiliClient::new(BiliApiConfig::default()).unwrap();
    /// ```
    pub fn new(config: BiliApiConfig) -> Result<Self> {
        Ok(Self {
            api: BiliApi::new(config)?,
        })
    }

    /// Crée un client en utilisant la configuration de btconfig
    pub fn from_config() -> Result<Self> {
        use crate::config_ext::BiliConfigExt;

        let config = btconfig::get_config();
        Self::new(config.bili_api_config()?)
    }

    /// Vérifie si un credential SESSDATA est configuré
    pub fn has_credential(&self) -> bool {
        self.api.has_credential()
    }

    /// Résout le manifeste audio d'une partie
    ///
    /// Retourne le résultat typé [`Manifest`] : soit les variantes audio du
    /// manifeste DASH, soit `PreviewOnly` si l'upstream verrouille le contenu
    /// en mode essai (aucune substitution silencieuse du flux tronqué).
    pub async fn resolve_manifest(&self, avid: u64, cid: u64) -> Result<Manifest> {
        let data = self.api.get_play_url(avid, cid).await?;

        if data.is_preview_only() {
            info!("avid {} cid {} is gated to trial preview", avid, cid);
            return Ok(Manifest::PreviewOnly);
        }

        let dash = data
            .dash
            .ok_or_else(|| BiliError::malformed("manifest has no dash section"))?;

        if dash.audio.is_empty() {
            return Err(BiliError::malformed("manifest has no audio variants"));
        }

        Ok(Manifest::Audio(dash.audio))
    }

    /// Résout directement une URL de flux audio
    ///
    /// Applique la politique de sélection fixe de [`select_audio_url`] sur le
    /// manifeste résolu. L'URL retournée est opaque et à durée de vie courte ;
    /// sa joignabilité n'est pas vérifiée ici.
    pub async fn resolve_stream_url(&self, avid: u64, cid: u64) -> Result<String> {
        match self.resolve_manifest(avid, cid).await? {
            Manifest::PreviewOnly => Err(BiliError::PreviewOnly),
            Manifest::Audio(entries) => {
                let url = select_audio_url(&entries)
                    .ok_or_else(|| BiliError::malformed("no selectable audio URL"))?;
                debug!("selected audio URL for avid {} cid {}", avid, cid);
                Ok(url)
            }
        }
    }

    /// Récupère la liste des parties lisibles d'un contenu
    pub async fn get_parts(&self, avid: u64) -> Result<Vec<VideoPart>> {
        self.api.get_page_list(avid).await
    }
}

/// Politique de sélection d'une variante audio
///
/// Reprend le choix historique du lecteur : la deuxième entrée du manifeste,
/// première URL de secours. Ce choix d'index n'a pas de logique de qualité
/// documentée et est conservé pour compatibilité ; on retombe sur la première
/// entrée quand le manifeste n'en a qu'une, et sur `base_url` quand l'entrée
/// n'a pas d'URL de secours.
pub fn select_audio_url(entries: &[DashAudio]) -> Option<String> {
    let entry = entries.get(1).or_else(|| entries.first())?;

    let url = entry
        .backup_url
        .first()
        .cloned()
        .unwrap_or_else(|| entry.base_url.clone());

    if url.is_empty() {
        None
    } else {
        Some(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn audio(id: u32, base: &str, backups: &[&str]) -> DashAudio {
        DashAudio {
            id,
            base_url: base.to_string(),
            backup_url: backups.iter().map(|s| s.to_string()).collect(),
            mime_type: Some("audio/mp4".to_string()),
            codecs: Some("mp4a.40.2".to_string()),
            bandwidth: Some(128_000),
        }
    }

    #[test]
    fn test_selection_prefers_second_entry_first_backup() {
        let entries = vec![
            audio(30216, "https://a/base0", &["https://a/bk0"]),
            audio(30232, "https://a/base1", &["https://a/bk1", "https://a/bk2"]),
        ];
        assert_eq!(
            select_audio_url(&entries).as_deref(),
            Some("https://a/bk1")
        );
    }

    #[test]
    fn test_selection_is_deterministic() {
        let entries = vec![
            audio(30216, "https://a/base0", &["https://a/bk0"]),
            audio(30232, "https://a/base1", &["https://a/bk1"]),
            audio(30280, "https://a/base2", &["https://a/bk3"]),
        ];
        let first = select_audio_url(&entries);
        for _ in 0..10 {
            assert_eq!(select_audio_url(&entries), first);
        }
    }

    #[test]
    fn test_selection_single_entry_falls_back() {
        let entries = vec![audio(30216, "https://a/base0", &["https://a/bk0"])];
        assert_eq!(
            select_audio_url(&entries).as_deref(),
            Some("https://a/bk0")
        );
    }

    #[test]
    fn test_selection_without_backup_uses_base_url() {
        let entries = vec![
            audio(30216, "https://a/base0", &[]),
            audio(30232, "https://a/base1", &[]),
        ];
        assert_eq!(
            select_audio_url(&entries).as_deref(),
            Some("https://a/base1")
        );
    }

    #[test]
    fn test_selection_empty_manifest() {
        assert!(select_audio_url(&[]).is_none());
    }
}
