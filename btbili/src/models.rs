//! Structures de données pour représenter les réponses de l'API Bilibili

use serde::{Deserialize, Serialize};

/// Valeur de `accept_description[0]` signalant un contenu limité à l'essai
///
/// Bilibili renvoie cette chaîne localisée ("trial viewing") en tête des
/// descriptions de qualité quand le contenu payant n'est servi qu'en aperçu.
pub const PREVIEW_SENTINEL: &str = "试看";

/// Enveloppe générique des réponses de l'API Bilibili
///
/// Toutes les réponses ont la forme `{ code, message, ttl, data }` ;
/// `code != 0` indique une erreur applicative.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub ttl: i64,
    pub data: Option<T>,
}

/// Section `data` de la réponse playurl
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayUrlData {
    /// Qualité effectivement servie
    #[serde(default)]
    pub quality: Option<u32>,
    /// Descriptions des qualités disponibles (la première peut être le
    /// marqueur d'essai, voir [`PREVIEW_SENTINEL`])
    #[serde(default)]
    pub accept_description: Vec<String>,
    #[serde(default)]
    pub accept_quality: Vec<u32>,
    /// Manifeste DASH (présent avec `fnval=16`)
    pub dash: Option<Dash>,
}

impl PlayUrlData {
    /// Vérifie si le manifeste est limité à un aperçu d'essai
    pub fn is_preview_only(&self) -> bool {
        self.accept_description
            .first()
            .is_some_and(|d| d == PREVIEW_SENTINEL)
    }
}

/// Manifeste DASH (flux audio/vidéo séparés)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dash {
    #[serde(default)]
    pub duration: Option<u64>,
    /// Variantes audio disponibles, triées par l'upstream
    #[serde(default)]
    pub audio: Vec<DashAudio>,
}

/// Une variante de flux audio du manifeste DASH
///
/// L'upstream émet les champs à la fois en snake_case et en camelCase
/// selon l'endpoint, d'où les alias serde.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashAudio {
    /// Identifiant de qualité (ex: 30216, 30232, 30280)
    pub id: u32,
    #[serde(rename = "base_url", alias = "baseUrl")]
    pub base_url: String,
    #[serde(rename = "backup_url", alias = "backupUrl", default)]
    pub backup_url: Vec<String>,
    #[serde(rename = "mime_type", alias = "mimeType", default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub codecs: Option<String>,
    #[serde(default)]
    pub bandwidth: Option<u64>,
}

/// Une partie lisible d'un contenu (réponse pagelist)
///
/// Un même `avid` peut contenir plusieurs parties (ex: un album multi-pistes),
/// chacune identifiée par son `cid`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoPart {
    pub cid: u64,
    pub page: u32,
    /// Titre de la partie
    pub part: String,
    #[serde(default)]
    pub duration: Option<u64>,
}

/// Résultat typé de la résolution d'un manifeste
///
/// Décodé une seule fois à la frontière du résolveur : le reste du code ne
/// retouche jamais au JSON brut de l'upstream.
#[derive(Debug, Clone)]
pub enum Manifest {
    /// Variantes audio lisibles
    Audio(Vec<DashAudio>),
    /// Contenu verrouillé en aperçu d'essai, aucune variante exploitable
    PreviewOnly,
}

impl Manifest {
    pub fn is_preview_only(&self) -> bool {
        matches!(self, Manifest::PreviewOnly)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_with_error_code() {
        let json = r#"{"code":-404,"message":"啥都木有","ttl":1}"#;
        let envelope: Envelope<PlayUrlData> = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.code, -404);
        assert!(envelope.data.is_none());
    }

    #[test]
    fn test_dash_audio_accepts_camel_case() {
        let json = r#"{
            "id": 30232,
            "baseUrl": "https://upos.example.com/a.m4s",
            "backupUrl": ["https://backup.example.com/a.m4s"],
            "mimeType": "audio/mp4",
            "codecs": "mp4a.40.2",
            "bandwidth": 132000
        }"#;
        let audio: DashAudio = serde_json::from_str(json).unwrap();
        assert_eq!(audio.base_url, "https://upos.example.com/a.m4s");
        assert_eq!(audio.backup_url.len(), 1);
        assert_eq!(audio.mime_type.as_deref(), Some("audio/mp4"));
    }

    #[test]
    fn test_dash_audio_accepts_snake_case() {
        let json = r#"{
            "id": 30216,
            "base_url": "https://upos.example.com/b.m4s",
            "backup_url": []
        }"#;
        let audio: DashAudio = serde_json::from_str(json).unwrap();
        assert_eq!(audio.base_url, "https://upos.example.com/b.m4s");
        assert!(audio.backup_url.is_empty());
    }

    #[test]
    fn test_preview_detection() {
        let data = PlayUrlData {
            quality: Some(32),
            accept_description: vec![PREVIEW_SENTINEL.to_string(), "高清 1080P".to_string()],
            accept_quality: vec![80, 32],
            dash: None,
        };
        assert!(data.is_preview_only());

        let data = PlayUrlData {
            quality: Some(32),
            accept_description: vec!["高清 1080P".to_string(), PREVIEW_SENTINEL.to_string()],
            accept_quality: vec![80, 32],
            dash: None,
        };
        // seul le premier élément fait foi
        assert!(!data.is_preview_only());
    }
}
