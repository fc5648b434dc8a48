//! # btbili - Source audio Bilibili pour BiliTune
//!
//! Cette crate fournit le cœur du lecteur : la résolution d'un identifiant de
//! contenu vers une URL de flux audio DASH via l'API publique de Bilibili, et
//! le relais de ces octets à travers le serveur local avec passthrough des
//! requêtes Range (indispensable pour que l'élément média du navigateur
//! puisse se positionner dans la piste).
//!
//! ## Vue d'ensemble
//!
//! - Résolution du manifeste playurl (`fnval=16`, DASH) avec détection du
//!   verrouillage "essai" (试看) des contenus payants
//! - Sélection déterministe d'une variante audio
//! - Relais d'octets chunk par chunk, sans mise en mémoire du corps, avec
//!   copie verbatim de `Content-Range` et fermeture de la connexion upstream
//!   quand le client se déconnecte
//! - Liste des parties lisibles d'un contenu (pagelist)
//!
//! ## Structure des modules
//!
//! ```text
//! btbili/
//! ├── src/
//! │   ├── lib.rs              # Module principal (ce fichier)
//! │   ├── client.rs           # Client haut-niveau et politique de sélection
//! │   ├── models.rs           # Structures de données (manifeste, parties)
//! │   ├── api/
//! │   │   ├── mod.rs          # API client bas-niveau
//! │   │   └── playurl.rs      # Endpoints playurl et pagelist
//! │   ├── relay.rs            # Relais de flux avec Range passthrough
//! │   ├── api_rest.rs         # Handlers HTTP
//! │   ├── config_ext.rs       # Extension btconfig
//! │   ├── server_ext.rs       # Extension btserver
//! │   └── error.rs            # Gestion des erreurs
//! ```
//!
//! ## Utilisation
//!
//! ```rust,no_run
//! use btbili::BiliServerExt;
//! use btserver::ServerBuilder;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut server = ServerBuilder::new_configured().build();
//!     server.init_bilibili().await?;
//!     server.start().await;
//!     server.wait().await;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod api_rest;
pub mod client;
pub mod config_ext;
pub mod error;
pub mod models;
pub mod relay;
pub mod server_ext;

pub use api::{BiliApi, BiliApiConfig};
pub use api_rest::{create_router, BiliState};
pub use client::{select_audio_url, BiliClient};
pub use config_ext::BiliConfigExt;
pub use error::{BiliError, Result};
pub use models::{Dash, DashAudio, Envelope, Manifest, PlayUrlData, VideoPart, PREVIEW_SENTINEL};
pub use relay::{RelayConfig, RelayedStream, StreamRelay};
pub use server_ext::BiliServerExt;
