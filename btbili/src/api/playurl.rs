//! Endpoints playurl et pagelist de l'API Bilibili

use super::BiliApi;
use crate::error::Result;
use crate::models::{PlayUrlData, VideoPart};

/// Drapeau `fnval` demandant le manifeste DASH multi-flux
const FNVAL_DASH: u32 = 16;

impl BiliApi {
    /// Récupère le manifeste de lecture d'une partie
    ///
    /// Interroge `GET /x/player/playurl` en demandant la réponse DASH
    /// (`fnval=16`). Le cookie `SESSDATA` configuré est transmis s'il existe ;
    /// les appels anonymes portent le marqueur `gaia_source=pre-load`, comme
    /// le lecteur web de la plateforme.
    pub async fn get_play_url(&self, avid: u64, cid: u64) -> Result<PlayUrlData> {
        let mut params = vec![
            ("avid", avid.to_string()),
            ("cid", cid.to_string()),
            ("fnval", FNVAL_DASH.to_string()),
            ("fourk", "1".to_string()),
        ];

        if !self.has_credential() {
            params.push(("gaia_source", "pre-load".to_string()));
        }

        self.get_data("/x/player/playurl", &params).await
    }

    /// Récupère la liste des parties lisibles d'un contenu
    ///
    /// `GET /x/player/pagelist` : associe un `avid` à ses `cid` (un par
    /// partie — les entrées multi-pistes en ont plusieurs).
    pub async fn get_page_list(&self, avid: u64) -> Result<Vec<VideoPart>> {
        self.get_data("/x/player/pagelist", &[("aid", avid.to_string())])
            .await
    }
}
