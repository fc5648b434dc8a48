//! Tests d'intégration des endpoints audio contre un upstream de fixture
//!
//! L'upstream Bilibili est simulé avec mockito ; le router est piloté
//! directement via tower::ServiceExt sans ouvrir de socket local.

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use btbili::api::BiliApiConfig;
use btbili::api_rest::{create_router, BiliState};
use btbili::client::BiliClient;
use btbili::relay::{RelayConfig, StreamRelay};
use futures::StreamExt;
use mockito::Matcher;
use std::sync::Arc;
use std::time::Duration;
use tower::util::ServiceExt;

/// Construit l'état de l'application pointant vers l'upstream de fixture
fn test_state(base_url: &str) -> BiliState {
    let api_config = BiliApiConfig {
        base_url: base_url.to_string(),
        ..Default::default()
    };
    let relay_config = RelayConfig {
        connect_timeout: Duration::from_secs(2),
        ..Default::default()
    };

    BiliState {
        client: Arc::new(BiliClient::new(api_config).unwrap()),
        relay: Arc::new(StreamRelay::new(relay_config).unwrap()),
    }
}

/// Enveloppe playurl avec deux variantes audio DASH
fn playurl_body(base0: &str, backup0: &str, base1: &str, backup1: &str) -> String {
    serde_json::json!({
        "code": 0,
        "message": "0",
        "ttl": 1,
        "data": {
            "quality": 80,
            "accept_description": ["高清 1080P", "清晰 480P"],
            "accept_quality": [80, 32],
            "dash": {
                "duration": 211,
                "audio": [
                    {"id": 30216, "baseUrl": base0, "backupUrl": [backup0]},
                    {"id": 30232, "baseUrl": base1, "backupUrl": [backup1]}
                ]
            }
        }
    })
    .to_string()
}

async fn get_json(state: BiliState, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = create_router(state)
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap();
    (status, json)
}

#[tokio::test]
async fn missing_cid_is_rejected_without_upstream_call() {
    let mut upstream = mockito::Server::new_async().await;
    let playurl = upstream
        .mock("GET", "/x/player/playurl")
        .match_query(Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let (status, json) = get_json(test_state(&upstream.url()), "/audio/url?avid=42").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], 400);
    assert!(json["message"].as_str().unwrap().contains("cid"));

    playurl.assert_async().await;
}

#[tokio::test]
async fn missing_avid_is_rejected_without_upstream_call() {
    let mut upstream = mockito::Server::new_async().await;
    let playurl = upstream
        .mock("GET", "/x/player/playurl")
        .match_query(Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let (status, json) = get_json(test_state(&upstream.url()), "/audio/url?cid=7").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["message"].as_str().unwrap().contains("avid"));

    playurl.assert_async().await;
}

#[tokio::test]
async fn audio_url_returns_upstream_track_list() {
    let mut upstream = mockito::Server::new_async().await;
    let playurl = upstream
        .mock("GET", "/x/player/playurl")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("avid".into(), "42".into()),
            Matcher::UrlEncoded("cid".into(), "7".into()),
            Matcher::UrlEncoded("fnval".into(), "16".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(playurl_body(
            "https://cdn/a0.m4s",
            "https://cdn/a0-bk.m4s",
            "https://cdn/a1.m4s",
            "https://cdn/a1-bk.m4s",
        ))
        .create_async()
        .await;

    let (status, json) = get_json(test_state(&upstream.url()), "/audio/url?avid=42&cid=7").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["code"], 0);
    let data = json["data"].as_array().unwrap();
    assert_eq!(data.len(), 2);
    assert_eq!(data[0]["base_url"], "https://cdn/a0.m4s");
    assert_eq!(data[1]["backup_url"][0], "https://cdn/a1-bk.m4s");

    playurl.assert_async().await;
}

#[tokio::test]
async fn anonymous_calls_carry_the_preload_marker() {
    let mut upstream = mockito::Server::new_async().await;
    let playurl = upstream
        .mock("GET", "/x/player/playurl")
        .match_query(Matcher::UrlEncoded(
            "gaia_source".into(),
            "pre-load".into(),
        ))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(playurl_body(
            "https://cdn/a0.m4s",
            "https://cdn/a0-bk.m4s",
            "https://cdn/a1.m4s",
            "https://cdn/a1-bk.m4s",
        ))
        .create_async()
        .await;

    let (status, _json) = get_json(test_state(&upstream.url()), "/audio/url?avid=42&cid=7").await;

    assert_eq!(status, StatusCode::OK);
    playurl.assert_async().await;
}

#[tokio::test]
async fn configured_credential_is_forwarded_as_cookie() {
    let mut upstream = mockito::Server::new_async().await;
    let playurl = upstream
        .mock("GET", "/x/player/playurl")
        .match_header("cookie", Matcher::Regex("SESSDATA=tok123".to_string()))
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(playurl_body(
            "https://cdn/a0.m4s",
            "https://cdn/a0-bk.m4s",
            "https://cdn/a1.m4s",
            "https://cdn/a1-bk.m4s",
        ))
        .create_async()
        .await;

    let api_config = BiliApiConfig {
        base_url: upstream.url(),
        sessdata: Some("tok123".to_string()),
        ..Default::default()
    };
    let client = BiliClient::new(api_config).unwrap();
    client.resolve_manifest(42, 7).await.unwrap();

    playurl.assert_async().await;
}

#[tokio::test]
async fn preview_gated_content_maps_to_403() {
    let mut upstream = mockito::Server::new_async().await;
    let playurl = upstream
        .mock("GET", "/x/player/playurl")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            serde_json::json!({
                "code": 0,
                "message": "0",
                "ttl": 1,
                "data": {
                    "quality": 32,
                    "accept_description": ["试看", "高清 1080P"],
                    "accept_quality": [80, 32]
                }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let (status, json) = get_json(test_state(&upstream.url()), "/audio/url?avid=42&cid=7").await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["code"], 403);

    playurl.assert_async().await;
}

#[tokio::test]
async fn upstream_api_error_is_opaque_500() {
    let mut upstream = mockito::Server::new_async().await;
    let playurl = upstream
        .mock("GET", "/x/player/playurl")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"code":-404,"message":"啥都木有","ttl":1}"#)
        .create_async()
        .await;

    let (status, json) = get_json(test_state(&upstream.url()), "/audio/url?avid=42&cid=7").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["code"], 500);
    // le détail upstream ne doit pas fuiter vers le client
    assert_eq!(json["message"], "stream resolution failed");

    playurl.assert_async().await;
}

#[tokio::test]
async fn stream_url_selection_is_deterministic() {
    let mut upstream = mockito::Server::new_async().await;
    let playurl = upstream
        .mock("GET", "/x/player/playurl")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(playurl_body(
            "https://cdn/a0.m4s",
            "https://cdn/a0-bk.m4s",
            "https://cdn/a1.m4s",
            "https://cdn/a1-bk.m4s",
        ))
        .expect(2)
        .create_async()
        .await;

    let api_config = BiliApiConfig {
        base_url: upstream.url(),
        ..Default::default()
    };
    let client = BiliClient::new(api_config).unwrap();

    let first = client.resolve_stream_url(42, 7).await.unwrap();
    let second = client.resolve_stream_url(42, 7).await.unwrap();

    // deuxième entrée du manifeste, première URL de secours
    assert_eq!(first, "https://cdn/a1-bk.m4s");
    assert_eq!(first, second);

    playurl.assert_async().await;
}

#[tokio::test]
async fn audio_parts_lists_playable_parts() {
    let mut upstream = mockito::Server::new_async().await;
    let pagelist = upstream
        .mock("GET", "/x/player/pagelist")
        .match_query(Matcher::UrlEncoded("aid".into(), "42".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            serde_json::json!({
                "code": 0,
                "message": "0",
                "ttl": 1,
                "data": [
                    {"cid": 1001, "page": 1, "part": "Track 01", "duration": 240},
                    {"cid": 1002, "page": 2, "part": "Track 02", "duration": 198}
                ]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let (status, json) = get_json(test_state(&upstream.url()), "/audio/parts?avid=42").await;

    assert_eq!(status, StatusCode::OK);
    let data = json["data"].as_array().unwrap();
    assert_eq!(data.len(), 2);
    assert_eq!(data[0]["cid"], 1001);
    assert_eq!(data[1]["part"], "Track 02");

    pagelist.assert_async().await;
}

// ============================================================================
// Relais /play/url
// ============================================================================

/// Corps de référence : 1000 octets pseudo-aléatoires mais reproductibles
fn fixture_bytes() -> Vec<u8> {
    (0..1000u32).map(|i| (i.wrapping_mul(31) % 251) as u8).collect()
}

fn play_uri(media_url: &str) -> String {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("url", media_url)
        .finish();
    format!("/play/url?{}", query)
}

#[tokio::test]
async fn relay_passes_range_through() {
    let full = fixture_bytes();
    let slice = full[100..200].to_vec();

    let mut upstream = mockito::Server::new_async().await;
    let media = upstream
        .mock("GET", "/media/a1.m4s")
        .match_header("range", "bytes=100-199")
        .with_status(206)
        .with_header("content-type", "application/octet-stream")
        .with_header("content-range", "bytes 100-199/1000")
        .with_header("accept-ranges", "bytes")
        .with_body(slice.clone())
        .create_async()
        .await;

    let media_url = format!("{}/media/a1.m4s", upstream.url());
    let response = create_router(test_state(&upstream.url()))
        .oneshot(
            Request::builder()
                .uri(play_uri(&media_url))
                .header(header::RANGE, "bytes=100-199")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(
        response.headers().get(header::CONTENT_RANGE).unwrap(),
        "bytes 100-199/1000"
    );
    // le type MIME est fixe, jamais recopié de l'upstream
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "audio/mpeg"
    );

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(bytes.as_ref(), slice.as_slice());

    media.assert_async().await;
}

#[tokio::test]
async fn relay_without_range_returns_full_body() {
    let full = fixture_bytes();

    let mut upstream = mockito::Server::new_async().await;
    let media = upstream
        .mock("GET", "/media/a1.m4s")
        .match_header("range", Matcher::Missing)
        .with_status(200)
        .with_header("content-type", "application/octet-stream")
        .with_body(full.clone())
        .create_async()
        .await;

    let media_url = format!("{}/media/a1.m4s", upstream.url());
    let response = create_router(test_state(&upstream.url()))
        .oneshot(
            Request::builder()
                .uri(play_uri(&media_url))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(header::CONTENT_RANGE).is_none());

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(bytes.len(), full.len());
    assert_eq!(bytes.as_ref(), full.as_slice());

    media.assert_async().await;
}

#[tokio::test]
async fn relay_missing_url_is_rejected() {
    let upstream = mockito::Server::new_async().await;

    let (status, json) = get_json(test_state(&upstream.url()), "/play/url").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("url"));
}

#[tokio::test]
async fn relay_rejects_non_http_url() {
    let upstream = mockito::Server::new_async().await;

    let (status, json) = get_json(
        test_state(&upstream.url()),
        "/play/url?url=ftp%3A%2F%2Fcdn%2Fa.m4s",
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("url"));
}

#[tokio::test]
async fn relay_upstream_failure_is_opaque_500() {
    let mut upstream = mockito::Server::new_async().await;
    let media = upstream
        .mock("GET", "/media/gone.m4s")
        .with_status(403)
        .with_body("upstream says no")
        .create_async()
        .await;

    let media_url = format!("{}/media/gone.m4s", upstream.url());
    let (status, json) = get_json(test_state(&upstream.url()), &play_uri(&media_url)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"], "failed to fetch upstream audio");

    media.assert_async().await;
}

#[tokio::test]
async fn relay_stream_can_be_dropped_after_first_chunk() {
    // un corps volumineux pour que le relais ne tienne pas tout en un chunk
    let big = vec![0xA5u8; 4 * 1024 * 1024];

    let mut upstream = mockito::Server::new_async().await;
    let _media = upstream
        .mock("GET", "/media/big.m4s")
        .with_status(200)
        .with_body(big)
        .create_async()
        .await;

    let relay = StreamRelay::new(RelayConfig::default()).unwrap();
    let media_url = format!("{}/media/big.m4s", upstream.url());

    let mut relayed = relay.fetch(&media_url, None).await.unwrap();
    let first = relayed.stream.next().await;
    assert!(matches!(first, Some(Ok(_))));

    // la déconnexion du client se traduit par un drop du flux : la réponse
    // upstream est libérée sans consommer le reste du corps
    drop(relayed);

    // le relais reste utilisable pour un appel suivant
    let again = relay.fetch(&media_url, None).await.unwrap();
    assert!(!again.partial);
}
