use crate::controller::{NetworkListing, WifiController};
use crate::structs::Security;
use crate::Error;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

// The shared state for our web server. The controller hides which
// `RemoteCallClient` sits underneath.
pub type WebServerState = State<Arc<AppState>>;

pub struct AppState {
    pub controller: Arc<WifiController>,
}

/// Builds the JSON API router.
pub fn router(controller: Arc<WifiController>) -> Router {
    let app_state = Arc::new(AppState { controller });

    Router::new()
        .route("/api/networks", get(api_list_networks))
        .route("/api/connect", post(api_connect_wifi))
        .with_state(app_state)
}

/// Starts the Axum web server.
///
/// # Returns
/// A `JoinHandle` for the server task.
pub fn start_web_server(
    controller: Arc<WifiController>,
    addr: SocketAddr,
) -> JoinHandle<crate::Result<()>> {
    let app = router(controller);

    tracing::info!(%addr, "web server listening");

    tokio::spawn(async move {
        let listener = TcpListener::bind(addr).await?;
        axum::serve(listener, app.into_make_service())
            .await
            .map_err(|e| Error::WebServer(e.into()))
    })
}

fn error_response(e: &Error) -> Response {
    let status = match e {
        Error::NotFound => StatusCode::NOT_FOUND,
        Error::ServiceUnavailable(_) | Error::Timeout { .. } => StatusCode::SERVICE_UNAVAILABLE,
        Error::DuplicateProfile { .. } | Error::Cancelled => StatusCode::CONFLICT,
        Error::UnsupportedSecurity(_) => StatusCode::UNPROCESSABLE_ENTITY,
        Error::ConnectError { name, message } => {
            return (
                StatusCode::BAD_GATEWAY,
                Json(serde_json::json!({
                    "error": e.to_string(),
                    "name": name,
                    "message": message,
                })),
            )
                .into_response();
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(serde_json::json!({ "error": e.to_string() }))).into_response()
}

// --- Route Handlers ---

/// API endpoint to scan and list Wi-Fi networks.
async fn api_list_networks(State(state): WebServerState) -> impl IntoResponse {
    match state.controller.show_networks().await {
        Ok(NetworkListing::Networks(networks)) => (StatusCode::OK, Json(networks)).into_response(),
        Ok(NetworkListing::NoAdapter) => error_response(&Error::NotFound),
        Err(e) => {
            tracing::warn!(error = %e, "network listing failed");
            error_response(&e)
        }
    }
}

/// SSID as posted by a client: the `ssid` byte array of a listed network,
/// or plain text for names typed by hand.
#[derive(Deserialize)]
#[serde(untagged)]
pub enum SsidField {
    Bytes(Vec<u8>),
    Text(String),
}

impl SsidField {
    fn into_bytes(self) -> Vec<u8> {
        match self {
            SsidField::Bytes(bytes) => bytes,
            SsidField::Text(text) => text.into_bytes(),
        }
    }
}

#[derive(Deserialize)]
pub struct ConnectRequest {
    ssid: SsidField,
    password: String,
    /// Security class as listed by `/api/networks`; WPA-PSK when omitted.
    #[serde(default)]
    security: Option<Security>,
}

/// API endpoint to create a connection profile.
async fn api_connect_wifi(
    State(state): WebServerState,
    Json(payload): Json<ConnectRequest>,
) -> impl IntoResponse {
    let security = payload.security.unwrap_or(Security::WpaPsk);
    let ssid = payload.ssid.into_bytes();
    match state
        .controller
        .connect_with_security(&ssid, security, &payload.password)
        .await
    {
        Ok(path) => (StatusCode::OK, Json(serde_json::json!({ "path": path }))).into_response(),
        Err(e) => {
            tracing::warn!(ssid = %String::from_utf8_lossy(&ssid), error = %e, "connect failed");
            error_response(&e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::mock::{
        DEVICE_TYPE_ETHERNET, DEVICE_TYPE_WIFI, MockAccessPoint, MockNetworkManager,
    };
    use crate::config::ServiceConfig;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    const WLAN0: &str = "/org/freedesktop/NetworkManager/Devices/2";

    fn app(nm: MockNetworkManager) -> Router {
        router(Arc::new(WifiController::new(
            Arc::new(nm),
            Arc::new(ServiceConfig::default()),
        )))
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn connect_request(body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/connect")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn lists_networks_as_json() {
        let nm = MockNetworkManager::new()
            .with_device(WLAN0, DEVICE_TYPE_WIFI)
            .with_access_point(
                WLAN0,
                MockAccessPoint::new("/org/freedesktop/NetworkManager/AccessPoint/1", b"HomeNet", 80)
                    .wpa_psk(),
            );

        let response = app(nm)
            .oneshot(Request::builder().uri("/api/networks").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body[0]["name"], "HomeNet");
        assert_eq!(body[0]["ssid"], serde_json::json!(b"HomeNet".to_vec()));
        assert_eq!(body[0]["bucket"], 75);
        assert_eq!(body[0]["security"], "wpa-psk");
        assert_eq!(body[0]["connected"], false);
    }

    #[tokio::test]
    async fn missing_adapter_is_404() {
        let nm = MockNetworkManager::new().with_device(
            "/org/freedesktop/NetworkManager/Devices/1",
            DEVICE_TYPE_ETHERNET,
        );

        let response = app(nm)
            .oneshot(Request::builder().uri("/api/networks").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unavailable_service_is_503() {
        let response = app(MockNetworkManager::new().unavailable())
            .oneshot(Request::builder().uri("/api/networks").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn connect_returns_profile_path() {
        let response = app(MockNetworkManager::new())
            .oneshot(connect_request(
                serde_json::json!({ "ssid": "HomeNet", "password": "s3cr3t!" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["path"], "/org/freedesktop/NetworkManager/Settings/1");
    }

    #[tokio::test]
    async fn listed_ssid_bytes_post_back_unchanged() {
        let nm = Arc::new(
            MockNetworkManager::new()
                .with_device(WLAN0, DEVICE_TYPE_WIFI)
                .with_access_point(
                    WLAN0,
                    MockAccessPoint::new(
                        "/org/freedesktop/NetworkManager/AccessPoint/1",
                        &[0xff, b'N', b'e', b't'],
                        70,
                    )
                    .wpa_psk(),
                ),
        );
        let app = router(Arc::new(WifiController::new(
            nm.clone(),
            Arc::new(ServiceConfig::default()),
        )));

        let listed = app
            .clone()
            .oneshot(Request::builder().uri("/api/networks").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = json_body(listed).await;
        assert_eq!(body[0]["name"], "\u{fffd}Net");
        assert_eq!(body[0]["ssid"], serde_json::json!([255, 78, 101, 116]));

        let connected = app
            .oneshot(connect_request(serde_json::json!({
                "ssid": body[0]["ssid"].clone(),
                "password": "s3cr3t!",
                "security": body[0]["security"].clone(),
            })))
            .await
            .unwrap();

        assert_eq!(connected.status(), StatusCode::OK);
        assert_eq!(nm.added_profiles()[0].ssid, vec![0xff, b'N', b'e', b't']);
    }

    #[tokio::test]
    async fn rejected_profile_is_502_with_service_error() {
        let nm = MockNetworkManager::new().rejecting_add(
            "org.freedesktop.NetworkManager.Error.InvalidArguments",
            "bad psk",
        );

        let response = app(nm)
            .oneshot(connect_request(
                serde_json::json!({ "ssid": "HomeNet", "password": "x" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = json_body(response).await;
        assert_eq!(body["name"], "org.freedesktop.NetworkManager.Error.InvalidArguments");
        assert_eq!(body["message"], "bad psk");
    }

    #[tokio::test]
    async fn duplicate_and_unsupported_map_to_client_errors() {
        let nm = MockNetworkManager::new()
            .with_connection("/org/freedesktop/NetworkManager/Settings/4", b"HomeNet");
        let app = app(nm);

        let duplicate = app
            .clone()
            .oneshot(connect_request(
                serde_json::json!({ "ssid": "HomeNet", "password": "s3cr3t!" }),
            ))
            .await
            .unwrap();
        assert_eq!(duplicate.status(), StatusCode::CONFLICT);

        let enterprise = app
            .oneshot(connect_request(serde_json::json!({
                "ssid": "CorpNet",
                "password": "pw",
                "security": "enterprise",
            })))
            .await
            .unwrap();
        assert_eq!(enterprise.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
