use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde_json::json;
use tokio::sync::mpsc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::referrals::ReferralRequest;
use super::ServiceError;
use crate::settings;

mod referrals;

#[derive(Clone)]
pub struct AppState {
    referral_channel: mpsc::Sender<ReferralRequest>,
    auth: settings::Auth,
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = if self.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };

        let mut body = json!({
            "code": self.code(),
            "message": self.message(),
        });
        if let Some(reason) = self.reason() {
            body["reason"] = json!(reason);
        }

        (status, Json(body)).into_response()
    }
}

async fn ping() -> String {
    format!(
        "services up and running... {}",
        chrono::Local::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
    )
}

fn is_authorized(headers: &HeaderMap, auth: &settings::Auth) -> bool {
    let Some(encoded) = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Basic "))
    else {
        return false;
    };

    let Ok(decoded) = STANDARD.decode(encoded.trim()) else {
        return false;
    };
    let Ok(credentials) = String::from_utf8(decoded) else {
        return false;
    };

    match credentials.split_once(':') {
        Some((username, password)) => username == auth.username && password == auth.password,
        None => false,
    }
}

async fn basic_auth(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if is_authorized(request.headers(), &state.auth) {
        return next.run(request).await;
    }

    log::warn!("Unauthorized request to {}.", request.uri());
    (
        StatusCode::UNAUTHORIZED,
        [(
            header::WWW_AUTHENTICATE,
            HeaderValue::from_static("Basic realm=\"Restricted\""),
        )],
        Json(json!({"code": "9999", "message": "unauthorized"})),
    )
        .into_response()
}

pub fn app(
    referral_channel: mpsc::Sender<ReferralRequest>,
    auth: settings::Auth,
) -> Router {
    let app_state = AppState {
        referral_channel,
        auth,
    };

    let referral_routes = Router::new()
        .route("/1.0/referral", post(referrals::redeem))
        .route("/1.0/referral/{msisdn}", get(referrals::list_history))
        .route("/1.0/referral/{msisdn}/code", get(referrals::get_code))
        .route("/1.0/referral/{msisdn}/reward", get(referrals::get_reward))
        .route_layer(middleware::from_fn_with_state(
            app_state.clone(),
            basic_auth,
        ));

    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::ORIGIN,
            header::ACCEPT,
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::CONTENT_LENGTH,
            header::CONTENT_ENCODING,
            header::ACCEPT_ENCODING,
        ])
        .expose_headers([header::CONTENT_LENGTH]);

    Router::new()
        .route("/ping", get(ping))
        .merge(referral_routes)
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

pub async fn start_http_server(
    server: &settings::Server,
    auth: settings::Auth,
    referral_channel: mpsc::Sender<ReferralRequest>,
) -> Result<(), anyhow::Error> {
    let app = app(referral_channel, auth);

    let listener = tokio::net::TcpListener::bind(&server.listen).await?;
    log::info!(
        "{} {} listening on {}",
        server.name,
        server.version,
        listener.local_addr()?
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => log::info!("Shutdown signal received."),
        Err(e) => log::error!("Could not listen for shutdown signal: {}", e),
    }
}
