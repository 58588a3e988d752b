use crate::cli::globals::GlobalArgs;
use anyhow::{anyhow, Context, Result};
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderName, HeaderValue, Method, Request,
    },
    middleware,
    routing::{get, post, put},
    Extension, Router,
};
use secrecy::ExposeSecret;
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{info, info_span, warn, Span};
use ulid::Ulid;
use url::Url;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod handlers;
pub mod notify;
mod openapi;

use handlers::auth::{
    self,
    utils::hash_password,
    AuthConfig, AuthState, TokenIssuer,
};

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(
    port: u16,
    dsn: String,
    globals: &GlobalArgs,
    auth_config: AuthConfig,
    alert_config: notify::AlertWorkerConfig,
) -> Result<()> {
    // Connect to database
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(&dsn)
        .await
        .context("Failed to connect to database")?;

    // Bootstrap: create the default administrator once, if none exists.
    let admin_hash = hash_password(globals.default_admin_password.expose_secret())?;
    if auth::storage::ensure_default_admin(&pool, &admin_hash).await? {
        warn!("Default administrator created; change the bootstrap password immediately");
    }

    let issuer = TokenIssuer::new(&globals.jwt_secret, auth_config.token_ttl_minutes());
    let cors = cors_layer(auth_config.allowed_origins())?;
    let auth_state = Arc::new(AuthState::new(auth_config, issuer));

    // Detached alert worker: login responses never wait on delivery.
    let (alert_queue, _alert_worker) = notify::spawn_alert_worker(
        pool.clone(),
        Arc::new(notify::LogAlertSender),
        alert_config,
    );

    // Authenticated routes sit behind the password-expiry gate; the gate
    // itself exempts change-password so expired users can recover.
    let protected = Router::new()
        .route(
            "/auth/profile",
            get(auth::profile::profile).put(auth::profile::update_profile),
        )
        .route("/auth/email-settings", put(auth::profile::email_settings))
        .route("/auth/change-password", put(auth::password::change_password))
        .route("/auth/password-policy", get(auth::password::password_policy))
        .route("/admin/users", get(auth::admin::list_users))
        .route("/admin/users/:id/lock", put(auth::admin::lock_user))
        .route("/admin/users/:id/unlock", put(auth::admin::unlock_user))
        .route(
            "/admin/users/:id/reset-attempts",
            put(auth::admin::reset_attempts),
        )
        .layer(middleware::from_fn(
            auth::principal::enforce_password_expiry,
        ));

    let app = Router::new()
        .route("/auth/register", post(auth::register::register))
        .route("/auth/login", post(auth::login::login))
        .route("/health", get(handlers::health::health))
        .merge(protected)
        .merge(
            SwaggerUi::new("/swagger-ui")
                .url("/api-docs/openapi.json", openapi::ApiDoc::openapi()),
        )
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(cors)
                .layer(Extension(auth_state.clone()))
                .layer(Extension(alert_queue))
                .layer(Extension(pool.clone())),
        );

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

fn cors_layer(allowed_origins: &[String]) -> Result<CorsLayer> {
    let origins = allowed_origins
        .iter()
        .map(|origin| parse_origin(origin))
        .collect::<Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true))
}

fn parse_origin(origin: &str) -> Result<HeaderValue> {
    let parsed =
        Url::parse(origin).with_context(|| format!("Invalid allowed origin: {origin}"))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| anyhow!("Allowed origin must include a valid host: {origin}"))?;
    let port = parsed
        .port()
        .map_or_else(String::new, |port| format!(":{port}"));
    let normalized = format!("{}://{}{}", parsed.scheme(), host, port);
    HeaderValue::from_str(&normalized).context("Failed to build origin header")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_origin_normalizes_and_keeps_port() {
        let origin = parse_origin("https://app.example.com/").unwrap();
        assert_eq!(origin, HeaderValue::from_static("https://app.example.com"));

        let origin = parse_origin("http://localhost:3000").unwrap();
        assert_eq!(origin, HeaderValue::from_static("http://localhost:3000"));
    }

    #[test]
    fn parse_origin_rejects_garbage() {
        assert!(parse_origin("not-a-url").is_err());
        assert!(parse_origin("mailto:root@example.com").is_err());
    }

    #[test]
    fn cors_layer_accepts_origin_list() {
        let origins = vec![
            "https://app.example.com".to_string(),
            "http://localhost:3000".to_string(),
        ];
        assert!(cors_layer(&origins).is_ok());
        assert!(cors_layer(&[]).is_ok());
    }
}
