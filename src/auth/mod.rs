//! Auth session gateway
//!
//! Small axum service that signs users in (Google, GitHub or email) and keeps
//! the result in a server-side session behind an HttpOnly cookie. The studio
//! only ever sees the public `User`; provider tokens stay here.

pub mod error;
pub mod handlers;
pub mod oauth;
pub mod rate_limit;
pub mod session;

use anyhow::Result;
use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::ForgeConfig;
pub use error::{ApiError, ApiResult};
pub use oauth::{OAuthClient, OAuthError, ProviderEndpoints};
pub use rate_limit::RateLimiter;
pub use session::{SessionStore, SessionUser, SESSION_COOKIE};

const CONTENT_SECURITY_POLICY: &str = "default-src 'self'; \
    style-src 'self' 'unsafe-inline' https://fonts.googleapis.com; \
    font-src 'self' https://fonts.gstatic.com; \
    img-src 'self' data: https:; \
    script-src 'self'";

/// How often expired sessions and idle rate-limit entries are swept
const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Shared state for all gateway handlers
#[derive(Clone)]
pub struct AuthState {
    pub config: Arc<ForgeConfig>,
    pub sessions: Arc<SessionStore>,
    pub oauth: Arc<OAuthClient>,
    pub limiter: Arc<RateLimiter>,
}

impl AuthState {
    pub fn new(config: ForgeConfig) -> Result<Self, OAuthError> {
        let oauth = OAuthClient::new(&config)?;
        Ok(Self::with_oauth(config, oauth))
    }

    pub fn with_oauth(config: ForgeConfig, oauth: OAuthClient) -> Self {
        let sessions = SessionStore::new(chrono::Duration::hours(config.session_ttl_hours));
        let limiter = RateLimiter::new(
            config.rate_limit_max,
            Duration::from_secs(config.rate_limit_window_secs),
        );

        Self {
            config: Arc::new(config),
            sessions: Arc::new(sessions),
            oauth: Arc::new(oauth),
            limiter: Arc::new(limiter),
        }
    }

    /// `Set-Cookie` value for a fresh session token
    pub fn cookie_for(&self, token: &str) -> String {
        session::session_cookie(token, self.sessions.ttl(), self.config.is_production())
    }
}

fn cors_layer(config: &ForgeConfig) -> CorsLayer {
    let origin = match HeaderValue::from_str(config.client_url.trim_end_matches('/')) {
        Ok(origin) => AllowOrigin::exact(origin),
        Err(_) => {
            warn!("CLIENT_URL is not a valid origin, CORS disabled: {}", config.client_url);
            AllowOrigin::list(Vec::<HeaderValue>::new())
        }
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

/// Create the router with all endpoints
pub fn create_router(state: AuthState) -> Router {
    let api = Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/auth/user", get(handlers::current_user_handler))
        .route("/auth/google", get(handlers::google_login_handler))
        .route("/auth/google/callback", get(handlers::google_callback_handler))
        .route("/auth/github", get(handlers::github_login_handler))
        .route("/auth/github/callback", get(handlers::github_callback_handler))
        .route("/auth/email", post(handlers::email_login_handler))
        .route("/auth/logout", post(handlers::logout_handler))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::rate_limit,
        ));

    Router::new()
        .nest("/api", api)
        .fallback(handlers::not_found_handler)
        .layer(SetResponseHeaderLayer::if_not_present(
            header::CONTENT_SECURITY_POLICY,
            HeaderValue::from_static(CONTENT_SECURITY_POLICY),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("SAMEORIGIN"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
        .layer(cors_layer(&state.config))
        .layer(CatchPanicLayer::custom(error::panic_response(
            state.config.is_production(),
        )))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the gateway until ctrl-c
pub async fn run(config: ForgeConfig) -> Result<()> {
    let bind_address = config.bind_address();
    info!(
        "Environment: {}, OAuth configured: Google={}, GitHub={}",
        config.environment,
        config.google_configured(),
        config.github_configured()
    );

    let state = AuthState::new(config)?;
    let sessions = state.sessions.clone();
    let limiter = state.limiter.clone();
    let purge = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SESSION_PURGE_INTERVAL);
        loop {
            ticker.tick().await;
            sessions.purge_expired().await;
            limiter.retain_recent();
        }
    });

    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!("Auth gateway listening on http://{}", bind_address);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        let _ = tokio::signal::ctrl_c().await;
        info!("Shutting down auth gateway");
    })
    .await?;

    purge.abort();
    Ok(())
}
