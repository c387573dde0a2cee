// src/auth/oauth.rs
// OAuth 2 authorization-code flow against Google and GitHub

use chrono::{DateTime, Duration, Utc};
use rand::distr::Alphanumeric;
use rand::Rng;
use reqwest::header::{ACCEPT, USER_AGENT};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration as StdDuration;
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use super::session::SessionUser;
use crate::config::ForgeConfig;
use crate::types::{AuthProvider, User};

const STATE_LEN: usize = 32;
const STATE_TTL_MINUTES: i64 = 10;
const HTTP_TIMEOUT_SECS: u64 = 15;
const GITHUB_USER_AGENT: &str = concat!("prompt-forge/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("{0} login is not configured")]
    NotConfigured(AuthProvider),

    #[error("{0} does not support OAuth")]
    Unsupported(AuthProvider),

    #[error("unknown or expired state")]
    InvalidState,

    #[error("provider denied access: {0}")]
    Denied(String),

    #[error("token exchange failed: {0}")]
    TokenExchange(String),

    #[error("profile request failed: {0}")]
    Profile(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

/// The three URLs a provider exposes for the code flow
#[derive(Debug, Clone)]
pub struct ProviderEndpoints {
    pub authorize_url: String,
    pub token_url: String,
    pub profile_url: String,
    /// GitHub hides private emails from the profile; this lists them
    pub emails_url: Option<String>,
    pub scope: String,
}

impl ProviderEndpoints {
    pub fn google() -> Self {
        Self {
            authorize_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            profile_url: "https://www.googleapis.com/oauth2/v3/userinfo".to_string(),
            emails_url: None,
            scope: "profile email".to_string(),
        }
    }

    pub fn github() -> Self {
        Self {
            authorize_url: "https://github.com/login/oauth/authorize".to_string(),
            token_url: "https://github.com/login/oauth/access_token".to_string(),
            profile_url: "https://api.github.com/user".to_string(),
            emails_url: Some("https://api.github.com/user/emails".to_string()),
            scope: "user:email".to_string(),
        }
    }

    /// Same paths as the real provider, rooted at `base` (used against local fakes)
    pub fn rooted_at(base: &str, provider: AuthProvider) -> Self {
        let base = base.trim_end_matches('/');
        let mut endpoints = match provider {
            AuthProvider::Github => Self::github(),
            _ => Self::google(),
        };
        endpoints.authorize_url = format!("{}/authorize", base);
        endpoints.token_url = format!("{}/token", base);
        endpoints.profile_url = format!("{}/user", base);
        if endpoints.emails_url.is_some() {
            endpoints.emails_url = Some(format!("{}/user/emails", base));
        }
        endpoints
    }
}

#[derive(Debug, Clone)]
struct Credentials {
    client_id: String,
    client_secret: String,
    redirect_uri: String,
}

#[derive(Debug, Clone)]
struct PendingState {
    provider: AuthProvider,
    expires_at: DateTime<Utc>,
}

// ============================================================================
// Provider payloads
// ============================================================================

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GoogleProfile {
    #[serde(alias = "id")]
    pub sub: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GithubProfile {
    pub id: u64,
    pub login: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GithubEmail {
    pub email: String,
    #[serde(default)]
    pub primary: bool,
}

pub fn google_user(profile: GoogleProfile, access_token: String) -> SessionUser {
    let email = profile.email.unwrap_or_default();
    let name = profile
        .name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| email.clone());

    SessionUser {
        user: User {
            id: format!("google_{}", profile.sub),
            name,
            email,
            avatar: profile.picture,
            provider: AuthProvider::Google,
        },
        access_token: Some(access_token),
    }
}

/// `emails` is only consulted when the profile has no public email
pub fn github_user(
    profile: GithubProfile,
    emails: &[GithubEmail],
    access_token: String,
) -> SessionUser {
    let email = profile
        .email
        .filter(|e| !e.is_empty())
        .or_else(|| {
            emails
                .iter()
                .find(|e| e.primary)
                .or_else(|| emails.first())
                .map(|e| e.email.clone())
        })
        .unwrap_or_default();

    let name = profile
        .name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| profile.login.clone());

    SessionUser {
        user: User {
            id: format!("github_{}", profile.id),
            name,
            email,
            avatar: profile.avatar_url,
            provider: AuthProvider::Github,
        },
        access_token: Some(access_token),
    }
}

// ============================================================================
// Client
// ============================================================================

pub struct OAuthClient {
    http: reqwest::Client,
    google: ProviderEndpoints,
    github: ProviderEndpoints,
    google_credentials: Option<Credentials>,
    github_credentials: Option<Credentials>,
    pending: Mutex<HashMap<String, PendingState>>,
}

impl OAuthClient {
    pub fn new(config: &ForgeConfig) -> Result<Self, OAuthError> {
        Self::with_endpoints(config, ProviderEndpoints::google(), ProviderEndpoints::github())
    }

    pub fn with_endpoints(
        config: &ForgeConfig,
        google: ProviderEndpoints,
        github: ProviderEndpoints,
    ) -> Result<Self, OAuthError> {
        let credentials = |id: &Option<String>, secret: &Option<String>, provider: &str| {
            match (id, secret) {
                (Some(id), Some(secret)) => Some(Credentials {
                    client_id: id.clone(),
                    client_secret: secret.clone(),
                    redirect_uri: config.callback_url(provider),
                }),
                _ => None,
            }
        };

        let http = reqwest::Client::builder()
            .timeout(StdDuration::from_secs(HTTP_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            http,
            google,
            github,
            google_credentials: credentials(
                &config.google_client_id,
                &config.google_client_secret,
                "google",
            ),
            github_credentials: credentials(
                &config.github_client_id,
                &config.github_client_secret,
                "github",
            ),
            pending: Mutex::new(HashMap::new()),
        })
    }

    pub fn is_configured(&self, provider: AuthProvider) -> bool {
        self.credentials(provider).is_ok()
    }

    fn endpoints(&self, provider: AuthProvider) -> &ProviderEndpoints {
        match provider {
            AuthProvider::Github => &self.github,
            _ => &self.google,
        }
    }

    fn credentials(&self, provider: AuthProvider) -> Result<&Credentials, OAuthError> {
        let creds = match provider {
            AuthProvider::Google => self.google_credentials.as_ref(),
            AuthProvider::Github => self.github_credentials.as_ref(),
            AuthProvider::Email => return Err(OAuthError::Unsupported(provider)),
        };
        creds.ok_or(OAuthError::NotConfigured(provider))
    }

    /// Build the provider's consent URL and remember its CSRF state
    pub fn authorize_url(&self, provider: AuthProvider) -> Result<String, OAuthError> {
        let creds = self.credentials(provider)?;
        let endpoints = self.endpoints(provider);

        let state: String = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(STATE_LEN)
            .map(char::from)
            .collect();

        let mut url = Url::parse(&endpoints.authorize_url)?;
        url.query_pairs_mut()
            .append_pair("client_id", &creds.client_id)
            .append_pair("redirect_uri", &creds.redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", &endpoints.scope)
            .append_pair("state", &state);

        self.remember_state(state, provider);
        Ok(url.into())
    }

    fn remember_state(&self, state: String, provider: AuthProvider) {
        let now = Utc::now();
        if let Ok(mut pending) = self.pending.lock() {
            pending.retain(|_, p| p.expires_at > now);
            pending.insert(
                state,
                PendingState {
                    provider,
                    expires_at: now + Duration::minutes(STATE_TTL_MINUTES),
                },
            );
        }
    }

    /// One-shot: a state is consumed whether or not it matches
    fn take_state(&self, state: &str, provider: AuthProvider) -> Result<(), OAuthError> {
        let taken = self
            .pending
            .lock()
            .ok()
            .and_then(|mut pending| pending.remove(state));

        match taken {
            Some(p) if p.provider == provider && p.expires_at > Utc::now() => Ok(()),
            _ => Err(OAuthError::InvalidState),
        }
    }

    /// Finish the code flow: verify state, exchange the code, fetch the profile
    pub async fn complete(
        &self,
        provider: AuthProvider,
        code: &str,
        state: &str,
    ) -> Result<SessionUser, OAuthError> {
        let creds = self.credentials(provider)?;
        self.take_state(state, provider)?;

        let access_token = self.exchange_code(provider, creds, code).await?;
        debug!(%provider, "Exchanged authorization code");

        let user = match provider {
            AuthProvider::Google => {
                let profile: GoogleProfile = self.fetch_profile(provider, &access_token).await?;
                google_user(profile, access_token)
            }
            AuthProvider::Github => {
                let profile: GithubProfile = self.fetch_profile(provider, &access_token).await?;
                let emails = if profile.email.as_deref().is_none_or(str::is_empty) {
                    self.github_emails(&access_token).await
                } else {
                    Vec::new()
                };
                github_user(profile, &emails, access_token)
            }
            AuthProvider::Email => return Err(OAuthError::Unsupported(provider)),
        };

        info!(%provider, user_id = %user.user.id, "OAuth login completed");
        Ok(user)
    }

    async fn exchange_code(
        &self,
        provider: AuthProvider,
        creds: &Credentials,
        code: &str,
    ) -> Result<String, OAuthError> {
        let params = [
            ("client_id", creds.client_id.as_str()),
            ("client_secret", creds.client_secret.as_str()),
            ("code", code),
            ("redirect_uri", creds.redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ];

        let response = self
            .http
            .post(&self.endpoints(provider).token_url)
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, GITHUB_USER_AGENT)
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| OAuthError::TokenExchange(e.to_string()))?;

        if let Some(error) = body.error {
            let detail = body.error_description.unwrap_or(error);
            return Err(OAuthError::TokenExchange(detail));
        }
        if !status.is_success() {
            return Err(OAuthError::TokenExchange(format!("status {}", status)));
        }

        body.access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| OAuthError::TokenExchange("no access token in response".to_string()))
    }

    async fn fetch_profile<T: serde::de::DeserializeOwned>(
        &self,
        provider: AuthProvider,
        access_token: &str,
    ) -> Result<T, OAuthError> {
        let response = self
            .http
            .get(&self.endpoints(provider).profile_url)
            .bearer_auth(access_token)
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, GITHUB_USER_AGENT)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(OAuthError::Profile(format!("status {}", response.status())));
        }

        response
            .json()
            .await
            .map_err(|e| OAuthError::Profile(e.to_string()))
    }

    /// Best effort; a user without a reachable email still logs in
    async fn github_emails(&self, access_token: &str) -> Vec<GithubEmail> {
        let Some(url) = self.github.emails_url.as_deref() else {
            return Vec::new();
        };

        let result = async {
            self.http
                .get(url)
                .bearer_auth(access_token)
                .header(ACCEPT, "application/json")
                .header(USER_AGENT, GITHUB_USER_AGENT)
                .send()
                .await?
                .error_for_status()?
                .json::<Vec<GithubEmail>>()
                .await
        }
        .await;

        result.unwrap_or_else(|e| {
            warn!("Failed to fetch GitHub emails: {}", e);
            Vec::new()
        })
    }
}
