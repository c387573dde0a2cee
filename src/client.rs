// src/client.rs
// HTTP client for the auth gateway, used by the CLI

use anyhow::{bail, Context, Result};
use reqwest::{header, Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use crate::auth::SESSION_COOKIE;
use crate::types::{AuthProvider, User};

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Clone)]
pub struct AuthClient {
    client: Client,
    api_url: String,
}

impl AuthClient {
    /// `api_url` is the gateway's `/api` root, e.g. `http://localhost:3001/api`
    pub fn new(api_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .context("Failed to build auth gateway client")?;

        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Where a browser starts the provider's login
    pub fn login_url(&self, provider: AuthProvider) -> String {
        format!("{}/auth/{}", self.api_url, provider)
    }

    /// Sign in with email; returns the user and the session token
    pub async fn login_with_email(&self, email: &str, password: &str) -> Result<(User, String)> {
        let response = self
            .client
            .post(format!("{}/auth/email", self.api_url))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .context("Failed to reach auth gateway")?;

        let token = session_token(response.headers());
        let response = check(response).await?;
        let user: User = response.json().await.context("Invalid user in login response")?;

        let Some(token) = token else {
            bail!("Login response did not set a session cookie");
        };
        debug!(user_id = %user.id, "Email login succeeded");
        Ok((user, token))
    }

    /// `None` when the session is unknown or expired
    pub async fn current_user(&self, token: &str) -> Result<Option<User>> {
        let response = self
            .client
            .get(format!("{}/auth/user", self.api_url))
            .header(header::COOKIE, cookie_header(token))
            .send()
            .await
            .context("Failed to reach auth gateway")?;

        if response.status() == StatusCode::UNAUTHORIZED {
            return Ok(None);
        }
        let response = check(response).await?;
        Ok(Some(response.json().await.context("Invalid user response")?))
    }

    /// Adopt a session started elsewhere, e.g. the `forge.sid` cookie left
    /// in the browser by an OAuth login
    pub async fn resume_session(&self, token: &str) -> Result<User> {
        let token = token.trim();
        if token.is_empty() {
            bail!("Session token is empty");
        }
        match self.current_user(token).await? {
            Some(user) => {
                debug!(user_id = %user.id, "Session resumed");
                Ok(user)
            }
            None => bail!("Session token is unknown or expired"),
        }
    }

    pub async fn logout(&self, token: &str) -> Result<()> {
        let response = self
            .client
            .post(format!("{}/auth/logout", self.api_url))
            .header(header::COOKIE, cookie_header(token))
            .send()
            .await
            .context("Failed to reach auth gateway")?;

        check(response).await?;
        Ok(())
    }
}

fn cookie_header(token: &str) -> String {
    format!("{}={}", SESSION_COOKIE, token)
}

/// Pull the session token out of `Set-Cookie`
fn session_token(headers: &header::HeaderMap) -> Option<String> {
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// Turn a non-2xx response into an error carrying the gateway's message
async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .map(|body| body.error)
        .unwrap_or(text);
    bail!("Auth gateway returned {}: {}", status, message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderMap, HeaderValue};

    #[test]
    fn test_login_url() {
        let client = AuthClient::new("http://localhost:3001/api/").unwrap();
        assert_eq!(
            client.login_url(AuthProvider::Github),
            "http://localhost:3001/api/auth/github"
        );
    }

    #[test]
    fn test_session_token_from_set_cookie() {
        let mut headers = HeaderMap::new();
        headers.append(
            header::SET_COOKIE,
            HeaderValue::from_static("other=1; Path=/"),
        );
        headers.append(
            header::SET_COOKIE,
            HeaderValue::from_static("forge.sid=abc123; Path=/; HttpOnly; SameSite=Lax"),
        );
        assert_eq!(session_token(&headers).as_deref(), Some("abc123"));

        let mut cleared = HeaderMap::new();
        cleared.append(
            header::SET_COOKIE,
            HeaderValue::from_static("forge.sid=; Path=/; Max-Age=0"),
        );
        assert!(session_token(&cleared).is_none());
    }
}
