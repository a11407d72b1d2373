//! Optional bearer-token gate in front of `/chat`.
//!
//! Verification itself is delegated to a [`TokenVerifier`]. The gate only
//! decides which outcome a caller sees.

use async_trait::async_trait;
use axum::http::{HeaderMap, header};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::config::Args;

pub type Claims = Map<String, Value>;

pub const GOOGLE_TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingCredential,
    #[error("invalid identity token")]
    InvalidToken,
    #[error("token verifier unavailable")]
    VerifierUnavailable,
}

// Why a verifier rejected a token. Never shown to callers.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("tokeninfo request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("tokeninfo rejected token with status {0}")]
    Rejected(u16),
    #[error("audience mismatch: {0:?}")]
    Audience(Option<String>),
    #[error("token expired")]
    Expired,
    #[error("malformed claims: {0}")]
    Malformed(String),
}

/// Verify a token for an audience, returning its claims.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str, audience: Option<&str>) -> Result<Claims, VerifyError>;
}

// Google-signed ID tokens, checked via the tokeninfo endpoint
pub struct GoogleTokenInfoVerifier {
    client: reqwest::Client,
    tokeninfo_url: String,
}

impl GoogleTokenInfoVerifier {
    pub fn new(tokeninfo_url: &str) -> Result<Self, VerifyError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            tokeninfo_url: tokeninfo_url.to_string(),
        })
    }
}

#[async_trait]
impl TokenVerifier for GoogleTokenInfoVerifier {
    async fn verify(&self, token: &str, audience: Option<&str>) -> Result<Claims, VerifyError> {
        let url = reqwest::Url::parse_with_params(&self.tokeninfo_url, &[("id_token", token)])
            .map_err(|e| VerifyError::Malformed(e.to_string()))?;

        let res = self.client.get(url).send().await?;
        if !res.status().is_success() {
            return Err(VerifyError::Rejected(res.status().as_u16()));
        }

        let claims = res.json::<Claims>().await?;
        check_claims(&claims, audience, chrono::Utc::now().timestamp())?;
        Ok(claims)
    }
}

// tokeninfo returns numeric claims as strings
fn numeric_claim(claims: &Claims, name: &str) -> Option<i64> {
    match claims.get(name)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

pub(crate) fn check_claims(
    claims: &Claims,
    audience: Option<&str>,
    now: i64,
) -> Result<(), VerifyError> {
    if let Some(expected) = audience {
        let aud = claims.get("aud").and_then(Value::as_str);
        if aud != Some(expected) {
            return Err(VerifyError::Audience(aud.map(str::to_string)));
        }
    }

    let exp = numeric_claim(claims, "exp")
        .ok_or_else(|| VerifyError::Malformed("missing exp".to_string()))?;
    if exp <= now {
        return Err(VerifyError::Expired);
    }
    Ok(())
}

/// Extract the credential from `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

pub struct AuthGate {
    audience: Option<String>,
    require_auth: bool,
    verifier: Option<Arc<dyn TokenVerifier>>,
}

impl AuthGate {
    pub fn new(
        audience: Option<String>,
        require_auth: bool,
        verifier: Option<Arc<dyn TokenVerifier>>,
    ) -> Self {
        Self {
            audience: audience.filter(|a| !a.is_empty()),
            require_auth,
            verifier,
        }
    }

    pub fn disabled() -> Self {
        Self::new(None, false, None)
    }

    pub fn from_config(args: &Args) -> Self {
        let verifier: Option<Arc<dyn TokenVerifier>> = if args.auth_tokeninfo_url.is_empty() {
            None
        } else {
            match GoogleTokenInfoVerifier::new(&args.auth_tokeninfo_url) {
                Ok(v) => Some(Arc::new(v)),
                Err(e) => {
                    tracing::warn!(error = %e, "token verifier unavailable");
                    None
                }
            }
        };

        if args.require_auth && verifier.is_none() {
            tracing::warn!("auth is required but no verifier is available; /chat will return 503");
        }

        Self::new(args.auth_audience.clone(), args.require_auth, verifier)
    }

    pub fn required(&self) -> bool {
        self.require_auth
    }

    /// Check the caller's credential. `Ok(None)` when auth is not required.
    pub async fn authenticate(&self, token: Option<&str>) -> Result<Option<Claims>, AuthError> {
        if !self.require_auth {
            return Ok(None);
        }

        let token = match token {
            Some(t) if !t.is_empty() => t,
            _ => return Err(AuthError::MissingCredential),
        };

        let verifier = self.verifier.as_ref().ok_or(AuthError::VerifierUnavailable)?;

        match verifier.verify(token, self.audience.as_deref()).await {
            Ok(claims) => Ok(Some(claims)),
            Err(e) => {
                tracing::debug!(error = %e, "token verification failed");
                Err(AuthError::InvalidToken)
            }
        }
    }
}
