use anyhow::{Context, Result, anyhow};
use base64ct::{Base64UrlUnpadded, Encoding};
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::models::{CurrentUser, SessionSnapshot, TokenClaims};

/// Process-wide authentication state. Screens read it through [`SessionStore::snapshot`].
#[derive(Debug, Default)]
pub struct SessionStore {
    api_base_url: String,
    is_authenticated: bool,
    token: String,
    current_user: CurrentUser,
    expires_at: Option<DateTime<Utc>>,
}

impl SessionStore {
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            ..Default::default()
        }
    }

    pub fn set_api_base_url(&mut self, api_base_url: &str) {
        self.api_base_url = api_base_url.trim().trim_end_matches('/').to_string();
    }

    /// Claims carried by a JWT win over `fallback_role`/`fallback_expiry`;
    /// opaque tokens use the fallbacks as-is.
    pub fn sign_in(
        &mut self,
        token: &str,
        fallback_role: &str,
        fallback_expiry: Option<DateTime<Utc>>,
    ) {
        let token = token.trim();
        let claims = match decode_token_claims(token) {
            Ok(claims) => claims,
            Err(err) => {
                debug!("Treating access token as opaque: {err:#}");
                TokenClaims::default()
            }
        };

        self.current_user = CurrentUser {
            name: claims.name.or(claims.sub).unwrap_or_default(),
            role: claims.role.unwrap_or_else(|| fallback_role.to_string()),
        };
        self.expires_at = claims.exp.or(fallback_expiry);
        self.token = token.to_string();
        self.is_authenticated = !self.token.is_empty();
        info!(
            "Signed in: user={:?}, role={:?}, expires_at={:?}",
            self.current_user.name, self.current_user.role, self.expires_at
        );
    }

    pub fn sign_out(&mut self) {
        if self.is_authenticated {
            info!("Signing out {:?}", self.current_user.name);
        }
        self.is_authenticated = false;
        self.token.clear();
        self.current_user = CurrentUser::default();
        self.expires_at = None;
    }

    /// Returns true when the token has expired. An expired session is signed out.
    pub fn check_token_expiry(&mut self) -> bool {
        self.check_token_expiry_at(Utc::now())
    }

    pub fn check_token_expiry_at(&mut self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) if expires_at <= now => {
                warn!("Access token expired at {}", expires_at);
                self.sign_out();
                true
            }
            _ => false,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.is_authenticated
    }

    pub fn current_user(&self) -> &CurrentUser {
        &self.current_user
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            is_authenticated: self.is_authenticated,
            api_base_url: self.api_base_url.clone(),
            token: self.token.clone(),
            current_user: self.current_user.clone(),
        }
    }
}

/// Decodes the payload segment of a JWT without verifying its signature.
/// The backend verifies tokens; the viewer only needs the claims for display and expiry.
pub fn decode_token_claims(token: &str) -> Result<TokenClaims> {
    let mut segments = token.split('.');
    let (Some(_header), Some(payload), Some(_signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(anyhow!("token is not a JWT"));
    };

    let bytes = Base64UrlUnpadded::decode_vec(payload.trim_end_matches('='))
        .map_err(|err| anyhow!("invalid base64url payload: {err}"))?;
    serde_json::from_slice::<TokenClaims>(&bytes).context("invalid JWT claims")
}
