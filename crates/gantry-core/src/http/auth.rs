//! Bearer-token routing for the pipeline
//!
//! A call either carries its own token or falls back to an ambient provider
//! passed in explicitly; tokens are never discovered from the call chain.
//! When a cache store is configured the resolver returns a synthetic pass,
//! since cached calls perform no network I/O.

use crate::error::{Error, Result};
use chrono::{DateTime, Duration, Utc};

/// A bearer credential with optional expiry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BearerToken {
    pub access_token: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl BearerToken {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            expires_at: None,
        }
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Expired or about to expire (30 second buffer)
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => Utc::now() >= expires_at - Duration::seconds(30),
            None => false,
        }
    }

    /// Non-empty and free of whitespace or control characters
    pub fn is_well_formed(&self) -> bool {
        !self.access_token.is_empty()
            && !self
                .access_token
                .chars()
                .any(|c| c.is_whitespace() || c.is_control())
    }

    fn validate(&self) -> Result<()> {
        if !self.is_well_formed() {
            return Err(Error::InvalidToken {
                message: "token is empty or malformed".to_string(),
            });
        }
        if self.is_expired() {
            return Err(Error::InvalidToken {
                message: "token is expired".to_string(),
            });
        }
        Ok(())
    }
}

/// The credential selected for one call
#[derive(Debug, Clone)]
pub enum TokenHandle {
    /// Resolved from the ambient provider
    Ambient(BearerToken),
    /// Passed by the caller for this call
    Supplied(BearerToken),
    /// Synthetic pass used in cache mode; carries no credential
    CacheOnly,
}

impl TokenHandle {
    /// The underlying bearer token, if this handle carries one
    pub fn bearer(&self) -> Option<&BearerToken> {
        match self {
            TokenHandle::Ambient(token) | TokenHandle::Supplied(token) => Some(token),
            TokenHandle::CacheOnly => None,
        }
    }
}

/// Source of ambient (process-local) tokens
pub trait TokenProvider: Send + Sync {
    /// Current ambient token, if any
    fn ambient_token(&self) -> Option<BearerToken>;
}

/// Reads the ambient token from the `GANTRY_ACCESS_TOKEN` environment variable
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvTokenProvider;

impl TokenProvider for EnvTokenProvider {
    fn ambient_token(&self) -> Option<BearerToken> {
        std::env::var("GANTRY_ACCESS_TOKEN")
            .ok()
            .map(BearerToken::new)
    }
}

/// Select and validate the credential for a call
///
/// A supplied token wins over the ambient provider. Invalid or missing
/// credentials fail before any network I/O. In cache mode validation is
/// skipped entirely.
pub fn resolve_token(
    provider: &dyn TokenProvider,
    supplied: Option<&BearerToken>,
    cache_mode: bool,
) -> Result<TokenHandle> {
    if cache_mode {
        return Ok(TokenHandle::CacheOnly);
    }
    if let Some(token) = supplied {
        token.validate()?;
        return Ok(TokenHandle::Supplied(token.clone()));
    }
    match provider.ambient_token() {
        Some(token) => {
            token.validate()?;
            Ok(TokenHandle::Ambient(token))
        }
        None => Err(Error::InvalidToken {
            message: "no ambient token available".to_string(),
        }),
    }
}
