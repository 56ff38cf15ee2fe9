//! Authentication configuration.
//!
//! Configuration values are provided by the application at startup and
//! injected into the components that need them; no component reads the
//! environment on its own.

use chrono::Duration;

/// Token signing and lifetime configuration.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// HMAC secret for access tokens.
    pub access_secret: String,

    /// HMAC secret for refresh tokens.
    ///
    /// Must differ from `access_secret`: disjoint secrets ensure a
    /// leaked access token cannot be replayed as a refresh token.
    pub refresh_secret: String,

    /// Issuer claim embedded in and required of every token.
    pub issuer: String,

    /// Access token lifetime.
    ///
    /// Default: 15 minutes
    pub access_ttl: Duration,

    /// Refresh token lifetime; also the session lifetime, advanced on
    /// each rotation.
    ///
    /// Default: 14 days
    pub refresh_ttl: Duration,
}

impl TokenConfig {
    /// Create new token configuration with the two signing secrets.
    #[must_use]
    pub const fn new(access_secret: String, refresh_secret: String) -> Self {
        Self {
            access_secret,
            refresh_secret,
            issuer: String::new(),
            access_ttl: Duration::minutes(15),
            refresh_ttl: Duration::days(14),
        }
    }

    /// Set the issuer claim.
    #[must_use]
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }

    /// Set the access token lifetime.
    #[must_use]
    pub const fn with_access_ttl(mut self, ttl: Duration) -> Self {
        self.access_ttl = ttl;
        self
    }

    /// Set the refresh token lifetime.
    #[must_use]
    pub const fn with_refresh_ttl(mut self, ttl: Duration) -> Self {
        self.refresh_ttl = ttl;
        self
    }
}

/// Session lifecycle configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Maximum concurrent sessions per account. Creating a session
    /// beyond the cap evicts the oldest sessions by creation time.
    ///
    /// Default: 5
    pub max_sessions_per_account: usize,
}

impl SessionConfig {
    /// Create new session configuration with defaults.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_sessions_per_account: 5,
        }
    }

    /// Set the per-account session cap.
    #[must_use]
    pub const fn with_max_sessions(mut self, max: usize) -> Self {
        self.max_sessions_per_account = max;
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Phone verification configuration.
#[derive(Debug, Clone)]
pub struct PhoneConfig {
    /// Verification code time-to-live.
    ///
    /// Default: 5 minutes
    pub code_ttl: Duration,

    /// Maximum code sends per phone number per window.
    ///
    /// Default: 5
    pub send_limit: u32,

    /// Fixed window for the send counter.
    ///
    /// Default: 1 hour
    pub send_window: std::time::Duration,

    /// Maximum verification attempts per phone number per window.
    ///
    /// Default: 10
    pub verify_limit: u32,

    /// Fixed window for the verification-attempt counter.
    ///
    /// Default: 15 minutes
    pub verify_window: std::time::Duration,
}

impl PhoneConfig {
    /// Create new phone verification configuration with defaults.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            code_ttl: Duration::minutes(5),
            send_limit: 5,
            send_window: std::time::Duration::from_secs(3600),
            verify_limit: 10,
            verify_window: std::time::Duration::from_secs(900),
        }
    }

    /// Set the code time-to-live.
    #[must_use]
    pub const fn with_code_ttl(mut self, ttl: Duration) -> Self {
        self.code_ttl = ttl;
        self
    }

    /// Set the send limit and window.
    #[must_use]
    pub const fn with_send_limit(mut self, limit: u32, window: std::time::Duration) -> Self {
        self.send_limit = limit;
        self.send_window = window;
        self
    }

    /// Set the verification-attempt limit and window.
    #[must_use]
    pub const fn with_verify_limit(mut self, limit: u32, window: std::time::Duration) -> Self {
        self.verify_limit = limit;
        self.verify_window = window;
        self
    }
}

impl Default for PhoneConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_config_defaults() {
        let config = TokenConfig::new("a".to_string(), "r".to_string());
        assert_eq!(config.access_ttl, Duration::minutes(15));
        assert_eq!(config.refresh_ttl, Duration::days(14));
    }

    #[test]
    fn test_builders_chain() {
        let config = TokenConfig::new("a".to_string(), "r".to_string())
            .with_issuer("tradepost")
            .with_access_ttl(Duration::minutes(5));
        assert_eq!(config.issuer, "tradepost");
        assert_eq!(config.access_ttl, Duration::minutes(5));

        let phone = PhoneConfig::new().with_send_limit(3, std::time::Duration::from_secs(60));
        assert_eq!(phone.send_limit, 3);
    }
}
