//! Shared-password session gate.
//!
//! A successful login yields a sealed token carrying its own expiry. Tokens
//! are opaque to clients and cannot be forged without the session key.

use std::time::Duration;

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};

use crate::config::AuthConfig;
use crate::error::ConfigError;
use crate::secrets::{random_hex, SecretError, TokenCipher};

const TOKEN_PREFIX: &str = "ordarchive-session";

/// Attributes of the session cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCookie {
    pub name: String,
    pub max_age: Duration,
    pub secure: bool,
}

impl SessionCookie {
    /// `Set-Cookie` value carrying `token`.
    pub fn header_value(&self, token: &str) -> String {
        let mut value = format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            self.name,
            token,
            self.max_age.as_secs()
        );
        if self.secure {
            value.push_str("; Secure");
        }
        value
    }

    /// `Set-Cookie` value that removes the cookie.
    pub fn clearing_value(&self) -> String {
        let mut value = format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", self.name);
        if self.secure {
            value.push_str("; Secure");
        }
        value
    }
}

pub struct SessionGate {
    password: SecretString,
    cipher: TokenCipher,
    ttl: Duration,
    cookie: SessionCookie,
}

impl SessionGate {
    pub fn new(password: SecretString, cipher: TokenCipher, ttl: Duration) -> Self {
        Self {
            password,
            cipher,
            ttl,
            cookie: SessionCookie {
                name: "hr-auth-token".to_string(),
                max_age: ttl,
                secure: false,
            },
        }
    }

    pub fn with_cookie(mut self, name: &str, secure: bool) -> Self {
        self.cookie.name = name.to_string();
        self.cookie.secure = secure;
        self
    }

    /// Resolves the password and session key. Without a configured key a
    /// random one is generated and sessions end with the process.
    pub fn from_config(config: &AuthConfig) -> Result<Self, ConfigError> {
        let password = config.password.resolve().map_err(|e| ConfigError::Secret {
            name: "auth.password".to_string(),
            source: e,
        })?;
        if password.expose_secret().is_empty() {
            return Err(ConfigError::Validation {
                message: "auth.password resolved to an empty string".to_string(),
            });
        }

        let key = config
            .session_key
            .resolve_optional()
            .map_err(|e| ConfigError::Secret {
                name: "auth.session_key".to_string(),
                source: e,
            })?;
        let cipher = match key {
            Some(key) => TokenCipher::from_hex_key(key.expose_secret()),
            None => {
                log::warn!("No auth.session_key configured; sessions will not survive a restart");
                TokenCipher::generate()
            }
        }
        .map_err(|e| ConfigError::Secret {
            name: "auth.session_key".to_string(),
            source: e,
        })?;

        let ttl = Duration::from_secs(u64::from(config.session_ttl_days) * 24 * 60 * 60);
        Ok(Self::new(password, cipher, ttl).with_cookie(&config.cookie_name, config.secure_cookie))
    }

    pub fn cookie(&self) -> &SessionCookie {
        &self.cookie
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn check_password(&self, candidate: &str) -> bool {
        constant_time_eq(
            candidate.as_bytes(),
            self.password.expose_secret().as_bytes(),
        )
    }

    /// Checks `candidate` and issues a token valid from `now`.
    pub fn login(&self, candidate: &str, now: DateTime<Utc>) -> Option<Result<String, SecretError>> {
        if !self.check_password(candidate) {
            log::warn!("Rejected login attempt");
            return None;
        }
        Some(self.issue(now))
    }

    pub fn issue(&self, now: DateTime<Utc>) -> Result<String, SecretError> {
        let expires = now.timestamp() + self.ttl.as_secs() as i64;
        let nonce = random_hex::<8>()?;
        self.cipher
            .seal(&format!("{}:{}:{}", TOKEN_PREFIX, expires, nonce))
    }

    /// Whether `token` was issued by this gate and has not expired at `now`.
    pub fn validate(&self, token: &str, now: DateTime<Utc>) -> bool {
        let Ok(payload) = self.cipher.open(token.trim()) else {
            return false;
        };
        let mut parts = payload.splitn(3, ':');
        match (parts.next(), parts.next().and_then(|e| e.parse::<i64>().ok())) {
            (Some(TOKEN_PREFIX), Some(expires)) => now.timestamp() < expires,
            _ => false,
        }
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
