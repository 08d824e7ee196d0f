//! JWT authentication for the Engine API.

use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::{
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError},
    time::{Duration, Instant, SystemTime, UNIX_EPOCH},
};
use thiserror::Error;

/// The client version sent in the `clv` claim.
pub const CLIENT_VERSION: &str = concat!("Regent/", env!("CARGO_PKG_VERSION"));

/// Length of the decoded secret in bytes.
const JWT_SECRET_LEN: usize = 32;

/// Tokens older than this are re-signed before use. Engine API servers reject an `iat` that is
/// more than 60 seconds off.
pub const TOKEN_REFRESH_AFTER: Duration = Duration::from_secs(55);

/// Errors raised while loading a secret or signing a token.
#[derive(Debug, Error)]
pub enum JwtError {
    /// The secret is not valid hex.
    #[error(transparent)]
    Hex(#[from] hex::FromHexError),
    /// The secret decoded to the wrong number of bytes.
    #[error("JWT secret is expected to be {0} bytes, {1} bytes provided")]
    InvalidLength(usize, usize),
    /// The secret file could not be read.
    #[error("failed to read JWT secret from {path}: {source}")]
    Io {
        /// Path of the secret file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
    /// Signing the token failed.
    #[error("failed to sign JWT: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
    /// The system clock reads earlier than the unix epoch.
    #[error("system clock is set before the unix epoch")]
    Clock,
}

/// A 256 bit secret shared with the execution client.
#[derive(Clone, PartialEq, Eq)]
pub struct JwtSecret([u8; JWT_SECRET_LEN]);

impl core::fmt::Debug for JwtSecret {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("JwtSecret(<redacted>)")
    }
}

impl JwtSecret {
    /// Creates a secret from raw bytes.
    pub const fn new(bytes: [u8; JWT_SECRET_LEN]) -> Self {
        Self(bytes)
    }

    /// Parses a hex encoded secret.
    ///
    /// Surrounding whitespace and an optional `0x` prefix are ignored. An odd number of digits is
    /// padded with a leading zero nibble.
    pub fn from_hex(hex: impl AsRef<str>) -> Result<Self, JwtError> {
        let hex = hex.as_ref().trim();
        let hex = hex.strip_prefix("0x").or_else(|| hex.strip_prefix("0X")).unwrap_or(hex);
        let bytes =
            if hex.len() % 2 == 1 { hex::decode(format!("0{hex}"))? } else { hex::decode(hex)? };
        let bytes: [u8; JWT_SECRET_LEN] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| JwtError::InvalidLength(JWT_SECRET_LEN, bytes.len()))?;
        Ok(Self(bytes))
    }

    /// Reads a hex encoded secret from `path`.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, JwtError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|source| JwtError::Io { path: path.to_path_buf(), source })?;
        Self::from_hex(raw)
    }

    /// The raw secret bytes.
    pub const fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Signs `claims` with HS256.
    pub fn sign(&self, claims: &Claims) -> Result<String, JwtError> {
        let key = EncodingKey::from_secret(&self.0);
        Ok(jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &key)?)
    }
}

/// The claims of an Engine API token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Client version.
    pub clv: String,
    /// Issued-at time in unix seconds.
    pub iat: u64,
}

impl Claims {
    /// Claims for the current time.
    pub fn now() -> Result<Self, JwtError> {
        let iat = SystemTime::now().duration_since(UNIX_EPOCH).map_err(|_| JwtError::Clock)?;
        Ok(Self { clv: CLIENT_VERSION.to_string(), iat: iat.as_secs() })
    }
}

/// A bearer token that re-signs itself once it is older than [`TOKEN_REFRESH_AFTER`].
#[derive(Debug)]
pub struct AuthToken {
    secret: JwtSecret,
    cached: Mutex<Option<(Instant, String)>>,
}

impl AuthToken {
    /// Creates a token provider for `secret`. The first token is signed lazily.
    pub const fn new(secret: JwtSecret) -> Self {
        Self { secret, cached: Mutex::new(None) }
    }

    /// Returns a signed token, refreshing it if it is stale.
    pub fn token(&self) -> Result<String, JwtError> {
        let mut cached = self.cached.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((issued_at, token)) = cached.as_ref() {
            if issued_at.elapsed() <= TOKEN_REFRESH_AFTER {
                return Ok(token.clone());
            }
        }

        let token = self.secret.sign(&Claims::now()?)?;
        tracing::trace!(target: "engine_rpc", "Refreshed engine API token");
        *cached = Some((Instant::now(), token.clone()));
        Ok(token)
    }
}

impl From<JwtSecret> for AuthToken {
    fn from(secret: JwtSecret) -> Self {
        Self::new(secret)
    }
}
