//! One-time API key secrets and their stored hashes.
//!
//! A raw key looks like `tgb_<64 hex chars>`. Only its hash is ever stored; the
//! plaintext leaves the process exactly once, in the creation response.

use std::{fmt, sync::Arc};

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

/// Prefix that makes our keys recognisable in configs and logs.
pub const API_KEY_PREFIX: &str = "tgb";

/// Hex-encoded hash of a raw API key, as stored in `api_keys.key_hash`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyHash(String);

impl KeyHash {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for KeyHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hashes raw API keys.
///
/// Without a pepper this is plain SHA-256. With a pepper it is HMAC-SHA256
/// keyed by the pepper, so a leaked table cannot be checked offline without
/// the server configuration as well.
#[derive(Clone)]
pub struct KeyHasher {
    pepper: Option<Arc<SecretString>>,
}

impl KeyHasher {
    pub fn new(pepper: Option<String>) -> Self {
        Self {
            pepper: pepper
                .filter(|p| !p.is_empty())
                .map(|p| Arc::new(SecretString::from(p))),
        }
    }

    /// Plain SHA-256 hasher.
    pub fn unpeppered() -> Self {
        Self { pepper: None }
    }

    pub fn hash(&self, raw_key: &str) -> KeyHash {
        let digest = match &self.pepper {
            Some(pepper) => {
                // HMAC accepts keys of any length
                let mut mac = HmacSha256::new_from_slice(pepper.expose_secret().as_bytes())
                    .expect("HMAC key length is valid");
                mac.update(raw_key.as_bytes());
                hex::encode(mac.finalize().into_bytes())
            }
            None => {
                let mut hasher = Sha256::new();
                hasher.update(raw_key.as_bytes());
                hex::encode(hasher.finalize())
            }
        };

        KeyHash(digest)
    }
}

impl Default for KeyHasher {
    fn default() -> Self {
        Self::unpeppered()
    }
}

impl fmt::Debug for KeyHasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyHasher")
            .field("peppered", &self.pepper.is_some())
            .finish()
    }
}

/// A freshly generated API key.
///
/// The plaintext can be read exactly once, by consuming the value with
/// [`ApiKeySecret::into_plaintext`]. There is no `Clone`, no `Serialize`, and
/// `Debug` is redacted; the buffer is zeroized when dropped.
pub struct ApiKeySecret {
    plaintext: SecretString,
    hash: KeyHash,
}

impl ApiKeySecret {
    /// Generate a new random key and compute its hash.
    ///
    /// 32 bytes from the thread-local CSPRNG, hex encoded, behind the prefix.
    pub fn generate(hasher: &KeyHasher) -> Self {
        let bytes: [u8; 32] = rand::random();
        let raw = format!("{}_{}", API_KEY_PREFIX, hex::encode(bytes));
        let hash = hasher.hash(&raw);

        Self {
            plaintext: SecretString::from(raw),
            hash,
        }
    }

    pub fn hash(&self) -> &KeyHash {
        &self.hash
    }

    /// Hand out the plaintext. The secret is gone afterwards.
    pub fn into_plaintext(self) -> String {
        self.plaintext.expose_secret().to_owned()
    }
}

impl fmt::Debug for ApiKeySecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKeySecret")
            .field("plaintext", &"[REDACTED]")
            .field("hash", &self.hash)
            .finish()
    }
}
