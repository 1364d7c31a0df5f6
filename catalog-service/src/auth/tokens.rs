//! Opaque access tokens
//!
//! Tokens follow the format `{prefix}_{random_base32}` and are shown to the
//! client once, at login. Stores only keep a blake3 digest of each token
//! together with its owner and expiry.
//!
//! # Example
//!
//! ```rust,ignore
//! use catalog_service::auth::{MemoryTokenStore, TokenGenerator, TokenStore};
//!
//! let store = MemoryTokenStore::new(TokenGenerator::new("cat", None));
//! let issued = store.issue(user.id).await?;
//! assert_eq!(store.resolve(&issued.token).await?, Some(user.id));
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::config::AuthConfig;
use crate::error::Error;
use crate::models::Id;

/// A freshly issued token; `token` is the only copy of the plaintext value
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub user_id: Id,
    pub expires_at: Option<DateTime<Utc>>,
}

/// What a store keeps for each token
#[derive(Debug, Clone)]
struct TokenRecord {
    user_id: Id,
    expires_at: Option<DateTime<Utc>>,
}

impl TokenRecord {
    fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(true, |expires_at| expires_at > now)
    }
}

/// Token generator
///
/// 24 random bytes (192 bits of entropy) per token.
#[derive(Debug, Clone)]
pub struct TokenGenerator {
    prefix: String,
    lifetime: Option<Duration>,
}

impl TokenGenerator {
    pub fn new(prefix: impl Into<String>, lifetime: Option<Duration>) -> Self {
        Self {
            prefix: prefix.into(),
            lifetime,
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(config.token_prefix.clone(), config.token_ttl())
    }

    /// Generate a new plaintext token
    pub fn generate(&self) -> String {
        let random_bytes: [u8; 24] = rand::random();
        format!("{}_{}", self.prefix, base32_encode(&random_bytes))
    }

    /// Expiry for a token issued at `now`, or `None` when tokens never expire
    pub fn expires_at(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.lifetime
            .and_then(|lifetime| chrono::Duration::from_std(lifetime).ok())
            .and_then(|lifetime| now.checked_add_signed(lifetime))
    }

    /// Storage key for a token
    pub fn digest(token: &str) -> String {
        blake3::hash(token.as_bytes()).to_hex().to_string()
    }
}

/// Encode bytes as lowercase base32 without padding
fn base32_encode(bytes: &[u8]) -> String {
    const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz234567";

    let mut result = String::with_capacity((bytes.len() * 8).div_ceil(5));
    let mut buffer = 0u64;
    let mut bits = 0;

    for &byte in bytes {
        buffer = (buffer << 8) | byte as u64;
        bits += 8;

        while bits >= 5 {
            bits -= 5;
            let index = ((buffer >> bits) & 0x1f) as usize;
            result.push(ALPHABET[index] as char);
        }
    }

    if bits > 0 {
        let index = ((buffer << (5 - bits)) & 0x1f) as usize;
        result.push(ALPHABET[index] as char);
    }

    result
}

/// Token storage trait
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Issue a new token for a user. Existing tokens stay valid.
    async fn issue(&self, user_id: Id) -> Result<IssuedToken, Error>;

    /// Owner of a token, or `None` when it is unknown or expired
    async fn resolve(&self, token: &str) -> Result<Option<Id>, Error>;

    /// Invalidate every token of a user
    async fn revoke_all_for_user(&self, user_id: Id) -> Result<u64, Error>;

    /// Drop expired tokens
    async fn cleanup_expired(&self) -> Result<u64, Error>;
}

/// In-process token store keyed by token digest
#[derive(Debug)]
pub struct MemoryTokenStore {
    generator: TokenGenerator,
    tokens: RwLock<HashMap<String, TokenRecord>>,
}

impl MemoryTokenStore {
    pub fn new(generator: TokenGenerator) -> Self {
        Self {
            generator,
            tokens: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn issue(&self, user_id: Id) -> Result<IssuedToken, Error> {
        let token = self.generator.generate();
        let expires_at = self.generator.expires_at(Utc::now());

        self.tokens.write().await.insert(
            TokenGenerator::digest(&token),
            TokenRecord {
                user_id,
                expires_at,
            },
        );
        tracing::debug!(user_id, "token issued");

        Ok(IssuedToken {
            token,
            user_id,
            expires_at,
        })
    }

    async fn resolve(&self, token: &str) -> Result<Option<Id>, Error> {
        let tokens = self.tokens.read().await;
        let owner = tokens
            .get(&TokenGenerator::digest(token))
            .filter(|record| record.is_valid(Utc::now()))
            .map(|record| record.user_id);
        Ok(owner)
    }

    async fn revoke_all_for_user(&self, user_id: Id) -> Result<u64, Error> {
        let mut tokens = self.tokens.write().await;
        let before = tokens.len();
        tokens.retain(|_, record| record.user_id != user_id);
        Ok((before - tokens.len()) as u64)
    }

    async fn cleanup_expired(&self) -> Result<u64, Error> {
        let now = Utc::now();
        let mut tokens = self.tokens.write().await;
        let before = tokens.len();
        tokens.retain(|_, record| record.is_valid(now));
        let removed = (before - tokens.len()) as u64;
        if removed > 0 {
            tracing::debug!(removed, "expired tokens removed");
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base32_encode() {
        let bytes = [0x48, 0x65, 0x6c, 0x6c, 0x6f]; // "Hello"
        assert_eq!(base32_encode(&bytes), "jbswy3dp");
    }

    #[test]
    fn test_generated_token_format() {
        let generator = TokenGenerator::new("cat", None);
        let token = generator.generate();
        let (prefix, random) = token.split_once('_').unwrap();
        assert_eq!(prefix, "cat");
        assert_eq!(random.len(), 39);
        assert_ne!(token, generator.generate());
    }

    #[test]
    fn test_expiry_follows_lifetime() {
        let now = Utc::now();
        let generator = TokenGenerator::new("cat", Some(Duration::from_secs(60)));
        assert_eq!(generator.expires_at(now), Some(now + chrono::Duration::seconds(60)));
        assert_eq!(TokenGenerator::new("cat", None).expires_at(now), None);
    }

    #[tokio::test]
    async fn test_issue_and_resolve() {
        let store = MemoryTokenStore::new(TokenGenerator::new("cat", None));
        let first = store.issue(7).await.unwrap();
        let second = store.issue(7).await.unwrap();

        assert_eq!(store.resolve(&first.token).await.unwrap(), Some(7));
        assert_eq!(store.resolve(&second.token).await.unwrap(), Some(7));
        assert_eq!(store.resolve("cat_unknown").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_plaintext_is_not_stored() {
        let store = MemoryTokenStore::new(TokenGenerator::new("cat", None));
        let issued = store.issue(1).await.unwrap();
        let tokens = store.tokens.read().await;
        assert!(!tokens.contains_key(&issued.token));
        assert!(tokens.contains_key(&TokenGenerator::digest(&issued.token)));
    }

    #[tokio::test]
    async fn test_expired_tokens_do_not_resolve() {
        let store = MemoryTokenStore::new(TokenGenerator::new("cat", Some(Duration::ZERO)));
        let issued = store.issue(3).await.unwrap();
        assert_eq!(store.resolve(&issued.token).await.unwrap(), None);
        assert_eq!(store.cleanup_expired().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_revoke_all_for_user() {
        let store = MemoryTokenStore::new(TokenGenerator::new("cat", None));
        let a = store.issue(1).await.unwrap();
        store.issue(1).await.unwrap();
        let b = store.issue(2).await.unwrap();

        assert_eq!(store.revoke_all_for_user(1).await.unwrap(), 2);
        assert_eq!(store.resolve(&a.token).await.unwrap(), None);
        assert_eq!(store.resolve(&b.token).await.unwrap(), Some(2));
    }
}
