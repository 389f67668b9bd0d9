//! Session revocation: Redis-backed deny list of logged-out token ids.
//!
//! A revoked `jti` is stored with `SET key 1 EX ttl` where the TTL is the
//! token's remaining lifetime, so entries disappear once the token would
//! have expired anyway.

use redis::AsyncCommands;
use redis::aio::ConnectionManager;

use curbside_common::error::AppError;

pub struct SessionStore {
    redis: ConnectionManager,
}

impl SessionStore {
    pub fn new(redis: ConnectionManager) -> Self {
        Self { redis }
    }

    fn key(jti: &str) -> String {
        format!("session:revoked:{}", jti)
    }

    /// Deny the token id for `ttl_secs` seconds. A non-positive TTL means
    /// the token has already expired and nothing is stored.
    pub async fn revoke(&mut self, jti: &str, ttl_secs: i64) -> Result<(), AppError> {
        if ttl_secs <= 0 {
            return Ok(());
        }

        let _: () = redis::cmd("SET")
            .arg(Self::key(jti))
            .arg("1")
            .arg("EX")
            .arg(ttl_secs)
            .query_async(&mut self.redis)
            .await?;

        tracing::debug!(jti, ttl_secs, "Session revoked");
        Ok(())
    }

    pub async fn is_revoked(&mut self, jti: &str) -> Result<bool, AppError> {
        let revoked: bool = self.redis.exists(Self::key(jti)).await?;
        Ok(revoked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_is_namespaced() {
        assert_eq!(SessionStore::key("abc"), "session:revoked:abc");
    }
}
