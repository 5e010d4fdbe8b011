//! Request-forgery tokens for the admin status endpoint.
//!
//! A token is `{expires}.{hex(hmac_sha256(secret, action|expires))}`. It is
//! bound to one action and valid until `expires` (unix seconds).

use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

pub const ADMIN_NONCE_ACTION: &str = "mypay-admin-nonce";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NonceError {
    #[error("Malformed nonce")]
    Malformed,
    #[error("Nonce expired")]
    Expired,
    #[error("Nonce does not match")]
    Mismatch,
    #[error("Invalid nonce secret")]
    InvalidSecret,
}

#[derive(Clone)]
pub struct NonceService {
    secret: Vec<u8>,
    ttl: Duration,
}

impl NonceService {
    pub fn new(secret: impl AsRef<[u8]>, ttl: Duration) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
            ttl,
        }
    }

    pub fn issue(&self, action: &str) -> Result<String, NonceError> {
        let expires = (Utc::now() + self.ttl).timestamp();
        let signature = self.mac(action, expires)?.finalize().into_bytes();
        Ok(format!("{}.{}", expires, hex::encode(signature)))
    }

    pub fn verify(&self, action: &str, token: &str) -> Result<(), NonceError> {
        let (expires, signature) = token.split_once('.').ok_or(NonceError::Malformed)?;
        let expires: i64 = expires.parse().map_err(|_| NonceError::Malformed)?;
        let signature = hex::decode(signature).map_err(|_| NonceError::Malformed)?;

        self.mac(action, expires)?
            .verify_slice(&signature)
            .map_err(|_| NonceError::Mismatch)?;

        if Utc::now().timestamp() > expires {
            return Err(NonceError::Expired);
        }

        Ok(())
    }

    fn mac(&self, action: &str, expires: i64) -> Result<HmacSha256, NonceError> {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).map_err(|_| NonceError::InvalidSecret)?;
        mac.update(action.as_bytes());
        mac.update(b"|");
        mac.update(expires.to_string().as_bytes());
        Ok(mac)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> NonceService {
        NonceService::new("test-secret", Duration::hours(12))
    }

    #[test]
    fn issued_nonce_verifies() {
        let nonces = service();
        let token = nonces.issue(ADMIN_NONCE_ACTION).unwrap();
        assert_eq!(nonces.verify(ADMIN_NONCE_ACTION, &token), Ok(()));
    }

    #[test]
    fn nonce_is_bound_to_action_and_secret() {
        let token = service().issue(ADMIN_NONCE_ACTION).unwrap();
        assert_eq!(
            service().verify("other-action", &token),
            Err(NonceError::Mismatch)
        );
        let other = NonceService::new("another-secret", Duration::hours(12));
        assert_eq!(
            other.verify(ADMIN_NONCE_ACTION, &token),
            Err(NonceError::Mismatch)
        );
    }

    #[test]
    fn expired_nonce_is_rejected() {
        let nonces = NonceService::new("test-secret", Duration::seconds(-5));
        let token = nonces.issue(ADMIN_NONCE_ACTION).unwrap();
        assert_eq!(
            nonces.verify(ADMIN_NONCE_ACTION, &token),
            Err(NonceError::Expired)
        );
    }

    #[test]
    fn garbage_is_malformed() {
        let nonces = service();
        assert_eq!(nonces.verify(ADMIN_NONCE_ACTION, ""), Err(NonceError::Malformed));
        assert_eq!(
            nonces.verify(ADMIN_NONCE_ACTION, "123.zz"),
            Err(NonceError::Malformed)
        );
        assert_eq!(
            nonces.verify(ADMIN_NONCE_ACTION, "abc.00"),
            Err(NonceError::Malformed)
        );
    }
}
