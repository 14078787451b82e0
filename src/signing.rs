//! Time-limited download tokens.
//!
//! Token = `<record id>.<issued unix seconds>.<hex HMAC-SHA256(secret, salt || id.issued)>`.
//! Changing either the id or the timestamp invalidates the signature.

use std::time::Duration;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const SALT: &[u8] = b"biodata.download-link:";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LinkError {
    #[error("token is not well formed")]
    Malformed,
    #[error("token signature does not match")]
    BadSignature,
    #[error("token expired")]
    Expired,
    #[error("token was issued for a different record")]
    IdMismatch,
}

#[derive(Clone)]
pub struct LinkSigner {
    key: Vec<u8>,
    max_age: Duration,
}

impl LinkSigner {
    pub fn new(secret: &str, max_age: Duration) -> Self {
        Self {
            key: secret.as_bytes().to_vec(),
            max_age,
        }
    }

    pub fn issue(&self, record_id: i64) -> String {
        self.issue_at(record_id, Utc::now())
    }

    pub fn issue_at(&self, record_id: i64, issued_at: DateTime<Utc>) -> String {
        let body = format!("{record_id}.{}", issued_at.timestamp());
        let tag = self.mac(&body).finalize().into_bytes();
        format!("{body}.{}", hex::encode(tag))
    }

    /// Verify a token presented alongside `expected_id` and return the id.
    pub fn verify(&self, token: &str, expected_id: i64) -> Result<i64, LinkError> {
        self.verify_at(token, expected_id, Utc::now())
    }

    pub fn verify_at(
        &self,
        token: &str,
        expected_id: i64,
        now: DateTime<Utc>,
    ) -> Result<i64, LinkError> {
        let record_id = self.unsign_at(token, now)?;
        if record_id != expected_id {
            return Err(LinkError::IdMismatch);
        }
        Ok(record_id)
    }

    /// Signature and age checks only.
    pub fn unsign_at(&self, token: &str, now: DateTime<Utc>) -> Result<i64, LinkError> {
        let (body, signature) = token.rsplit_once('.').ok_or(LinkError::Malformed)?;
        let (id_part, ts_part) = body.split_once('.').ok_or(LinkError::Malformed)?;

        let tag = hex::decode(signature).map_err(|_| LinkError::Malformed)?;
        self.mac(body)
            .verify_slice(&tag)
            .map_err(|_| LinkError::BadSignature)?;

        let record_id: i64 = id_part.parse().map_err(|_| LinkError::Malformed)?;
        let issued_at: i64 = ts_part.parse().map_err(|_| LinkError::Malformed)?;

        let elapsed = now.timestamp().saturating_sub(issued_at).max(0) as u64;
        if elapsed > self.max_age.as_secs() {
            return Err(LinkError::Expired);
        }

        Ok(record_id)
    }

    fn mac(&self, body: &str) -> HmacSha256 {
        let mut mac =
            HmacSha256::new_from_slice(&self.key).expect("HMAC accepts any key size");
        mac.update(SALT);
        mac.update(body.as_bytes());
        mac
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const WEEK: Duration = Duration::from_secs(7 * 24 * 60 * 60);

    fn signer() -> LinkSigner {
        LinkSigner::new("test-signing-secret", WEEK)
    }

    fn issued() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn six_days_old_token_is_accepted() {
        let token = signer().issue_at(42, issued());
        let now = issued() + chrono::Duration::days(6);
        assert_eq!(signer().verify_at(&token, 42, now), Ok(42));
    }

    #[test]
    fn eight_days_old_token_is_expired() {
        let token = signer().issue_at(42, issued());
        let now = issued() + chrono::Duration::days(8);
        assert_eq!(signer().verify_at(&token, 42, now), Err(LinkError::Expired));
    }

    #[test]
    fn token_for_another_record_is_rejected() {
        let token = signer().issue_at(5, issued());
        let now = issued() + chrono::Duration::hours(1);
        assert_eq!(signer().unsign_at(&token, now), Ok(5));
        assert_eq!(signer().verify_at(&token, 6, now), Err(LinkError::IdMismatch));
    }

    #[test]
    fn tampering_breaks_the_signature() {
        let token = signer().issue_at(5, issued());
        let now = issued() + chrono::Duration::hours(1);

        let swapped_id = token.replacen("5.", "6.", 1);
        assert_eq!(signer().verify_at(&swapped_id, 6, now), Err(LinkError::BadSignature));

        let (body, sig) = token.rsplit_once('.').unwrap();
        let (id, ts) = body.split_once('.').unwrap();
        let later: i64 = ts.parse::<i64>().unwrap() + 86_400;
        let pushed = format!("{id}.{later}.{sig}");
        assert_eq!(signer().verify_at(&pushed, 5, now), Err(LinkError::BadSignature));
    }

    #[test]
    fn other_secret_is_rejected() {
        let token = LinkSigner::new("other", WEEK).issue_at(5, issued());
        assert_eq!(signer().verify_at(&token, 5, issued()), Err(LinkError::BadSignature));
    }

    #[test]
    fn garbage_is_malformed() {
        assert_eq!(signer().verify_at("abc", 1, issued()), Err(LinkError::Malformed));
        assert_eq!(signer().verify_at("1.2.zz", 1, issued()), Err(LinkError::Malformed));
    }
}
