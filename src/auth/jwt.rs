use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Access tokens stay valid for this long.
pub const ACCESS_TOKEN_MINUTES: i64 = 60;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub adm: bool,
    pub exp: i64,
}

impl Claims {
    pub fn new(user_id: Uuid, email: String, is_admin: bool) -> Self {
        Self {
            sub: user_id,
            email,
            adm: is_admin,
            exp: (Utc::now() + Duration::minutes(ACCESS_TOKEN_MINUTES)).timestamp(),
        }
    }
}

pub fn encode_token(claims: &Claims, secret: &str) -> Result<String, String> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| format!("JWT encode failed: {e}"))
}

pub fn decode_token(token: &str, secret: &str) -> Result<Claims, String> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| format!("JWT decode failed: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trips_and_rejects_other_secret() {
        let id = Uuid::now_v7();
        let token = encode_token(&Claims::new(id, "a@example.com".into(), true), "s1").unwrap();
        let claims = decode_token(&token, "s1").unwrap();
        assert_eq!(claims.sub, id);
        assert!(claims.adm);
        assert!(decode_token(&token, "s2").is_err());
    }
}
