//! Password hashing and access-token signing.
//!
//! Passwords are stored as hex PBKDF2-SHA256 digests next to a random salt.
//! Access tokens are compact HS256 JWTs carrying the user id as `sub`.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use hmac::{Hmac, Mac};
use pbkdf2::pbkdf2_hmac;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::ServiceError;

type HmacSha256 = Hmac<Sha256>;

const ROUNDS: u32 = 600_000;
const SALT_BYTES: usize = 16;
const DIGEST_BYTES: usize = 32;

/// Access tokens live for an hour unless configured otherwise.
pub const ACCESS_TOKEN_TTL_SECS: u64 = 3600;

/// Base64url of `{"alg":"HS256","typ":"JWT"}`.
const HS256_HEADER: &str = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9";

fn derive(password: &str, salt: &[u8]) -> [u8; DIGEST_BYTES] {
    let mut out = [0u8; DIGEST_BYTES];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, ROUNDS, &mut out);
    out
}

/// Returns `(digest_hex, salt_hex)` for a fresh random salt.
pub fn hash_password(password: &str) -> Result<(String, String), ServiceError> {
    let mut salt = [0u8; SALT_BYTES];
    getrandom::getrandom(&mut salt)
        .map_err(|e| ServiceError::Internal(format!("no entropy for salt: {e}")))?;
    Ok((hex::encode(derive(password, &salt)), hex::encode(salt)))
}

/// False for a wrong password and for malformed stored values alike.
pub fn verify_password(password: &str, hash_hex: &str, salt_hex: &str) -> bool {
    match (hex::decode(hash_hex), hex::decode(salt_hex)) {
        (Ok(stored), Ok(salt)) => same_bytes(&derive(password, &salt), &stored),
        _ => false,
    }
}

#[derive(Serialize, Deserialize)]
struct Claims {
    sub: String,
    iat: u64,
    exp: u64,
}

fn mac_for(secret: &str) -> HmacSha256 {
    // HMAC accepts keys of any length, so this never fails.
    match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => unreachable!("hmac key length is unrestricted"),
    }
}

fn signature(secret: &str, signed_part: &str) -> Vec<u8> {
    let mut mac = mac_for(secret);
    mac.update(signed_part.as_bytes());
    mac.finalize().into_bytes().to_vec()
}

/// Issue a token for `user_id` valid from `now_unix` for `ttl_secs`.
pub fn sign_jwt(user_id: &str, secret: &str, now_unix: u64, ttl_secs: u64) -> String {
    let claims = Claims {
        sub: user_id.to_string(),
        iat: now_unix,
        exp: now_unix.saturating_add(ttl_secs),
    };
    // Serializing a struct of plain strings and integers cannot fail.
    let body = serde_json::to_vec(&claims).unwrap_or_default();
    let signed_part = format!("{HS256_HEADER}.{}", URL_SAFE_NO_PAD.encode(body));
    let sig = URL_SAFE_NO_PAD.encode(signature(secret, &signed_part));
    format!("{signed_part}.{sig}")
}

/// Check signature and expiry, returning the user id the token was issued for.
pub fn verify_jwt(token: &str, secret: &str, now_unix: u64) -> Result<String, ServiceError> {
    let reject = |why: &str| ServiceError::Unauthorized(why.to_string());

    let (signed_part, sig_b64) = token.rsplit_once('.').ok_or_else(|| reject("malformed token"))?;
    let (_, body_b64) = signed_part
        .split_once('.')
        .filter(|(_, body)| !body.contains('.'))
        .ok_or_else(|| reject("malformed token"))?;

    let sig = URL_SAFE_NO_PAD
        .decode(sig_b64)
        .map_err(|_| reject("malformed token"))?;
    if !same_bytes(&signature(secret, signed_part), &sig) {
        return Err(reject("token signature mismatch"));
    }

    let claims: Claims = URL_SAFE_NO_PAD
        .decode(body_b64)
        .ok()
        .and_then(|raw| serde_json::from_slice(&raw).ok())
        .ok_or_else(|| reject("malformed token claims"))?;
    if now_unix > claims.exp {
        return Err(reject("token expired"));
    }
    Ok(claims.sub)
}

fn same_bytes(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).map(|(x, y)| x ^ y).fold(0, |acc, d| acc | d) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn header_constant_matches_hs256() {
        let decoded = URL_SAFE_NO_PAD.decode(HS256_HEADER).unwrap();
        assert_eq!(decoded, br#"{"alg":"HS256","typ":"JWT"}"#);
    }

    #[test]
    fn password_roundtrip() {
        let (hash, salt) = hash_password("hunter22").unwrap();
        assert!(verify_password("hunter22", &hash, &salt));
        assert!(!verify_password("hunter23", &hash, &salt));
        assert!(!verify_password("hunter22", "not-hex", &salt));
    }

    #[test]
    fn jwt_carries_subject_until_expiry() {
        let token = sign_jwt("user-1", SECRET, 1_000, 60);
        assert_eq!(verify_jwt(&token, SECRET, 1_030).unwrap(), "user-1");
        assert_eq!(verify_jwt(&token, SECRET, 1_060).unwrap(), "user-1");

        let err = verify_jwt(&token, SECRET, 1_061).unwrap_err();
        assert_eq!(err, ServiceError::Unauthorized("token expired".into()));
    }

    #[test]
    fn jwt_rejects_foreign_secret_and_garbage() {
        let token = sign_jwt("user-1", SECRET, 1_000, 60);
        assert!(verify_jwt(&token, "other-secret", 1_000).is_err());
        assert!(verify_jwt("a.b", SECRET, 1_000).is_err());
        assert!(verify_jwt("not.a.jwt", SECRET, 1_000).is_err());
        assert!(verify_jwt("a.b.c.d", SECRET, 1_000).is_err());
    }

    #[test]
    fn jwt_rejects_tampered_payload() {
        let token = sign_jwt("user-1", SECRET, 1_000, 60);
        let parts: Vec<&str> = token.split('.').collect();
        let forged = URL_SAFE_NO_PAD.encode(br#"{"sub":"admin","iat":1000,"exp":9999999999}"#);
        let tampered = format!("{}.{}.{}", parts[0], forged, parts[2]);
        assert_eq!(
            verify_jwt(&tampered, SECRET, 1_000).unwrap_err(),
            ServiceError::Unauthorized("token signature mismatch".into())
        );
    }
}
