use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha1::Sha1;

use crate::errors::AppError;
use crate::models::{Role, Session};

type HmacSha1 = Hmac<Sha1>;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    email: String,
    role: Role,
    /// Expiry as a unix timestamp.
    exp: i64,
}

/// Issues a signed bearer token: `base64url(claims) "." base64url(hmac)`.
pub fn issue_token(session: &Session, secret: &str, ttl: Duration) -> Result<String, AppError> {
    let claims = Claims {
        email: session.email.clone(),
        role: session.role,
        exp: Utc::now()
            .checked_add_signed(ttl)
            .ok_or_else(|| AppError::Internal("session lifetime out of range".to_string()))?
            .timestamp(),
    };
    let payload = serde_json::to_vec(&claims)
        .map_err(|e| AppError::Internal(format!("failed to encode session: {e}")))?;
    let payload = URL_SAFE_NO_PAD.encode(payload);

    let signature = URL_SAFE_NO_PAD.encode(sign(secret, &payload)?);
    Ok(format!("{payload}.{signature}"))
}

/// Verifies signature and expiry and returns the caller's session.
pub fn verify_token(token: &str, secret: &str) -> Result<Session, AppError> {
    let (payload, signature) = token.split_once('.').ok_or(AppError::Unauthorized)?;
    let signature = URL_SAFE_NO_PAD
        .decode(signature)
        .map_err(|_| AppError::Unauthorized)?;

    let mut mac = HmacSha1::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Internal(format!("invalid session secret: {e}")))?;
    mac.update(payload.as_bytes());
    if mac.verify_slice(&signature).is_err() {
        tracing::warn!("rejected session token with bad signature");
        return Err(AppError::Unauthorized);
    }

    let claims: Claims = URL_SAFE_NO_PAD
        .decode(payload)
        .ok()
        .and_then(|bytes| serde_json::from_slice(&bytes).ok())
        .ok_or(AppError::Unauthorized)?;

    if Utc::now().timestamp() >= claims.exp {
        return Err(AppError::Unauthorized);
    }

    Ok(Session {
        email: claims.email,
        role: claims.role,
    })
}

fn sign(secret: &str, payload: &str) -> Result<Vec<u8>, AppError> {
    let mut mac = HmacSha1::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Internal(format!("invalid session secret: {e}")))?;
    mac.update(payload.as_bytes());
    Ok(mac.finalize().into_bytes().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn test_issue_and_verify() {
        let token = issue_token(&Session::customer("u@x.com"), SECRET, Duration::hours(1)).unwrap();
        let session = verify_token(&token, SECRET).unwrap();
        assert_eq!(session, Session::customer("u@x.com"));

        let token = issue_token(&Session::admin("admin@x.com"), SECRET, Duration::hours(1)).unwrap();
        assert!(verify_token(&token, SECRET).unwrap().is_admin());
    }

    #[test]
    fn test_out_of_range_lifetime_is_an_error() {
        assert!(matches!(
            issue_token(&Session::customer("u@x.com"), SECRET, Duration::MAX),
            Err(AppError::Internal(_))
        ));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = issue_token(&Session::customer("u@x.com"), SECRET, Duration::hours(1)).unwrap();
        assert!(matches!(verify_token(&token, "other"), Err(AppError::Unauthorized)));
    }

    #[test]
    fn test_promoted_role_rejected() {
        let token = issue_token(&Session::customer("u@x.com"), SECRET, Duration::hours(1)).unwrap();
        let (_, signature) = token.split_once('.').unwrap();

        let forged_claims = serde_json::json!({
            "email": "u@x.com",
            "role": "admin",
            "exp": Utc::now().timestamp() + 3600,
        });
        let forged_payload = URL_SAFE_NO_PAD.encode(forged_claims.to_string());
        let forged = format!("{forged_payload}.{signature}");

        assert!(matches!(verify_token(&forged, SECRET), Err(AppError::Unauthorized)));
    }

    #[test]
    fn test_expired_token_rejected() {
        let token =
            issue_token(&Session::customer("u@x.com"), SECRET, Duration::seconds(-5)).unwrap();
        assert!(matches!(verify_token(&token, SECRET), Err(AppError::Unauthorized)));
    }

    #[test]
    fn test_garbage_rejected() {
        for token in ["", "abc", "abc.def", "a.b.c", "...."] {
            assert!(matches!(verify_token(token, SECRET), Err(AppError::Unauthorized)));
        }
    }
}
