use crate::config::AuthKeys;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD as b64, Engine};
use hmac::{Hmac, Mac};
use serde_json::{json, Value as JsonValue};
use sha2::Sha256;

pub type Rejection = (StatusCode, Json<JsonValue>);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Provider,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Provider => "provider",
        }
    }
}

/// Identity issued by the upstream auth layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Caller {
    pub id: Option<String>,
    pub active_role: Option<String>,
}

fn unauthorized(msg: &str) -> Rejection {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"errorType": "Unauthorized!", "errorMessage": msg})),
    )
}

/// Verify a `kid.payload.sig` capability token (HMAC-SHA256, base64url) and
/// return the caller it names. With no keys configured every request passes
/// as an anonymous caller.
pub fn authenticate(headers: &HeaderMap, keys: &AuthKeys) -> Result<Caller, Rejection> {
    if !keys.enabled() {
        return Ok(Caller::default());
    }
    let token = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .ok_or_else(|| unauthorized("missing token"))?;
    let parts: Vec<&str> = token.split('.').collect();
    let [kid, payload, sig] = parts[..] else {
        return Err(unauthorized("bad token"));
    };
    let payload = b64.decode(payload).map_err(|_| unauthorized("bad b64"))?;
    let sig = b64.decode(sig).map_err(|_| unauthorized("bad b64"))?;
    let secret = keys
        .secret_for(kid)
        .ok_or_else(|| unauthorized("unknown kid"))?;
    let mut mac = <Hmac<Sha256>>::new_from_slice(secret.as_bytes())
        .map_err(|_| unauthorized("bad key"))?;
    mac.update(&payload);
    mac.verify_slice(&sig).map_err(|_| unauthorized("bad sig"))?;

    let claims: JsonValue =
        serde_json::from_slice(&payload).map_err(|_| unauthorized("bad claims"))?;
    if let Some(exp) = claims.get("exp").and_then(|v| v.as_i64()) {
        if exp < chrono::Utc::now().timestamp() {
            return Err(unauthorized("expired"));
        }
    }
    Ok(Caller {
        id: claims.get("sub").and_then(|v| v.as_str()).map(str::to_string),
        active_role: claims
            .get("activeRole")
            .and_then(|v| v.as_str())
            .map(str::to_string),
    })
}

/// Authenticate and require the caller's active role to be `role`.
pub fn require_role(
    headers: &HeaderMap,
    keys: &AuthKeys,
    role: Role,
) -> Result<Caller, Rejection> {
    let caller = authenticate(headers, keys)?;
    if !keys.enabled() || caller.active_role.as_deref() == Some(role.as_str()) {
        return Ok(caller);
    }
    Err((
        StatusCode::FORBIDDEN,
        Json(json!({
            "errorType": "Forbidden!",
            "errorMessage": format!(
                "Only users with an active role [{}] have access in this route.",
                role.as_str()
            ),
        })),
    ))
}

#[cfg(test)]
pub(crate) fn sign_token(kid: &str, secret: &str, claims: &JsonValue) -> String {
    let payload = serde_json::to_vec(claims).unwrap_or_default();
    let mut mac = <Hmac<Sha256>>::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(&payload);
    let sig = mac.finalize().into_bytes();
    format!("{}.{}.{}", kid, b64.encode(&payload), b64.encode(sig))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn keys() -> AuthKeys {
        AuthKeys {
            active: Some(("active".into(), "s3cret".into())),
            next: None,
        }
    }

    fn bearer(token: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        h
    }

    #[test]
    fn disabled_auth_admits_anonymous_caller() {
        let caller = require_role(&HeaderMap::new(), &AuthKeys::default(), Role::Provider).unwrap();
        assert_eq!(caller, Caller::default());
    }

    #[test]
    fn valid_token_yields_caller() {
        let token = sign_token("active", "s3cret", &json!({"sub": "u1", "activeRole": "provider"}));
        let caller = require_role(&bearer(&token), &keys(), Role::Provider).unwrap();
        assert_eq!(caller.id.as_deref(), Some("u1"));
    }

    #[test]
    fn wrong_role_is_forbidden() {
        let token = sign_token("active", "s3cret", &json!({"sub": "u1", "activeRole": "user"}));
        let (status, _) = require_role(&bearer(&token), &keys(), Role::Provider).unwrap_err();
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[test]
    fn tampered_expired_or_missing_tokens_are_rejected() {
        let forged = sign_token("active", "other", &json!({"sub": "u1"}));
        let expired = sign_token("active", "s3cret", &json!({"sub": "u1", "exp": 1}));
        let unknown = sign_token("nope", "s3cret", &json!({"sub": "u1"}));
        for headers in [
            bearer(&forged),
            bearer(&expired),
            bearer(&unknown),
            bearer("a.b"),
            HeaderMap::new(),
        ] {
            let (status, _) = authenticate(&headers, &keys()).unwrap_err();
            assert_eq!(status, StatusCode::UNAUTHORIZED);
        }
    }
}
