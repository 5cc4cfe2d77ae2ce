//! Principal extraction from identity headers.
//!
//! Authentication happens upstream; this service trusts the identity layer
//! to set `X-User-Id` and `X-User-Role` on every request it forwards.

use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::request::Parts;
use common::UserId;
use domain::{Principal, Role};

use crate::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// The authenticated caller of a request.
#[derive(Debug, Clone, Copy)]
pub struct AuthPrincipal(pub Principal);

impl<S: Send + Sync> FromRequestParts<S> for AuthPrincipal {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        principal_from_headers(&parts.headers).map(AuthPrincipal)
    }
}

/// Reads the principal from identity headers.
pub fn principal_from_headers(headers: &HeaderMap) -> Result<Principal, ApiError> {
    let user_id: UserId = header_str(headers, USER_ID_HEADER)?
        .parse()
        .map_err(|_| ApiError::Unauthorized(format!("malformed {USER_ID_HEADER} header")))?;

    let role: Role = header_str(headers, USER_ROLE_HEADER)?
        .trim()
        .to_ascii_lowercase()
        .parse()
        .map_err(|_| ApiError::Unauthorized(format!("unknown role in {USER_ROLE_HEADER} header")))?;

    Ok(Principal::new(user_id, role))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &'static str) -> Result<&'a str, ApiError> {
    headers
        .get(name)
        .ok_or_else(|| ApiError::Unauthorized(format!("missing {name} header")))?
        .to_str()
        .map_err(|_| ApiError::Unauthorized(format!("malformed {name} header")))
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn headers(user: Option<&str>, role: Option<&str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(user) = user {
            headers.insert(USER_ID_HEADER, HeaderValue::from_str(user).unwrap());
        }
        if let Some(role) = role {
            headers.insert(USER_ROLE_HEADER, HeaderValue::from_str(role).unwrap());
        }
        headers
    }

    #[test]
    fn test_valid_headers() {
        let user = UserId::new();
        let principal =
            principal_from_headers(&headers(Some(&user.to_string()), Some("Store"))).unwrap();
        assert_eq!(principal, Principal::new(user, Role::Store));
    }

    #[test]
    fn test_missing_or_malformed_headers() {
        let user = UserId::new().to_string();
        for h in [
            headers(None, Some("client")),
            headers(Some(&user), None),
            headers(Some("not-a-uuid"), Some("client")),
            headers(Some(&user), Some("admin")),
        ] {
            assert!(matches!(
                principal_from_headers(&h),
                Err(ApiError::Unauthorized(_))
            ));
        }
    }
}
