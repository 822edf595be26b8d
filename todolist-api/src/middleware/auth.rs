/// HTTP Basic authentication
///
/// Protected handlers take an [`AuthContext`] argument. Extraction resolves
/// the `Authorization: Basic <base64(login:password)>` header to a stored
/// user. It runs only once the router has matched both path and method, so
/// a wrong method is answered with 405 before credentials are looked at.
///
/// A missing, malformed or undecodable header and an unknown login are all
/// answered with 401 `unauthorized access`; a known login with the wrong
/// password gets 401 `wrong password`.

use crate::app::AppState;
use crate::error::ApiError;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use base64::{engine::general_purpose::STANDARD, Engine};
use todolist_shared::models::user::User;
use todolist_shared::service::AuthFailure;

/// Authenticated caller
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// The user whose credentials were accepted
    pub user: User,
}

/// Login and password taken from a Basic `Authorization` header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    pub login: String,
    pub password: String,
}

/// Extracts Basic credentials from request headers
///
/// The scheme name is matched case-insensitively. The password may itself
/// contain `:`; only the first colon separates it from the login.
pub fn parse_basic_credentials(headers: &HeaderMap) -> Option<BasicCredentials> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, encoded) = value.trim().split_once(char::is_whitespace)?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }

    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (login, password) = decoded.split_once(':')?;

    Some(BasicCredentials {
        login: login.to_string(),
        password: password.to_string(),
    })
}

#[async_trait]
impl FromRequestParts<AppState> for AuthContext {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(context) = parts.extensions.get::<AuthContext>() {
            return Ok(context.clone());
        }

        let credentials = parse_basic_credentials(&parts.headers)
            .ok_or_else(|| ApiError::from(AuthFailure::UnknownLogin))?;

        let user = state
            .service
            .authenticate(&credentials.login, &credentials.password)
            .await?;

        tracing::debug!(user_id = user.id, "Basic credentials accepted");
        let context = AuthContext { user };
        parts.extensions.insert(context.clone());

        Ok(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_parse_valid_header() {
        // "alice:secret" in base64
        for scheme in ["Basic", "basic", "BASIC"] {
            let header = format!("{} YWxpY2U6c2VjcmV0", scheme);
            let credentials = parse_basic_credentials(&headers_with(&header)).unwrap();
            assert_eq!(
                credentials,
                BasicCredentials {
                    login: "alice".to_string(),
                    password: "secret".to_string(),
                },
                "{}",
                scheme
            );
        }
    }

    #[test]
    fn test_password_may_contain_colon() {
        let encoded = STANDARD.encode("alice:se:cret");
        let credentials =
            parse_basic_credentials(&headers_with(&format!("Basic {}", encoded))).unwrap();
        assert_eq!(credentials.login, "alice");
        assert_eq!(credentials.password, "se:cret");
    }

    #[test]
    fn test_rejects_malformed_headers() {
        assert!(parse_basic_credentials(&HeaderMap::new()).is_none());
        assert!(parse_basic_credentials(&headers_with("Bearer abc")).is_none());
        assert!(parse_basic_credentials(&headers_with("Basic")).is_none());
        assert!(parse_basic_credentials(&headers_with("Basicfoo YWxpY2U6c2VjcmV0")).is_none());
        assert!(parse_basic_credentials(&headers_with("Basic !!!not-base64")).is_none());

        let no_colon = STANDARD.encode("alice");
        assert!(parse_basic_credentials(&headers_with(&format!("Basic {}", no_colon))).is_none());
    }
}
