//! Token authentication extractor

use super::error::{map_domain_error, Problem};
use crate::contract::{SchoolError, User};
use crate::domain::Service;
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use std::sync::Arc;

/// Authenticated caller, resolved from `Authorization: Token <key>`
/// (`Bearer` is accepted too)
pub struct CurrentUser(pub User);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Problem;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let service = parts
            .extensions
            .get::<Arc<Service>>()
            .cloned()
            .ok_or_else(|| {
                tracing::error!("school service extension missing from request");
                map_domain_error(SchoolError::Internal)
            })?;

        let key = token_key(parts).map_err(map_domain_error)?;
        let user = service.authenticate(key).await.map_err(map_domain_error)?;
        Ok(Self(user))
    }
}

fn token_key(parts: &Parts) -> Result<&str, SchoolError> {
    let value = parts
        .headers
        .get(header::AUTHORIZATION)
        .ok_or_else(|| SchoolError::unauthenticated("Authentication credentials were not provided"))?
        .to_str()
        .map_err(|_| SchoolError::unauthenticated("Invalid token header"))?;

    let (scheme, key) = value
        .split_once(' ')
        .ok_or_else(|| SchoolError::unauthenticated("Invalid token header"))?;
    if !scheme.eq_ignore_ascii_case("token") && !scheme.eq_ignore_ascii_case("bearer") {
        return Err(SchoolError::unauthenticated("Unsupported authorization scheme"));
    }

    let key = key.trim();
    if key.is_empty() || key.contains(' ') {
        return Err(SchoolError::unauthenticated("Invalid token header"));
    }
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with(header_value: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/me");
        if let Some(value) = header_value {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn token_and_bearer_schemes_are_accepted() {
        assert_eq!(token_key(&parts_with(Some("Token abc123"))).unwrap(), "abc123");
        assert_eq!(token_key(&parts_with(Some("Bearer abc123"))).unwrap(), "abc123");
    }

    #[test]
    fn missing_or_malformed_header_is_unauthenticated() {
        for value in [None, Some("abc123"), Some("Basic abc"), Some("Token a b")] {
            let err = token_key(&parts_with(value)).unwrap_err();
            assert!(matches!(err, SchoolError::Unauthenticated { .. }), "{value:?}");
        }
    }
}
