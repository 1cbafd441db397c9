//! Session guard for routes that need an authenticated identity.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::{
    error::AppError,
    models::user::AuthUser,
    repositories::user as user_repo,
    state::AppState,
    types::UserId,
    utils::{
        cookies::{cookie_from_headers, ACCESS_COOKIE_NAME},
        jwt::Claims,
    },
};

/// Verifies the access token and attaches [`Claims`] and [`AuthUser`] to the request.
///
/// Failing requests never reach the wrapped handler.
pub async fn auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let (claims, user) = authenticate_request(request.headers(), &state).await?;
    request.extensions_mut().insert(claims);
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

fn parse_bearer_token(header: &str) -> Option<&str> {
    let (scheme, rest) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = rest.trim();
    (!token.is_empty()).then_some(token)
}

/// The `accessToken` cookie wins over an `Authorization: Bearer` header.
pub fn extract_access_token(headers: &HeaderMap) -> Option<String> {
    cookie_from_headers(headers, ACCESS_COOKIE_NAME).or_else(|| {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_bearer_token)
            .map(str::to_string)
    })
}

pub async fn authenticate_request(
    headers: &HeaderMap,
    state: &AppState,
) -> Result<(Claims, AuthUser), AppError> {
    let token = extract_access_token(headers)
        .ok_or_else(|| AppError::Unauthorized("Unauthorized request".into()))?;

    let claims = state.tokens.verify_access(&token)?;
    let user_id: UserId = claims
        .sub
        .parse()
        .map_err(|_| AppError::Unauthorized("Invalid access token".into()))?;

    let user = user_repo::find_by_id(&state.pool, user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid access token".into()))?;

    Ok((claims, AuthUser::from(user)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn parse_bearer_token_accepts_any_case_scheme() {
        assert_eq!(parse_bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(parse_bearer_token("bearer  abc "), Some("abc"));
        assert_eq!(parse_bearer_token("BEARER abc"), Some("abc"));
        assert_eq!(parse_bearer_token("Basic abc"), None);
        assert_eq!(parse_bearer_token("Bearer "), None);
        assert_eq!(parse_bearer_token("Bearer"), None);
    }

    #[test]
    fn cookie_takes_precedence_over_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
        assert_eq!(extract_access_token(&headers).as_deref(), Some("from-header"));

        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; accessToken=from-cookie"),
        );
        assert_eq!(extract_access_token(&headers).as_deref(), Some("from-cookie"));
    }

    #[test]
    fn missing_credentials_yield_none() {
        assert!(extract_access_token(&HeaderMap::new()).is_none());
    }
}
