use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use tracing::{debug, instrument, trace};
use uuid::Uuid;

use crate::{
    AppState,
    api::models::users::CurrentUser,
    auth::session,
    config::Config,
    errors::{Error, Result},
};

/// Extract user from an `Authorization: Bearer <jwt>` header
/// Returns:
/// - None: No bearer token present
/// - Some(Ok(user)): Valid JWT found and verified
/// - Some(Err(error)): Bearer token present but invalid/expired
#[instrument(skip(parts, config))]
fn try_bearer_auth(parts: &Parts, config: &Config) -> Option<Result<CurrentUser>> {
    let auth_header = parts.headers.get(header::AUTHORIZATION)?;

    let value = match auth_header.to_str() {
        Ok(s) => s,
        Err(e) => {
            return Some(Err(Error::BadRequest {
                message: format!("Invalid authorization header: {e}"),
            }));
        }
    };

    let token = value.strip_prefix("Bearer ").or_else(|| value.strip_prefix("bearer "))?;
    Some(session::verify_session_token(token.trim(), config))
}

/// Extract user from the session cookie if present and valid
/// Returns:
/// - None: No session cookie present
/// - Some(Ok(user)): Valid JWT found and verified
/// - Some(Err(error)): Cookie header unreadable
#[instrument(skip(parts, config))]
fn try_cookie_auth(parts: &Parts, config: &Config, cookie_name: &str) -> Option<Result<CurrentUser>> {
    let cookie_header = parts.headers.get(header::COOKIE)?;

    let cookie_str = match cookie_header.to_str() {
        Ok(s) => s,
        Err(e) => {
            return Some(Err(Error::BadRequest {
                message: format!("Invalid cookie header: {e}"),
            }));
        }
    };

    for cookie in cookie_str.split(';') {
        if let Some((name, value)) = cookie.trim().split_once('=')
            && name == cookie_name
        {
            match session::verify_session_token(value, config) {
                Ok(user) => return Some(Ok(user)),
                // Expired tokens are expected here; keep looking at the other cookies
                Err(_) => continue,
            }
        }
    }
    None
}

/// Extract user from the trusted proxy header
/// Returns:
/// - None: No proxy header present
/// - Some(Ok(user)): Header carries a valid user UUID
/// - Some(Err(error)): Header present but not a UUID
#[instrument(skip(parts, config))]
fn try_proxy_header_auth(parts: &Parts, config: &Config) -> Option<Result<CurrentUser>> {
    let value = parts
        .headers
        .get(&config.auth.proxy_header.header_name)
        .and_then(|h| h.to_str().ok())?;

    Some(
        Uuid::parse_str(value.trim())
            .map(|id| CurrentUser { id })
            .map_err(|_| Error::Unauthenticated { message: None }),
    )
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Error;

    #[instrument(skip(parts, state))]
    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        // Each method returns Option<Result<CurrentUser>>:
        // - None means the method is not applicable (no credentials present)
        // - Some(Ok(user)) means successful authentication
        // - Some(Err(error)) means credentials were present but invalid
        let config = &state.config;
        let mut auth_errors = Vec::new();

        if config.auth.bearer_enabled {
            match try_bearer_auth(parts, config) {
                Some(Ok(user)) => {
                    debug!("Found bearer authenticated user: {}", user.id);
                    return Ok(user);
                }
                Some(Err(e)) => auth_errors.push(("Bearer", e)),
                None => trace!("No bearer authentication attempted"),
            }
        }

        if let Some(cookie_name) = config.auth.cookie_name.as_deref() {
            match try_cookie_auth(parts, config, cookie_name) {
                Some(Ok(user)) => {
                    debug!("Found cookie authenticated user: {}", user.id);
                    return Ok(user);
                }
                Some(Err(e)) => auth_errors.push(("Cookie", e)),
                None => trace!("No cookie authentication attempted"),
            }
        }

        if config.auth.proxy_header.enabled {
            match try_proxy_header_auth(parts, config) {
                Some(Ok(user)) => {
                    debug!("Found proxy header authenticated user: {}", user.id);
                    return Ok(user);
                }
                Some(Err(e)) => auth_errors.push(("Proxy header", e)),
                None => trace!("No proxy header authentication attempted"),
            }
        }

        if auth_errors.is_empty() {
            trace!("No authentication credentials found in request");
        } else {
            trace!("All authentication attempts failed ({}): {:?}", auth_errors.len(), auth_errors);
        }
        Err(Error::Unauthenticated { message: None })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_test_config, create_test_state, session_token};
    use sqlx::PgPool;

    fn parts_with_header(header_name: &str, header_value: &str) -> Parts {
        let request = axum::http::Request::builder()
            .uri("http://localhost/test")
            .header(header_name, header_value)
            .body(())
            .unwrap();

        let (parts, _body) = request.into_parts();
        parts
    }

    #[test]
    fn test_bearer_token_extraction() {
        let config = create_test_config();
        let user_id = Uuid::new_v4();
        let parts = parts_with_header("authorization", &format!("Bearer {}", session_token(user_id)));

        let user = try_bearer_auth(&parts, &config).unwrap().unwrap();
        assert_eq!(user.id, user_id);
    }

    #[test]
    fn test_non_bearer_authorization_is_ignored() {
        let config = create_test_config();
        let parts = parts_with_header("authorization", "Basic dXNlcjpwYXNz");
        assert!(try_bearer_auth(&parts, &config).is_none());
    }

    #[test]
    fn test_cookie_extraction_skips_other_cookies() {
        let config = create_test_config();
        let user_id = Uuid::new_v4();
        let cookie = format!("theme=dark; sb-access-token={}; other=1", session_token(user_id));
        let parts = parts_with_header("cookie", &cookie);

        let user = try_cookie_auth(&parts, &config, "sb-access-token").unwrap().unwrap();
        assert_eq!(user.id, user_id);
    }

    #[test]
    fn test_cookie_with_invalid_token_is_not_applicable() {
        let config = create_test_config();
        let parts = parts_with_header("cookie", "sb-access-token=garbage");
        assert!(try_cookie_auth(&parts, &config, "sb-access-token").is_none());
    }

    #[test]
    fn test_proxy_header_requires_uuid() {
        let config = create_test_config();
        let user_id = Uuid::new_v4();

        let parts = parts_with_header("x-machplan-user", &user_id.to_string());
        assert_eq!(try_proxy_header_auth(&parts, &config).unwrap().unwrap().id, user_id);

        let parts = parts_with_header("x-machplan-user", "someone@example.com");
        assert!(try_proxy_header_auth(&parts, &config).unwrap().is_err());
    }

    #[sqlx::test]
    async fn test_missing_credentials_returns_unauthorized(pool: PgPool) {
        let (state, _dir) = create_test_state(pool, None);
        let request = axum::http::Request::builder().uri("http://localhost/test").body(()).unwrap();
        let (mut parts, _body) = request.into_parts();

        let result = CurrentUser::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result.unwrap_err(), Error::Unauthenticated { .. }));
    }

    #[sqlx::test]
    async fn test_proxy_header_disabled_by_default(pool: PgPool) {
        let (state, _dir) = create_test_state(pool, None);
        let mut parts = parts_with_header("x-machplan-user", &Uuid::new_v4().to_string());

        let result = CurrentUser::from_request_parts(&mut parts, &state).await;
        assert!(result.is_err());
    }
}
