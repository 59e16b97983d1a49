//! Caller identity. Authentication itself happens outside this service; here
//! a request is mapped to an optional opaque user id.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, HeaderMap, HeaderName, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use std::convert::Infallible;
use std::sync::Arc;
use subtle::ConstantTimeEq;

use crate::api::handlers::ErrorResponse;
use crate::config::{ApiKey, AuthConfig, AuthMode};

/// Identity attached to a request by [`auth_middleware`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: String,
}

#[derive(Debug)]
pub struct InvalidCredentials;

pub struct AuthService {
    mode: AuthMode,
    api_keys: Vec<ApiKey>,
    user_id_header: HeaderName,
}

impl AuthService {
    pub fn new(config: AuthConfig) -> anyhow::Result<Self> {
        let user_id_header = HeaderName::try_from(config.user_id_header.to_lowercase())?;
        Ok(Self {
            mode: config.mode,
            api_keys: config.api_keys,
            user_id_header,
        })
    }

    pub fn mode(&self) -> &AuthMode {
        &self.mode
    }

    /// Resolve the caller. `Ok(None)` means anonymous.
    pub fn identify(
        &self,
        headers: &HeaderMap,
    ) -> Result<Option<AuthenticatedUser>, InvalidCredentials> {
        match self.mode {
            AuthMode::None => Ok(None),
            AuthMode::ApiKey => {
                let Some(presented) = headers.get("x-api-key") else {
                    return Ok(None);
                };
                let presented = presented.as_bytes();

                // Compare against every key so timing does not reveal which matched
                let mut matched = None;
                for api_key in &self.api_keys {
                    if bool::from(api_key.key.as_bytes().ct_eq(presented)) {
                        matched = Some(api_key.user_id.clone());
                    }
                }

                matched
                    .map(|user_id| Some(AuthenticatedUser { user_id }))
                    .ok_or(InvalidCredentials)
            }
            AuthMode::Header => Ok(headers
                .get(&self.user_id_header)
                .and_then(|h| h.to_str().ok())
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(|id| AuthenticatedUser {
                    user_id: id.to_string(),
                })),
        }
    }
}

pub async fn auth_middleware(
    State(auth_service): State<Arc<AuthService>>,
    mut request: Request,
    next: Next,
) -> Response {
    match auth_service.identify(request.headers()) {
        Ok(Some(user)) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Ok(None) => next.run(request).await,
        Err(InvalidCredentials) => unauthorized("Invalid API key"),
    }
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}

/// Extractor for routes that need an identified caller.
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| unauthorized("Authentication required"))
    }
}

/// Extractor for routes open to anonymous callers.
pub struct MaybeUser(pub Option<AuthenticatedUser>);

impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(parts.extensions.get::<AuthenticatedUser>().cloned()))
    }
}
