use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use crate::appresult::AppError;

pub const USER_ID: &str = "user_id";
pub const CSRF_STATE: &str = "csrf_state";
pub const PKCE_VERIFIER: &str = "pkce_verifier";
pub const RETURN_URL: &str = "return_url";

/// Current signed-in user, if any. Handlers take this instead of poking at
/// the session so identity always flows in through the extractor.
pub struct Identity(pub Option<String>);

/// Like [`Identity`] but rejects with 401 when nobody is signed in.
pub struct RequireUser(pub String);

impl<S: Send + Sync> FromRequestParts<S> for Identity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|(_, msg)| AppError::from(msg))?;
        Ok(Identity(session.get::<String>(USER_ID).await?))
    }
}

impl<S: Send + Sync> FromRequestParts<S> for RequireUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Identity(user_id) = Identity::from_request_parts(parts, state).await?;
        user_id.map(RequireUser).ok_or(AppError::Unauthenticated)
    }
}
