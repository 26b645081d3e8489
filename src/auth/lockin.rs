use axum::{debug_handler, extract::{Path, Query, State}, response::Redirect};
use oauth2::{AuthorizationCode, CsrfToken, PkceCodeVerifier, TokenResponse};
use serde::Deserialize;
use sqlx::SqlitePool;
use tower_sessions::Session;
use tracing::info;

use crate::{
    session::{CSRF_STATE, PKCE_VERIFIER, RETURN_URL, USER_ID},
    AppResult, AppState,
};

use super::{clients::ClientProvider, ensure_profile, Clients};

#[derive(Deserialize)]
pub(crate) struct LockinQuery {
    pub(crate) state: Option<String>,
    pub(crate) code: Option<String>,
}

#[debug_handler(state = AppState)]
pub(crate) async fn lockin(
    Path(provider): Path<ClientProvider>,
    Query(LockinQuery { state, code }): Query<LockinQuery>,
    State(db_pool): State<SqlitePool>,
    State(clients): State<Clients>,
    session: Session,
) -> AppResult<Redirect> {
    let state = CsrfToken::new(state.ok_or("OAuth: without state")?);
    let code = AuthorizationCode::new(code.ok_or("OAuth: without code")?);

    let Some(stored_state) = session.get::<String>(CSRF_STATE).await? else {
        return Err("no csrf_state")?;
    };

    if state.secret().as_str() != stored_state.as_str() {
        return Err("csrf tokens don't match")?;
    }

    let Some(pkce_verifier) = session.get::<String>(PKCE_VERIFIER).await? else {
        return Err("no pkce_verifier")?;
    };

    let client = clients.get_client(provider)?;
    let http_client = reqwest::ClientBuilder::new()
        .redirect(reqwest::redirect::Policy::none())
        .build()?;
    let token_result = client
        .exchange_code(code)
        .set_pkce_verifier(PkceCodeVerifier::new(pkce_verifier))
        .request_async(&http_client)
        .await?;

    let access_token = token_result.access_token().secret();
    let body: serde_json::Value = http_client
        .get(provider.userinfo_url())
        .bearer_auth(access_token)
        .header("User-Agent", "spothub")
        .send()
        .await?
        .json()
        .await?;

    // github hands back a numeric id, google a string one
    let provider_id = match body.get("id") {
        Some(serde_json::Value::String(id)) => id.clone(),
        Some(serde_json::Value::Number(id)) => id.to_string(),
        _ => return Err("no id in userinfo response")?,
    };
    let user_id = format!("{provider}:{provider_id}").to_lowercase();
    let display_name = body
        .get("name")
        .and_then(|v| v.as_str())
        .or_else(|| body.get("login").and_then(|v| v.as_str()));

    ensure_profile(&db_pool, &user_id, display_name).await?;
    session.insert(USER_ID, user_id.clone()).await?;

    info!("welcome u/{user_id}");

    let return_url: Option<String> = session.get(RETURN_URL).await?;
    Ok(Redirect::to(return_url.as_deref().unwrap_or("/")))
}
