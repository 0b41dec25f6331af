//! Spotify login endpoints
//!
//! GET /login    - redirect to the Spotify consent page
//! GET /callback - exchange the authorization code

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect},
    routing::get,
    Router,
};
use serde::Deserialize;
use tracing::info;

use super::{ApiError, AppState};
use crate::spotify::AuthError;

/// Build auth router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", get(login))
        .route("/callback", get(callback))
}

/// Redirect to Spotify
async fn login(State(state): State<AppState>) -> Redirect {
    let url = state.auth.begin_login();
    info!("Starting Spotify login");
    Redirect::to(&url)
}

/// Callback query params
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// Exchange the authorization code for tokens
async fn callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackQuery>,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(error) = params.error {
        return Err(ApiError::validation(format!(
            "Autorización rechazada: {}",
            error
        )));
    }

    let (Some(code), Some(login_state)) = (params.code, params.state) else {
        return Err(ApiError::validation("Faltan los parámetros code o state"));
    };

    match state.auth.complete_login(&code, &login_state).await {
        Ok(()) => Ok("Autenticación completada. Ya puedes cerrar esta ventana."),
        Err(AuthError::UnknownState) => Err(ApiError::validation(
            "El parámetro state no es válido o ha expirado",
        )),
        Err(e) => Err(e.into()),
    }
}
