//! Open log viewer

use axum::{
    Json,
    extract::State,
    response::{IntoResponse, Response},
};

use crate::web::{AppState, responses::handle_error};

/// `GET /logs`: most recent open log lines, oldest first
pub async fn view_logs(State(state): State<AppState>) -> Response {
    match state.open_log.tail(state.log_tail_lines).await {
        Ok(lines) => Json(lines).into_response(),
        Err(e) => handle_error(e).into_response(),
    }
}
