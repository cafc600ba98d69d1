//! Beacon endpoint
//!
//! Every request is answered with the same image, whatever happened while
//! recording it, so the endpoint never reveals tracking state to whoever is
//! loading the pixel.
//!
//! Recording runs on its own task. Once the dedup mark is set the log append
//! and notification always follow, even if the client disconnects or the
//! request deadline passes first.

use axum::{
    extract::{Path, State, rejection::PathRejection},
    response::Response,
};
use chrono::Utc;
use tracing::{debug, error, warn};

use crate::models::OpenEvent;
use crate::web::{AppState, extractors::ClientContext, responses::pixel_response};

/// `GET /track/{sender}/{message_id}/{subject}.{ext}`
pub async fn track_open(
    State(state): State<AppState>,
    path: Result<Path<(String, String, String)>, PathRejection>,
    client: ClientContext,
) -> Response {
    let Path((sender, message_id, file)) = match path {
        Ok(path) => path,
        Err(rejection) => {
            warn!(request_id = %client.request_id, "Undecodable tracking path: {}", rejection);
            return pixel_response(state.pixel.bytes());
        }
    };

    let event = OpenEvent {
        sender,
        message_id,
        subject: subject_from_file(&file).to_string(),
        client_ip: client.client_ip,
        user_agent: client.user_agent,
        timestamp: Utc::now(),
    };

    let tracker = state.tracker.clone();
    let recording = tokio::spawn(async move { tracker.record_open(event).await });

    match tokio::time::timeout(state.request_timeout, recording).await {
        Ok(Ok(outcome)) => {
            debug!(request_id = %client.request_id, ?outcome, "Tracking request handled");
        }
        Ok(Err(join_error)) => {
            error!(request_id = %client.request_id, "Open recording task failed: {}", join_error);
        }
        Err(_) => {
            warn!(
                request_id = %client.request_id,
                timeout_ms = state.request_timeout.as_millis(),
                "Open recording still running at request deadline, answering with pixel"
            );
        }
    }

    pixel_response(state.pixel.bytes())
}

/// Strip the image extension from the last path segment
pub fn subject_from_file(file: &str) -> &str {
    match file.rsplit_once('.') {
        Some((subject, _ext)) => subject,
        None => file,
    }
}
