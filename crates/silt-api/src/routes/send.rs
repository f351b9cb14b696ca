//! Envelope signing and distribution handler.

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;

use silt_core::operation::Envelope;
use silt_core::traits::Signable;

use crate::error::ApiError;
use crate::hal::Hal;
use crate::send::distribute;

use super::{hal_response, render, AppState};

/// POST `/builder/send` — sign an envelope with the node key and distribute
/// it to every peer channel.
pub(crate) async fn send(
    State(state): State<AppState>,
    Json(mut envelope): Json<Envelope>,
) -> Response {
    if envelope.operations.is_empty() {
        return ApiError::BadRequest("empty envelope".into()).into_response();
    }

    if let Err(e) = envelope.sign(&state.node_key, &state.network_id) {
        return ApiError::Internal(e.to_string()).into_response();
    }

    if let Err(e) = distribute(&state.channels, &envelope).await {
        tracing::warn!(error = %e, "failed to distribute envelope");
        return ApiError::from(e).into_response();
    }

    let hal = Hal::new(envelope, "/builder/send");
    match render(&hal) {
        Ok(body) => hal_response(body),
        Err(e) => e.into_response(),
    }
}
