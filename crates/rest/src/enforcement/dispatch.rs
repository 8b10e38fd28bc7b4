//! Per-request dispatch through the interceptor chain.
//!
//! A request moves through these states:
//!
//! ```text
//! RECEIVED -> DISPATCHING -> BEFORE -> HANDLING -> AFTER -> FINALIZED
//!                              |                    |
//!                              +--------------------+--> FINALIZED_VIA_SHORT_CIRCUIT
//! ```
//!
//! A handler error skips the after stage: it is translated into the
//! standard error response exactly once and the request is finalized.

use std::future::Future;

use axum::response::{IntoResponse, Response};
use tracing::{debug, error, trace};

use super::{ApiResponse, InterceptorChain, RequestInfo};
use crate::error::RestResult;

/// The interceptor stage that replaced a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalStage {
    /// Before the handler ran; the handler was never invoked.
    Before,
    /// After the handler produced its response.
    After,
}

/// How a request was finalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The handler's response (or its translated error) was returned.
    Finalized,
    /// An interceptor supplied the response.
    FinalizedViaShortCircuit {
        /// Name of the interceptor.
        interceptor: String,
        /// Where it intervened.
        stage: SignalStage,
    },
}

impl DispatchOutcome {
    /// Returns `true` if an interceptor supplied the response.
    pub fn is_short_circuit(&self) -> bool {
        matches!(self, DispatchOutcome::FinalizedViaShortCircuit { .. })
    }
}

/// The final response of a dispatched request.
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatched {
    /// The response returned to the client.
    pub response: ApiResponse,
    /// How the request was finalized.
    pub outcome: DispatchOutcome,
}

impl IntoResponse for Dispatched {
    fn into_response(self) -> Response {
        self.response.into_response()
    }
}

/// Runs `handler` for `request`, giving `chain` the chance to replace the
/// response before and after it.
pub async fn dispatch<F, Fut>(
    chain: &InterceptorChain,
    request: &RequestInfo,
    handler: F,
) -> Dispatched
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = RestResult<ApiResponse>>,
{
    trace!(
        channel = %request.channel(),
        method = %request.method(),
        kind = %request.kind(),
        "dispatching"
    );

    if let Some(short) = chain.before(request) {
        debug!(
            channel = %request.channel(),
            interceptor = %short.interceptor,
            status = %short.response.status(),
            "request short-circuited before handler"
        );
        return Dispatched {
            response: short.response,
            outcome: DispatchOutcome::FinalizedViaShortCircuit {
                interceptor: short.interceptor,
                stage: SignalStage::Before,
            },
        };
    }

    let response = match handler().await {
        Ok(response) => response,
        Err(err) => {
            if err.is_server_error() {
                error!(
                    channel = %request.channel(),
                    kind = %request.kind(),
                    correlation_id = ?request.context().correlation_id(),
                    error = %err,
                    "request failed"
                );
            } else {
                debug!(channel = %request.channel(), error = %err, "request rejected");
            }
            return Dispatched {
                response: err.to_api_response(),
                outcome: DispatchOutcome::Finalized,
            };
        }
    };

    if let Some(short) = chain.after(request, &response) {
        debug!(
            channel = %request.channel(),
            interceptor = %short.interceptor,
            replaced = %response.status(),
            status = %short.response.status(),
            "response replaced after handler"
        );
        return Dispatched {
            response: short.response,
            outcome: DispatchOutcome::FinalizedViaShortCircuit {
                interceptor: short.interceptor,
                stage: SignalStage::After,
            },
        };
    }

    trace!(channel = %request.channel(), status = %response.status(), "finalized");
    Dispatched {
        response,
        outcome: DispatchOutcome::Finalized,
    }
}
