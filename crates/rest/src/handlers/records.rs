//! Record handlers.
//!
//! Every handler resolves the entity kind and the request channel, wraps the
//! record unit for that kind in [`Scoped`](crate::enforcement::Scoped) and
//! runs the operation through [`dispatch`].
//!
//! | Operation | HTTP Method | URL Pattern |
//! |-----------|-------------|-------------|
//! | list | GET | `/api/{kind}?field=value&_count=&_offset=` |
//! | create | POST | `/api/{kind}` |
//! | retrieve | GET | `/api/{kind}/{id}` |
//! | update | PATCH | `/api/{kind}/{id}` |
//! | delete | DELETE | `/api/{kind}/{id}` |

use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    response::{IntoResponse, Response},
};
use beacon_persistence::core::{ChannelStorage, RecordStorage};
use beacon_persistence::entity::{EntityKind, RecordId};
use serde_json::Value;
use tracing::debug;

use crate::enforcement::{Operation, RequestInfo, dispatch, perform};
use crate::error::{RestError, RestResult};
use crate::extractors::{ChannelExtractor, ListParams};
use crate::state::AppState;

/// Handler for listing records visible under the request channel.
pub async fn list_handler<S>(
    State(state): State<AppState<S>>,
    Path(kind): Path<String>,
    channel: ChannelExtractor,
    Query(pairs): Query<Vec<(String, String)>>,
) -> RestResult<Response>
where
    S: RecordStorage + ChannelStorage + 'static,
{
    let params = ListParams::parse(&pairs, state.default_page_size(), state.max_page_size())?;
    run(&state, channel, &kind, Operation::List(params)).await
}

/// Handler for creating a record under the request channel.
///
/// The body is the record's field map. It may not name a channel.
pub async fn create_handler<S>(
    State(state): State<AppState<S>>,
    Path(kind): Path<String>,
    channel: ChannelExtractor,
    body: Result<Json<Value>, JsonRejection>,
) -> RestResult<Response>
where
    S: RecordStorage + ChannelStorage + 'static,
{
    let fields = match json_body(body)? {
        Value::Object(fields) => fields,
        _ => {
            return Err(RestError::BadRequest {
                message: "request body must be a JSON object".to_string(),
            });
        }
    };
    run(&state, channel, &kind, Operation::Create(fields)).await
}

/// Handler for reading one visible record.
pub async fn read_handler<S>(
    State(state): State<AppState<S>>,
    Path((kind, id)): Path<(String, String)>,
    channel: ChannelExtractor,
) -> RestResult<Response>
where
    S: RecordStorage + ChannelStorage + 'static,
{
    let id = parse_id(&kind, &id)?;
    run(&state, channel, &kind, Operation::Retrieve(id)).await
}

/// Handler for merging a JSON merge patch into one visible record.
pub async fn patch_handler<S>(
    State(state): State<AppState<S>>,
    Path((kind, id)): Path<(String, String)>,
    channel: ChannelExtractor,
    body: Result<Json<Value>, JsonRejection>,
) -> RestResult<Response>
where
    S: RecordStorage + ChannelStorage + 'static,
{
    let id = parse_id(&kind, &id)?;
    let patch = json_body(body)?;
    run(&state, channel, &kind, Operation::Update(id, patch)).await
}

/// Handler for deleting one visible record.
pub async fn delete_handler<S>(
    State(state): State<AppState<S>>,
    Path((kind, id)): Path<(String, String)>,
    channel: ChannelExtractor,
) -> RestResult<Response>
where
    S: RecordStorage + ChannelStorage + 'static,
{
    let id = parse_id(&kind, &id)?;
    run(&state, channel, &kind, Operation::Delete(id)).await
}

async fn run<S>(
    state: &AppState<S>,
    channel: ChannelExtractor,
    kind: &str,
    operation: Operation,
) -> RestResult<Response>
where
    S: RecordStorage + ChannelStorage + 'static,
{
    let kind: EntityKind = kind.parse()?;
    state.registry().require_channel(channel.slug()).await?;

    let mut request = RequestInfo::new(channel.context().clone(), operation.method(), kind);
    if let Some(id) = operation.id() {
        request = request.with_id(id);
    }
    debug!(
        channel = %channel,
        kind = %kind,
        method = %request.method(),
        id = ?request.id(),
        correlation_id = ?channel.context().correlation_id(),
        "Processing record request"
    );

    let unit = state.scoped_unit(kind, channel.slug().clone());
    let dispatched = dispatch(state.interceptors(), &request, || {
        perform(&unit, channel.slug(), operation)
    })
    .await;
    debug!(outcome = ?dispatched.outcome, status = %dispatched.response.status(), "Request finalized");

    Ok(dispatched.into_response())
}

fn parse_id(kind: &str, id: &str) -> RestResult<RecordId> {
    id.parse().map_err(|_| RestError::NotFound {
        kind: kind.to_string(),
        id: id.to_string(),
    })
}

fn json_body(body: Result<Json<Value>, JsonRejection>) -> RestResult<Value> {
    body.map(|Json(value)| value)
        .map_err(|rejection| RestError::BadRequest {
            message: rejection.body_text(),
        })
}
