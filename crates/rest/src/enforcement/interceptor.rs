//! Before/after request extension points.
//!
//! Interceptors are consulted synchronously, in registration order, once
//! before the handler runs and once after it produced a response. The first
//! interceptor that returns [`Interception::Override`] wins: its response is
//! returned to the client and no further interceptor (nor, for the before
//! stage, the handler) runs.

use std::fmt::Debug;
use std::sync::Arc;

use axum::http::Method;
use beacon_persistence::entity::{EntityKind, RecordId};
use beacon_persistence::tenant::{ChannelContext, ChannelSlug};
use tracing::debug;

use super::ApiResponse;

/// What an interceptor wants to happen next.
#[derive(Debug, Clone, PartialEq)]
pub enum Interception {
    /// Carry on with normal handling.
    Continue,
    /// Stop and return this response instead.
    Override(ApiResponse),
}

/// The request as seen by interceptors.
#[derive(Debug, Clone)]
pub struct RequestInfo {
    context: ChannelContext,
    method: Method,
    kind: EntityKind,
    id: Option<RecordId>,
}

impl RequestInfo {
    /// Describes a request against `kind` records.
    pub fn new(context: ChannelContext, method: Method, kind: EntityKind) -> Self {
        Self {
            context,
            method,
            kind,
            id: None,
        }
    }

    /// Sets the addressed record.
    pub fn with_id(mut self, id: RecordId) -> Self {
        self.id = Some(id);
        self
    }

    /// Returns the resolved channel context.
    pub fn context(&self) -> &ChannelContext {
        &self.context
    }

    /// Returns the request channel.
    pub fn channel(&self) -> &ChannelSlug {
        self.context.channel()
    }

    /// Returns the HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the entity kind.
    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Returns the addressed record, for instance-level requests.
    pub fn id(&self) -> Option<RecordId> {
        self.id
    }
}

/// A request lifecycle extension.
///
/// Both hooks default to [`Interception::Continue`].
pub trait Interceptor: Send + Sync + Debug {
    /// A name for logs.
    fn name(&self) -> &str;

    /// Called before the handler runs.
    fn before(&self, _request: &RequestInfo) -> Interception {
        Interception::Continue
    }

    /// Called after the handler produced `response`.
    fn after(&self, _request: &RequestInfo, _response: &ApiResponse) -> Interception {
        Interception::Continue
    }
}

/// Restricts an interceptor to requests issued under one channel.
#[derive(Debug)]
pub struct ForChannel<I> {
    channel: ChannelSlug,
    inner: I,
}

impl<I: Interceptor> ForChannel<I> {
    /// Wraps `inner` so it only sees requests under `channel`.
    pub fn new(channel: ChannelSlug, inner: I) -> Self {
        Self { channel, inner }
    }
}

impl<I: Interceptor> Interceptor for ForChannel<I> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn before(&self, request: &RequestInfo) -> Interception {
        if request.channel() == &self.channel {
            self.inner.before(request)
        } else {
            Interception::Continue
        }
    }

    fn after(&self, request: &RequestInfo, response: &ApiResponse) -> Interception {
        if request.channel() == &self.channel {
            self.inner.after(request, response)
        } else {
            Interception::Continue
        }
    }
}

/// A response supplied by an interceptor.
#[derive(Debug, Clone, PartialEq)]
pub struct ShortCircuit {
    /// Name of the interceptor that supplied the response.
    pub interceptor: String,
    /// The substitute response.
    pub response: ApiResponse,
}

/// Interceptors in registration order.
#[derive(Debug, Clone, Default)]
pub struct InterceptorChain {
    interceptors: Vec<Arc<dyn Interceptor>>,
}

impl InterceptorChain {
    /// Creates an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an interceptor.
    pub fn register<I: Interceptor + 'static>(self, interceptor: I) -> Self {
        self.register_arc(Arc::new(interceptor))
    }

    /// Appends a shared interceptor.
    pub fn register_arc(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        debug!(
            interceptor = interceptor.name(),
            position = self.interceptors.len(),
            "interceptor registered"
        );
        self.interceptors.push(interceptor);
        self
    }

    /// Returns the number of interceptors.
    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    /// Returns `true` if no interceptor is registered.
    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    /// Runs the before hooks until one overrides.
    pub fn before(&self, request: &RequestInfo) -> Option<ShortCircuit> {
        self.first_override(|interceptor| interceptor.before(request))
    }

    /// Runs the after hooks until one overrides.
    pub fn after(&self, request: &RequestInfo, response: &ApiResponse) -> Option<ShortCircuit> {
        self.first_override(|interceptor| interceptor.after(request, response))
    }

    fn first_override<F>(&self, mut hook: F) -> Option<ShortCircuit>
    where
        F: FnMut(&dyn Interceptor) -> Interception,
    {
        self.interceptors
            .iter()
            .find_map(|interceptor| match hook(interceptor.as_ref()) {
                Interception::Continue => None,
                Interception::Override(response) => Some(ShortCircuit {
                    interceptor: interceptor.name().to_string(),
                    response,
                }),
            })
    }
}
