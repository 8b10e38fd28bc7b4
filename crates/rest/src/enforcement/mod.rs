//! Request enforcement.
//!
//! Every resource request is served by a [`ResourceUnit`] wrapped in
//! [`Scoped`], which narrows both of the unit's query accessors to what the
//! request channel may see, and is run through [`dispatch`], which gives the
//! registered [`Interceptor`]s a chance to replace the response before and
//! after the handler.
//!
//! # Example
//!
//! ```
//! use axum::http::{Method, StatusCode};
//! use beacon_persistence::entity::EntityKind;
//! use beacon_persistence::tenant::{ChannelContext, ChannelSlug};
//! use beacon_rest::enforcement::{
//!     ApiResponse, Interception, Interceptor, InterceptorChain, RequestInfo, dispatch,
//! };
//!
//! #[derive(Debug)]
//! struct ReadOnly;
//!
//! impl Interceptor for ReadOnly {
//!     fn name(&self) -> &str {
//!         "read-only"
//!     }
//!
//!     fn before(&self, request: &RequestInfo) -> Interception {
//!         if *request.method() == Method::GET {
//!             Interception::Continue
//!         } else {
//!             Interception::Override(ApiResponse::new(StatusCode::FORBIDDEN))
//!         }
//!     }
//! }
//!
//! # tokio_test::block_on(async {
//! let chain = InterceptorChain::new().register(ReadOnly);
//! let request = RequestInfo::new(
//!     ChannelContext::new(ChannelSlug::new("partner")),
//!     Method::DELETE,
//!     EntityKind::Project,
//! );
//! let dispatched = dispatch(&chain, &request, || async { Ok(ApiResponse::no_content()) }).await;
//! assert_eq!(dispatched.response.status(), StatusCode::FORBIDDEN);
//! assert!(dispatched.outcome.is_short_circuit());
//! # });
//! ```

mod dispatch;
mod interceptor;
mod response;
mod unit;

pub use dispatch::{DispatchOutcome, Dispatched, SignalStage, dispatch};
pub use interceptor::{
    ForChannel, Interception, Interceptor, InterceptorChain, RequestInfo, ShortCircuit,
};
pub use response::ApiResponse;
pub use unit::{Operation, RecordUnit, ResourceUnit, Scoped, perform};
