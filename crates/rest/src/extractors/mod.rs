//! Axum extractors and request parameter parsing.
//!
//! - [`ChannelExtractor`] - Resolves the request channel from `X-Channel`
//! - [`ListParams`] - Filters and pagination of list requests

pub mod channel;
pub mod params;

pub use channel::{ChannelExtractor, X_CHANNEL, X_REQUEST_ID};
pub use params::{ListParams, ParamError};
