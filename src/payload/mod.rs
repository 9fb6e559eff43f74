//! Request payload builders.
//!
//! Every JSON body the front-end sends is a typed struct here, built by a pure
//! function of the search parameters, the session state and the batch context.
//! Builders never mutate the session; anything random comes from the `Entropy`
//! they are handed. Field order is part of the wire format, so struct field
//! order is significant.

mod extension;
mod misc;
mod route_info;
mod search;
mod w_payload;

use crate::parse::FlightSearchParams;
use crate::session::{BatchContext, SessionState};

pub use extension::{extension_value, full_extensions, token_extensions, Extension, X_UA};
pub use misc::{
    app_config_payload, fingerprint_payload, header_info_payload, risk_payload, save_log_payload,
};
pub use route_info::{build_route_info_payload, RouteInfoPayload, RouteSegment};
pub use search::{
    build_search_payload, build_token_payload, AbAssignment, JourneyInfo, RequestHead,
    SearchOptions, SearchPayload, SortSpec, TokenPayload,
};
pub use w_payload::{ab_testing_string, build_w_payload, WPayload};

/// Read-only inputs shared by every builder.
#[derive(Debug, Clone, Copy)]
pub struct PayloadContext<'a> {
    pub params: &'a FlightSearchParams,
    pub session: &'a SessionState,
    pub batch: &'a BatchContext,
}
