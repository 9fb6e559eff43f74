//! Route-info payload (sent twice: Stage A and Stage B).

use serde::Serialize;

use super::search::RequestHead;
use super::PayloadContext;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteSegment {
    pub segment_no: u8,
    pub d_city_code: String,
    pub a_city_code: String,
    pub d_airport_code: String,
    pub a_airport_code: String,
    pub d_date: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteInfoPayload {
    pub trip_type: String,
    pub segments: Vec<RouteSegment>,
    pub head: RequestHead,
}

/// Builds the route-info body from the current session.
pub fn build_route_info_payload(ctx: &PayloadContext<'_>) -> RouteInfoPayload {
    RouteInfoPayload {
        trip_type: ctx.params.effective_trip_type().short_code().to_string(),
        segments: ctx
            .params
            .legs()
            .into_iter()
            .map(|leg| RouteSegment {
                segment_no: leg.number,
                d_city_code: leg.depart_city,
                a_city_code: leg.arrive_city,
                d_airport_code: leg.depart_airport,
                a_airport_code: leg.arrive_airport,
                d_date: leg.depart_date,
            })
            .collect(),
        head: RequestHead::new(ctx, None),
    }
}
