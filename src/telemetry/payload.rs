//! UBT telemetry payload.
//!
//! Describes a browsing session of a few minutes that ends at the send
//! timestamp: page view, paint metrics, resource timings, the API calls the
//! list page made so far and the opening of the search stream.

use serde::ser::SerializeTuple;
use serde::{Serialize, Serializer};
use serde_json::{json, Value};

use super::codec::encode_str;
use crate::config::{
    CAPTAIN_APP_ID, PATH_APP_CONFIG, PATH_HEADER_INFO, PATH_ROUTE_INFO, PATH_SAVE_LOG,
    PATH_SEARCH_SSE,
};
use crate::entropy::Entropy;
use crate::parse::TripType;
use crate::payload::PayloadContext;

/// Shortest simulated session before the beacon is sent
const SESSION_SPAN_MIN_MS: u64 = 120_000;
/// Longest simulated session before the beacon is sent
const SESSION_SPAN_MAX_MS: u64 = 300_000;

/// Static assets whose timings the page reports.
const RESOURCE_SAMPLES: &[(&str, &str)] = &[
    ("https://static.tripcdn.com/packages/flight/online-list/index.js", "script"),
    ("https://static.tripcdn.com/packages/flight/online-list/vendor.js", "script"),
    ("https://static.tripcdn.com/packages/flight/online-list/index.css", "link"),
    ("https://static.tripcdn.com/packages/ibu/ibu-header/header.js", "script"),
    ("https://static.tripcdn.com/packages/ibu/ibu-footer/footer.js", "script"),
    ("https://static.tripcdn.com/packages/ubt/ubt-web-core/ubt.min.js", "script"),
    ("https://static.tripcdn.com/packages/rp/sdk/rp.js", "script"),
    ("https://static.tripcdn.com/fonts/tripgeom/TripGeom-Regular.woff2", "css"),
    ("https://static.tripcdn.com/fonts/tripgeom/TripGeom-Medium.woff2", "css"),
    ("https://ak-d.tripcdn.com/images/airline/logo/GA.png", "img"),
    ("https://ak-d.tripcdn.com/images/airline/logo/SQ.png", "img"),
    ("https://ak-d.tripcdn.com/images/airline/logo/QZ.png", "img"),
    ("https://ak-d.tripcdn.com/images/airline/logo/TR.png", "img"),
    ("https://static.tripcdn.com/packages/flight/online-list/chunk-filter.js", "script"),
];

/// Paint/navigation metrics: name and value range in milliseconds.
const PAGE_METRICS: &[(&str, u64, u64)] = &[
    ("TTFB", 80, 400),
    ("FP", 400, 1_200),
    ("FCP", 450, 1_300),
    ("DCL", 900, 2_000),
    ("LCP", 1_200, 3_500),
    ("load", 1_500, 4_000),
];

/// One `[sequence, timestampMs, kind, tag|null, body]` entry.
#[derive(Debug, Clone, PartialEq)]
pub struct UbtEvent {
    pub seq: u32,
    pub ts: i64,
    pub kind: &'static str,
    pub tag: Option<String>,
    pub body: Value,
}

impl Serialize for UbtEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(5)?;
        tuple.serialize_element(&self.seq)?;
        tuple.serialize_element(&self.ts)?;
        tuple.serialize_element(self.kind)?;
        tuple.serialize_element(&self.tag)?;
        tuple.serialize_element(&self.body)?;
        tuple.end()
    }
}

/// Analytics batch posted to the collector.
#[derive(Debug, Clone, Serialize)]
pub struct TelemetryPayload {
    pub context: Vec<Value>,
    pub business: Vec<Value>,
    pub user: Vec<Value>,
    #[serde(rename = "ubtList")]
    pub ubt_list: Vec<UbtEvent>,
    #[serde(rename = "sendTs")]
    pub send_ts: i64,
}

/// Everything the beacon describes besides the session.
#[derive(Debug, Clone, Copy)]
pub struct TelemetryInput<'a> {
    /// The list page URL
    pub url: &'a str,
    /// A/B string in `M:{n},{code}:{version};` form
    pub ab_testing: &'a str,
    pub send_ts: i64,
}

/// Builds the telemetry payload.
pub fn build_telemetry_payload(
    ctx: &PayloadContext<'_>,
    input: &TelemetryInput<'_>,
    entropy: &mut Entropy,
) -> TelemetryPayload {
    let span = entropy.between(SESSION_SPAN_MIN_MS, SESSION_SPAN_MAX_MS) as i64;
    let enter_ts = input.send_ts - span;

    let entries = event_entries(ctx, input, entropy);
    let ubt_list = schedule(entries, enter_ts, input.send_ts, entropy);

    TelemetryPayload {
        context: context_array(ctx, input, entropy),
        business: business_array(ctx, input, enter_ts, entropy),
        user: vec![
            Value::Null,
            Value::from(input.ab_testing),
            Value::Null,
            Value::from(""),
        ],
        ubt_list,
        send_ts: input.send_ts,
    }
}

/// Fixed-position environment facts.
fn context_array(
    ctx: &PayloadContext<'_>,
    input: &TelemetryInput<'_>,
    entropy: &mut Entropy,
) -> Vec<Value> {
    let session = ctx.session;
    let instance = format!(
        "{CAPTAIN_APP_ID}-{}-{}-{}",
        &entropy.uuid_simple()[..8],
        entropy.digits(6),
        entropy.digits(6)
    );
    let fef = json!({
        "fef_name": "",
        "fef_ver": "",
        "rg": "",
        "lang": ctx.params.locale,
        "lizard": "",
    })
    .to_string();
    let captain_app_id: u64 = CAPTAIN_APP_ID.parse().unwrap_or_default();

    vec![
        json!(session.page_id),
        json!(session.visitor_id),
        json!(1),
        json!(6),
        json!("1.3.78/new/t"),
        json!(captain_app_id),
        Value::Null,
        Value::Null,
        json!("online"),
        json!(session.client_id),
        json!(input.url),
        json!(session.page_id),
        json!(5),
        json!(1),
        json!(1536),
        json!(864),
        json!(1261),
        json!(27),
        json!(47),
        json!("en-us"),
        json!(""),
        json!(""),
        json!(r#"{"version":"","net":"None","platform":""}"#),
        json!(1.25),
        json!(fef),
        json!("SGP-ALI"),
        json!(instance),
        Value::Null,
        Value::Null,
        json!(""),
        json!(true),
        json!(false),
        Value::Null,
        Value::Null,
    ]
}

/// Ten empty slots, then the business object.
fn business_array(
    ctx: &PayloadContext<'_>,
    input: &TelemetryInput<'_>,
    enter_ts: i64,
    entropy: &mut Entropy,
) -> Vec<Value> {
    let params = ctx.params;
    let site = params
        .locale
        .split_once('-')
        .map(|(_, site)| site.to_string())
        .unwrap_or_else(|| "ID".to_string());
    let flight_type = match params.effective_trip_type() {
        TripType::OneWay => "OW",
        TripType::RoundTrip => "D",
        TripType::MultiCity => "M",
    };
    let segments: Vec<Value> = params
        .legs()
        .iter()
        .map(|leg| {
            let port = |airport: &str, city: &str| {
                if airport.is_empty() { city.to_string() } else { airport.to_string() }
            };
            json!({
                "segmentno": leg.number,
                "segments": [{
                    "sequence": 1,
                    "dport": port(&leg.depart_airport, &leg.depart_city),
                    "aport": port(&leg.arrive_airport, &leg.arrive_city),
                    "takeofftime": leg.depart_date,
                }],
            })
        })
        .collect();
    let reqid = format!(
        "{}{}{}",
        input.send_ts,
        entropy.digits(4),
        entropy.alphanumeric(2).to_ascii_lowercase()
    );

    let business = json!({
        "enterTs": enter_ts,
        "instKey": entropy.alphanumeric(6),
        "npmVersion": "1.6.5",
        "npmEnterTs": enter_ts - 123,
        "init_cki": encode_str(&format!("GUID={}", ctx.session.client_id)),
        "bizTokens": [],
        "eid": null,
        "framework": "web-core",
        "tcpSend": false,
        "isSupportWasm": true,
        "isOverseas": "true",
        "tld": "trip.com",
        "captainAppId": CAPTAIN_APP_ID,
        "lsSize": 17999,
        "ubt_language": params.language(),
        "ubt_currency": params.currency,
        "ubt_site": site,
        "ubt_locale": params.locale,
        "wcVersion": "2.0.91",
        "flighttype": flight_type,
        "flightinformation": {
            "segmentinfo": segments,
            "airlineclass": params.cabin.letter(),
            "adult": params.adults,
            "child": params.children,
            "infant": params.infants,
        },
        "_ubt_user_data_length": 304,
        "ubt_reqid": reqid,
    });

    let mut business_array = vec![Value::Null; 10];
    business_array.push(business);
    business_array
}

/// Unscheduled event: kind, tag, body.
type Entry = (&'static str, Option<String>, Value);

fn city_fact(ctx: &PayloadContext<'_>, code: &str) -> Value {
    match ctx.session.cities.get(code) {
        Some(city) => json!({"code": code, "id": city.id, "name": city.name}),
        None => json!({"code": code}),
    }
}

fn event_entries(
    ctx: &PayloadContext<'_>,
    input: &TelemetryInput<'_>,
    entropy: &mut Entropy,
) -> Vec<Entry> {
    let mut entries: Vec<Entry> = Vec::with_capacity(40);

    entries.push((
        "pv",
        None,
        json!({
            "pageId": ctx.session.page_id,
            "url": input.url,
            "departCity": city_fact(ctx, &ctx.params.departure_city),
            "arriveCity": city_fact(ctx, &ctx.params.arrival_city),
        }),
    ));

    for &(name, low, high) in PAGE_METRICS {
        entries.push((
            "metric",
            Some(name.to_string()),
            json!({"name": name, "value": entropy.between(low, high)}),
        ));
    }

    let samples = entropy.between(8, RESOURCE_SAMPLES.len() as u64) as usize;
    for &(name, initiator) in RESOURCE_SAMPLES.iter().take(samples) {
        entries.push((
            "metric",
            Some("resource".to_string()),
            json!({
                "name": name,
                "initiatorType": initiator,
                "duration": entropy.between(20, 900),
                "transferSize": entropy.between(1_200, 350_000),
                "protocol": "h2",
            }),
        ));
    }

    for path in [
        PATH_APP_CONFIG,
        PATH_HEADER_INFO,
        PATH_SAVE_LOG,
        PATH_ROUTE_INFO,
        PATH_ROUTE_INFO,
    ] {
        entries.push((
            "trace",
            Some("ajax_send".to_string()),
            json!({"url": path, "method": "POST"}),
        ));
        entries.push((
            "trace",
            Some("ajax_done".to_string()),
            json!({"url": path, "status": 200, "duration": entropy.between(60, 700)}),
        ));
    }

    entries.push((
        "exposure",
        Some("filter_bar".to_string()),
        json!({"visible": true, "position": entropy.between(120, 320)}),
    ));
    entries.push((
        "action",
        Some("scroll".to_string()),
        json!({"depth": entropy.between(200, 1_400)}),
    ));
    entries.push((
        "trace",
        Some("sse_request".to_string()),
        json!({"url": PATH_SEARCH_SSE, "method": "POST", "batchId": ctx.batch.batch_id}),
    ));
    entries.push((
        "trace",
        Some("sse_open".to_string()),
        json!({"url": PATH_SEARCH_SSE, "batchId": ctx.batch.batch_id}),
    ));

    entries
}

/// Numbers entries from 1 and spreads them over `[start, send_ts)`.
///
/// Entry `i` lands in the first half of the `i`-th equal slice, so timestamps
/// strictly increase and all stay below `send_ts`.
fn schedule(entries: Vec<Entry>, start: i64, send_ts: i64, entropy: &mut Entropy) -> Vec<UbtEvent> {
    let count = entries.len().max(1) as i64;
    let slice = ((send_ts - start) / count).max(2);
    entries
        .into_iter()
        .enumerate()
        .map(|(i, (kind, tag, body))| {
            let jitter = entropy.between(0, (slice / 2 - 1).max(0) as u64) as i64;
            UbtEvent {
                seq: i as u32 + 1,
                ts: (start + slice * i as i64 + jitter).min(send_ts),
                kind,
                tag,
                body,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::entropy::FixedClock;
    use crate::parse::CityInfo;
    use crate::payload::fixtures::{batch, parsed, session, ROUND_TRIP_URL};

    const SEND_TS: i64 = 1_767_225_600_000;

    fn entropy(seed: u64) -> Entropy {
        Entropy::seeded(seed, Arc::new(FixedClock::at_millis(SEND_TS)))
    }

    fn build(seed: u64) -> TelemetryPayload {
        let parsed = parsed(ROUND_TRIP_URL);
        let mut session = session(&parsed);
        session.cities.insert(
            "JKT".to_string(),
            CityInfo {
                id: "524".to_string(),
                name: "Jakarta".to_string(),
            },
        );
        let batch = batch();
        let ctx = PayloadContext {
            params: &parsed.params,
            session: &session,
            batch: &batch,
        };
        let input = TelemetryInput {
            url: ROUND_TRIP_URL,
            ab_testing: "M:1,250811_IBU_wjrankol:A;",
            send_ts: SEND_TS,
        };
        build_telemetry_payload(&ctx, &input, &mut entropy(seed))
    }

    #[test]
    fn test_event_sequence_and_timestamps() {
        for seed in 0..20 {
            let payload = build(seed);
            let events = &payload.ubt_list;
            assert!((25..=40).contains(&events.len()), "{} events", events.len());
            assert_eq!(events[0].seq, 1);
            assert_eq!(events[0].kind, "pv");
            for pair in events.windows(2) {
                assert!(pair[1].seq > pair[0].seq);
                assert!(pair[1].ts > pair[0].ts);
            }
            assert!(events.iter().all(|e| e.ts <= payload.send_ts));
            let first = events[0].ts;
            assert!(payload.send_ts - first >= 60_000, "session too short");
        }
    }

    #[test]
    fn test_fixed_shapes() {
        let payload = build(1);
        assert_eq!(payload.context.len(), 34);
        assert_eq!(payload.context[0], "10320667452");
        assert_eq!(payload.context[9], "09031234567890");
        assert_eq!(payload.business.len(), 11);
        assert!(payload.business[..10].iter().all(Value::is_null));
        let business = &payload.business[10];
        assert_eq!(business["flighttype"], "D");
        assert_eq!(business["ubt_site"], "ID");
        assert_eq!(business["flightinformation"]["segmentinfo"][1]["segments"][0]["dport"], "SIN");
        assert_eq!(business["init_cki"], encode_str("GUID=09031234567890"));
        assert_eq!(payload.user[1], "M:1,250811_IBU_wjrankol:A;");
    }

    #[test]
    fn test_event_tuple_serialization() {
        let payload = build(2);
        let json = serde_json::to_value(&payload).expect("serializable");
        let first = &json["ubtList"][0];
        assert_eq!(first[0], 1);
        assert_eq!(first[2], "pv");
        assert_eq!(first[3], Value::Null);
        assert_eq!(first[4]["departCity"]["name"], "Jakarta");
        assert_eq!(first[4]["arriveCity"], json!({"code": "SIN"}));
        assert_eq!(json["sendTs"], SEND_TS);
        let keys: Vec<&String> = json.as_object().expect("object").keys().collect();
        assert_eq!(keys, vec!["context", "business", "user", "ubtList", "sendTs"]);
    }

    #[test]
    fn test_batch_id_is_shared_with_stream_events() {
        let payload = build(3);
        let sse = payload
            .ubt_list
            .iter()
            .find(|e| e.tag.as_deref() == Some("sse_open"))
            .expect("sse event");
        assert_eq!(sse.body["batchId"], batch().batch_id);
    }

    #[test]
    fn test_same_seed_same_payload() {
        let a = serde_json::to_string(&build(9)).expect("serializable");
        let b = serde_json::to_string(&build(9)).expect("serializable");
        assert_eq!(a, b);
    }
}
