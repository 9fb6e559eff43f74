//! Main search payload and the token-oracle variant.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::extension::{full_extensions, token_extensions, Extension};
use super::PayloadContext;
use crate::config::{AB_TEST_ASSIGNMENTS, APP_ID};
use crate::parse::Leg;

/// Result ordering requested by the search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SortSpec {
    pub order_by: String,
    pub ascending: bool,
}

impl Default for SortSpec {
    fn default() -> Self {
        Self {
            order_by: "Direct".to_string(),
            ascending: true,
        }
    }
}

/// Caller-controlled parts of a search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchOptions {
    /// Product id of a previous search, for a refine search
    pub product_id: Option<String>,
    /// Explicit ordering; `None` means the default and an initial search
    pub sort: Option<SortSpec>,
}

impl SearchOptions {
    /// Sort/refine searches use the plain JSON endpoint.
    pub fn is_refine(&self) -> bool {
        self.product_id.is_some() || self.sort.is_some()
    }

    pub fn sort_or_default(&self) -> SortSpec {
        self.sort.clone().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PassengerInfo {
    pub adult_count: u32,
    pub child_count: u32,
    pub infant_count: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JourneyInfo {
    pub journey_no: u8,
    pub depart_date: String,
    pub depart_code: String,
    pub arrive_code: String,
    pub depart_airport: String,
    pub arrive_airport: String,
}

impl From<&Leg> for JourneyInfo {
    fn from(leg: &Leg) -> Self {
        Self {
            journey_no: leg.number,
            depart_date: leg.depart_date.clone(),
            depart_code: leg.depart_city.clone(),
            arrive_code: leg.arrive_city.clone(),
            depart_airport: leg.depart_airport.clone(),
            arrive_airport: leg.arrive_airport.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchCriteria {
    pub grade: u8,
    pub real_grade: u8,
    pub trip_type: u8,
    pub journey_no: u8,
    pub passenger_info_type: PassengerInfo,
    pub journey_info_types: Vec<JourneyInfo>,
    pub policy_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SortInfoType {
    pub direction: bool,
    pub order_by: String,
    pub top_list: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterType {
    pub filter_flag_types: Vec<String>,
    pub query_item_settings: Vec<String>,
    pub students_selected_status: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AbAssignment {
    pub ab_code: String,
    pub ab_version: String,
}

/// `head` block of the search and route-info payloads.
#[derive(Debug, Clone, Serialize)]
pub struct RequestHead {
    pub cid: String,
    pub ctok: String,
    pub cver: String,
    pub lang: String,
    pub sid: String,
    pub syscode: String,
    pub auth: String,
    pub xsid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<Vec<Extension>>,
    #[serde(rename = "Locale")]
    pub locale: String,
    #[serde(rename = "Language")]
    pub language: String,
    #[serde(rename = "Currency")]
    pub currency: String,
    #[serde(rename = "ClientID")]
    pub client_id: String,
    pub appid: String,
}

impl RequestHead {
    pub(crate) fn new(ctx: &PayloadContext<'_>, extension: Option<Vec<Extension>>) -> Self {
        Self {
            cid: ctx.session.client_id.clone(),
            ctok: String::new(),
            cver: "3".to_string(),
            lang: "01".to_string(),
            sid: "8888".to_string(),
            syscode: "40".to_string(),
            auth: String::new(),
            xsid: String::new(),
            extension,
            locale: ctx.params.locale.clone(),
            language: ctx.params.language().to_string(),
            currency: ctx.params.currency.clone(),
            client_id: String::new(),
            appid: APP_ID.to_string(),
        }
    }
}

/// Abbreviated head handed to the token oracle.
#[derive(Debug, Clone, Serialize)]
pub struct TokenHead {
    pub cid: String,
    pub ctok: String,
    pub cver: String,
    pub lang: String,
    pub sid: String,
    pub syscode: String,
    pub auth: String,
    pub xsid: String,
    pub extension: Vec<Extension>,
}

/// Body of the main search call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPayload {
    pub mode: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    pub search_criteria: SearchCriteria,
    pub sort_info_type: SortInfoType,
    pub tag_list: Vec<String>,
    pub flag_list: Vec<String>,
    pub filter_type: FilterType,
    pub abt_list: Vec<AbAssignment>,
    pub head: RequestHead,
}

/// Input of the token oracle: the search payload with an abbreviated head.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPayload {
    pub mode: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    pub search_criteria: SearchCriteria,
    pub sort_info_type: SortInfoType,
    pub tag_list: Vec<String>,
    pub flag_list: Vec<String>,
    pub filter_type: FilterType,
    pub abt_list: Vec<AbAssignment>,
    pub head: TokenHead,
}

fn search_criteria(ctx: &PayloadContext<'_>) -> SearchCriteria {
    let params = ctx.params;
    SearchCriteria {
        grade: 3,
        real_grade: params.cabin.grade_code(),
        trip_type: params.effective_trip_type().code(),
        journey_no: 1,
        passenger_info_type: PassengerInfo {
            adult_count: params.adults,
            child_count: params.children,
            infant_count: params.infants,
        },
        journey_info_types: params.legs().iter().map(JourneyInfo::from).collect(),
        policy_id: None,
    }
}

fn sort_info(options: &SearchOptions) -> SortInfoType {
    let sort = options.sort_or_default();
    SortInfoType {
        direction: sort.ascending,
        order_by: sort.order_by,
        top_list: Vec::new(),
    }
}

fn filter_type() -> FilterType {
    FilterType {
        filter_flag_types: Vec::new(),
        query_item_settings: Vec::new(),
        students_selected_status: true,
    }
}

/// A/B assignments reported with every search.
pub fn ab_assignments() -> Vec<AbAssignment> {
    AB_TEST_ASSIGNMENTS
        .iter()
        .map(|(code, version)| AbAssignment {
            ab_code: code.to_string(),
            ab_version: version.to_string(),
        })
        .collect()
}

/// Builds the main search body.
pub fn build_search_payload(
    ctx: &PayloadContext<'_>,
    options: &SearchOptions,
    client_time: DateTime<Utc>,
) -> SearchPayload {
    SearchPayload {
        mode: 0,
        product_id: options.product_id.clone(),
        search_criteria: search_criteria(ctx),
        sort_info_type: sort_info(options),
        tag_list: Vec::new(),
        flag_list: vec!["NEED_RESET_SORT".to_string()],
        filter_type: filter_type(),
        abt_list: ab_assignments(),
        head: RequestHead::new(ctx, Some(full_extensions(ctx, client_time))),
    }
}

/// Builds the token-oracle input for the same search.
pub fn build_token_payload(ctx: &PayloadContext<'_>, options: &SearchOptions) -> TokenPayload {
    let head = RequestHead::new(ctx, None);
    TokenPayload {
        mode: 0,
        product_id: options.product_id.clone(),
        search_criteria: search_criteria(ctx),
        sort_info_type: sort_info(options),
        tag_list: Vec::new(),
        flag_list: vec!["NEED_RESET_SORT".to_string()],
        filter_type: filter_type(),
        abt_list: ab_assignments(),
        head: TokenHead {
            cid: head.cid,
            ctok: head.ctok,
            cver: head.cver,
            lang: head.lang,
            sid: head.sid,
            syscode: head.syscode,
            auth: head.auth,
            xsid: head.xsid,
            extension: token_extensions(ctx),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::fixtures::{batch, parsed, session, ROUND_TRIP_URL};
    use chrono::TimeZone;
    use serde_json::Value;

    fn client_time() -> DateTime<Utc> {
        Utc.timestamp_millis_opt(1_767_225_600_000)
            .single()
            .expect("valid timestamp")
    }

    fn to_value<T: Serialize>(payload: &T) -> Value {
        serde_json::to_value(payload).expect("serializable")
    }

    #[test]
    fn test_round_trip_search_payload() {
        let parsed = parsed(ROUND_TRIP_URL);
        let session = session(&parsed);
        let batch = batch();
        let ctx = PayloadContext {
            params: &parsed.params,
            session: &session,
            batch: &batch,
        };
        let json = to_value(&build_search_payload(&ctx, &SearchOptions::default(), client_time()));

        let criteria = &json["searchCriteria"];
        assert_eq!(criteria["tripType"], 2);
        assert_eq!(criteria["realGrade"], 1);
        assert_eq!(criteria["policyId"], Value::Null);
        let legs = criteria["journeyInfoTypes"].as_array().expect("legs");
        assert_eq!(legs.len(), 2);
        assert_eq!(legs[0]["departCode"], "JKT");
        assert_eq!(legs[1]["departCode"], "SIN");
        assert_eq!(legs[1]["arriveCode"], "JKT");
        assert_eq!(legs[1]["departDate"], "2026-02-03");

        assert_eq!(json["sortInfoType"]["direction"], true);
        assert_eq!(json["sortInfoType"]["orderBy"], "Direct");
        assert_eq!(json["flagList"][0], "NEED_RESET_SORT");
        assert_eq!(json["abtList"].as_array().map(Vec::len), Some(4));
        assert!(json.get("productId").is_none());

        let head = &json["head"];
        assert_eq!(head["cid"], "09031234567890");
        assert_eq!(head["Language"], "en");
        assert_eq!(head["Currency"], "IDR");
        assert_eq!(head["appid"], "700020");
        let ext = head["extension"].as_array().expect("extensions");
        assert_eq!(ext.len(), 24);
        assert_eq!(ext[7], serde_json::json!({"name": "uuid"}));
        let batch_entry = ext
            .iter()
            .find(|e| e["name"] == "Flt_BatchId")
            .expect("batch id entry");
        assert_eq!(batch_entry["value"], batch.batch_id);
        let time_entry = ext.iter().find(|e| e["name"] == "clientTime").expect("clientTime");
        assert_eq!(time_entry["value"], "2026-01-01T00:00:00.000Z");
    }

    #[test]
    fn test_search_payload_key_order() {
        let parsed = parsed(ROUND_TRIP_URL);
        let session = session(&parsed);
        let batch = batch();
        let ctx = PayloadContext {
            params: &parsed.params,
            session: &session,
            batch: &batch,
        };
        let text = serde_json::to_string(&build_search_payload(
            &ctx,
            &SearchOptions::default(),
            client_time(),
        ))
        .expect("serializable");
        assert!(text.starts_with(r#"{"mode":0,"searchCriteria":{"grade":3,"realGrade":1,"tripType":2,"journeyNo":1,"passengerInfoType":{"adultCount":1,"childCount":0,"infantCount":0},"journeyInfoTypes":[{"journeyNo":1,"departDate":"2026-02-01","departCode":"JKT","arriveCode":"SIN","departAirport":"","arriveAirport":""}"#));
    }

    #[test]
    fn test_one_way_and_airport_suppression() {
        let parsed = parsed(
            "https://www.trip.com/flights/showfarefirst?dcity=jkt&acity=sin&dairport=cgk&ddate=2026-02-01&triptype=ow",
        );
        let session = session(&parsed);
        let batch = batch();
        let ctx = PayloadContext {
            params: &parsed.params,
            session: &session,
            batch: &batch,
        };
        let json = to_value(&build_search_payload(&ctx, &SearchOptions::default(), client_time()));
        let legs = json["searchCriteria"]["journeyInfoTypes"]
            .as_array()
            .expect("legs");
        assert_eq!(legs.len(), 1);
        assert_eq!(legs[0]["departCode"], "");
        assert_eq!(legs[0]["departAirport"], "CGK");
        assert_eq!(legs[0]["arriveCode"], "SIN");
        assert_eq!(json["searchCriteria"]["tripType"], 1);
    }

    #[test]
    fn test_refine_options() {
        let parsed = parsed(ROUND_TRIP_URL);
        let session = session(&parsed);
        let batch = batch();
        let ctx = PayloadContext {
            params: &parsed.params,
            session: &session,
            batch: &batch,
        };
        let options = SearchOptions {
            product_id: Some("pid-1".to_string()),
            sort: Some(SortSpec {
                order_by: "Price".to_string(),
                ascending: false,
            }),
        };
        assert!(options.is_refine());
        assert!(!SearchOptions::default().is_refine());
        let json = to_value(&build_search_payload(&ctx, &options, client_time()));
        assert_eq!(json["productId"], "pid-1");
        assert_eq!(json["sortInfoType"]["orderBy"], "Price");
        assert_eq!(json["sortInfoType"]["direction"], false);
    }

    #[test]
    fn test_token_payload_has_abbreviated_head() {
        let parsed = parsed(ROUND_TRIP_URL);
        let session = session(&parsed);
        let batch = batch();
        let ctx = PayloadContext {
            params: &parsed.params,
            session: &session,
            batch: &batch,
        };
        let json = to_value(&build_token_payload(&ctx, &SearchOptions::default()));
        let head = json["head"].as_object().expect("head");
        assert!(!head.contains_key("Locale"));
        assert!(!head.contains_key("appid"));
        let ext = head["extension"].as_array().expect("extensions");
        assert_eq!(ext.len(), 17);
        assert!(ext.iter().all(|e| e["name"] != "clientTime"));
        assert_eq!(ext.last().map(|e| e["value"].clone()), Some(Value::from(batch.batch_id.clone())));
        assert_eq!(json["searchCriteria"]["journeyInfoTypes"].as_array().map(Vec::len), Some(2));
    }
}
