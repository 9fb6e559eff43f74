//! The w-payload-source variant: hashed, then handed to its oracle.

use md5::{Digest, Md5};
use serde::Serialize;

use super::extension::X_UA;
use super::search::ab_assignments;
use super::PayloadContext;
use crate::entropy::Entropy;

#[derive(Debug, Clone, Serialize)]
pub struct TravelerNum {
    pub adult: u32,
    pub child: u32,
    pub infant: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchInfo {
    pub traveler_num: TravelerNum,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AllianceInfo {
    #[serde(rename = "AllianceID")]
    pub alliance_id: u32,
    #[serde(rename = "SID")]
    pub sid: u32,
    #[serde(rename = "OuID")]
    pub ou_id: String,
    pub use_distribution_type: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtendFields {
    #[serde(rename = "PageId")]
    pub page_id: String,
    #[serde(rename = "Os")]
    pub os: String,
    #[serde(rename = "OsVersion")]
    pub os_version: String,
    #[serde(rename = "SpecialSupply")]
    pub special_supply: String,
    #[serde(rename = "BatchedId")]
    pub batched_id: String,
    pub flightsignature: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct WHead {
    pub ab_testing: String,
    pub locale: String,
    #[serde(rename = "VID")]
    pub vid: String,
    pub alliance_info: AllianceInfo,
    #[serde(rename = "TransactionID")]
    pub transaction_id: String,
    pub extend_fields: ExtendFields,
    #[serde(rename = "ClientID")]
    pub client_id: String,
    pub group: String,
    pub source: String,
    pub currency: String,
    pub version: String,
    pub session_id: String,
    pub pv_id: String,
}

/// Low-price calendar shaped payload the w-payload-source oracle signs.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WPayload {
    #[serde(rename = "dCity")]
    pub d_city: String,
    #[serde(rename = "aCity")]
    pub a_city: String,
    #[serde(rename = "dDate")]
    pub d_date: String,
    pub flight_way_type: String,
    pub departure_airport: String,
    pub arrival_airport: String,
    pub cabin_class: String,
    pub transfer_type: String,
    pub search_info: SearchInfo,
    pub abt_list: Vec<String>,
    pub off_set: u32,
    #[serde(rename = "aDate")]
    pub a_date: String,
    pub start_interval: u32,
    pub end_interval: u32,
    #[serde(rename = "Head")]
    pub head: WHead,
}

impl WPayload {
    /// Lowercase hex MD5 of the compact JSON form.
    pub fn digest(&self) -> Result<String, serde_json::Error> {
        let json = serde_json::to_string(self)?;
        Ok(hex::encode(Md5::digest(json.as_bytes())))
    }
}

/// `M:{weight},{code}:{version};` per assignment, weights drawn in 0..=99.
pub fn ab_testing_string(entropy: &mut Entropy) -> String {
    ab_assignments()
        .iter()
        .map(|ab| {
            format!(
                "M:{},{}:{};",
                entropy.between(0, 99),
                ab.ab_code,
                ab.ab_version
            )
        })
        .collect()
}

/// `os` and `osv` fields of an `x-ua` value.
fn os_from_x_ua(x_ua: &str) -> (String, String) {
    let mut os = String::new();
    let mut version = String::new();
    for part in x_ua.split('_') {
        if let Some(v) = part.strip_prefix("osv=") {
            version = v.to_string();
        } else if let Some(v) = part.strip_prefix("os=") {
            os = v.to_string();
        }
    }
    (os, version)
}

/// Builds the w-payload variant of the current search.
pub fn build_w_payload(ctx: &PayloadContext<'_>, entropy: &mut Entropy) -> WPayload {
    let params = ctx.params;
    let session = ctx.session;
    let legs = params.legs();
    let outbound = &legs[0];
    let (os, os_version) = os_from_x_ua(X_UA);

    WPayload {
        d_city: outbound.depart_city.to_ascii_uppercase(),
        a_city: outbound.arrive_city.to_ascii_uppercase(),
        d_date: outbound.depart_date.clone(),
        flight_way_type: params.effective_trip_type().short_code().to_string(),
        departure_airport: outbound.depart_airport.to_ascii_uppercase(),
        arrival_airport: outbound.arrive_airport.to_ascii_uppercase(),
        cabin_class: params.cabin.name().to_string(),
        transfer_type: "ANY".to_string(),
        search_info: SearchInfo {
            traveler_num: TravelerNum {
                adult: params.adults,
                child: params.children,
                infant: params.infants,
            },
        },
        abt_list: Vec::new(),
        off_set: 30,
        a_date: legs
            .get(1)
            .map(|leg| leg.depart_date.clone())
            .unwrap_or_default(),
        start_interval: 2,
        end_interval: 2,
        head: WHead {
            ab_testing: ab_testing_string(entropy),
            locale: params.locale.clone(),
            vid: session.visitor_id.clone(),
            alliance_info: AllianceInfo {
                alliance_id: 0,
                sid: 0,
                ou_id: String::new(),
                use_distribution_type: 1,
            },
            transaction_id: session.transaction_id.clone(),
            extend_fields: ExtendFields {
                page_id: session.page_id.clone(),
                os,
                os_version,
                special_supply: String::new(),
                batched_id: ctx.batch.batch_id.clone(),
                flightsignature: String::new(),
            },
            client_id: session.client_id.clone(),
            group: "Trip".to_string(),
            source: "ONLINE".to_string(),
            currency: params.currency.clone(),
            version: "3".to_string(),
            session_id: session.context.session_id.clone(),
            pv_id: session.context.pv_id.clone(),
        },
    }
}
