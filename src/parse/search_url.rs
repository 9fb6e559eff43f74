//! Search URL parsing.
//!
//! Turns a list-page URL such as
//! `https://id.trip.com/flights/showfarefirst?dcity=jkt&acity=sin&ddate=2026-02-01&triptype=rt`
//! into typed search parameters plus the host facts every later step needs.

use std::collections::HashMap;

use log::debug;
use serde::Serialize;
use url::{Host, Url};

use crate::error_handling::ScrapeError;

/// Maximum URL length accepted, matching common browser and server limits.
const MAX_URL_LENGTH: usize = 2048;

/// Path of the flight list page.
const LIST_PAGE_PATH: &str = "/flights/showfarefirst";

/// Locale for hosts without a region label.
const DEFAULT_LOCALE: &str = "en-US";

/// Journey shape requested by the URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TripType {
    OneWay,
    RoundTrip,
    /// Multi-city; searched as its first leg only.
    MultiCity,
}

impl TripType {
    fn from_query(value: &str) -> Self {
        match value.to_ascii_uppercase().as_str() {
            "OW" => TripType::OneWay,
            "MT" => TripType::MultiCity,
            _ => TripType::RoundTrip,
        }
    }

    /// Numeric code of `searchCriteria.tripType`.
    pub fn code(self) -> u8 {
        match self {
            TripType::OneWay => 1,
            TripType::RoundTrip => 2,
            TripType::MultiCity => 3,
        }
    }

    /// String code used by the w-payload and route-info shapes.
    pub fn short_code(self) -> &'static str {
        match self {
            TripType::OneWay => "OW",
            TripType::RoundTrip => "RT",
            TripType::MultiCity => "MT",
        }
    }
}

/// Cabin requested by the URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CabinClass {
    Economy,
    Business,
    First,
}

impl CabinClass {
    fn from_query(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "c" => CabinClass::Business,
            "f" => CabinClass::First,
            _ => CabinClass::Economy,
        }
    }

    /// Numeric code of `searchCriteria.realGrade`.
    pub fn grade_code(self) -> u8 {
        match self {
            CabinClass::Economy => 1,
            CabinClass::Business => 4,
            CabinClass::First => 8,
        }
    }

    /// Single-letter code telemetry reports.
    pub fn letter(self) -> &'static str {
        match self {
            CabinClass::Economy => "Y",
            CabinClass::Business => "C",
            CabinClass::First => "F",
        }
    }

    /// Name used by the w-payload shape.
    pub fn name(self) -> &'static str {
        match self {
            CabinClass::Economy => "Economy",
            CabinClass::Business => "Business",
            CabinClass::First => "First",
        }
    }
}

/// Typed search parameters.
///
/// City and airport codes are stored uppercase. A round trip without a return
/// date is searched as one leg.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlightSearchParams {
    pub departure_city: String,
    pub arrival_city: String,
    pub departure_airport: Option<String>,
    pub arrival_airport: Option<String>,
    pub departure_date: String,
    pub return_date: Option<String>,
    pub trip_type: TripType,
    pub cabin: CabinClass,
    pub adults: u32,
    pub children: u32,
    pub infants: u32,
    pub locale: String,
    pub currency: String,
    pub low_price_source: String,
    pub page_source: String,
}

/// One journey leg as the payloads spell it.
///
/// When an airport code is present the matching city code is blank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Leg {
    pub number: u8,
    pub depart_date: String,
    pub depart_city: String,
    pub arrive_city: String,
    pub depart_airport: String,
    pub arrive_airport: String,
}

impl FlightSearchParams {
    /// True when a second, reversed leg is searched.
    pub fn has_return_leg(&self) -> bool {
        self.trip_type == TripType::RoundTrip && self.return_date.is_some()
    }

    /// Trip type actually searched: a round trip without a return date is one-way.
    pub fn effective_trip_type(&self) -> TripType {
        match self.trip_type {
            TripType::RoundTrip if !self.has_return_leg() => TripType::OneWay,
            other => other,
        }
    }

    /// Language part of the locale (`en` of `en-ID`).
    pub fn language(&self) -> &str {
        self.locale.split('-').next().unwrap_or(&self.locale)
    }

    /// Journey legs, outbound first.
    pub fn legs(&self) -> Vec<Leg> {
        let city_unless = |city: &str, airport: &Option<String>| {
            if airport.is_some() {
                String::new()
            } else {
                city.to_string()
            }
        };
        let airport = |airport: &Option<String>| airport.clone().unwrap_or_default();

        let mut legs = vec![Leg {
            number: 1,
            depart_date: self.departure_date.clone(),
            depart_city: city_unless(&self.departure_city, &self.departure_airport),
            arrive_city: city_unless(&self.arrival_city, &self.arrival_airport),
            depart_airport: airport(&self.departure_airport),
            arrive_airport: airport(&self.arrival_airport),
        }];

        if let (true, Some(return_date)) = (self.has_return_leg(), &self.return_date) {
            legs.push(Leg {
                number: 2,
                depart_date: return_date.clone(),
                depart_city: city_unless(&self.arrival_city, &self.arrival_airport),
                arrive_city: city_unless(&self.departure_city, &self.departure_airport),
                depart_airport: airport(&self.arrival_airport),
                arrive_airport: airport(&self.departure_airport),
            });
        }
        legs
    }
}

/// A parsed search URL. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedUrlData {
    /// The URL exactly as given
    pub url: String,
    /// `scheme://host[:port]` of the URL
    pub origin: String,
    pub hostname: String,
    /// First hostname label, lowercase (`id` of `id.trip.com`); empty for IP
    /// address hosts
    pub region: String,
    pub params: FlightSearchParams,
}

/// Parses a search URL.
///
/// Missing query parameters take the front-end's defaults: locale `en-{REGION}`
/// (`en-US` when the host is an IP address), currency `IDR` for the `id`
/// region and `USD` elsewhere, round trip, economy, one adult.
///
/// # Errors
///
/// Returns `ScrapeError::Validation` if the URL is empty, too long, unparsable,
/// not http(s), or has no host.
pub fn parse_search_url(raw: &str) -> Result<ParsedUrlData, ScrapeError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ScrapeError::Validation("URL is required".to_string()));
    }
    if raw.len() > MAX_URL_LENGTH {
        return Err(ScrapeError::Validation(format!(
            "URL exceeds maximum length ({} > {})",
            raw.len(),
            MAX_URL_LENGTH
        )));
    }

    let url = Url::parse(raw).map_err(|e| ScrapeError::Validation(format!("{raw}: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ScrapeError::Validation(format!(
            "unsupported scheme '{}'",
            url.scheme()
        )));
    }
    let host = url
        .host()
        .ok_or_else(|| ScrapeError::Validation(format!("{raw}: missing host")))?;
    let region = match &host {
        Host::Domain(domain) => domain
            .split('.')
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase(),
        // IP literals carry no regional subdomain
        Host::Ipv4(_) | Host::Ipv6(_) => String::new(),
    };
    let hostname = host.to_string().to_ascii_lowercase();

    // First occurrence wins, as in a browser's URLSearchParams.get
    let mut query: HashMap<String, String> = HashMap::new();
    for (key, value) in url.query_pairs() {
        query.entry(key.into_owned()).or_insert_with(|| value.into_owned());
    }
    let get = |key: &str| query.get(key).map(String::as_str).filter(|v| !v.is_empty());
    let count = |key: &str, default: u32| {
        get(key)
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(default)
    };

    let params = FlightSearchParams {
        departure_city: get("dcity").unwrap_or_default().to_ascii_uppercase(),
        arrival_city: get("acity").unwrap_or_default().to_ascii_uppercase(),
        departure_airport: get("dairport").map(str::to_ascii_uppercase),
        arrival_airport: get("aairport").map(str::to_ascii_uppercase),
        departure_date: get("ddate").unwrap_or_default().to_string(),
        return_date: get("rdate").map(str::to_string),
        trip_type: TripType::from_query(get("triptype").unwrap_or("rt")),
        cabin: CabinClass::from_query(get("class").unwrap_or("y")),
        adults: count("quantity", 1).max(1),
        children: count("childqty", 0),
        infants: count("babyqty", 0),
        locale: get("locale").map(str::to_string).unwrap_or_else(|| {
            if region.is_empty() {
                DEFAULT_LOCALE.to_string()
            } else {
                format!("en-{}", region.to_ascii_uppercase())
            }
        }),
        currency: get("curr")
            .map(str::to_ascii_uppercase)
            .unwrap_or_else(|| if region == "id" { "IDR" } else { "USD" }.to_string()),
        low_price_source: get("lowpricesource").unwrap_or("searchForm").to_string(),
        page_source: get("pagesource").unwrap_or("list").to_string(),
    };

    debug!(
        "Parsed search URL: host={hostname} region={region} {}->{} {:?}",
        params.departure_city, params.arrival_city, params.trip_type
    );

    Ok(ParsedUrlData {
        url: raw.to_string(),
        origin: url.origin().ascii_serialization(),
        hostname,
        region,
        params,
    })
}

/// Builds the list-page URL for `params` on `origin`.
///
/// The inverse of [`parse_search_url`]: parsing the result yields `params`
/// again. Every parameter is written explicitly, so host-derived defaults
/// never apply.
///
/// # Errors
///
/// Returns `ScrapeError::Validation` if `origin` is not an http(s) URL.
pub fn build_search_url(params: &FlightSearchParams, origin: &str) -> Result<String, ScrapeError> {
    let mut url =
        Url::parse(origin).map_err(|e| ScrapeError::Validation(format!("{origin}: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") || url.host().is_none() {
        return Err(ScrapeError::Validation(format!("{origin}: not an http(s) origin")));
    }
    url.set_path(LIST_PAGE_PATH);
    url.set_fragment(None);
    url.set_query(None);

    {
        let mut query = url.query_pairs_mut();
        query
            .append_pair("pagesource", &params.page_source)
            .append_pair("lowpricesource", &params.low_price_source)
            .append_pair("triptype", params.trip_type.short_code())
            .append_pair("class", params.cabin.letter())
            .append_pair("quantity", &params.adults.to_string())
            .append_pair("childqty", &params.children.to_string())
            .append_pair("babyqty", &params.infants.to_string())
            .append_pair("dcity", &params.departure_city.to_ascii_lowercase())
            .append_pair("acity", &params.arrival_city.to_ascii_lowercase())
            .append_pair("ddate", &params.departure_date)
            .append_pair("locale", &params.locale)
            .append_pair("curr", &params.currency);
        if let Some(airport) = &params.departure_airport {
            query.append_pair("dairport", &airport.to_ascii_lowercase());
        }
        if let Some(airport) = &params.arrival_airport {
            query.append_pair("aairport", &airport.to_ascii_lowercase());
        }
        if let Some(return_date) = &params.return_date {
            query.append_pair("rdate", return_date);
        }
    }

    Ok(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROUND_TRIP_URL: &str = "https://id.trip.com/flights/showfarefirst?dcity=jkt&acity=sin&ddate=2026-02-01&rdate=2026-02-03&triptype=rt&class=y&locale=en-ID&curr=IDR";

    #[test]
    fn test_parse_round_trip_example() {
        let parsed = parse_search_url(ROUND_TRIP_URL).expect("valid URL");
        assert_eq!(parsed.hostname, "id.trip.com");
        assert_eq!(parsed.region, "id");
        assert_eq!(parsed.origin, "https://id.trip.com");
        assert_eq!(parsed.params.trip_type, TripType::RoundTrip);
        assert_eq!(parsed.params.cabin, CabinClass::Economy);
        assert_eq!(parsed.params.locale, "en-ID");
        assert_eq!(parsed.params.currency, "IDR");
        assert_eq!(parsed.params.adults, 1);

        let legs = parsed.params.legs();
        assert_eq!(legs.len(), 2);
        assert_eq!(
            (legs[0].depart_city.as_str(), legs[0].arrive_city.as_str()),
            ("JKT", "SIN")
        );
        assert_eq!(legs[0].depart_date, "2026-02-01");
        assert_eq!(
            (legs[1].depart_city.as_str(), legs[1].arrive_city.as_str()),
            ("SIN", "JKT")
        );
        assert_eq!(legs[1].depart_date, "2026-02-03");
    }

    #[test]
    fn test_defaults_follow_region() {
        let parsed = parse_search_url("https://vn.trip.com/flights/showfarefirst?dcity=sgn&acity=han&ddate=2026-03-01")
            .expect("valid URL");
        assert_eq!(parsed.region, "vn");
        assert_eq!(parsed.params.locale, "en-VN");
        assert_eq!(parsed.params.currency, "USD");
        assert_eq!(parsed.params.trip_type, TripType::RoundTrip);
        assert_eq!(parsed.params.cabin, CabinClass::Economy);

        let parsed = parse_search_url("https://id.trip.com/flights?dcity=jkt").expect("valid URL");
        assert_eq!(parsed.params.currency, "IDR");
    }

    #[test]
    fn test_round_trip_without_return_date_is_one_leg() {
        let parsed = parse_search_url(
            "https://id.trip.com/flights/showfarefirst?dcity=jkt&acity=sin&ddate=2026-02-01&triptype=rt",
        )
        .expect("valid URL");
        assert_eq!(parsed.params.legs().len(), 1);
        assert_eq!(parsed.params.effective_trip_type(), TripType::OneWay);
    }

    #[test]
    fn test_one_way_ignores_return_date() {
        let parsed = parse_search_url(
            "https://id.trip.com/flights/showfarefirst?dcity=jkt&acity=sin&ddate=2026-02-01&rdate=2026-02-03&triptype=ow",
        )
        .expect("valid URL");
        assert_eq!(parsed.params.trip_type, TripType::OneWay);
        assert_eq!(parsed.params.legs().len(), 1);
    }

    #[test]
    fn test_airport_suppresses_city_code() {
        let parsed = parse_search_url(
            "https://id.trip.com/flights/showfarefirst?dcity=jkt&acity=sin&dairport=cgk&ddate=2026-02-01&rdate=2026-02-03&triptype=rt",
        )
        .expect("valid URL");
        let legs = parsed.params.legs();
        assert_eq!(legs[0].depart_city, "");
        assert_eq!(legs[0].depart_airport, "CGK");
        assert_eq!(legs[0].arrive_city, "SIN");
        assert_eq!(legs[1].arrive_city, "");
        assert_eq!(legs[1].arrive_airport, "CGK");
        assert_eq!(legs[1].depart_city, "SIN");
    }

    #[test]
    fn test_cabin_and_passenger_codes() {
        let parsed = parse_search_url(
            "https://id.trip.com/flights/showfarefirst?dcity=jkt&acity=sin&ddate=2026-02-01&class=c&quantity=2&childqty=1&babyqty=1",
        )
        .expect("valid URL");
        assert_eq!(parsed.params.cabin, CabinClass::Business);
        assert_eq!(parsed.params.cabin.grade_code(), 4);
        assert_eq!(parsed.params.adults, 2);
        assert_eq!(parsed.params.children, 1);
        assert_eq!(parsed.params.infants, 1);
    }

    #[test]
    fn test_rejects_malformed_urls() {
        for bad in ["", "   ", "not a url", "ftp://id.trip.com/flights", "https://"] {
            let result = parse_search_url(bad);
            assert!(
                matches!(result, Err(ScrapeError::Validation(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_rejects_overlong_url() {
        let url = format!("https://id.trip.com/?q={}", "a".repeat(MAX_URL_LENGTH));
        assert!(matches!(
            parse_search_url(&url),
            Err(ScrapeError::Validation(_))
        ));
    }

    #[test]
    fn test_origin_keeps_port() {
        let parsed = parse_search_url("http://127.0.0.1:8080/flights/showfarefirst?dcity=jkt")
            .expect("valid URL");
        assert_eq!(parsed.origin, "http://127.0.0.1:8080");
        assert_eq!(parsed.hostname, "127.0.0.1");
        assert_eq!(parsed.region, "");
        assert_eq!(parsed.params.locale, "en-US");
        assert_eq!(parsed.params.currency, "USD");
    }

    #[test]
    fn test_ipv6_host_has_no_region() {
        let parsed = parse_search_url("http://[::1]:8080/flights/showfarefirst?dcity=jkt")
            .expect("valid URL");
        assert_eq!(parsed.origin, "http://[::1]:8080");
        assert_eq!(parsed.hostname, "[::1]");
        assert_eq!(parsed.region, "");
        assert_eq!(parsed.params.locale, "en-US");
    }

    #[test]
    fn test_build_search_url_round_trips() {
        for raw in [
            ROUND_TRIP_URL,
            "https://id.trip.com/flights/showfarefirst?dcity=jkt&acity=sin&dairport=cgk&ddate=2026-02-01&triptype=ow&class=c&quantity=2&childqty=1&babyqty=1",
            "https://vn.trip.com/flights/showfarefirst?dcity=sgn&acity=han&ddate=2026-03-01&triptype=mt&lowpricesource=calendar",
        ] {
            let parsed = parse_search_url(raw).expect("valid URL");
            let built = build_search_url(&parsed.params, &parsed.origin).expect("builds");
            let reparsed = parse_search_url(&built).expect("built URL parses");
            assert_eq!(reparsed.params, parsed.params, "{built}");
            assert_eq!(reparsed.origin, parsed.origin);
        }
    }

    #[test]
    fn test_build_search_url_query_shape() {
        let parsed = parse_search_url(ROUND_TRIP_URL).expect("valid URL");
        let built = build_search_url(&parsed.params, "https://id.trip.com/some/page?x=1#top")
            .expect("builds");
        assert_eq!(
            built,
            "https://id.trip.com/flights/showfarefirst?pagesource=list&lowpricesource=searchForm\
             &triptype=RT&class=Y&quantity=1&childqty=0&babyqty=0&dcity=jkt&acity=sin\
             &ddate=2026-02-01&locale=en-ID&curr=IDR&rdate=2026-02-03"
        );
    }

    #[test]
    fn test_build_search_url_rejects_bad_origin() {
        let parsed = parse_search_url(ROUND_TRIP_URL).expect("valid URL");
        for bad in ["", "id.trip.com", "ftp://id.trip.com"] {
            assert!(matches!(
                build_search_url(&parsed.params, bad),
                Err(ScrapeError::Validation(_))
            ));
        }
    }
}
