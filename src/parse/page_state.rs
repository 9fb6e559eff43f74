//! Embedded page state extraction.
//!
//! The list page ships its initial state as JSON inside the HTML, either in a
//! `<script id="__NEXT_DATA__">` tag or assigned to `window.__INITIAL_STATE__`.
//! Only the city lookup is taken from it; telemetry needs city ids and names.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use serde::Serialize;
use serde_json::Value;

const NEXT_DATA_SELECTOR_STR: &str = "script#__NEXT_DATA__";

static NEXT_DATA_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(NEXT_DATA_SELECTOR_STR)
        .unwrap_or_else(|e| panic!("Failed to parse selector '{NEXT_DATA_SELECTOR_STR}': {e}"))
});

static INITIAL_STATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)window\.__INITIAL_STATE__\s*=\s*(\{.*?\})\s*;?\s*</script>")
        .unwrap_or_else(|e| panic!("Failed to compile initial state pattern: {e}"))
});

/// City id and display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CityInfo {
    pub id: String,
    pub name: String,
}

/// City code (uppercase) to id/name.
pub type CityTable = HashMap<String, CityInfo>;

/// Extracts the embedded initial-state JSON from a page, if any.
pub fn extract_initial_state(html: &str) -> Option<Value> {
    let document = Html::parse_document(html);
    if let Some(script) = document.select(&NEXT_DATA_SELECTOR).next() {
        let text: String = script.text().collect();
        if let Ok(value) = serde_json::from_str::<Value>(text.trim()) {
            return Some(value);
        }
    }

    INITIAL_STATE_RE
        .captures(html)
        .and_then(|caps| caps.get(1))
        .and_then(|m| serde_json::from_str::<Value>(m.as_str()).ok())
}

/// Builds the city table from an initial-state blob.
///
/// Per-leg segment info is the primary source; the global city list is used
/// only when no leg carries city facts.
pub fn build_city_table(state: &Value) -> CityTable {
    let mut table = CityTable::new();

    let legs = find_key(state, "segmentInfo").or_else(|| find_key(state, "journeyInfoTypes"));
    if let Some(Value::Array(legs)) = legs {
        for leg in legs {
            for side in ["depart", "arrive"] {
                let code = leg.get(format!("{side}CityCode")).and_then(Value::as_str);
                if let Some(code) = code.filter(|c| !c.is_empty()) {
                    table.insert(
                        code.to_ascii_uppercase(),
                        CityInfo {
                            id: scalar_string(leg.get(format!("{side}CityId"))),
                            name: scalar_string(leg.get(format!("{side}CityName"))),
                        },
                    );
                }
            }
        }
    }

    if table.is_empty() {
        if let Some(Value::Array(cities)) = find_key(state, "cityList") {
            for city in cities {
                if let Some(code) = city.get("code").and_then(Value::as_str) {
                    table.insert(
                        code.to_ascii_uppercase(),
                        CityInfo {
                            id: scalar_string(city.get("id")),
                            name: scalar_string(city.get("name")),
                        },
                    );
                }
            }
        }
    }

    table
}

/// Depth-first search for the first value stored under `key`.
fn find_key<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => map
            .get(key)
            .or_else(|| map.values().find_map(|v| find_key(v, key))),
        Value::Array(items) => items.iter().find_map(|v| find_key(v, key)),
        _ => None,
    }
}

fn scalar_string(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_next_data_script() {
        let html = r#"<html><head></head><body>
            <script id="__NEXT_DATA__" type="application/json">{"props":{"pageProps":{"x":1}}}</script>
            </body></html>"#;
        let state = extract_initial_state(html).expect("state present");
        assert_eq!(state["props"]["pageProps"]["x"], 1);
    }

    #[test]
    fn test_extract_window_initial_state() {
        let html = r#"<html><body><script>window.__INITIAL_STATE__ = {"a":{"b":"c"}};</script></body></html>"#;
        let state = extract_initial_state(html).expect("state present");
        assert_eq!(state["a"]["b"], "c");
    }

    #[test]
    fn test_extract_missing_state() {
        assert!(extract_initial_state("<html><body>nothing</body></html>").is_none());
    }

    #[test]
    fn test_city_table_prefers_segment_info() {
        let state = json!({
            "search": {
                "segmentInfo": [
                    {"departCityCode": "jkt", "departCityId": 524, "departCityName": "Jakarta",
                     "arriveCityCode": "SIN", "arriveCityId": "73", "arriveCityName": "Singapore"}
                ]
            },
            "cityList": [{"code": "BKK", "id": 359, "name": "Bangkok"}]
        });
        let table = build_city_table(&state);
        assert_eq!(table.len(), 2);
        assert_eq!(
            table["JKT"],
            CityInfo {
                id: "524".to_string(),
                name: "Jakarta".to_string()
            }
        );
        assert_eq!(table["SIN"].id, "73");
        assert!(!table.contains_key("BKK"));
    }

    #[test]
    fn test_city_table_falls_back_to_city_list() {
        let state = json!({"meta": {"cityList": [{"code": "bkk", "id": 359, "name": "Bangkok"}]}});
        let table = build_city_table(&state);
        assert_eq!(table["BKK"].name, "Bangkok");
        assert_eq!(table["BKK"].id, "359");
    }

    #[test]
    fn test_city_table_empty_state() {
        assert!(build_city_table(&json!({})).is_empty());
    }
}
