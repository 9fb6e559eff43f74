//! Input parsing.
//!
//! This module parses the two inputs the front-end starts from:
//! - The search URL (typed search parameters, host and region), and back
//! - The list page's embedded initial state (city lookup)
//!
//! HTML parsing is done using CSS selectors via the `scraper` crate.

mod page_state;
mod search_url;

// Re-export public API
pub use page_state::{build_city_table, extract_initial_state, CityInfo, CityTable};
pub use search_url::{
    build_search_url, parse_search_url, CabinClass, FlightSearchParams, Leg, ParsedUrlData,
    TripType,
};
