//! Full scrape over the real `reqwest` transport against a mock server.
//!
//! Every endpoint is served by one `httptest` server (`Endpoints::same_origin`),
//! so the test covers header rendering, cookie propagation, and response
//! decompression end to end without touching the network.

use std::io::Write;

use flate2::write::GzEncoder;
use flate2::Compression;
use httptest::{matchers::*, responders::*, Expectation, Server};

use flight_scout::{
    Config, Endpoints, Entropy, HttpRequest, ReqwestTransport, ScrapeRequest, Scraper, Signers,
    StepName, Transport,
};

const LIST_PAGE: &str = r#"<html><body><script id="__NEXT_DATA__" type="application/json">
{"props":{"segmentInfo":[{"departCityCode":"JKT","departCityId":524,"departCityName":"Jakarta",
"arriveCityCode":"SIN","arriveCityId":73,"arriveCityName":"Singapore"}]}}</script></body></html>"#;

const SEARCH_EVENTS: &str = "event: message\ndata: {\"basicInfo\":{\"recordCount\":25,\"productId\":\"srv-1\"},\"itineraryList\":[]}\n\n";

fn gzip(text: &str) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(text.as_bytes()).expect("write");
    encoder.finish().expect("finish")
}

fn config() -> Config {
    Config {
        endpoints: Endpoints::same_origin(),
        timeout_seconds: 5,
        ..Config::unpaced()
    }
}

fn expect_session(server: &Server) {
    server.expect(
        Expectation::matching(request::method_path("GET", "/")).respond_with(
            status_code(200)
                .append_header("set-cookie", "GUID=09035555555555; Path=/")
                .append_header("x-ctx-country", "ID")
                .body("<html></html>"),
        ),
    );
    server.expect(
        Expectation::matching(all_of![
            request::method_path("POST", "/restapi/soa2/10290/createclientid"),
            request::query(url_decoded(contains(("systemcode", "09")))),
        ])
        .respond_with(json_encoded(serde_json::json!({"ClientID": "09036666666666"}))),
    );
    server.expect(
        Expectation::matching(request::method_path("GET", "/flights/showfarefirst")).respond_with(
            status_code(200)
                .append_header(
                    "set-cookie",
                    "_combined=transactionId%3D1-mf-20260201000000001-WEB%26pageId%3D10320667452; Path=/",
                )
                .body(LIST_PAGE),
        ),
    );
    for path in [
        "/restapi/soa2/18088/getAppConfig.json",
        "/m/home/getHeaderInfo",
        "/restapi/soa2/27015/saveLogInfo",
    ] {
        server.expect(
            Expectation::matching(request::method_path("POST", path))
                .respond_with(status_code(200).body("{}")),
        );
    }
    server.expect(
        Expectation::matching(request::method_path(
            "POST",
            "/restapi/soa2/27015/GetRouteInfo",
        ))
        .times(2)
        .respond_with(status_code(200).body("{}")),
    );
    server.expect(
        Expectation::matching(all_of![
            request::method_path("POST", "/bee/collect"),
            request::body(matches(r#"^\{"d":"f00"#)),
        ])
        .respond_with(status_code(200)),
    );
}

fn search_url(server: &Server) -> String {
    server.url_str("/flights/showfarefirst?dcity=jkt&acity=sin&ddate=2026-02-01&triptype=ow")
}

#[tokio::test]
async fn test_scrape_over_http() {
    let server = Server::run();
    expect_session(&server);
    server.expect(
        Expectation::matching(all_of![
            request::method_path("POST", "/restapi/soa2/27015/FlightListSearchSSE"),
            request::headers(contains(("accept", "text/event-stream"))),
            request::headers(contains(("cookie", matches("GUID=09036666666666")))),
            request::headers(contains(key("x-ctx-wclient-req"))),
            request::body(json_decoded(|body: &serde_json::Value| {
                body["searchCriteria"].is_object()
            })),
        ])
        .respond_with(
            status_code(200)
                .append_header("content-type", "text/event-stream")
                .append_header("content-encoding", "gzip")
                .body(gzip(SEARCH_EVENTS)),
        ),
    );
    server.expect(
        Expectation::matching(request::method_path("POST", "/rp/getRiskFingerprint"))
            .respond_with(status_code(200).body("rguid-1|rf1-1|rsg-1|rdg-1")),
    );
    server.expect(
        Expectation::matching(all_of![
            request::method_path("POST", "/rp/reportRisk"),
            request::headers(contains(("cookie", matches("_RGUID=rguid-1")))),
        ])
        .respond_with(status_code(200).body("{}")),
    );

    let scraper = Scraper::new(config(), Signers::none());
    let response = scraper
        .respond(&ScrapeRequest::new(search_url(&server)), &mut Entropy::from_os())
        .await;

    assert!(response.success, "{}", response.message);
    let result = response.result.expect("result");
    assert_eq!(result.status, 200);
    assert_eq!(result.record_count, Some(25));
    assert_eq!(result.product_id.as_deref(), Some("srv-1"));
    // The mock server is an IP literal (127.0.0.1 or [::1]): no region label
    assert_eq!(result.request.region, "");
    assert_eq!(result.request.transaction_id, "1-mf-20260201000000001-WEB");
    assert_eq!(
        result.cookies.get("GUID").map(String::as_str),
        Some("09036666666666")
    );
    assert!(response.steps.iter().all(|o| o.success), "{:?}", response.steps);
}

#[tokio::test]
async fn test_search_error_status_over_http() {
    let server = Server::run();
    expect_session(&server);
    server.expect(
        Expectation::matching(request::method_path(
            "POST",
            "/restapi/soa2/27015/FlightListSearchSSE",
        ))
        .respond_with(status_code(502).body("bad gateway")),
    );

    let config = Config {
        debug: true,
        ..config()
    };
    let response = Scraper::new(config, Signers::none())
        .respond(&ScrapeRequest::new(search_url(&server)), &mut Entropy::from_os())
        .await;

    assert!(!response.success);
    assert!(
        response.message.contains("FlightListSearchSSE"),
        "{}",
        response.message
    );
    assert!(response.message.contains("502"), "{}", response.message);
    // Debug mode carries the response snippet
    assert!(response.message.contains("bad gateway"), "{}", response.message);
    let search = response
        .steps
        .iter()
        .find(|o| o.step == StepName::SearchStream)
        .expect("search recorded");
    assert_eq!(search.status, Some(502));
}

#[tokio::test]
async fn test_redirect_hop_cookies_survive() {
    let server = Server::run();
    server.expect(
        Expectation::matching(request::method_path("GET", "/")).respond_with(
            status_code(302)
                .append_header("location", "/home")
                .append_header("set-cookie", "GUID=09035555555555; Path=/"),
        ),
    );
    server.expect(
        Expectation::matching(all_of![
            request::method_path("GET", "/home"),
            request::headers(contains(("cookie", "_bfa=x; GUID=09035555555555"))),
        ])
        .respond_with(
            status_code(200)
                .append_header("set-cookie", "UBT_VID=1767225600000.abc; Path=/")
                .body("<html></html>"),
        ),
    );

    let transport = ReqwestTransport::new(&config(), None).expect("transport");
    let request = HttpRequest::get(StepName::RootVisit, server.url_str("/"))
        .with_headers([("cookie".to_string(), "_bfa=x".to_string())]);
    let response = transport.send(request).await.expect("response");

    assert_eq!(response.status, 200);
    let cookies: Vec<&str> = response.set_cookies().collect();
    assert_eq!(
        cookies,
        vec!["GUID=09035555555555; Path=/", "UBT_VID=1767225600000.abc; Path=/"]
    );
}

#[tokio::test]
async fn test_redirect_loop_is_a_transport_failure() {
    let server = Server::run();
    server.expect(
        Expectation::matching(request::method_path("GET", "/loop"))
            .times(1..)
            .respond_with(status_code(302).append_header("location", "/loop")),
    );

    let transport = ReqwestTransport::new(&config(), None).expect("transport");
    let err = transport
        .send(HttpRequest::get(StepName::RootVisit, server.url_str("/loop")))
        .await
        .expect_err("redirect loop");
    assert_eq!(err.status(), None);
    assert!(err.to_string().contains("redirects"), "{err}");
}
