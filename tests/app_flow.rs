use chrono::{NaiveDate, TimeZone, Utc};
use daily_rates::{FetchError, HttpRateSource, MemoryConnector, SyncError, SyncJob};
use rust_decimal::Decimal;
use std::str::FromStr;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const RATES_RESPONSE: &str = r#"{
    "valid": true,
    "updated": 1709971200,
    "base": "USD",
    "rates": {
        "AED": 3.67,
        "EUR": 0.92,
        "GBP": 0.79,
        "JPY": 147.05,
        "BTC": 0.0000146
    }
}"#;

async fn create_mock_server(status: u16, body: &str) -> MockServer {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/rates"))
        .and(query_param("key", "integration-key"))
        .and(query_param("base", "USD"))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .mount(&mock_server)
        .await;

    mock_server
}

fn job_for(server: &MockServer, connector: &MemoryConnector) -> SyncJob<HttpRateSource, MemoryConnector> {
    SyncJob::new(
        HttpRateSource::new(&format!("{}/api/v1/rates", server.uri())),
        connector.clone(),
        Some("integration-key".to_string()),
    )
}

#[test_log::test(tokio::test)]
async fn test_fetch_and_store_flow() {
    let server = create_mock_server(200, RATES_RESPONSE).await;
    let connector = MemoryConnector::new();

    let summary = job_for(&server, &connector).run().await.unwrap();

    let expected_date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
    assert_eq!(summary.date, expected_date);
    assert_eq!(summary.inserted, 5);

    let records = connector.records();
    assert_eq!(records.len(), 5);
    assert!(records.iter().all(|r| r.date == expected_date));
    let btc = records.iter().find(|r| r.currency_code == "BTC").unwrap();
    assert_eq!(btc.rate, Decimal::from_str("0.0000146").unwrap());
    assert_eq!(connector.connections_opened(), connector.connections_closed());
}

#[test_log::test(tokio::test)]
async fn test_rerun_is_idempotent() {
    let server = create_mock_server(200, RATES_RESPONSE).await;
    let connector = MemoryConnector::new();
    let job = job_for(&server, &connector);

    job.run().await.unwrap();
    let after_first = connector.records();
    let second = job.run().await.unwrap();

    assert_eq!(second.inserted, 0);
    assert_eq!(second.skipped, 5);
    assert_eq!(connector.records(), after_first);
    assert_eq!(connector.connections_closed(), 2);
}

#[test_log::test(tokio::test)]
async fn test_partial_failure_keeps_valid_rates() {
    let body = r#"{"updated": 1709971200, "rates": {"EUR": 0.92, "XXX": "invalid_rate", "GBP": 0.79}}"#;
    let server = create_mock_server(200, body).await;
    let connector = MemoryConnector::new();

    let summary = job_for(&server, &connector).run().await.unwrap();

    assert_eq!(summary.inserted, 2);
    assert_eq!(summary.failed, 1);
    assert!(connector.records().iter().all(|r| r.currency_code != "XXX"));
}

#[test_log::test(tokio::test)]
async fn test_missing_timestamp_uses_today() {
    let server = create_mock_server(200, r#"{"base": "USD", "rates": {"EUR": 0.92}}"#).await;
    let connector = MemoryConnector::new();
    let now = Utc.with_ymd_and_hms(2024, 12, 31, 23, 30, 0).unwrap();

    let summary = job_for(&server, &connector).run_at(now).await.unwrap();

    assert_eq!(summary.date, NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());
}

#[test_log::test(tokio::test)]
async fn test_upstream_error_stops_before_database() {
    let server = create_mock_server(500, "Internal Server Error").await;
    let connector = MemoryConnector::new();

    let err = job_for(&server, &connector).run().await.unwrap_err();

    match err {
        SyncError::Fetch(FetchError::HttpStatus { status, body }) => {
            assert_eq!(status.as_u16(), 500);
            assert_eq!(body, "Internal Server Error");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(connector.connections_opened(), 0);
}

#[test_log::test(tokio::test)]
async fn test_missing_api_key_makes_no_calls() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(RATES_RESPONSE))
        .expect(0)
        .mount(&server)
        .await;
    let connector = MemoryConnector::new();
    let job = SyncJob::new(HttpRateSource::new(&server.uri()), connector.clone(), None);

    let err = job.run().await.unwrap_err();

    assert!(matches!(err, SyncError::MissingApiKey));
    assert_eq!(connector.connections_opened(), 0);
}
