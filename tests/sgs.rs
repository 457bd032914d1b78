use bcbcast::collector::SgsClient;
use bcbcast::config::CollectionConfig;
use bcbcast::core::data::DateWindow;
use bcbcast::SeriesSource;
use chrono::NaiveDate;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const IPCA_PATH: &str = "/bcdata.sgs.433/dados";

/// Client pointed at the mock server with two retries and no backoff
fn client_for(server: &MockServer) -> SgsClient {
    let config = CollectionConfig {
        base_url: format!("{}/bcdata.sgs", server.uri()),
        max_retries: 2,
        delay_between_requests_ms: 0,
        ..CollectionConfig::default()
    };
    SgsClient::new(&config).unwrap()
}

async fn request_count(server: &MockServer) -> usize {
    server.received_requests().await.map(|r| r.len()).unwrap_or(0)
}

#[tokio::test]
async fn server_errors_stop_after_max_retries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(IPCA_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .mount(&server)
        .await;

    let err = client_for(&server).fetch(433, None).await.unwrap_err();

    assert!(err.to_string().contains("500"));
    assert_eq!(request_count(&server).await, 3);
}

#[tokio::test]
async fn empty_array_is_retried_as_a_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(IPCA_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .mount(&server)
        .await;

    let err = client_for(&server).fetch(433, None).await.unwrap_err();

    assert!(err.to_string().contains("Empty response"));
    assert_eq!(request_count(&server).await, 3);
}

#[tokio::test]
async fn non_json_body_aborts_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(IPCA_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let err = client_for(&server).fetch(433, None).await.unwrap_err();

    assert!(err.to_string().contains("decode"));
    assert_eq!(request_count(&server).await, 1);
}

#[tokio::test]
async fn transient_failure_recovers_on_next_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(IPCA_PATH))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(IPCA_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"[{"data":"01/01/2024","valor":"0.42"},{"data":"01/02/2024","valor":"-"},{"data":"01/03/2024","valor":"0,16"}]"#,
        ))
        .mount(&server)
        .await;

    let observations = client_for(&server).fetch(433, None).await.unwrap();

    assert_eq!(request_count(&server).await, 2);
    // The "-" record is dropped, the comma decimal is accepted
    assert_eq!(observations.len(), 2);
    assert_eq!(observations[0].date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    assert!((observations[1].value - 0.16).abs() < 1e-12);
}

#[tokio::test]
async fn window_is_sent_as_bcb_dates() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(IPCA_PATH))
        .and(query_param("formato", "json"))
        .and(query_param("dataInicial", "01/01/2023"))
        .and(query_param("dataFinal", "31/12/2023"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"[{"data":"01/06/2023","valor":"-0.08"}]"#))
        .expect(1)
        .mount(&server)
        .await;

    let window = DateWindow::new(
        NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2023, 12, 31).unwrap(),
    );
    let observations = client_for(&server).fetch(433, Some(window)).await.unwrap();

    assert_eq!(observations.len(), 1);
    assert!((observations[0].value + 0.08).abs() < 1e-12);
}
