use loanscout_core::config::AppConfig;
use loanscout_core::domain::loan::LoanTypeCode;
use loanscout_core::errors::TransportFailure;
use loanscout_core::routing::ProviderRequest;
use loanscout_gateway::{HttpLoanApiClient, LoanApiClient};
use mockito::Matcher;
use rust_decimal::Decimal;

fn housing_request(base_url: String) -> ProviderRequest {
    ProviderRequest {
        loan_type: LoanTypeCode::Housing,
        endpoint_base_url: base_url,
        amount: Decimal::from(5_000_000),
        maturity_months: 48,
    }
}

fn client() -> HttpLoanApiClient {
    HttpLoanApiClient::new(&AppConfig::default().http).expect("default http config is valid")
}

#[tokio::test]
async fn get_carries_device_and_accept_headers_and_query() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/housing")
        .match_header("accept", "text/plain")
        .match_header("device", "1")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("Amount".into(), "5000000".into()),
            Matcher::UrlEncoded("Maturity".into(), "48".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"products": []}"#)
        .expect(1)
        .create_async()
        .await;

    let body = client()
        .fetch(&housing_request(format!("{}/housing", server.url())))
        .await
        .expect("provider responds with 200");

    assert_eq!(body, r#"{"products": []}"#);
    mock.assert_async().await;
}

#[tokio::test]
async fn non_success_status_reports_code_and_reason() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/housing")
        .match_query(Matcher::Any)
        .with_status(503)
        .with_body("maintenance")
        .create_async()
        .await;

    let error = client()
        .fetch(&housing_request(format!("{}/housing", server.url())))
        .await
        .expect_err("503 is a transport failure");

    assert_eq!(
        error,
        TransportFailure::Status { code: 503, reason: "Service Unavailable".to_string() }
    );
    assert_eq!(error.to_string(), "HTTP 503: Service Unavailable");
}

#[tokio::test]
async fn each_fetch_is_a_single_attempt() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/housing")
        .match_query(Matcher::Any)
        .with_status(500)
        .expect(1)
        .create_async()
        .await;

    let result = client().fetch(&housing_request(format!("{}/housing", server.url()))).await;

    assert!(matches!(result, Err(TransportFailure::Status { code: 500, .. })));
    mock.assert_async().await;
}

#[tokio::test]
async fn unreachable_endpoint_is_a_network_failure() {
    let error = client()
        .fetch(&housing_request("http://127.0.0.1:1/housing".to_string()))
        .await
        .expect_err("nothing listens on port 1");

    assert!(matches!(error, TransportFailure::Network(_)));
}

#[tokio::test]
async fn non_success_status_keeps_server_reason_text() {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind local listener");
    let address = listener.local_addr().expect("listener address");
    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.expect("accept connection");
        let mut request = [0u8; 1024];
        let _ = stream.read(&mut request).await;
        stream
            .write_all(
                b"HTTP/1.1 503 Provider Maintenance\r\n\
                  content-length: 0\r\nconnection: close\r\n\r\n",
            )
            .await
            .expect("write response");
    });

    let error = client()
        .fetch(&housing_request(format!("http://{address}/housing")))
        .await
        .expect_err("503 is a transport failure");

    assert_eq!(
        error,
        TransportFailure::Status { code: 503, reason: "Provider Maintenance".to_string() }
    );
    server.await.expect("server task");
}
