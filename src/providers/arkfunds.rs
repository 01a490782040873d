use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::core::{HoldingsError, HoldingsProvider, HoldingsResponse};

const HOLDINGS_ENDPOINT: &str = "/api/v2/etf/holdings";

pub struct ArkFundsProvider {
    base_url: String,
    timeout: Duration,
}

impl ArkFundsProvider {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        ArkFundsProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    pub fn holdings_url(&self, funds: &[String]) -> String {
        format!(
            "{}{}?symbol={}",
            self.base_url,
            HOLDINGS_ENDPOINT,
            funds.join(",")
        )
    }
}

#[async_trait]
impl HoldingsProvider for ArkFundsProvider {
    #[instrument(name = "ArkHoldingsFetch", skip(self, funds), fields(fund_count = funds.len()))]
    async fn fetch_holdings(&self, funds: &[String]) -> Result<HoldingsResponse, HoldingsError> {
        let url = self.holdings_url(funds);
        debug!("Requesting holdings from {}", url);

        let transport = |source: reqwest::Error| HoldingsError::Transport {
            url: url.clone(),
            source,
        };
        let client = reqwest::Client::builder()
            .user_agent("noah/1.0")
            .timeout(self.timeout)
            .build()
            .map_err(transport)?;
        let response = client.get(&url).send().await.map_err(transport)?;

        debug!(status = %response.status(), "Received holdings response");

        // The client timeout also spans the body read; a stall there is a transport failure.
        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                transport(e)
            } else {
                HoldingsError::BodyRead(e)
            }
        })?;
        let holdings: HoldingsResponse =
            serde_json::from_slice(&body).map_err(HoldingsError::Decode)?;

        debug!(
            "Decoded {} holdings between {} and {}",
            holdings.holdings.len(),
            holdings.date_from,
            holdings.date_to
        );
        Ok(holdings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn funds(symbols: &[&str]) -> Vec<String> {
        symbols.iter().map(|s| s.to_string()).collect()
    }

    pub async fn create_mock_server(symbols: &str, template: ResponseTemplate) -> MockServer {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(HOLDINGS_ENDPOINT))
            .and(query_param("symbol", symbols))
            .respond_with(template)
            .mount(&mock_server)
            .await;

        mock_server
    }

    /// Address of a port nothing is listening on.
    async fn closed_port_url() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{addr}")
    }

    #[test]
    fn test_holdings_url_joins_funds() {
        let provider = ArkFundsProvider::new("https://arkfunds.io/", TIMEOUT);
        assert_eq!(
            provider.holdings_url(&funds(&["ARKK", "ARKW", "PRNT"])),
            "https://arkfunds.io/api/v2/etf/holdings?symbol=ARKK,ARKW,PRNT"
        );
    }

    #[tokio::test]
    async fn test_successful_holdings_fetch() {
        let mock_response = r#"{
            "symbol": "ARKK,ARKG",
            "date_from": "2023-01-01",
            "date_to": "2023-01-02",
            "holdings": [
                {"fund": "ARKK", "date": "2023-01-02", "ticker": "TSLA", "company": "Tesla",
                 "cusip": "88160R101", "shares": 100, "market_value": 1000.0,
                 "share_price": 10.0, "weight": 9.5, "weight_rank": 1},
                {"fund": "ARKG", "date": "2023-01-02", "ticker": "EXAS", "company": "Exact Sciences",
                 "cusip": "30063P105", "shares": 50, "market_value": 500.0,
                 "share_price": 10.0, "weight": 7.1, "weight_rank": 1}
            ]
        }"#;
        let mock_server = create_mock_server(
            "ARKK,ARKG",
            ResponseTemplate::new(200).set_body_string(mock_response),
        )
        .await;

        let provider = ArkFundsProvider::new(&mock_server.uri(), TIMEOUT);
        let result = provider
            .fetch_holdings(&funds(&["ARKK", "ARKG"]))
            .await
            .unwrap();

        assert_eq!(result.symbol, "ARKK,ARKG");
        assert_eq!(result.holdings.len(), 2);
        let top = result.top_tickers();
        assert_eq!(top["ARKK"], "TSLA");
        assert_eq!(top["ARKG"], "EXAS");
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let provider = ArkFundsProvider::new(&closed_port_url().await, TIMEOUT);
        let err = provider
            .fetch_holdings(&funds(&["ARKK"]))
            .await
            .unwrap_err();

        assert!(matches!(err, HoldingsError::Transport { .. }));
        assert_eq!(err.user_message(), "Couldn't connect to endpoint");
    }

    #[tokio::test]
    async fn test_timeout_is_transport_error() {
        let mock_server = create_mock_server(
            "ARKK",
            ResponseTemplate::new(200)
                .set_body_string(r#"{"holdings": []}"#)
                .set_delay(Duration::from_secs(2)),
        )
        .await;

        let provider = ArkFundsProvider::new(&mock_server.uri(), Duration::from_millis(200));
        let err = provider
            .fetch_holdings(&funds(&["ARKK"]))
            .await
            .unwrap_err();

        match err {
            HoldingsError::Transport { source, .. } => assert!(source.is_timeout()),
            other => panic!("Expected a transport error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_invalid_json_is_decode_error() {
        let mock_server =
            create_mock_server("ARKK", ResponseTemplate::new(200).set_body_string("not json"))
                .await;

        let provider = ArkFundsProvider::new(&mock_server.uri(), TIMEOUT);
        let err = provider
            .fetch_holdings(&funds(&["ARKK"]))
            .await
            .unwrap_err();

        assert!(matches!(err, HoldingsError::Decode(_)));
        assert_eq!(err.user_message(), "Error reading response body");
    }

    #[tokio::test]
    async fn test_json_array_is_decode_error() {
        let mock_server =
            create_mock_server("ARKK", ResponseTemplate::new(200).set_body_string("[]")).await;

        let provider = ArkFundsProvider::new(&mock_server.uri(), TIMEOUT);
        let err = provider
            .fetch_holdings(&funds(&["ARKK"]))
            .await
            .unwrap_err();

        assert!(matches!(err, HoldingsError::Decode(_)));
        assert_eq!(err.user_message(), "Error reading response body");
    }

    #[tokio::test]
    async fn test_stalled_body_is_transport_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 1024];
            let _ = socket.read(&mut request).await;
            socket
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\n\r\n{")
                .await
                .unwrap();
            socket.flush().await.unwrap();
            tokio::time::sleep(Duration::from_secs(3)).await;
        });

        let provider =
            ArkFundsProvider::new(&format!("http://{addr}"), Duration::from_millis(300));
        let err = provider
            .fetch_holdings(&funds(&["ARKK"]))
            .await
            .unwrap_err();

        match &err {
            HoldingsError::Transport { source, .. } => assert!(source.is_timeout()),
            other => panic!("Expected a transport error, got {other:?}"),
        }
        assert_eq!(err.user_message(), "Couldn't connect to endpoint");
    }

    #[tokio::test]
    async fn test_error_status_page_is_decode_error() {
        let mock_server = create_mock_server(
            "ARKK",
            ResponseTemplate::new(500).set_body_string("<html>Internal Server Error</html>"),
        )
        .await;

        let provider = ArkFundsProvider::new(&mock_server.uri(), TIMEOUT);
        let err = provider
            .fetch_holdings(&funds(&["ARKK"]))
            .await
            .unwrap_err();

        assert!(matches!(err, HoldingsError::Decode(_)));
    }

    #[tokio::test]
    async fn test_truncated_body_is_body_read_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 1024];
            let _ = socket.read(&mut request).await;
            socket
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\n\r\n{\"symbol\":")
                .await
                .unwrap();
            socket.flush().await.unwrap();
        });

        let provider = ArkFundsProvider::new(&format!("http://{addr}"), TIMEOUT);
        let err = provider
            .fetch_holdings(&funds(&["ARKK"]))
            .await
            .unwrap_err();

        assert!(matches!(err, HoldingsError::BodyRead(_)));
        assert_eq!(err.user_message(), "Error reading response body");
    }
}
