//! One side of the order book per call: first page only, no retries.
//!
//! Every failure (transport, HTTP status, timeout, malformed body) is logged
//! here and collapses into an empty observation list. The next scheduled
//! tick is the only retry.

use std::time::Duration;

use async_trait::async_trait;
use common::logger::{side_span, warn_if_slow};
use tracing::{Instrument, Span, debug, field, warn};

use crate::config::MarketQuery;
use crate::market::binance::{P2pClient, SearchRequest};
use crate::market::types::{Observation, TradeSide};

/// Source of one side's listings. Implementations never fail to the caller.
#[async_trait]
pub trait SideSource: Send + Sync {
    async fn fetch(&self, side: TradeSide, trans_amount: u64) -> Vec<Observation>;
}

pub struct P2pSideSampler {
    client: P2pClient,
    query: MarketQuery,
}

impl P2pSideSampler {
    pub fn new(client: P2pClient, query: MarketQuery) -> Self {
        Self { client, query }
    }
}

#[async_trait]
impl SideSource for P2pSideSampler {
    async fn fetch(&self, side: TradeSide, trans_amount: u64) -> Vec<Observation> {
        let span = side_span(side.as_str(), trans_amount);

        async {
            let request = SearchRequest {
                fiat: &self.query.fiat,
                asset: &self.query.asset,
                pay_types: &self.query.pay_methods,
                countries: &[],
                pro_merchant_ads: false,
                shield_merchant_ads: false,
                publisher_type: None,
                page: 1,
                rows: self.query.page_size,
                trade_type: side,
                trans_amount,
            };

            let result =
                warn_if_slow("p2p_search", Duration::from_secs(3), self.client.search(&request))
                    .await;

            let observations = match result {
                Ok(obs) => obs,
                Err(e) => {
                    warn!(error = %e, "side fetch failed; treating as empty");
                    Vec::new()
                }
            };

            Span::current().record("observations", field::display(observations.len()));
            if observations.is_empty() {
                debug!("side returned no listings");
            }

            observations
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    use rust_decimal_macros::dec;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::sync::oneshot;

    use crate::market::binance::P2pError;

    fn query() -> MarketQuery {
        MarketQuery {
            fiat: "VES".into(),
            asset: "USDT".into(),
            pay_methods: vec!["Banesco".into()],
            page_size: 7,
        }
    }

    fn http_response(status: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        )
    }

    /// Reads one full request (headers plus `Content-Length` body).
    async fn read_request(stream: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];

        loop {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);

            if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let headers = String::from_utf8_lossy(&buf[..end]).to_ascii_lowercase();
                let body_len = headers
                    .lines()
                    .find_map(|l| l.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + body_len {
                    break;
                }
            }
        }

        String::from_utf8_lossy(&buf).into_owned()
    }

    /// Serves a single connection. `None` accepts and then never answers.
    async fn serve_once(response: Option<String>) -> (String, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let request = read_request(&mut stream).await;
            let _ = tx.send(request);

            match response {
                Some(resp) => {
                    stream.write_all(resp.as_bytes()).await.unwrap();
                    let _ = stream.shutdown().await;
                }
                None => tokio::time::sleep(Duration::from_secs(60)).await,
            }
        });

        (format!("http://{addr}"), rx)
    }

    #[tokio::test]
    async fn unreachable_endpoint_yields_empty_side() {
        // Nothing listens on the discard port; the connect fails fast.
        let client = P2pClient::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
        let sampler = P2pSideSampler::new(client, query());

        let out = sampler.fetch(TradeSide::Buy, 32_000).await;

        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn server_error_status_yields_empty_side() {
        let body = r#"{"success": true, "data": [{"adv": {"price": "36.5", "tradableQuantity": "10"}}]}"#;
        let (base, _) = serve_once(Some(http_response("500 Internal Server Error", body))).await;
        let sampler = P2pSideSampler::new(P2pClient::new(&base, Duration::from_secs(2)).unwrap(), query());

        let out = sampler.fetch(TradeSide::Sell, 3_200).await;

        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn client_reports_status_as_http_error() {
        let (base, _) = serve_once(Some(http_response("503 Service Unavailable", "{}"))).await;
        let client = P2pClient::new(&base, Duration::from_secs(2)).unwrap();
        let pay = vec!["Banesco".to_string()];
        let request = SearchRequest {
            fiat: "VES",
            asset: "USDT",
            pay_types: &pay,
            countries: &[],
            pro_merchant_ads: false,
            shield_merchant_ads: false,
            publisher_type: None,
            page: 1,
            rows: 7,
            trade_type: TradeSide::Buy,
            trans_amount: 32_000,
        };

        let err = client.search(&request).await.unwrap_err();

        match err {
            P2pError::Http(e) => assert_eq!(e.status().map(|s| s.as_u16()), Some(503)),
            other => panic!("expected http error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn hung_server_yields_empty_side_within_timeout() {
        let (base, _) = serve_once(None).await;
        let timeout = Duration::from_millis(300);
        let sampler = P2pSideSampler::new(P2pClient::new(&base, timeout).unwrap(), query());

        let started = Instant::now();
        let out = sampler.fetch(TradeSide::Buy, 32_000).await;
        let elapsed = started.elapsed();

        assert!(out.is_empty());
        assert!(elapsed >= timeout, "returned before the timeout: {elapsed:?}");
        assert!(elapsed < Duration::from_secs(5), "timeout not enforced: {elapsed:?}");
    }

    #[tokio::test]
    async fn ok_page_is_posted_and_parsed() {
        let body = r#"{
            "code": "000000",
            "success": true,
            "data": [
                {"adv": {"price": "36.50", "tradableQuantity": "10"}},
                {"adv": {"price": "36.80", "tradableQuantity": "4.25"}}
            ]
        }"#;
        let (base, request) = serve_once(Some(http_response("200 OK", body))).await;
        let sampler = P2pSideSampler::new(P2pClient::new(&base, Duration::from_secs(2)).unwrap(), query());

        let out = sampler.fetch(TradeSide::Sell, 3_200).await;

        assert_eq!(
            out,
            vec![
                Observation::new(dec!(36.50), dec!(10)),
                Observation::new(dec!(36.80), dec!(4.25)),
            ]
        );

        let request = request.await.unwrap();
        assert!(request.starts_with("POST /bapi/c2c/v2/friendly/c2c/adv/search "));
        assert!(request.contains(r#""tradeType":"SELL""#));
        assert!(request.contains(r#""transAmount":3200"#));
        assert!(request.contains(r#""payTypes":["Banesco"]"#));
        assert!(request.contains(r#""rows":7"#));
    }
}
