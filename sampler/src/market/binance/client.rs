use std::time::Duration;

use reqwest::Client;
use tracing::{debug, instrument, warn};

use crate::market::binance::errors::P2pError;
use crate::market::binance::types::{SearchEnvelope, SearchRequest};
use crate::market::types::Observation;

const SEARCH_PATH: &str = "/bapi/c2c/v2/friendly/c2c/adv/search";

// The endpoint rejects requests without a browser-like agent.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
(KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

#[derive(Clone)]
pub struct P2pClient {
    http: Client,
    search_url: String,
}

impl P2pClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, P2pError> {
        let base = base_url.trim_end_matches('/');
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(P2pError::InvalidEndpoint(base_url.to_string()));
        }

        let http = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .pool_idle_timeout(Duration::from_secs(30))
            .tcp_keepalive(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            search_url: format!("{base}{SEARCH_PATH}"),
        })
    }

    pub fn search_url(&self) -> &str {
        &self.search_url
    }

    #[instrument(
        skip(self, request),
        fields(side = %request.trade_type, trans_amount = request.trans_amount),
        level = "debug"
    )]
    pub async fn search(&self, request: &SearchRequest<'_>) -> Result<Vec<Observation>, P2pError> {
        let resp = self
            .http
            .post(&self.search_url)
            .json(request)
            .send()
            .await?
            .error_for_status()?;

        let body = resp.bytes().await?;
        let observations = parse_search_body(&body)?;

        debug!(count = observations.len(), "p2p search page fetched");

        Ok(observations)
    }
}

/// Decodes a search response into observations.
///
/// A missing or false `success` flag and an absent `data` array are normal
/// "no data" outcomes and yield an empty list. Individual records that do not
/// carry parseable numbers are skipped.
pub fn parse_search_body(body: &[u8]) -> Result<Vec<Observation>, P2pError> {
    let envelope: SearchEnvelope = serde_json::from_slice(body)?;

    if !envelope.success {
        return Ok(Vec::new());
    }

    let records = envelope.data.unwrap_or_default();
    let mut out = Vec::with_capacity(records.len());
    for (idx, record) in records.iter().enumerate() {
        match record.to_observation() {
            Some(o) => out.push(o),
            None => {
                warn!(index = idx, "skipping ad with unparseable price or quantity");
            }
        }
    }

    Ok(out)
}
