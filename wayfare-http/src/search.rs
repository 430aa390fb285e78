use async_trait::async_trait;
use wayfare_game::{DiscoveryQuery, FlightSearch, ProviderError, SearchResponse};

use crate::config::ClientConfig;
use crate::error::{HttpError, Result};

pub const SEARCH_PATH: &str = "search/indicative";

/// Flight search over the indicative-fares HTTP endpoint.
pub struct HttpFlightSearch {
    client: reqwest::Client,
    url: String,
}

impl HttpFlightSearch {
    pub fn new(config: &ClientConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    pub fn with_client(client: reqwest::Client, config: &ClientConfig) -> Self {
        Self {
            client,
            url: config.search_url(SEARCH_PATH),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// POST the query. Error payloads (`{ "error": .. }`) come back as
    /// [`SearchResponse::Error`], even on a non-2xx status.
    pub async fn post(&self, query: &DiscoveryQuery) -> Result<SearchResponse> {
        log::debug!("searching from '{}' ({}/{})", query.from, query.month, query.year);
        let resp = self.client.post(&self.url).json(query).send().await?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            let payload = serde_json::from_str::<SearchResponse>(&body);
            if let Ok(error @ SearchResponse::Error { .. }) = payload {
                return Ok(error);
            }
            return Err(HttpError::Api {
                status: status.as_u16(),
                message: body,
            });
        }
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl FlightSearch for HttpFlightSearch {
    async fn search(
        &self,
        query: &DiscoveryQuery,
    ) -> std::result::Result<SearchResponse, ProviderError> {
        self.post(query).await.map_err(|err| {
            log::warn!("flight search failed: {err}");
            ProviderError::from(err)
        })
    }
}
