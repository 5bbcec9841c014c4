use crate::error::TransportError;
use crate::maps::api::{listugcposts_query, LISTUGCPOSTS_URL};
use crate::maps::place::PlaceId;
use crate::traits::PageTransport;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, REFERER};
use reqwest::Client;
use review_stream_config::HttpConfig;
use review_stream_models::SortDirection;
use tracing::debug;

/// Transport for the Google Maps listugcposts endpoint.
///
/// One instance serves both traversal directions; reqwest's `Client` pools
/// connections internally, so concurrent fetches share the pool.
pub struct MapsTransport {
    client: Client,
    place_id: PlaceId,
}

impl MapsTransport {
    pub fn new(place_id: PlaceId, http: &HttpConfig) -> Self {
        Self {
            client: create_maps_client(http),
            place_id,
        }
    }

    pub fn place_id(&self) -> &PlaceId {
        &self.place_id
    }
}

/// The endpoint serves different payloads to clients it does not recognize
/// as browsers, so the header set mimics Chrome.
fn create_maps_client(http: &HttpConfig) -> Client {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(REFERER, HeaderValue::from_static("https://www.google.com/"));
    if let Ok(lang) = HeaderValue::from_str(&http.accept_language) {
        headers.insert(ACCEPT_LANGUAGE, lang);
    }

    Client::builder()
        .user_agent(http.user_agent.clone())
        .default_headers(headers)
        .timeout(http.request_timeout())
        .build()
        .unwrap_or_else(|_| Client::new())
}

#[async_trait]
impl PageTransport for MapsTransport {
    async fn fetch_page(
        &self,
        direction: SortDirection,
        token: Option<&str>,
    ) -> Result<Vec<u8>, TransportError> {
        let query = listugcposts_query(&self.place_id, token, direction);

        debug!(
            %direction,
            token = token.map(|t| t.get(..24).unwrap_or(t)).unwrap_or("<first page>"),
            "Fetching review page"
        );

        let response = self
            .client
            .get(LISTUGCPOSTS_URL)
            .query(&query)
            .send()
            .await
            .map_err(|e| classify_reqwest_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                url: LISTUGCPOSTS_URL.to_string(),
            });
        }

        let bytes = response.bytes().await.map_err(classify_reqwest_error)?;
        Ok(bytes.to_vec())
    }
}

fn classify_reqwest_error(err: reqwest::Error) -> TransportError {
    let url = err
        .url()
        .map(|u| u.to_string())
        .unwrap_or_else(|| LISTUGCPOSTS_URL.to_string());
    if err.is_timeout() {
        TransportError::Timeout { url }
    } else {
        TransportError::Network { url, source: err }
    }
}
