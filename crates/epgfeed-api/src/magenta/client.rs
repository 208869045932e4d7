//! `MagentaClient` - Magenta TV Austria API client implementation.

use std::time::Duration;

use chrono::NaiveDate;
use reqwest::Client;
use tracing::instrument;
use url::Url;

use super::api::MagentaApi;
use super::session::{MagentaSession, extract_session};
use crate::error::UpstreamError;

/// EPG landing page; scraped for the embedded app configuration.
pub const LANDING_URL: &str = "https://tv.magenta.at/epg";

/// Default base URL for the bifrost API endpoints.
const DEFAULT_API_BASE_URL: &str = "https://tv-at-prod.yo-digital.com/at-bifrost/";

/// Channel-list endpoint path, relative to the API base.
const CHANNELS_PATH: &str = "epg/channel";

/// Schedule-window endpoint path, relative to the API base.
const SCHEDULES_PATH: &str = "epg/channel/schedules/v2";

/// Fixed browser user agent the upstream expects.
const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:109.0) Gecko/20100101 Firefox/114.0";

/// Fixed client-identification header the upstream expects.
const X_USER_AGENT: &str = "web|web|Firefox-114|02.0.660|1";

/// Fixed locale/country query parameters carried by every API call.
const BASE_QUERY: [(&str, &str); 2] = [("app_language", "de"), ("natco_code", "at")];

/// Default per-request timeout.
///
/// The pipeline has no retries and no internal cancellation, so a single
/// stalled window fetch must not be allowed to hang an entire run.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Magenta upstream API client.
#[derive(Debug)]
#[allow(clippy::module_name_repetitions)]
pub struct MagentaClient {
    /// HTTP client (reqwest, gzip enabled).
    http_client: Client,
    /// Landing page URL.
    landing_url: Url,
    /// Base URL for the bifrost API endpoints.
    api_base_url: Url,
}

/// Builder for `MagentaClient`.
#[derive(Debug)]
#[allow(clippy::module_name_repetitions)]
pub struct MagentaClientBuilder {
    landing_url: Option<Url>,
    api_base_url: Option<Url>,
    timeout: Option<Duration>,
}

impl MagentaClientBuilder {
    /// Creates a new builder.
    const fn new() -> Self {
        Self {
            landing_url: None,
            api_base_url: None,
            timeout: None,
        }
    }

    /// Overrides the landing page URL (for wiremock in tests).
    #[must_use]
    pub fn landing_url(mut self, url: Url) -> Self {
        self.landing_url = Some(url);
        self
    }

    /// Overrides the API base URL (for wiremock in tests).
    /// Must end with a trailing slash so endpoint paths join correctly.
    #[must_use]
    pub fn api_base_url(mut self, url: Url) -> Self {
        self.api_base_url = Some(url);
        self
    }

    /// Sets the per-request timeout (default: 30s).
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Builds the client.
    ///
    /// # Errors
    ///
    /// Returns an error if a default URL fails to parse or the
    /// `reqwest::Client` build fails.
    pub fn build(self) -> anyhow::Result<MagentaClient> {
        use anyhow::Context;

        let landing_url = if let Some(url) = self.landing_url {
            url
        } else {
            Url::parse(LANDING_URL).context("invalid default landing URL")?
        };

        let api_base_url = if let Some(url) = self.api_base_url {
            url
        } else {
            Url::parse(DEFAULT_API_BASE_URL).context("invalid default API base URL")?
        };

        let http_client = Client::builder()
            .user_agent(USER_AGENT)
            .gzip(true)
            .timeout(self.timeout.unwrap_or(DEFAULT_TIMEOUT))
            .build()
            .context("failed to build HTTP client")?;

        Ok(MagentaClient {
            http_client,
            landing_url,
            api_base_url,
        })
    }
}

impl MagentaClient {
    /// Creates a new builder.
    #[must_use]
    pub const fn builder() -> MagentaClientBuilder {
        MagentaClientBuilder::new()
    }

    /// Sends one GET and returns the response body.
    ///
    /// Session headers are attached when a session is available (every call
    /// except the landing-page fetch that creates it). There are no retries
    /// and the HTTP status is not inspected; a transport failure or an empty
    /// body is the error surface here, and a non-JSON error body fails later
    /// at parse time.
    async fn get_text(
        &self,
        url: Url,
        query: &[(&str, String)],
        session: Option<&MagentaSession>,
    ) -> Result<String, UpstreamError> {
        let mut request = self
            .http_client
            .get(url.clone())
            .header("X-User-Agent", X_USER_AGENT);

        if let Some(session) = session {
            request = request
                .header("app_key", &session.app_key)
                .header("app_version", &session.app_version)
                .header("Device-Id", &session.device_id);
        }

        if !query.is_empty() {
            request = request.query(query);
        }

        tracing::debug!(url = %url, "upstream request");

        let response = request.send().await.map_err(|e| UpstreamError::Request {
            url: url.to_string(),
            source: e,
        })?;

        let body = response
            .text()
            .await
            .map_err(|e| UpstreamError::Request {
                url: url.to_string(),
                source: e,
            })?;

        if body.is_empty() {
            return Err(UpstreamError::EmptyBody {
                url: url.to_string(),
            });
        }

        tracing::trace!(url = %url, body_len = body.len(), "upstream response");
        Ok(body)
    }

    /// Joins an endpoint path onto the API base URL.
    fn endpoint(&self, path: &str) -> Result<Url, UpstreamError> {
        self.api_base_url
            .join(path)
            .map_err(|e| UpstreamError::ConfigExtraction(format!("invalid endpoint {path}: {e}")))
    }

    /// Base locale/country query parameters as owned pairs.
    fn base_query() -> Vec<(&'static str, String)> {
        BASE_QUERY
            .iter()
            .map(|&(k, v)| (k, String::from(v)))
            .collect()
    }
}

impl MagentaApi for MagentaClient {
    #[instrument(skip_all)]
    async fn bootstrap_session(&self) -> Result<MagentaSession, UpstreamError> {
        let html = self.get_text(self.landing_url.clone(), &[], None).await?;
        let session = extract_session(&html)?;
        tracing::debug!(app_version = %session.app_version, "session bootstrapped");
        Ok(session)
    }

    #[instrument(skip_all)]
    async fn fetch_channel_list(
        &self,
        session: &MagentaSession,
    ) -> Result<String, UpstreamError> {
        let url = self.endpoint(CHANNELS_PATH)?;
        self.get_text(url, &Self::base_query(), Some(session)).await
    }

    #[instrument(skip(self, session))]
    async fn fetch_schedule_window(
        &self,
        session: &MagentaSession,
        station_id: &str,
        date: NaiveDate,
        hour_offset: u8,
    ) -> Result<String, UpstreamError> {
        let url = self.endpoint(SCHEDULES_PATH)?;

        let mut query = Self::base_query();
        query.push(("date", date.format("%Y-%m-%d").to_string()));
        query.push(("hour_offset", hour_offset.to_string()));
        query.push(("hour_range", String::from("3")));
        query.push(("station_ids", String::from(station_id)));

        self.get_text(url, &query, Some(session)).await
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn test_session() -> MagentaSession {
        MagentaSession {
            app_key: String::from("k3y-0f-th3-cms"),
            app_version: String::from("02.0.660"),
            device_id: String::from("web-3f9a1c"),
        }
    }

    fn test_client(server: &wiremock::MockServer) -> MagentaClient {
        MagentaClient::builder()
            .landing_url(format!("{}/epg", server.uri()).parse().unwrap())
            .api_base_url(format!("{}/", server.uri()).parse().unwrap())
            .build()
            .unwrap()
    }

    #[test]
    fn test_builder_default_urls() {
        // Arrange & Act
        let client = MagentaClient::builder().build().unwrap();

        // Assert
        assert_eq!(client.landing_url.as_str(), "https://tv.magenta.at/epg");
        assert_eq!(
            client.endpoint(CHANNELS_PATH).unwrap().as_str(),
            "https://tv-at-prod.yo-digital.com/at-bifrost/epg/channel"
        );
        assert_eq!(
            client.endpoint(SCHEDULES_PATH).unwrap().as_str(),
            "https://tv-at-prod.yo-digital.com/at-bifrost/epg/channel/schedules/v2"
        );
    }

    #[tokio::test]
    async fn test_bootstrap_session_via_http() {
        // Arrange
        let server = wiremock::MockServer::start().await;
        let html = include_str!("../../../../fixtures/magenta/landing.html");

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/epg"))
            .and(wiremock::matchers::header("X-User-Agent", X_USER_AGENT))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(html))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);

        // Act
        let session = client.bootstrap_session().await.unwrap();

        // Assert
        assert_eq!(session, test_session());
    }

    #[tokio::test]
    async fn test_bootstrap_session_scrape_failure() {
        // Arrange
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(
                wiremock::ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"),
            )
            .mount(&server)
            .await;

        let client = test_client(&server);

        // Act
        let result = client.bootstrap_session().await;

        // Assert
        assert!(matches!(result, Err(UpstreamError::ConfigExtraction(_))));
    }

    #[tokio::test]
    async fn test_fetch_channel_list_sends_session_headers() {
        // Arrange
        let server = wiremock::MockServer::start().await;
        let body = include_str!("../../../../fixtures/magenta/channel_list.json");

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/epg/channel"))
            .and(wiremock::matchers::query_param("app_language", "de"))
            .and(wiremock::matchers::query_param("natco_code", "at"))
            .and(wiremock::matchers::header("app_key", "k3y-0f-th3-cms"))
            .and(wiremock::matchers::header("app_version", "02.0.660"))
            .and(wiremock::matchers::header("Device-Id", "web-3f9a1c"))
            .and(wiremock::matchers::header("X-User-Agent", X_USER_AGENT))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(body))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);

        // Act
        let raw = client.fetch_channel_list(&test_session()).await.unwrap();

        // Assert (mock expect(1) verifies query params and headers)
        assert!(raw.contains("\"channels\""));
    }

    #[tokio::test]
    async fn test_fetch_schedule_window_query_params() {
        // Arrange
        let server = wiremock::MockServer::start().await;
        let body = include_str!("../../../../fixtures/magenta/schedule_window_14.json");

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/epg/channel/schedules/v2"))
            .and(wiremock::matchers::query_param("app_language", "de"))
            .and(wiremock::matchers::query_param("natco_code", "at"))
            .and(wiremock::matchers::query_param("date", "2024-01-01"))
            .and(wiremock::matchers::query_param("hour_offset", "18"))
            .and(wiremock::matchers::query_param("hour_range", "3"))
            .and(wiremock::matchers::query_param("station_ids", "14"))
            .and(wiremock::matchers::header("app_key", "k3y-0f-th3-cms"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(body))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

        // Act
        let raw = client
            .fetch_schedule_window(&test_session(), "14", date, 18)
            .await
            .unwrap();

        // Assert
        assert!(raw.contains("\"14\""));
    }

    #[tokio::test]
    async fn test_empty_body_is_an_error() {
        // Arrange
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(""))
            .mount(&server)
            .await;

        let client = test_client(&server);

        // Act
        let result = client.fetch_channel_list(&test_session()).await;

        // Assert
        assert!(matches!(result, Err(UpstreamError::EmptyBody { .. })));
    }

    #[tokio::test]
    async fn test_no_retry_on_transport_failure() {
        // Arrange: a server that is immediately dropped, so connects fail
        // (builder() gives a dedicated server; pooled ones keep listening after drop)
        let server = wiremock::MockServer::builder().start().await;
        let client = test_client(&server);
        drop(server);

        // Act
        let result = client.fetch_channel_list(&test_session()).await;

        // Assert
        assert!(matches!(result, Err(UpstreamError::Request { .. })));
    }
}
