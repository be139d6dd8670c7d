//! Remote observation API client
//!
//! The remote endpoint is a paginated HTTP GET accepting `species_group`,
//! `date_after`/`date_before` (exclusive day-after upper bound), `limit`,
//! and `offset`. Responses carry a `results` array and a `next` indicator
//! that is non-null while more pages exist.
//!
//! Page fetching sits behind the [`ObservationApi`] trait so the pagination
//! and worker logic can be exercised against scripted backends without a
//! network. [`HttpObservationApi`] is the production implementation.

use async_trait::async_trait;
use chrono::Days;
use reqwest::StatusCode;
use serde::Deserialize;
use url::Url;

use crate::config::ApiConfig;
use crate::error::{Error, Result};
use crate::types::{FetchTask, ObservationRecord};

/// One page of the remote API's paginated response
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawPage {
    /// Observation payloads on this page
    #[serde(default)]
    pub results: Vec<RawObservation>,
    /// URL of the next page; absent or null when this is the last page
    #[serde(default)]
    pub next: Option<String>,
}

/// One observation as the remote API serializes it
///
/// Every field is optional: a payload missing any of them still yields a
/// record (with nulls), it never fails the page.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawObservation {
    /// Remote observation id
    #[serde(default)]
    pub id: Option<i64>,
    /// Observation date (YYYY-MM-DD)
    #[serde(default)]
    pub date: Option<String>,
    /// Observation time (HH:MM)
    #[serde(default)]
    pub time: Option<String>,
    /// Number of individuals observed
    #[serde(default)]
    pub number: Option<i64>,
    /// Species naming details
    #[serde(default)]
    pub species_detail: Option<RawSpeciesDetail>,
    /// Geographic point, when the observation has coordinates
    #[serde(default)]
    pub point: Option<RawPoint>,
    /// Location details
    #[serde(default)]
    pub location_detail: Option<RawNamed>,
    /// Observer details
    #[serde(default)]
    pub user_detail: Option<RawNamed>,
}

/// Species naming payload nested in an observation
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawSpeciesDetail {
    /// Vernacular name
    #[serde(default)]
    pub name: Option<String>,
    /// Scientific name
    #[serde(default)]
    pub scientific_name: Option<String>,
}

/// GeoJSON-style point payload: `coordinates` is `[longitude, latitude]`
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawPoint {
    /// Coordinate pair, longitude first
    #[serde(default)]
    pub coordinates: Option<Vec<f64>>,
}

/// Generic named payload (`location_detail`, `user_detail`)
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawNamed {
    /// The entity's display name
    #[serde(default)]
    pub name: Option<String>,
}

impl RawObservation {
    /// Map the raw payload into the normalized record shape
    ///
    /// Missing nested fields become `None` in the output; nothing is
    /// synthesized and nothing fails the record.
    pub fn normalize(self) -> ObservationRecord {
        let (common_name, scientific_name) = match self.species_detail {
            Some(species) => (species.name, species.scientific_name),
            None => (None, None),
        };
        let coordinates = self.point.and_then(|p| p.coordinates);
        let longitude = coordinates.as_ref().and_then(|c| c.first().copied());
        let latitude = coordinates.as_ref().and_then(|c| c.get(1).copied());

        ObservationRecord {
            id: self.id,
            common_name,
            scientific_name,
            date: self.date,
            time: self.time,
            count: self.number,
            longitude,
            latitude,
            location: self.location_detail.and_then(|l| l.name),
            observer: self.user_detail.and_then(|u| u.name),
        }
    }
}

/// Transport seam for fetching observation pages
///
/// The implementation must tolerate concurrent use: one shared instance
/// serves every worker in the pool.
#[async_trait]
pub trait ObservationApi: Send + Sync {
    /// Fetch one page of observations for `task` starting at `offset`
    ///
    /// # Errors
    ///
    /// [`Error::RateLimited`] on HTTP 429, [`Error::UnexpectedStatus`] on any
    /// other non-success status, [`Error::Network`] on transport failures,
    /// and [`Error::MalformedBody`] when the body is empty or not the
    /// expected JSON shape.
    async fn fetch_page(&self, task: &FetchTask, offset: u64) -> Result<RawPage>;
}

/// Production [`ObservationApi`] backed by reqwest
///
/// Stateless and reentrant: the inner `reqwest::Client` is a connection
/// pool designed for concurrent use, so a single instance is shared across
/// all workers.
#[derive(Clone, Debug)]
pub struct HttpObservationApi {
    client: reqwest::Client,
    base_url: Url,
    page_size: usize,
}

impl HttpObservationApi {
    /// Build a client from the API configuration
    ///
    /// # Errors
    ///
    /// Returns a configuration error when `base_url` does not parse, or a
    /// network error when the underlying HTTP client cannot be constructed.
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| Error::Config {
            message: format!("invalid base URL '{}': {}", config.base_url, e),
            key: Some("base_url".to_string()),
        })?;

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url,
            page_size: config.page_size,
        })
    }
}

#[async_trait]
impl ObservationApi for HttpObservationApi {
    async fn fetch_page(&self, task: &FetchTask, offset: u64) -> Result<RawPage> {
        // Exclusive upper bound: the day after the task's date
        let date_before = task.date.checked_add_days(Days::new(1)).ok_or_else(|| {
            Error::Config {
                message: format!("cannot compute exclusive end of day for {}", task.date),
                key: None,
            }
        })?;

        let response = self
            .client
            .get(self.base_url.clone())
            .query(&[
                ("species_group", task.group.to_string()),
                ("date_after", task.date.format("%Y-%m-%d").to_string()),
                ("date_before", date_before.format("%Y-%m-%d").to_string()),
                ("limit", self.page_size.to_string()),
                ("offset", offset.to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(Error::RateLimited);
        }
        if !status.is_success() {
            return Err(Error::UnexpectedStatus {
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        let page: RawPage = serde_json::from_str(&body)?;
        Ok(page)
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GroupId;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn task() -> FetchTask {
        FetchTask::new("2025-07-01".parse().unwrap(), GroupId(4))
    }

    fn api_config(base_url: String) -> ApiConfig {
        ApiConfig {
            base_url,
            ..Default::default()
        }
    }

    // -----------------------------------------------------------------------
    // Normalization
    // -----------------------------------------------------------------------

    #[test]
    fn normalize_maps_all_nested_fields() {
        let raw: RawObservation = serde_json::from_str(
            r#"{
                "id": 123456,
                "date": "2025-07-01",
                "time": "14:30",
                "number": 2,
                "species_detail": {"name": "Small Tortoiseshell", "scientific_name": "Aglais urticae"},
                "point": {"coordinates": [4.895168, 52.370216]},
                "location_detail": {"name": "Vondelpark"},
                "user_detail": {"name": "J. Janssen"}
            }"#,
        )
        .unwrap();

        let record = raw.normalize();
        assert_eq!(record.id, Some(123456));
        assert_eq!(record.common_name.as_deref(), Some("Small Tortoiseshell"));
        assert_eq!(record.scientific_name.as_deref(), Some("Aglais urticae"));
        assert_eq!(record.date.as_deref(), Some("2025-07-01"));
        assert_eq!(record.time.as_deref(), Some("14:30"));
        assert_eq!(record.count, Some(2));
        assert_eq!(record.longitude, Some(4.895168));
        assert_eq!(record.latitude, Some(52.370216));
        assert_eq!(record.location.as_deref(), Some("Vondelpark"));
        assert_eq!(record.observer.as_deref(), Some("J. Janssen"));
    }

    #[test]
    fn normalize_missing_nested_fields_yield_nulls() {
        let raw: RawObservation = serde_json::from_str(r#"{"id": 7}"#).unwrap();
        let record = raw.normalize();

        assert_eq!(record.id, Some(7));
        assert_eq!(record.common_name, None);
        assert_eq!(record.scientific_name, None);
        assert_eq!(record.date, None);
        assert_eq!(record.time, None);
        assert_eq!(record.count, None);
        assert_eq!(record.longitude, None);
        assert_eq!(record.latitude, None);
        assert_eq!(record.location, None);
        assert_eq!(record.observer, None);
    }

    #[test]
    fn normalize_preserves_missing_coordinate_pair() {
        let raw: RawObservation =
            serde_json::from_str(r#"{"id": 1, "point": {"coordinates": null}}"#).unwrap();
        let record = raw.normalize();
        assert_eq!(record.longitude, None);
        assert_eq!(record.latitude, None);

        let raw: RawObservation = serde_json::from_str(r#"{"id": 2, "point": null}"#).unwrap();
        let record = raw.normalize();
        assert_eq!(record.longitude, None);
        assert_eq!(record.latitude, None);
    }

    #[test]
    fn normalize_tolerates_partial_species_detail() {
        let raw: RawObservation = serde_json::from_str(
            r#"{"id": 3, "species_detail": {"name": "Seven-spot Ladybird"}}"#,
        )
        .unwrap();
        let record = raw.normalize();
        assert_eq!(record.common_name.as_deref(), Some("Seven-spot Ladybird"));
        assert_eq!(record.scientific_name, None);
    }

    #[test]
    fn page_with_null_next_is_last() {
        let page: RawPage =
            serde_json::from_str(r#"{"results": [], "next": null}"#).unwrap();
        assert!(page.next.is_none());
        assert!(page.results.is_empty());
    }

    // -----------------------------------------------------------------------
    // HTTP client
    // -----------------------------------------------------------------------

    #[test]
    fn invalid_base_url_is_a_config_error() {
        let config = api_config("not a url".to_string());
        let err = HttpObservationApi::new(&config).unwrap_err();
        assert!(matches!(err, Error::Config { key: Some(ref k), .. } if k == "base_url"));
    }

    #[tokio::test]
    async fn fetch_page_sends_the_expected_query_parameters() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("species_group", "4"))
            .and(query_param("date_after", "2025-07-01"))
            .and(query_param("date_before", "2025-07-02"))
            .and(query_param("limit", "100"))
            .and(query_param("offset", "200"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [{"id": 1}],
                "next": null
            })))
            .expect(1)
            .mount(&server)
            .await;

        let api = HttpObservationApi::new(&api_config(server.uri())).unwrap();
        let page = api.fetch_page(&task(), 200).await.unwrap();

        assert_eq!(page.results.len(), 1);
        assert!(page.next.is_none());
    }

    #[tokio::test]
    async fn http_429_maps_to_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let api = HttpObservationApi::new(&api_config(server.uri())).unwrap();
        let err = api.fetch_page(&task(), 0).await.unwrap_err();
        assert!(matches!(err, Error::RateLimited));
    }

    #[tokio::test]
    async fn http_500_maps_to_unexpected_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let api = HttpObservationApi::new(&api_config(server.uri())).unwrap();
        let err = api.fetch_page(&task(), 0).await.unwrap_err();
        assert!(matches!(err, Error::UnexpectedStatus { status: 500 }));
    }

    #[tokio::test]
    async fn garbled_body_maps_to_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
            .mount(&server)
            .await;

        let api = HttpObservationApi::new(&api_config(server.uri())).unwrap();
        let err = api.fetch_page(&task(), 0).await.unwrap_err();
        assert!(matches!(err, Error::MalformedBody(_)));
    }

    #[tokio::test]
    async fn empty_body_maps_to_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(""))
            .mount(&server)
            .await;

        let api = HttpObservationApi::new(&api_config(server.uri())).unwrap();
        let err = api.fetch_page(&task(), 0).await.unwrap_err();
        assert!(matches!(err, Error::MalformedBody(_)));
    }
}
