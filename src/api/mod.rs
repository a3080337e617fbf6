mod types;

use std::time::Duration;

use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::http::{HttpFailure, RetryPolicy, get_text_with_retries};

use types::ApiResponse;
pub(crate) use types::{AuthorProfile, Comment, Episode, Pagination, Work};

const API_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const API_READ_TIMEOUT: Duration = Duration::from_secs(15);
const API_ATTEMPTS: usize = 3;
const API_RETRY_DELAY: Duration = Duration::from_millis(300);

pub(crate) const DEFAULT_COMMENT_LIMIT: u32 = 20;

#[derive(Debug, Error)]
pub(crate) enum ApiError {
    #[error("{0}")]
    Transport(String),
    #[error("failed to decode response from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("{endpoint} rejected the request: {}", describe_rejection(.error, .message))]
    Rejected {
        endpoint: String,
        error: Option<String>,
        message: Option<String>,
    },
    #[error("{endpoint} returned no data")]
    MissingData { endpoint: String },
}

impl ApiError {
    /// True when the API said the resource does not exist.
    pub(crate) fn is_not_found(&self) -> bool {
        match self {
            Self::Rejected { error, message, .. } => [error, message]
                .into_iter()
                .flatten()
                .any(|text| text.to_ascii_lowercase().contains("not found")),
            _ => false,
        }
    }
}

fn describe_rejection(error: &Option<String>, message: &Option<String>) -> String {
    match (error.as_deref(), message.as_deref()) {
        (Some(error), Some(message)) => format!("{error} ({message})"),
        (Some(text), None) | (None, Some(text)) => text.to_string(),
        (None, None) => "unknown error".to_string(),
    }
}

/// One page of a paginated listing.
#[derive(Debug, Clone)]
pub(crate) struct Page<T> {
    pub(crate) items: Vec<T>,
    pub(crate) pagination: Option<Pagination>,
}

#[derive(Debug, Clone)]
pub(crate) struct ApiClient {
    base_url: String,
    policy: RetryPolicy,
}

impl ApiClient {
    pub(crate) fn new(base_url: &str) -> Self {
        Self::with_policy(
            base_url,
            RetryPolicy {
                connect_timeout: API_CONNECT_TIMEOUT,
                read_timeout: API_READ_TIMEOUT,
                attempts: API_ATTEMPTS,
                retry_delay: API_RETRY_DELAY,
            },
        )
    }

    pub(crate) fn with_policy(base_url: &str, policy: RetryPolicy) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            policy,
        }
    }

    pub(crate) fn list_works(&self) -> Result<Vec<Work>, ApiError> {
        self.get_data(
            "/works",
            &[
                ("type", "comic".to_string()),
                ("status", "published".to_string()),
            ],
        )
    }

    pub(crate) fn work_by_slug(&self, slug: &str) -> Result<Work, ApiError> {
        self.get_data(&format!("/works/slug/{}", path_segment(slug)), &[])
    }

    pub(crate) fn work(&self, id: &str) -> Result<Work, ApiError> {
        self.get_data(&format!("/works/{}", path_segment(id)), &[])
    }

    pub(crate) fn episodes_by_work(&self, work_id: &str) -> Result<Vec<Episode>, ApiError> {
        self.get_data(
            "/episodes",
            &[
                ("work_id", work_id.to_string()),
                ("status", "published".to_string()),
            ],
        )
    }

    pub(crate) fn episode(&self, id: &str) -> Result<Episode, ApiError> {
        self.get_data(&format!("/episodes/{}", path_segment(id)), &[])
    }

    pub(crate) fn episode_by_slug(
        &self,
        work_slug: &str,
        episode_slug: &str,
    ) -> Result<Episode, ApiError> {
        self.get_data(
            &format!(
                "/works/slug/{}/episodes/{}",
                path_segment(work_slug),
                path_segment(episode_slug)
            ),
            &[],
        )
    }

    pub(crate) fn comments_by_episode(
        &self,
        episode_id: &str,
        page: u32,
        limit: u32,
    ) -> Result<Page<Comment>, ApiError> {
        let endpoint = "/comments";
        let response: ApiResponse<Vec<Comment>> = self.get_envelope(
            endpoint,
            &[
                ("episode_id", episode_id.to_string()),
                ("status", "approved".to_string()),
                ("page", page.max(1).to_string()),
                ("limit", limit.max(1).to_string()),
            ],
        )?;
        let pagination = response.pagination;
        let items = into_data(endpoint, response)?;
        Ok(Page { items, pagination })
    }

    pub(crate) fn author(&self) -> Result<AuthorProfile, ApiError> {
        self.get_data("/author", &[])
    }

    fn get_data<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let response = self.get_envelope(endpoint, query)?;
        into_data(endpoint, response)
    }

    fn get_envelope<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<ApiResponse<T>, ApiError> {
        let url = format!("{}{endpoint}", self.base_url);
        let body = match get_text_with_retries(&url, query, &self.policy) {
            Ok(body) => body,
            Err(failure) => return Err(rejection_from_failure(endpoint, failure)),
        };
        serde_json::from_str(&body).map_err(|source| ApiError::Decode {
            endpoint: endpoint.to_string(),
            source,
        })
    }
}

/// Error statuses usually still carry the envelope; surface its message
/// instead of the raw HTTP failure when it does.
fn rejection_from_failure(endpoint: &str, failure: HttpFailure) -> ApiError {
    let envelope = failure
        .body
        .as_deref()
        .and_then(|body| serde_json::from_str::<ApiResponse<serde_json::Value>>(body).ok())
        .filter(|envelope| envelope.error.is_some() || envelope.message.is_some());
    match envelope {
        Some(envelope) => {
            log::debug!(
                "{endpoint} answered HTTP {:?} with an error envelope",
                failure.status
            );
            ApiError::Rejected {
                endpoint: endpoint.to_string(),
                error: envelope.error,
                message: envelope.message,
            }
        }
        None => ApiError::Transport(format!("{endpoint}: {failure}")),
    }
}

fn into_data<T>(endpoint: &str, response: ApiResponse<T>) -> Result<T, ApiError> {
    if !response.success {
        return Err(ApiError::Rejected {
            endpoint: endpoint.to_string(),
            error: response.error,
            message: response.message,
        });
    }
    response.data.ok_or_else(|| ApiError::MissingData {
        endpoint: endpoint.to_string(),
    })
}

fn path_segment(raw: &str) -> String {
    crate::format::encode_uri_component(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::test_server::{Behavior, TestServer};

    fn client(server: &TestServer) -> ApiClient {
        ApiClient::with_policy(
            &format!("{}/", server.base_url),
            RetryPolicy {
                connect_timeout: Duration::from_millis(250),
                read_timeout: Duration::from_millis(500),
                attempts: 2,
                retry_delay: Duration::from_millis(1),
            },
        )
    }

    fn ok(body: &str) -> Behavior {
        Behavior::Respond(200, body.to_string())
    }

    const WORK: &str = r#"{"id":"w1","type":"comic","title":"Night Shift","slug":"night-shift","description":"d","author":"A","status":"published","tags":"[\"sf\"]","created_at":1,"updated_at":2,"published_at":1700000000}"#;

    #[test]
    fn list_works_requests_published_comics() {
        let server = TestServer::spawn(vec![ok(&format!(r#"{{"success":true,"data":[{WORK}]}}"#))]);
        let works = client(&server).list_works().expect("works");
        assert_eq!(works.len(), 1);
        assert_eq!(works[0].slug, "night-shift");
        assert_eq!(
            server.request_lines()[0].split(' ').nth(1),
            Some("/works?type=comic&status=published")
        );
    }

    #[test]
    fn episode_by_slug_builds_nested_path() {
        let server = TestServer::spawn(vec![ok(
            r##"{"success":true,"data":{"id":"e1","work_id":"w1","episode_number":1,"title":"One","slug":"ep-1","content":"# Hi","status":"published","view_count":3,"published_at":null}}"##,
        )]);
        let episode = client(&server)
            .episode_by_slug("night-shift", "ep-1")
            .expect("episode");
        assert_eq!(episode.content, "# Hi");
        assert!(
            server.request_lines()[0].starts_with("GET /works/slug/night-shift/episodes/ep-1 ")
        );
    }

    #[test]
    fn comments_carry_pagination_and_query() {
        let server = TestServer::spawn(vec![ok(
            r#"{"success":true,"data":[],"pagination":{"page":2,"limit":5,"total":6,"totalPages":2}}"#,
        )]);
        let page = client(&server)
            .comments_by_episode("e1", 2, 5)
            .expect("comments");
        assert!(page.items.is_empty());
        assert_eq!(page.pagination.map(|p| p.total), Some(6));
        assert_eq!(
            server.request_lines()[0].split(' ').nth(1),
            Some("/comments?episode_id=e1&status=approved&page=2&limit=5")
        );
    }

    #[test]
    fn unsuccessful_envelope_maps_to_rejected() {
        let server = TestServer::spawn(vec![ok(
            r#"{"success":false,"error":"Work not found"}"#,
        )]);
        let err = client(&server).work("missing").expect_err("should fail");
        assert!(err.is_not_found(), "unexpected error: {err}");
        assert!(matches!(err, ApiError::Rejected { .. }));
    }

    #[test]
    fn http_error_with_envelope_body_maps_to_rejected() {
        let server = TestServer::spawn(vec![Behavior::Respond(
            404,
            r#"{"success":false,"error":"Not found","message":"no such episode"}"#.to_string(),
        )]);
        let err = client(&server).episode("nope").expect_err("should fail");
        assert!(err.is_not_found());
        assert_eq!(
            err.to_string(),
            "/episodes/nope rejected the request: Not found (no such episode)"
        );
        assert_eq!(server.request_count(), 1);
    }

    #[test]
    fn success_without_data_is_missing_data() {
        let server = TestServer::spawn(vec![ok(r#"{"success":true}"#)]);
        let err = client(&server).author().expect_err("should fail");
        assert!(matches!(err, ApiError::MissingData { .. }));
    }

    #[test]
    fn malformed_body_is_a_decode_error() {
        let server = TestServer::spawn(vec![ok("<html>")]);
        let err = client(&server).list_works().expect_err("should fail");
        assert!(matches!(err, ApiError::Decode { .. }));
    }

    #[test]
    fn server_errors_without_envelope_are_transport_errors() {
        let server = TestServer::spawn(vec![
            Behavior::Respond(502, "bad gateway".to_string()),
            Behavior::Respond(502, "bad gateway".to_string()),
        ]);
        let err = client(&server).author().expect_err("should fail");
        assert!(matches!(err, ApiError::Transport(_)));
        assert!(!err.is_not_found());
        assert_eq!(server.request_count(), 2);
    }
}
