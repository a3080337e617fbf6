use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use crate::format::parse_json_or;

/// Envelope wrapping every content API response.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiResponse<T> {
    #[serde(default)]
    pub(crate) success: bool,
    pub(crate) data: Option<T>,
    #[serde(default)]
    pub(crate) error: Option<String>,
    #[serde(default)]
    pub(crate) message: Option<String>,
    #[serde(default)]
    pub(crate) pagination: Option<Pagination>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub(crate) struct Pagination {
    pub(crate) page: u32,
    pub(crate) limit: u32,
    pub(crate) total: u32,
    #[serde(rename = "totalPages")]
    pub(crate) total_pages: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum WorkType {
    Comic,
    Illustration,
    #[serde(other)]
    Other,
}

impl WorkType {
    pub(crate) fn label(self) -> &'static str {
        match self {
            Self::Comic => "Comic",
            Self::Illustration => "Illustration",
            Self::Other => "Work",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Work {
    pub(crate) id: String,
    #[serde(rename = "type")]
    pub(crate) work_type: WorkType,
    pub(crate) title: String,
    pub(crate) slug: String,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(default)]
    pub(crate) author: String,
    #[serde(default)]
    pub(crate) thumbnail_image_id: Option<String>,
    #[serde(default)]
    tags: Option<Value>,
    #[serde(default)]
    pub(crate) published_at: Option<i64>,
}

impl Work {
    /// Tags arrive as a JSON-encoded array string; a decoded array is also
    /// accepted. Anything malformed yields no tags.
    pub(crate) fn tags(&self) -> Vec<String> {
        decode_embedded_json(self.tags.as_ref(), Vec::new())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Episode {
    pub(crate) id: String,
    #[serde(default)]
    pub(crate) work_id: String,
    pub(crate) episode_number: i64,
    pub(crate) title: String,
    pub(crate) slug: String,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(default)]
    pub(crate) content: String,
    #[serde(default)]
    pub(crate) view_count: i64,
    #[serde(default)]
    pub(crate) published_at: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Comment {
    #[serde(default)]
    pub(crate) author_name: Option<String>,
    pub(crate) content: String,
    #[serde(default)]
    pub(crate) created_at: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct AuthorProfile {
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) bio: Option<String>,
    #[serde(default)]
    pub(crate) avatar_image_id: Option<String>,
    #[serde(default)]
    social_links: Option<Value>,
}

impl AuthorProfile {
    /// Social links keyed by service name, with blank entries dropped.
    pub(crate) fn social_links(&self) -> BTreeMap<String, String> {
        let links: BTreeMap<String, Value> =
            decode_embedded_json(self.social_links.as_ref(), BTreeMap::new());
        links
            .into_iter()
            .filter_map(|(key, value)| match value {
                Value::String(url) if !url.trim().is_empty() => Some((key, url.trim().to_string())),
                _ => None,
            })
            .collect()
    }
}

fn decode_embedded_json<T: serde::de::DeserializeOwned>(value: Option<&Value>, default: T) -> T {
    match value {
        Some(Value::String(raw)) => parse_json_or(Some(raw.as_str()), default),
        Some(Value::Null) | None => default,
        Some(other) => serde_json::from_value(other.clone()).unwrap_or(default),
    }
}
