use chrono::{DateTime, Local, TimeZone};
use clap::ValueEnum;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::de::DeserializeOwned;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ImageFit {
    ScaleDown,
    Contain,
    Cover,
    Crop,
    Pad,
}

impl ImageFit {
    fn as_str(self) -> &'static str {
        match self {
            Self::ScaleDown => "scale-down",
            Self::Contain => "contain",
            Self::Cover => "cover",
            Self::Crop => "crop",
            Self::Pad => "pad",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ImageFormat {
    Auto,
    Webp,
    Avif,
    Json,
}

impl ImageFormat {
    fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Webp => "webp",
            Self::Avif => "avif",
            Self::Json => "json",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct CustomVariant {
    pub(crate) width: Option<u32>,
    pub(crate) height: Option<u32>,
    pub(crate) fit: Option<ImageFit>,
    pub(crate) quality: Option<u32>,
    pub(crate) format: Option<ImageFormat>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ImageVariant {
    Named(String),
    Custom(CustomVariant),
}

/// Builds the delivery URL for an image id on the image domain.
pub(crate) fn image_url(domain: &str, image_id: &str, variant: &ImageVariant) -> String {
    let custom = match variant {
        ImageVariant::Named(name) => return format!("https://{domain}/{image_id}/{name}"),
        ImageVariant::Custom(custom) => custom,
    };

    let mut params: Vec<(&str, String)> = Vec::new();
    if let Some(width) = custom.width.filter(|v| *v > 0) {
        params.push(("width", width.to_string()));
    }
    if let Some(height) = custom.height.filter(|v| *v > 0) {
        params.push(("height", height.to_string()));
    }
    if let Some(fit) = custom.fit {
        params.push(("fit", fit.as_str().to_string()));
    }
    if let Some(quality) = custom.quality.filter(|v| *v > 0) {
        params.push(("quality", quality.to_string()));
    }
    if let Some(format) = custom.format {
        params.push(("format", format.as_str().to_string()));
    }

    let base = format!("https://{domain}/{image_id}/public");
    if params.is_empty() {
        return base;
    }
    let query = params
        .iter()
        .map(|(key, value)| format!("{key}={}", encode_uri_component(value)))
        .collect::<Vec<_>>()
        .join("&");
    format!("{base}?{query}")
}

fn local_datetime(unix_secs: i64) -> Option<DateTime<Local>> {
    Local.timestamp_opt(unix_secs, 0).single()
}

pub(crate) fn format_date(unix_secs: i64) -> String {
    local_datetime(unix_secs)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".to_string())
}

pub(crate) fn format_date_time(unix_secs: i64) -> String {
    local_datetime(unix_secs)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

pub(crate) fn relative_time(unix_secs: i64, now_secs: i64) -> String {
    let seconds = now_secs.saturating_sub(unix_secs).max(0);
    let minutes = seconds / 60;
    let hours = minutes / 60;
    let days = hours / 24;
    let months = days / 30;
    let years = days / 365;

    let (value, unit) = if years > 0 {
        (years, "year")
    } else if months > 0 {
        (months, "month")
    } else if days > 0 {
        (days, "day")
    } else if hours > 0 {
        (hours, "hour")
    } else if minutes > 0 {
        (minutes, "minute")
    } else {
        return "just now".to_string();
    };
    let plural = if value == 1 { "" } else { "s" };
    format!("{value} {unit}{plural} ago")
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    let mut out = s.to_string();
    if out.chars().count() > max {
        out = out.chars().take(max.saturating_sub(3)).collect::<String>() + "...";
    }
    out
}

pub(crate) fn parse_json_or<T: DeserializeOwned>(raw: Option<&str>, default: T) -> T {
    let Some(raw) = raw.filter(|raw| !raw.trim().is_empty()) else {
        return default;
    };
    serde_json::from_str(raw).unwrap_or(default)
}

/// Characters JavaScript's `encodeURIComponent` leaves alone stay literal.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

pub(crate) fn encode_uri_component(raw: &str) -> String {
    utf8_percent_encode(raw, URI_COMPONENT).to_string()
}

pub(crate) fn episode_url(site_url: &str, work_slug: &str, episode_slug: &str) -> String {
    format!(
        "{}/works/{work_slug}/episodes/{episode_slug}",
        site_url.trim_end_matches('/')
    )
}

pub(crate) fn share_intent_url(text: &str, url: &str) -> String {
    format!(
        "https://twitter.com/intent/tweet?text={}&url={}",
        encode_uri_component(text),
        encode_uri_component(url)
    )
}

pub(crate) fn episode_label(number: i64) -> String {
    format!("Episode {number}")
}

pub(crate) fn format_count(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if value < 0 {
        out.insert(0, '-');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_variant_builds_path_url() {
        let url = image_url(
            "img.unbelong.xyz",
            "abc",
            &ImageVariant::Named("thumbnail".to_string()),
        );
        assert_eq!(url, "https://img.unbelong.xyz/abc/thumbnail");
    }

    #[test]
    fn custom_variant_only_includes_set_params() {
        let url = image_url(
            "img.test",
            "abc",
            &ImageVariant::Custom(CustomVariant {
                width: Some(640),
                fit: Some(ImageFit::ScaleDown),
                format: Some(ImageFormat::Webp),
                ..CustomVariant::default()
            }),
        );
        assert_eq!(
            url,
            "https://img.test/abc/public?width=640&fit=scale-down&format=webp"
        );
    }

    #[test]
    fn empty_custom_variant_has_no_query() {
        let url = image_url("img.test", "abc", &ImageVariant::Custom(CustomVariant::default()));
        assert_eq!(url, "https://img.test/abc/public");
    }

    #[test]
    fn relative_time_picks_largest_unit() {
        let now = 1_700_000_000;
        assert_eq!(relative_time(now - 30, now), "just now");
        assert_eq!(relative_time(now - 60, now), "1 minute ago");
        assert_eq!(relative_time(now - 3 * 3600, now), "3 hours ago");
        assert_eq!(relative_time(now - 40 * 86_400, now), "1 month ago");
        assert_eq!(relative_time(now - 800 * 86_400, now), "2 years ago");
        assert_eq!(relative_time(now + 500, now), "just now");
    }

    #[test]
    fn truncate_appends_ellipsis() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a long title here", 10), "a long ...");
    }

    #[test]
    fn parse_json_or_falls_back_on_bad_input() {
        let tags: Vec<String> = parse_json_or(Some(r#"["sf","comedy"]"#), Vec::new());
        assert_eq!(tags, ["sf", "comedy"]);
        let bad: Vec<String> = parse_json_or(Some("{not json"), Vec::new());
        assert!(bad.is_empty());
        let missing: Vec<String> = parse_json_or(None, Vec::new());
        assert!(missing.is_empty());
    }

    #[test]
    fn encode_uri_component_matches_javascript() {
        assert_eq!(encode_uri_component("a b&c/d"), "a%20b%26c%2Fd");
        assert_eq!(encode_uri_component("(ok)!*~'"), "(ok)!*~'");
        assert_eq!(encode_uri_component("第1話"), "%E7%AC%AC1%E8%A9%B1");
        assert_eq!(encode_uri_component("a+b=c?#%"), "a%2Bb%3Dc%3F%23%25");
    }

    #[test]
    fn share_intent_encodes_text_and_url() {
        let url = episode_url("https://comic.test/", "my-work", "ep-1");
        assert_eq!(url, "https://comic.test/works/my-work/episodes/ep-1");
        assert_eq!(
            share_intent_url("Work Episode 1", &url),
            "https://twitter.com/intent/tweet?text=Work%20Episode%201&url=https%3A%2F%2Fcomic.test%2Fworks%2Fmy-work%2Fepisodes%2Fep-1"
        );
    }

    #[test]
    fn format_count_groups_thousands() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1234567), "1,234,567");
    }
}
