//! Source identifier parsing and URL helpers.

use url::Url;

/// Errors that can occur while turning user input into a source id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceIdError {
    /// URL is not a valid YouTube URL
    InvalidYoutubeUrl,
    /// Video ID has invalid format
    InvalidVideoId,
    /// Video ID not found in URL
    VideoIdNotFound,
}

impl std::fmt::Display for SourceIdError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceIdError::InvalidYoutubeUrl => write!(f, "URL is not a valid YouTube URL"),
            SourceIdError::InvalidVideoId => write!(f, "Video ID has invalid format"),
            SourceIdError::VideoIdNotFound => write!(f, "Video ID not found in URL"),
        }
    }
}

impl std::error::Error for SourceIdError {}

/// Result type for source id parsing.
pub type SourceIdResult<T> = Result<T, SourceIdError>;

const WATCH_URL_PREFIX: &str = "https://www.youtube.com/watch?v=";

/// Canonical watch URL for a source id.
pub fn watch_url(source_id: &str) -> String {
    format!("{}{}", WATCH_URL_PREFIX, source_id)
}

/// Extract the 11-character video id from a YouTube URL.
///
/// Supports `watch?v=`, `youtu.be/`, `/embed/`, `/v/`, `/shorts/` and `/live/`
/// forms, with or without extra query parameters and fragments.
pub fn extract_youtube_id(url: &str) -> SourceIdResult<String> {
    let parsed = Url::parse(url.trim()).map_err(|_| SourceIdError::InvalidYoutubeUrl)?;
    let host = parsed
        .host_str()
        .map(|h| h.to_ascii_lowercase())
        .ok_or(SourceIdError::InvalidYoutubeUrl)?;

    let candidate = if host == "youtu.be" || host == "www.youtu.be" {
        first_path_segment(&parsed)
    } else if host == "youtube.com" || host.ends_with(".youtube.com") {
        parsed
            .query_pairs()
            .find(|(k, _)| k == "v")
            .map(|(_, v)| v.into_owned())
            .or_else(|| prefixed_path_segment(&parsed))
    } else {
        return Err(SourceIdError::InvalidYoutubeUrl);
    };

    let id = candidate.ok_or(SourceIdError::VideoIdNotFound)?;
    validate_youtube_id(id)
}

/// Accept either a bare source id or a YouTube URL and return the source id.
pub fn normalize_source(input: &str) -> SourceIdResult<String> {
    let input = input.trim();
    if input.starts_with("http://") || input.starts_with("https://") {
        return extract_youtube_id(input);
    }

    if input.is_empty() || !is_valid_id_chars(input) {
        return Err(SourceIdError::InvalidVideoId);
    }
    Ok(input.to_string())
}

fn first_path_segment(url: &Url) -> Option<String> {
    url.path_segments()?
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

fn prefixed_path_segment(url: &Url) -> Option<String> {
    let mut segments = url.path_segments()?.filter(|s| !s.is_empty());
    match segments.next()? {
        "embed" | "v" | "shorts" | "live" => segments.next().map(str::to_string),
        _ => None,
    }
}

fn is_valid_id_chars(s: &str) -> bool {
    s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn validate_youtube_id(id: String) -> SourceIdResult<String> {
    if id.len() != 11 || !is_valid_id_chars(&id) {
        return Err(SourceIdError::InvalidVideoId);
    }
    Ok(id)
}
