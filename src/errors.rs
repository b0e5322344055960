use thiserror::Error;

/// Conditions that abort a test case immediately, regardless of the
/// fail-fast setting.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid HTTP method {method:?}")]
    InvalidMethod { method: String },
    #[error("invalid URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("invalid request header {name:?}")]
    InvalidHeader { name: String },
    #[error("couldn't encode JSON request body: {source}")]
    EncodeBody {
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to build HTTP client: {source}")]
    BuildClient {
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to build request: {source}")]
    BuildRequest {
        #[source]
        source: reqwest::Error,
    },
    #[error("request failed: {source}")]
    Transport {
        #[source]
        source: reqwest::Error,
    },
    #[error("couldn't decode response body: {source}")]
    DecodeResponse {
        #[source]
        source: serde_json::Error,
    },
    #[error("couldn't convert value for comparison: {source}")]
    CompareValue {
        #[source]
        source: serde_json::Error,
    },
    #[error("couldn't parse URL (error: {source}): {href}")]
    ParseUrl {
        href: String,
        #[source]
        source: url::ParseError,
    },
    #[error("environment variable {name} is not set")]
    MissingEnv { name: String },
}

pub type Result<T> = std::result::Result<T, Error>;
