use bytes::Bytes;
use reqwest::StatusCode;
use thiserror::Error;
use url::Url;

/// All different error types this crate uses.
#[derive(Error, Debug)]
pub enum CurateError {
    /// Received a non success Http response that was not retried.
    #[error("HttpError encountered when trying to scrape {url}: {status}")]
    HttpFailure {
        /// The link that was requested.
        url: Url,
        /// Status of the final response.
        status: StatusCode,
    },
    /// Failed to get a response.
    #[error("Request failed: {error}")]
    HttpRequestFailure {
        /// The reqwest error.
        #[from]
        error: reqwest::Error,
    },
    /// Failed to read a document.
    #[error("Failed to read {url} html as document")]
    ReadDocument {
        /// The link of the document.
        url: Url,
        /// The content the resulted in the error.
        body: Bytes,
    },
    /// None of the configured tags matched any node of the page.
    #[error("No node matching the configured tags found in {url}")]
    NoMatchingNode {
        /// The link of the document.
        url: Url,
    },
    /// The search option is not one of the known options.
    #[error("Unrecognized search option `{key}`")]
    UnknownSearchOption { key: String },
    /// The value of a known search option could not be parsed.
    #[error("Invalid value `{value}` for search option `{key}`")]
    InvalidSearchOption { key: String, value: String },
    /// A `KEY=VALUE` pair without a `=`.
    #[error("Expected KEY=VALUE but got `{pair}`")]
    MalformedPair { pair: String },
    /// The store holds no row with that id.
    #[error("No row with id {id} in the tweets table")]
    UnknownRow { id: usize },
    /// The posting API rejected the request.
    #[error("Publishing failed with {status}: {body}")]
    Publish { status: StatusCode, body: String },
}
