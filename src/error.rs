use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Construction-time configuration problem; never retryable.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The configuration endpoint could not be reached during discovery.
    #[error("discovery connection to {endpoint} failed: {source}")]
    Connectivity {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },

    /// Discovery failed; carries the endpoint and the original cause.
    #[error("cannot connect to cluster {endpoint}: {source}")]
    ClusterUnreachable {
        endpoint: String,
        #[source]
        source: Box<Error>,
    },

    /// The configuration endpoint answered with a structurally invalid response.
    #[error("malformed discovery response: {0}")]
    Protocol(String),

    /// Opaque failure raised by the underlying key-value client.
    #[error("backend error: {0}")]
    Backend(String),
}
