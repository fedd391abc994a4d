/// Errors raised by the network-facing infrastructure shared by the checker crates.
///
/// These cover the two remote collaborators of an analysis: the article host and the
/// local inference backend. Service crates wrap `CommonError` via `#[from]` and map
/// each variant onto their own failure taxonomy.

#[derive(Debug, thiserror::Error)]
pub enum CommonError {
    #[error("http client setup failed: {0}")]
    Client(#[from] reqwest::Error),

    #[error("page fetch failed after {attempts} attempts: {source}")]
    Fetch {
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },

    #[error("could not connect to model backend: {0}")]
    ModelConnection(#[source] reqwest::Error),

    #[error("model backend returned status {status}")]
    ModelBackend { status: u16 },

    #[error("model call failed: {0}")]
    ModelUnknown(String),
}
