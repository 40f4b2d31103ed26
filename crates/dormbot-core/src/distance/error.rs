use thiserror::Error;

/// Errors surfaced to callers of the distance resolver.
#[derive(Debug, Error)]
pub enum DistanceError {
    #[error("dormitory '{dorm}' has no valid coordinates")]
    MissingCoordinates { dorm: String },
}

/// Routing provider failures. The resolver consumes all of these by falling
/// back to a great-circle estimate.
#[derive(Debug, Error)]
pub enum RoutingError {
    #[error("routing provider API key is not configured")]
    NotConfigured,

    #[error("routing request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("routing provider returned HTTP {0}")]
    Status(reqwest::StatusCode),

    #[error("malformed routing response: {0}")]
    Malformed(String),
}
