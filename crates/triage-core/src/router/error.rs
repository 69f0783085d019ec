//! Error types for ticket routing

use thiserror::Error;

/// Failure of the classification capability itself
#[derive(Error, Debug)]
pub enum ClassifierError {
    /// The provider call failed (network, HTTP status, timeout)
    #[error("classification request failed: {0:#}")]
    Provider(#[source] anyhow::Error),

    /// The provider answered, but not with a routing payload
    #[error("malformed classification response: {0}")]
    Malformed(String),
}

/// Errors returned by [`TicketRouter`](super::TicketRouter)
#[derive(Error, Debug)]
pub enum RouterError {
    /// Nothing to classify
    #[error("cannot route an empty conversation")]
    EmptyConversation,

    /// The classifier could not produce a decision
    #[error("classification unavailable: {0}")]
    ClassificationUnavailable(#[from] ClassifierError),

    /// The classifier produced a label outside the fixed set, or none at all
    #[error("unrecognized category: {}", label.as_deref().unwrap_or("<missing>"))]
    UnrecognizedCategory { label: Option<String> },
}

impl RouterError {
    pub fn is_unrecognized_category(&self) -> bool {
        matches!(self, Self::UnrecognizedCategory { .. })
    }

    pub fn is_classification_unavailable(&self) -> bool {
        matches!(self, Self::ClassificationUnavailable(_))
    }
}
