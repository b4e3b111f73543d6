use std::fmt;

use crate::providers::ProviderError;

/// Classified failure from any public gift operation.
///
/// Callers match on the variant to decide what to surface: validation and
/// state errors are the caller's fault, `Invariant` is ours, `Provider` and
/// `Store` wrap the layers below.
#[derive(Debug)]
pub enum GiftError {
    /// Malformed input: empty title, negative price, bad count, missing row.
    Validation(String),
    /// The addressed idea does not belong to the addressed giftee.
    OutOfRange { giftee_id: i64, idea_id: i64 },
    /// Rank density or uniqueness broke. A bug if ever observed.
    Invariant(String),
    /// `advance` on an idea that is already given.
    TerminalState,
    /// `revert` on an idea that is still considering.
    InitialState,
    /// Scenario tag outside the closed set.
    UnknownScenario(String),
    /// A brainstorm for this giftee is already in flight.
    AlreadyInProgress { giftee_id: i64 },
    /// The generation reply yielded zero usable suggestions.
    EmptyResponse,
    /// The caller cancelled before the generation call resolved.
    Cancelled,
    /// Classified failure from the generation provider.
    Provider(ProviderError),
    /// Persistence failure.
    Store(anyhow::Error),
}

impl fmt::Display for GiftError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GiftError::Validation(msg) => write!(f, "invalid input: {msg}"),
            GiftError::OutOfRange { giftee_id, idea_id } => {
                write!(f, "gift idea {idea_id} does not belong to giftee {giftee_id}")
            }
            GiftError::Invariant(msg) => write!(f, "rank invariant violated: {msg}"),
            GiftError::TerminalState => {
                write!(f, "gift is already given; there is no later status")
            }
            GiftError::InitialState => {
                write!(f, "gift is still being considered; there is no earlier status")
            }
            GiftError::UnknownScenario(tag) => write!(f, "unknown brainstorm scenario: {tag}"),
            GiftError::AlreadyInProgress { giftee_id } => {
                write!(f, "a brainstorm for giftee {giftee_id} is already in progress")
            }
            GiftError::EmptyResponse => {
                write!(f, "the generation reply contained no parseable suggestions")
            }
            GiftError::Cancelled => write!(f, "brainstorm cancelled"),
            GiftError::Provider(e) => write!(f, "{e}"),
            GiftError::Store(e) => write!(f, "store error: {e}"),
        }
    }
}

impl std::error::Error for GiftError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GiftError::Provider(e) => Some(e),
            GiftError::Store(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl From<ProviderError> for GiftError {
    fn from(e: ProviderError) -> Self {
        GiftError::Provider(e)
    }
}

impl From<anyhow::Error> for GiftError {
    fn from(e: anyhow::Error) -> Self {
        GiftError::Store(e)
    }
}
