use thiserror::Error;

/// A draft rejected before it is sent anywhere.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field was empty after trimming. Carries the field label.
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("Please enter a valid URL")]
    InvalidUrl(String),
}
