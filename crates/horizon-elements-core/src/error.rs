//! Error types for Horizon Elements.

/// A specialized Result type for Horizon Elements operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for Horizon Elements operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Element-related error.
    #[error("Element error: {0}")]
    Element(#[from] ElementError),
    /// Timer-related error.
    #[error("Timer error: {0}")]
    Timer(#[from] TimerError),
    /// A callback panicked and the panic was contained.
    #[error("Callback panicked: {0}")]
    Panicked(String),
}

/// Element tree and custom element errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ElementError {
    /// A part the element depends on could not be found among its descendants.
    #[error("<{host}> is missing its required '{part}' part")]
    MissingPart {
        /// Tag name of the host element.
        host: String,
        /// Name of the missing part.
        part: &'static str,
    },
    /// A custom element with this tag name is already defined.
    #[error("Custom element '{0}' is already defined")]
    AlreadyDefined(String),
    /// The tag name is not a valid custom element name.
    #[error("Invalid custom element name '{0}': names must be lowercase and contain a hyphen")]
    InvalidTagName(String),
    /// No custom element is defined for this tag name.
    #[error("No custom element is defined for '{0}'")]
    Undefined(String),
    /// The element is not attached to a document.
    #[error("Element <{0}> is not attached to a document")]
    Detached(String),
}

impl ElementError {
    /// Create a missing part error.
    pub fn missing_part(host: impl Into<String>, part: &'static str) -> Self {
        Self::MissingPart {
            host: host.into(),
            part,
        }
    }
}

/// Timer-specific errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimerError {
    /// The timer ID is invalid or has already fired.
    #[error("Invalid or expired timer ID")]
    InvalidTimerId,
}
