use std::fmt;

/// Error reported by a graphics backend when it refuses a request.
///
/// Resource creation and presentation are the only fallible backend calls;
/// everything else is either infallible or a programmer error caught by the
/// caller's assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendError(pub String);

impl BackendError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "graphics backend error: {}", self.0)
    }
}

impl std::error::Error for BackendError {}

impl From<String> for BackendError {
    fn from(msg: String) -> Self {
        Self(msg)
    }
}
