use std::fmt;

/// Failures the reader session has to tell apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReaderError {
    /// Network or payload failure at the content provider. Recoverable on the
    /// next explicit navigation.
    ContentUnavailable { resource: String, reason: String },
    /// The feed was fetched but nothing in it can be read here.
    NoReadableChapters { manga_id: String },
}

impl ReaderError {
    pub fn unavailable(resource: impl Into<String>, reason: impl fmt::Display) -> Self {
        ReaderError::ContentUnavailable {
            resource: resource.into(),
            reason: reason.to_string(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ReaderError::NoReadableChapters { .. })
    }
}

impl fmt::Display for ReaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReaderError::ContentUnavailable { resource, reason } => {
                write!(f, "could not load {}: {}", resource, reason)
            }
            ReaderError::NoReadableChapters { manga_id } => write!(
                f,
                "no readable chapters for manga {} (licensed, externally hosted or empty)",
                manga_id
            ),
        }
    }
}

impl std::error::Error for ReaderError {}
