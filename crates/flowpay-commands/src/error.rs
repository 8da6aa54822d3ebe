use crate::store::RecordStoreError;

/// Failure raised while turning a command into an action result.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Unknown action: {0}")]
    UnknownAction(String),
    #[error("Invalid parameters for {action}: {message}")]
    InvalidParameters {
        action: &'static str,
        message: String,
    },
    #[error("Client already exists: {name}")]
    DuplicateClient { name: String },
    #[error("record store error: {0}")]
    Store(RecordStoreError),
}

impl CommandError {
    /// HTTP status the error carries across the request boundary.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::UnknownAction(_) | Self::InvalidParameters { .. } | Self::DuplicateClient { .. } => {
                400
            }
            Self::Store(_) => 500,
        }
    }

    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::UnknownAction(_) => "unknown_action",
            Self::InvalidParameters { .. } => "invalid_parameters",
            Self::DuplicateClient { .. } => "duplicate_client",
            Self::Store(_) => "store_error",
        }
    }
}

impl From<RecordStoreError> for CommandError {
    fn from(error: RecordStoreError) -> Self {
        match error {
            RecordStoreError::DuplicateClient { name } => Self::DuplicateClient { name },
            other => Self::Store(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::CommandError;
    use crate::store::RecordStoreError;

    #[test]
    fn store_duplicate_surfaces_as_client_error() {
        let error = CommandError::from(RecordStoreError::DuplicateClient {
            name: "Gamma".to_string(),
        });
        assert_eq!(error.status_code(), 400);
        assert_eq!(error.to_string(), "Client already exists: Gamma");

        let error = CommandError::from(RecordStoreError::InvalidPatch { kind: "payment" });
        assert_eq!(error.status_code(), 500);
        assert_eq!(error.code(), "store_error");
    }
}
