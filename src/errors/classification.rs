use super::types::HarvesterError;

#[derive(Debug, Clone)]
pub struct ErrorClassification {
    pub error_type: &'static str,
    pub retryable: bool,
}

impl HarvesterError {
    /// Classify this error to determine its type and whether a caller may
    /// reasonably try the same operation again.
    pub fn classify(&self) -> ErrorClassification {
        match self {
            // Transient transport failures
            HarvesterError::Network(_) => ErrorClassification {
                error_type: "NetworkError",
                retryable: true,
            },
            HarvesterError::Timeout(_) => ErrorClassification {
                error_type: "TimeoutError",
                retryable: true,
            },
            HarvesterError::Api { status, .. } => ErrorClassification {
                error_type: "ApiError",
                retryable: *status == 429 || *status >= 500,
            },

            // The operation is meaningless until something changes
            HarvesterError::Authentication(_) => ErrorClassification {
                error_type: "AuthenticationError",
                retryable: false,
            },
            HarvesterError::NoProvidersAvailable => ErrorClassification {
                error_type: "NoProvidersAvailableError",
                retryable: false,
            },
            HarvesterError::Config(_) => ErrorClassification {
                error_type: "ConfigError",
                retryable: false,
            },
            HarvesterError::InvalidResponse(_) => ErrorClassification {
                error_type: "InvalidResponseError",
                retryable: false,
            },
            HarvesterError::InvalidInput(_) => ErrorClassification {
                error_type: "InvalidInputError",
                retryable: false,
            },
            HarvesterError::Json(_) => ErrorClassification {
                error_type: "JsonError",
                retryable: false,
            },
            HarvesterError::Yaml(_) => ErrorClassification {
                error_type: "YamlError",
                retryable: false,
            },

            HarvesterError::Storage(_) => ErrorClassification {
                error_type: "StorageError",
                retryable: true,
            },
            HarvesterError::Io(_) => ErrorClassification {
                error_type: "IoError",
                retryable: true,
            },
            HarvesterError::Internal(_) => ErrorClassification {
                error_type: "InternalError",
                retryable: false,
            },
        }
    }

    /// Process exit code used by the CLI for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            HarvesterError::Config(_) | HarvesterError::InvalidInput(_) => 2,
            HarvesterError::Authentication(_) => 4,
            HarvesterError::NoProvidersAvailable => 5,
            _ => 1,
        }
    }
}
