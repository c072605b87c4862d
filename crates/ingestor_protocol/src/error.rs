//! Error taxonomy for a single pipeline run.
//!
//! Validation, schema and template errors are raised before any collaborator
//! is mutated. External-service errors carry the name of the integration that
//! failed. Partial ingest failures are not errors: they travel as data inside
//! [`crate::JobHandle::errors`].

use thiserror::Error;

pub type IngestResult<T> = std::result::Result<T, IngestError>;

/// Result type returned by every collaborator call.
pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

#[derive(Debug, Error)]
pub enum IngestError {
    /// Missing or malformed descriptor property.
    #[error("Invalid '{field}': {message}")]
    Validation { field: String, message: String },

    /// Field list cannot be turned into a sink schema.
    #[error("Schema error: {0}")]
    Schema(String),

    /// Recognised source kind with a format variant we cannot handle.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// No template for a discriminant, or a placeholder left unbound.
    #[error("Template error: {0}")]
    Template(String),

    #[error("{service} failed: {source}")]
    ExternalService {
        service: &'static str,
        #[source]
        source: ServiceError,
    },

    #[error("Cancelled: {0}")]
    Cancelled(String),
}

impl IngestError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        IngestError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn schema(message: impl Into<String>) -> Self {
        IngestError::Schema(message.into())
    }

    pub fn template(message: impl Into<String>) -> Self {
        IngestError::Template(message.into())
    }

    pub fn unsupported_format(message: impl Into<String>) -> Self {
        IngestError::UnsupportedFormat(message.into())
    }

    /// An integration the run needs was not supplied at construction time.
    pub fn missing_integration(service: &'static str) -> Self {
        IngestError::ExternalService {
            service,
            source: ServiceError::Unavailable(format!("{} integration is not enabled", service)),
        }
    }

    /// Stable short code, used by the CLI when printing failures as JSON.
    pub fn code(&self) -> &'static str {
        match self {
            IngestError::Validation { .. } => "validation",
            IngestError::Schema(_) => "schema",
            IngestError::UnsupportedFormat(_) => "unsupported_format",
            IngestError::Template(_) => "template",
            IngestError::ExternalService { .. } => "external_service",
            IngestError::Cancelled(_) => "cancelled",
        }
    }

    /// Text shown to the user: names the property, discriminant or service.
    pub fn user_message(&self) -> String {
        match self {
            IngestError::ExternalService { service, source } => match source {
                ServiceError::NotFound(what) => format!("{}: {} was not found", service, what),
                ServiceError::Unavailable(why) => format!("{} is unavailable: {}", service, why),
                ServiceError::Failed(why) => format!("{} call failed: {}", service, why),
            },
            other => other.to_string(),
        }
    }

    /// True for errors detected before any side effect took place.
    pub fn is_pre_flight(&self) -> bool {
        matches!(
            self,
            IngestError::Validation { .. }
                | IngestError::Schema(_)
                | IngestError::UnsupportedFormat(_)
                | IngestError::Template(_)
        )
    }
}

/// Failure reported by a collaborator (catalog, index server, filesystem, ...).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("unavailable: {0}")]
    Unavailable(String),
    #[error("{0}")]
    Failed(String),
}

impl ServiceError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ServiceError::NotFound(_))
    }
}

/// Attach the collaborator name to a [`ServiceResult`].
pub trait ServiceContext<T> {
    fn service(self, service: &'static str) -> IngestResult<T>;
}

impl<T> ServiceContext<T> for ServiceResult<T> {
    fn service(self, service: &'static str) -> IngestResult<T> {
        self.map_err(|source| IngestError::ExternalService { service, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_names_field() {
        let err = IngestError::validation("path", "must not be empty");
        assert_eq!(err.to_string(), "Invalid 'path': must not be empty");
        assert_eq!(err.code(), "validation");
        assert!(err.is_pre_flight());
    }

    #[test]
    fn test_service_context_wraps_source() {
        let result: ServiceResult<()> = Err(ServiceError::NotFound("db.tbl".to_string()));
        let err = result.service("catalog").unwrap_err();
        assert_eq!(err.to_string(), "catalog failed: not found: db.tbl");
        assert!(!err.is_pre_flight());
        match err {
            IngestError::ExternalService { service, source } => {
                assert_eq!(service, "catalog");
                assert!(source.is_not_found());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_missing_integration_is_external() {
        let err = IngestError::missing_integration("index server");
        assert_eq!(err.code(), "external_service");
        assert!(err.to_string().contains("index server integration is not enabled"));
    }
}
