use std::fmt;
use thiserror::Error as ThisError;

/// Boxed driver error, passed through from the connection layer unchanged.
pub type DriverSource = Box<dyn std::error::Error + Send + Sync + 'static>;

///
/// Error
///
/// Structured runtime error with a stable class + origin classification.
/// `class` answers "what kind of failure", `origin` answers "which layer".
///

#[derive(Debug, ThisError)]
#[error("{message}")]
pub struct Error {
    pub class: ErrorClass,
    pub origin: ErrorOrigin,
    pub message: String,

    /// Optional structured error detail.
    pub detail: Option<ErrorDetail>,
}

impl Error {
    pub fn new(class: ErrorClass, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            class,
            origin,
            message: message.into(),
            detail: None,
        }
    }

    /// Construct a configuration error (mapping-plan or caller defect).
    pub(crate) fn configuration(origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Configuration, origin, message)
    }

    /// Construct an unsupported-operation error.
    pub(crate) fn unsupported(origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Unsupported, origin, message)
    }

    /// Construct a conversion error for a value that does not fit its field.
    pub(crate) fn conversion(origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Conversion, origin, message)
    }

    /// Construct a required-field error raised before any statement runs.
    pub(crate) fn required_field(origin: ErrorOrigin, table: &str, field: &str) -> Self {
        Self {
            class: ErrorClass::RequiredField,
            origin,
            message: format!("required field not set: {table}.{field}"),
            detail: Some(ErrorDetail::RequiredField {
                field: field.to_string(),
            }),
        }
    }

    /// Construct the uniform "missing row or stale version" conflict.
    pub(crate) fn concurrency(table: &str, key: impl Into<String>) -> Self {
        let key = key.into();

        Self {
            class: ErrorClass::Concurrency,
            origin: ErrorOrigin::Repository,
            message: format!(
                "concurrency violation: {table} key={key} was modified or removed by another writer"
            ),
            detail: Some(ErrorDetail::Concurrency {
                table: table.to_string(),
                key,
            }),
        }
    }

    /// Construct a virtual foreign key violation naming the referencing table.
    pub(crate) fn reference(table: &str, column: &str, display: Option<&str>) -> Self {
        let message = match display {
            Some(display) => format!("record is referenced by {display} ({table}.{column})"),
            None => format!("record is referenced by {table}.{column}"),
        };

        Self {
            class: ErrorClass::ReferentialIntegrity,
            origin: ErrorOrigin::Repository,
            message,
            detail: Some(ErrorDetail::Reference {
                table: table.to_string(),
                column: column.to_string(),
                display: display.map(ToString::to_string),
            }),
        }
    }

    /// Wrap a driver failure. The source error is kept intact.
    pub fn driver(source: impl Into<DriverSource>) -> Self {
        let source = source.into();

        Self {
            class: ErrorClass::Driver,
            origin: ErrorOrigin::Connection,
            message: source.to_string(),
            detail: Some(ErrorDetail::Driver { source }),
        }
    }

    #[must_use]
    pub const fn is_concurrency(&self) -> bool {
        matches!(self.class, ErrorClass::Concurrency)
    }

    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(self.class, ErrorClass::Configuration)
    }

    #[must_use]
    pub const fn is_reference(&self) -> bool {
        matches!(self.class, ErrorClass::ReferentialIntegrity)
    }

    #[must_use]
    pub const fn is_required_field(&self) -> bool {
        matches!(self.class, ErrorClass::RequiredField)
    }

    /// Underlying driver error, if this error came from the connection layer.
    #[must_use]
    pub fn driver_source(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match &self.detail {
            Some(ErrorDetail::Driver { source }) => Some(source.as_ref()),
            _ => None,
        }
    }

    #[must_use]
    pub fn display_with_class(&self) -> String {
        format!("{}:{}: {}", self.origin, self.class, self.message)
    }
}

///
/// ErrorDetail
///
/// Structured, class-specific error detail carried by [`Error`].
///

#[derive(Debug, ThisError)]
pub enum ErrorDetail {
    #[error("required field: {field}")]
    RequiredField { field: String },

    #[error("concurrency conflict on {table} key={key}")]
    Concurrency { table: String, key: String },

    #[error("referenced by {table}.{column}")]
    Reference {
        table: String,
        column: String,
        display: Option<String>,
    },

    #[error("{source}")]
    Driver {
        #[source]
        source: DriverSource,
    },
}

///
/// ErrorClass
/// Runtime error taxonomy.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[remain::sorted]
pub enum ErrorClass {
    Concurrency,
    Configuration,
    Conversion,
    Driver,
    ReferentialIntegrity,
    RequiredField,
    Unsupported,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Concurrency => "concurrency",
            Self::Configuration => "configuration",
            Self::Conversion => "conversion",
            Self::Driver => "driver",
            Self::ReferentialIntegrity => "referential_integrity",
            Self::RequiredField => "required_field",
            Self::Unsupported => "unsupported",
        };
        write!(f, "{label}")
    }
}

///
/// ErrorOrigin
/// Which layer raised the error.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorOrigin {
    Model,
    Dialect,
    Command,
    Audit,
    Paging,
    Repository,
    Connection,
    Config,
}

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Model => "model",
            Self::Dialect => "dialect",
            Self::Command => "command",
            Self::Audit => "audit",
            Self::Paging => "paging",
            Self::Repository => "repository",
            Self::Connection => "connection",
            Self::Config => "config",
        };
        write!(f, "{label}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concurrency_error_carries_table_and_key() {
        let err = Error::concurrency("Orders", "42");

        assert!(err.is_concurrency());
        assert_eq!(err.display_with_class().split(':').next(), Some("repository"));
        assert!(matches!(
            err.detail,
            Some(ErrorDetail::Concurrency { ref table, ref key }) if table == "Orders" && key == "42"
        ));
    }

    #[test]
    fn reference_error_prefers_display_name() {
        let err = Error::reference("OrderLine", "order_id", Some("order lines"));

        assert!(err.is_reference());
        assert_eq!(
            err.message,
            "record is referenced by order lines (OrderLine.order_id)"
        );
    }

    #[test]
    fn driver_error_keeps_source() {
        let io = std::io::Error::other("socket closed");
        let err = Error::driver(io);

        assert_eq!(err.class, ErrorClass::Driver);
        assert_eq!(
            err.driver_source().map(ToString::to_string).as_deref(),
            Some("socket closed")
        );
    }
}
