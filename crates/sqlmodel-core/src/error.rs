//! Error types for SQLModel operations.

use std::fmt;

/// The primary error type for all SQLModel operations.
#[derive(Debug)]
pub enum Error {
    /// An argument could not be resolved or combined (bad path, bad token, bad values)
    Argument(ArgumentError),
    /// The construct cannot accept the requested operation in its current state
    InvalidRequest(InvalidRequestError),
    /// Mapper configuration errors
    Mapping(MappingError),
    /// Serialization/deserialization errors
    Serde(String),
    /// Custom error with message
    Custom(String),
}

#[derive(Debug)]
pub struct ArgumentError {
    pub kind: ArgumentErrorKind,
    pub message: String,
    /// The token that failed to resolve, if any.
    pub token: Option<String>,
    /// The entity or path that was consulted while resolving `token`.
    pub path: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentErrorKind {
    /// The query has no mapped entities to resolve against
    NoMapperEntities,
    /// No query entity corresponds to the attribute's parent
    EntityNotFound,
    /// The mapped entity has no property with the given name
    PropertyNotFound,
    /// The attribute does not link from the current path element
    NotLinked,
    /// The attribute does not refer to a mapped entity, but the path continues
    NotMapped,
    /// Token is neither a property name nor a class-bound attribute
    InvalidToken,
    /// Wildcard `*` combined with other tokens
    AmbiguousWildcard,
    /// Single-row and multi-row value sets mixed in one statement
    MixedValueFormats,
    /// More than one positional values argument
    TooManyPositional,
    /// Keyword values passed together with multiple parameter sets
    KwargsWithMultipleParameters,
}

#[derive(Debug)]
pub struct InvalidRequestError {
    pub kind: InvalidRequestErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidRequestErrorKind {
    /// Multi-row values requested on a construct that only takes one row
    MultipleParametersUnsupported,
    /// Values requested on an INSERT that already inserts from a SELECT
    AlreadyFromSelect,
    /// INSERT..FROM SELECT requested on an INSERT that already has values
    AlreadyHasValues,
    /// Keyword values requested on a statement with multiple parameter sets
    AlreadyMultipleParameters,
}

#[derive(Debug)]
pub struct MappingError {
    pub kind: MappingErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingErrorKind {
    /// Two mappers share a class name
    DuplicateMapper,
    /// No mapper with the given class name
    UnknownMapper,
    /// Inherited mapper was not declared before its subclass
    UnknownBase,
    /// Relationship target is not mapped
    UnknownTarget,
    /// A property key is declared twice on one mapper hierarchy
    DuplicateProperty,
    /// No loader strategy exists for the property / descriptor combination
    NoStrategy,
}

impl Error {
    /// Build an argument error with no token/path detail.
    pub fn argument(kind: ArgumentErrorKind, message: impl Into<String>) -> Self {
        Error::Argument(ArgumentError {
            kind,
            message: message.into(),
            token: None,
            path: None,
        })
    }

    /// Build an argument error that names the unresolved token and the path consulted.
    pub fn unresolved(
        kind: ArgumentErrorKind,
        message: impl Into<String>,
        token: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Error::Argument(ArgumentError {
            kind,
            message: message.into(),
            token: Some(token.into()),
            path: Some(path.into()),
        })
    }

    /// Build an invalid-request error.
    pub fn invalid_request(kind: InvalidRequestErrorKind, message: impl Into<String>) -> Self {
        Error::InvalidRequest(InvalidRequestError {
            kind,
            message: message.into(),
        })
    }

    /// Build a mapping configuration error.
    pub fn mapping(kind: MappingErrorKind, message: impl Into<String>) -> Self {
        Error::Mapping(MappingError {
            kind,
            message: message.into(),
        })
    }

    /// Is this an argument error?
    pub fn is_argument_error(&self) -> bool {
        matches!(self, Error::Argument(_))
    }

    /// Is this an invalid-request error?
    pub fn is_invalid_request(&self) -> bool {
        matches!(self, Error::InvalidRequest(_))
    }

    /// Get the argument error kind, if this is an argument error.
    pub fn argument_kind(&self) -> Option<ArgumentErrorKind> {
        match self {
            Error::Argument(e) => Some(e.kind),
            _ => None,
        }
    }

    /// Get the invalid-request kind, if this is an invalid-request error.
    pub fn invalid_request_kind(&self) -> Option<InvalidRequestErrorKind> {
        match self {
            Error::InvalidRequest(e) => Some(e.kind),
            _ => None,
        }
    }

    /// Get the mapping error kind, if this is a mapping error.
    pub fn mapping_kind(&self) -> Option<MappingErrorKind> {
        match self {
            Error::Mapping(e) => Some(e.kind),
            _ => None,
        }
    }

    /// Get the unresolved token, if available.
    pub fn token(&self) -> Option<&str> {
        match self {
            Error::Argument(e) => e.token.as_deref(),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Argument(e) => write!(f, "Argument error: {}", e),
            Error::InvalidRequest(e) => write!(f, "Invalid request: {}", e.message),
            Error::Mapping(e) => write!(f, "Mapping error: {}", e.message),
            Error::Serde(msg) => write!(f, "Serialization error: {}", msg),
            Error::Custom(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl fmt::Display for ArgumentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for InvalidRequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for MappingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl From<ArgumentError> for Error {
    fn from(err: ArgumentError) -> Self {
        Error::Argument(err)
    }
}

impl From<InvalidRequestError> for Error {
    fn from(err: InvalidRequestError) -> Self {
        Error::InvalidRequest(err)
    }
}

impl From<MappingError> for Error {
    fn from(err: MappingError) -> Self {
        Error::Mapping(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serde(err.to_string())
    }
}

/// Result type alias for SQLModel operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unresolved_carries_token_and_path() {
        let err = Error::unresolved(
            ArgumentErrorKind::PropertyNotFound,
            "Can't find property named 'nope'",
            "nope",
            "Mapper|User|users",
        );

        assert!(err.is_argument_error());
        assert_eq!(err.argument_kind(), Some(ArgumentErrorKind::PropertyNotFound));
        assert_eq!(err.token(), Some("nope"));
        assert_eq!(
            err.to_string(),
            "Argument error: Can't find property named 'nope'"
        );
    }

    #[test]
    fn kind_helpers_are_exclusive() {
        let err = Error::invalid_request(
            InvalidRequestErrorKind::MultipleParametersUnsupported,
            "This construct does not support multiple parameter sets.",
        );
        assert!(err.is_invalid_request());
        assert!(!err.is_argument_error());
        assert_eq!(err.argument_kind(), None);
        assert_eq!(
            err.invalid_request_kind(),
            Some(InvalidRequestErrorKind::MultipleParametersUnsupported)
        );

        let err = Error::mapping(MappingErrorKind::UnknownTarget, "no mapper 'Ghost'");
        assert_eq!(err.mapping_kind(), Some(MappingErrorKind::UnknownTarget));
        assert_eq!(err.to_string(), "Mapping error: no mapper 'Ghost'");
    }

    #[test]
    fn serde_errors_convert() {
        let parse = serde_json::from_str::<serde_json::Value>("{not json");
        let err: Error = parse.unwrap_err().into();
        assert!(matches!(err, Error::Serde(_)));
    }
}
