//! Error taxonomy shared by every service.
//!
//! Storage adapters speak `StoreError`; services classify those into a
//! `ServiceError` carrying one of the seven `ErrorKind`s before anything
//! crosses a public contract. Each kind maps to exactly one status code
//! and heading through a static, read-only descriptor table.

use thiserror::Error;

/// Classification of every failure a caller can observe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Duplicate resource (e.g. email already registered).
    Conflict,
    /// Dependency failure (database, Redis, mail server).
    Internal,
    /// Missing, invalid or expired credential.
    Unauthorized,
    /// Referenced resource does not exist.
    NotFound,
    /// Malformed input.
    BadRequest,
    /// Authenticated but not allowed.
    Forbidden,
    /// Semantically invalid input (e.g. wrong OTP).
    UnprocessableData,
}

/// Status/heading pair rendered for an error kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorDescriptor {
    pub status: u16,
    pub heading: &'static str,
}

const CONFLICT: ErrorDescriptor = ErrorDescriptor {
    status: 409,
    heading: "Resource Conflict Try again later ... ",
};
const INTERNAL: ErrorDescriptor = ErrorDescriptor {
    status: 500,
    heading: "Internal Server Error ...",
};
const UNAUTHORIZED: ErrorDescriptor = ErrorDescriptor {
    status: 401,
    heading: "Unauthorized ",
};
const NOT_FOUND: ErrorDescriptor = ErrorDescriptor {
    status: 404,
    heading: "Not Found",
};
const BAD_REQUEST: ErrorDescriptor = ErrorDescriptor {
    status: 400,
    heading: "BadRequest",
};
const FORBIDDEN: ErrorDescriptor = ErrorDescriptor {
    status: 403,
    heading: "You are Forbidden for this service",
};
const UNPROCESSABLE: ErrorDescriptor = ErrorDescriptor {
    status: 422,
    heading: "Please provide a valid/processable data",
};

impl ErrorKind {
    /// Look up the status code and heading for this kind.
    pub const fn descriptor(self) -> &'static ErrorDescriptor {
        match self {
            Self::Conflict => &CONFLICT,
            Self::Internal => &INTERNAL,
            Self::Unauthorized => &UNAUTHORIZED,
            Self::NotFound => &NOT_FOUND,
            Self::BadRequest => &BAD_REQUEST,
            Self::Forbidden => &FORBIDDEN,
            Self::UnprocessableData => &UNPROCESSABLE,
        }
    }

    /// Only dependency failures are worth retrying with backoff.
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::Internal)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Conflict => "conflict",
            Self::Internal => "internal",
            Self::Unauthorized => "unauthorized",
            Self::NotFound => "not_found",
            Self::BadRequest => "bad_request",
            Self::Forbidden => "forbidden",
            Self::UnprocessableData => "unprocessable_data",
        };
        f.write_str(name)
    }
}

/// A classified failure returned by every service operation.
#[derive(Debug, Clone, Error)]
#[error("{kind}: {message}")]
pub struct ServiceError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ServiceError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, message)
    }

    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnprocessableData, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }
}

/// Failure raised by a storage adapter.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No row/key matched.
    #[error("record not found")]
    NotFound,
    /// A uniqueness constraint rejected the write.
    #[error("record already exists: {0}")]
    Conflict(String),
    /// The backend itself failed (connection, protocol, decode).
    #[error("storage backend failure: {0:#}")]
    Backend(#[from] anyhow::Error),
}

impl StoreError {
    pub fn backend(err: impl Into<anyhow::Error>) -> Self {
        Self::Backend(err.into())
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => Self::not_found("record not found"),
            StoreError::Conflict(what) => Self::conflict(format!("{what} already exists")),
            // Raw backend text stays in the logs, never in the response.
            StoreError::Backend(e) => {
                tracing::error!(error = %format!("{e:#}"), "Storage backend failure");
                Self::internal("storage backend unavailable, retry later")
            }
        }
    }
}
