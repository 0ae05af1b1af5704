use std::time::Duration;

/// Errors returned by a backend implementation before they are normalized
/// for the public event stream.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// The service returned an application-level failure (HTTP status, auth, etc.).
    #[error("api error: {message}")]
    Api {
        message: String,
        status_code: Option<u16>,
    },
    /// Transport or stream I/O failed.
    #[error("transport error: {message}")]
    Transport { message: String },
    /// A response body could not be decoded.
    #[error("decode error: {message}")]
    Decode { message: String },
}

impl BackendError {
    /// Creates an API-level error.
    pub fn api(message: impl Into<String>, status_code: Option<u16>) -> Self {
        Self::Api {
            message: message.into(),
            status_code,
        }
    }

    /// Creates a transport-level error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Creates a decode-level error.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Returns the human-readable message for this error.
    pub fn message(&self) -> &str {
        match self {
            Self::Api { message, .. }
            | Self::Transport { message }
            | Self::Decode { message } => message,
        }
    }

    /// Returns the HTTP status code when the service reported one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api { status_code, .. } => *status_code,
            _ => None,
        }
    }
}

/// Terminal stream failure delivered through `StreamEvent::Failed`.
///
/// Timeouts are deliberately not represented here: an inactivity timeout is
/// its own terminal signal (`StreamEvent::TimedOut`) so callers can present
/// "the server took too long" separately from a hard failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, serde::Serialize, serde::Deserialize)]
pub enum StreamFailure {
    /// The service rejected or aborted the search.
    #[error("api failure: {message}")]
    Api {
        message: String,
        status_code: Option<u16>,
    },
    /// Network/stream transport failed.
    #[error("transport failure: {message}")]
    Transport { message: String },
    /// The client detected a protocol or invariant error.
    #[error("protocol failure: {message}")]
    Protocol { message: String },
    /// The stream was cancelled, either explicitly or by a newer search
    /// superseding it.
    #[error("search cancelled")]
    Cancelled,
}

/// Top-level error type for the public client API.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// Invalid client/backend configuration.
    #[error("config error: {0}")]
    Config(String),
    /// Invalid user input to the builder API.
    #[error("validation error: {0}")]
    Validation(String),
    /// Backend request error outside an established stream.
    #[error(transparent)]
    Backend(BackendError),
    /// Terminal failure returned from a started stream.
    #[error(transparent)]
    SearchFailed(StreamFailure),
    /// The stream went silent for longer than the inactivity window.
    #[error("no data received for {idle:?}")]
    TimedOut { idle: Duration },
    /// Internal protocol misuse or invariant violation.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl ClientError {
    pub(crate) fn search_failed(failure: StreamFailure) -> Self {
        Self::SearchFailed(failure)
    }

    pub(crate) fn protocol_msg(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }
}

impl From<BackendError> for ClientError {
    fn from(value: BackendError) -> Self {
        ClientError::Backend(value)
    }
}

impl From<StreamFailure> for ClientError {
    fn from(value: StreamFailure) -> Self {
        ClientError::SearchFailed(value)
    }
}

pub(crate) fn stream_failure_from_backend_error(err: &BackendError) -> StreamFailure {
    match err {
        BackendError::Api {
            message,
            status_code,
        } => StreamFailure::Api {
            message: message.clone(),
            status_code: *status_code,
        },
        BackendError::Transport { message } => StreamFailure::Transport {
            message: message.clone(),
        },
        BackendError::Decode { message } => StreamFailure::Protocol {
            message: message.clone(),
        },
    }
}
