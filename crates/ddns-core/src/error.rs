//! Error types for the DDNS system
//!
//! Every failure a provider can produce is a variant of [`Error`]. Callers
//! that need to branch on the failure class should match on
//! [`Error::kind`] rather than on the display text.

use crate::http::HttpError;
use std::net::IpAddr;
use thiserror::Error;

/// Result type alias for DDNS operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the DDNS system
#[derive(Error, Debug)]
pub enum Error {
    /// The vendor has no update path for IPv6 records
    #[error("IPv6 is not supported by this provider")]
    Ipv6NotSupported,

    /// The provider settings object could not be decoded
    #[error("decoding provider settings: {0}")]
    Settings(#[from] serde_json::Error),

    /// The password does not have the shape the vendor requires
    #[error("password is malformed")]
    MalformedPassword,

    /// Username is required but empty
    #[error("username cannot be empty")]
    EmptyUsername,

    /// Password is required but empty
    #[error("password cannot be empty")]
    EmptyPassword,

    /// Record name is required but empty
    #[error("name cannot be empty")]
    EmptyName,

    /// The vendor only accepts the root-zone host
    #[error("host can only be \"@\"")]
    HostOnlyAt,

    /// No factory is registered under this vendor name
    #[error("unknown provider: {0}")]
    UnknownProvider(String),

    /// Configuration errors outside a single provider's settings
    #[error("configuration error: {0}")]
    Config(String),

    /// The outbound request could not be built
    #[error("building request: {0}")]
    Request(String),

    /// The request never produced a response
    #[error("doing HTTP request: {0}")]
    Http(#[from] HttpError),

    /// The vendor answered with a status other than 200
    #[error("bad HTTP status: {status}: {body}")]
    BadHttpStatus {
        /// HTTP status code
        status: u16,
        /// Response body flattened to one line
        body: String,
    },

    /// The response body did not match the vendor's schema
    #[error("unmarshaling response: {0}")]
    UnmarshalResponse(String),

    /// The vendor reported a failure in its own envelope
    #[error("unsuccessful response: {message}{}", code_suffix(.code))]
    UnsuccessfulResponse {
        /// Vendor message, verbatim
        message: String,
        /// Vendor error code, when the protocol carries one
        code: Option<i64>,
    },

    /// The vendor returned an address that does not parse
    #[error("received IP address is malformed: {0}")]
    IpReceivedMalformed(String),

    /// The vendor stored a different address than requested
    #[error("received IP address {received} does not match requested {requested}")]
    IpReceivedMismatch {
        /// Address sent to the vendor
        requested: IpAddr,
        /// Address the vendor claims it stored
        received: IpAddr,
    },

    /// A successful envelope carried no glue record to confirm the address
    #[error("no glue record returned")]
    NoGlueRecord,

    /// The update was abandoned because its cancellation token fired
    #[error("update canceled")]
    Canceled,
}

fn code_suffix(code: &Option<i64>) -> String {
    code.map(|code| format!(" (error code {code})"))
        .unwrap_or_default()
}

/// Stable classification of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Invalid settings, raised at construction; fatal to the provider
    Configuration,
    /// Request build or network failure
    Transport,
    /// Vendor reachable but answered with a non-200 status
    BadHttpStatus,
    /// Response body did not match the expected schema
    Decode,
    /// Vendor's own success flag or error field signalled failure
    VendorFailure,
    /// Vendor returned an unparsable address
    IpMalformed,
    /// Vendor confirmed a different address than requested
    IpMismatch,
    /// Caller canceled the update
    Canceled,
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a request build error
    pub fn request(msg: impl Into<String>) -> Self {
        Self::Request(msg.into())
    }

    /// Create a decode error
    pub fn unmarshal(msg: impl std::fmt::Display) -> Self {
        Self::UnmarshalResponse(msg.to_string())
    }

    /// Create a vendor-reported failure
    pub fn unsuccessful(message: impl Into<String>, code: Option<i64>) -> Self {
        Self::UnsuccessfulResponse {
            message: message.into(),
            code,
        }
    }

    /// The failure class of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Ipv6NotSupported
            | Self::Settings(_)
            | Self::MalformedPassword
            | Self::EmptyUsername
            | Self::EmptyPassword
            | Self::EmptyName
            | Self::HostOnlyAt
            | Self::UnknownProvider(_)
            | Self::Config(_) => ErrorKind::Configuration,
            Self::Request(_) | Self::Http(_) => ErrorKind::Transport,
            Self::BadHttpStatus { .. } => ErrorKind::BadHttpStatus,
            Self::UnmarshalResponse(_) | Self::NoGlueRecord => ErrorKind::Decode,
            Self::UnsuccessfulResponse { .. } => ErrorKind::VendorFailure,
            Self::IpReceivedMalformed(_) => ErrorKind::IpMalformed,
            Self::IpReceivedMismatch { .. } => ErrorKind::IpMismatch,
            Self::Canceled => ErrorKind::Canceled,
        }
    }

    /// Whether a later attempt with the same configuration may succeed
    ///
    /// Configuration errors need a config change, and a vendor echoing a
    /// stale address will keep doing so, so neither is worth retrying.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self.kind(),
            ErrorKind::Configuration | ErrorKind::IpMismatch | ErrorKind::Canceled
        )
    }
}
