//! Client-level error taxonomy surfaced to callers once the refresh protocol has settled.

// self
use crate::_prelude::*;

/// Client-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Message surfaced whenever the session can no longer be recovered.
pub const SESSION_EXPIRED_MESSAGE: &str = "Session expired. Please login again.";

/// Canonical client error exposed by public APIs.
///
/// Classification happens once, after any refresh-and-retry attempt has resolved, so the
/// refresh mechanics never show up as a distinct variant.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration or request-construction problem; the request was never sent.
	#[error(transparent)]
	Config(#[from] ConfigError),

	/// The API rejected the payload (HTTP 400).
	#[error("{message}")]
	Validation {
		/// Server-provided message, or a generic fallback.
		message: String,
	},
	/// The session expired and could not be refreshed; the caller must re-authenticate.
	#[error("Session expired. Please login again.")]
	Unauthorized,
	/// The resource already exists (HTTP 409).
	#[error("User already exists with that name")]
	Conflict,
	/// The API failed internally (HTTP 500).
	#[error("Server error. Please try again later.")]
	Server,
	/// Any other non-success status.
	#[error("{message}")]
	Status {
		/// HTTP status code returned by the API.
		status: u16,
		/// Server-provided message, or a generic fallback.
		message: String,
	},
	/// No response was received (connectivity failure or timeout).
	#[error("Network error. Please check your connection.")]
	Network {
		/// Transport failure that prevented a response.
		#[source]
		source: TransportError,
	},
	/// The response body could not be decoded into the requested type.
	#[error("Response body could not be decoded.")]
	Decode {
		/// HTTP status code of the undecodable response.
		status: u16,
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Anything not otherwise classified.
	#[error("{message}")]
	Unknown {
		/// Human-readable description.
		message: String,
		/// Underlying cause, when one exists.
		#[source]
		source: Option<BoxError>,
	},
}
impl Error {
	/// Builds an [`Error::Unknown`] without an underlying cause.
	pub fn unknown(message: impl Into<String>) -> Self {
		Self::Unknown { message: message.into(), source: None }
	}

	/// Returns the stable classification code for this error.
	pub fn code(&self) -> ErrorCode {
		match self {
			Self::Validation { .. } => ErrorCode::ValidationError,
			Self::Unauthorized => ErrorCode::Unauthorized,
			Self::Conflict => ErrorCode::Conflict,
			Self::Server => ErrorCode::ServerError,
			Self::Network { .. } => ErrorCode::NetworkError,
			Self::Config(_) | Self::Status { .. } | Self::Decode { .. } | Self::Unknown { .. } =>
				ErrorCode::UnknownError,
		}
	}

	/// Returns the HTTP status associated with the error, if a response was received.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Validation { .. } => Some(400),
			Self::Unauthorized => Some(401),
			Self::Conflict => Some(409),
			Self::Server => Some(500),
			Self::Status { status, .. } | Self::Decode { status, .. } => Some(*status),
			Self::Config(_) | Self::Network { .. } | Self::Unknown { .. } => None,
		}
	}

	/// Returns `true` when the surrounding application should route to a login flow.
	pub fn requires_reauthentication(&self) -> bool {
		matches!(self, Self::Unauthorized)
	}
}
impl From<TransportError> for Error {
	fn from(e: TransportError) -> Self {
		match e {
			TransportError::Dispatch { .. } => Self::Unknown {
				message: "Request could not be dispatched.".into(),
				source: Some(Box::new(e)),
			},
			e => Self::Network { source: e },
		}
	}
}

/// Stable error codes shared with the surrounding application.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
	/// Malformed request payload.
	ValidationError,
	/// Session expired; re-authentication required.
	Unauthorized,
	/// Duplicate resource.
	Conflict,
	/// Server-side failure.
	ServerError,
	/// No response received.
	NetworkError,
	/// Anything else.
	UnknownError,
}
impl ErrorCode {
	/// Returns the wire label for the code.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::ValidationError => "VALIDATION_ERROR",
			Self::Unauthorized => "UNAUTHORIZED",
			Self::Conflict => "CONFLICT",
			Self::ServerError => "SERVER_ERROR",
			Self::NetworkError => "NETWORK_ERROR",
			Self::UnknownError => "UNKNOWN_ERROR",
		}
	}
}
impl Display for ErrorCode {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Configuration and request-construction failures raised before dispatch.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] ::http::Error),
	/// Request path cannot be joined onto the base URL.
	#[error("Request path `{path}` is invalid.")]
	InvalidPath {
		/// Offending path.
		path: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Request body could not be serialized.
	#[error("Request body could not be serialized.")]
	RequestBody {
		/// Underlying serialization failure.
		#[source]
		source: serde_json::Error,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// The request was sent but no response arrived (connect failure, reset, timeout).
	#[error("No response was received from the API.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// The request could not be handed to the network at all.
	#[error("Request could not be dispatched.")]
	Dispatch {
		/// Transport-specific dispatch error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the API.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}

	/// Wraps a transport-specific dispatch error.
	pub fn dispatch(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Dispatch { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_builder() { Self::dispatch(e) } else { Self::network(e) }
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn codes_follow_classification() {
		assert_eq!(Error::Validation { message: "bad".into() }.code(), ErrorCode::ValidationError);
		assert_eq!(Error::Unauthorized.code(), ErrorCode::Unauthorized);
		assert_eq!(Error::Conflict.code(), ErrorCode::Conflict);
		assert_eq!(Error::Server.code(), ErrorCode::ServerError);
		assert_eq!(
			Error::Status { status: 418, message: "teapot".into() }.code(),
			ErrorCode::UnknownError
		);
		assert_eq!(Error::unknown("boom").code(), ErrorCode::UnknownError);
		assert_eq!(ErrorCode::NetworkError.to_string(), "NETWORK_ERROR");
	}

	#[test]
	fn transport_errors_split_between_network_and_unknown() {
		let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "timed out");
		let network: Error = TransportError::network(io).into();

		assert_eq!(network.code(), ErrorCode::NetworkError);
		assert_eq!(network.status(), None);
		assert_eq!(network.to_string(), "Network error. Please check your connection.");

		let io = std::io::Error::new(std::io::ErrorKind::InvalidInput, "bad header");
		let dispatch: Error = TransportError::dispatch(io).into();

		assert_eq!(dispatch.code(), ErrorCode::UnknownError);
		assert!(StdError::source(&dispatch).is_some());
	}

	#[test]
	fn unauthorized_requires_reauthentication() {
		assert!(Error::Unauthorized.requires_reauthentication());
		assert!(!Error::Server.requires_reauthentication());
		assert_eq!(Error::Unauthorized.to_string(), SESSION_EXPIRED_MESSAGE);
	}

	#[test]
	fn error_code_serializes_as_wire_label() {
		let payload = serde_json::to_string(&ErrorCode::ValidationError)
			.expect("ErrorCode should serialize to JSON.");

		assert_eq!(payload, "\"VALIDATION_ERROR\"");
	}
}
