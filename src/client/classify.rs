// crates.io
use ::http::StatusCode;
// self
use crate::{_prelude::*, transport::HttpResponse};

const VALIDATION_FALLBACK: &str = "Invalid input data";
const STATUS_FALLBACK: &str = "Something went wrong";

#[derive(Deserialize)]
struct ErrorBody {
	message: Option<String>,
}

/// Decodes a 2xx body. Empty bodies decode as JSON `null` so `()` and `Option<T>` work for
/// `204 No Content`.
pub(crate) fn decode<R>(response: &HttpResponse) -> Result<R>
where
	R: DeserializeOwned,
{
	let body = response.body();
	let body: &[u8] = if body.iter().all(u8::is_ascii_whitespace) { b"null" } else { body };
	let mut deserializer = serde_json::Deserializer::from_slice(body);

	serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|source| Error::Decode { status: response.status().as_u16(), source })
}

/// Maps a final non-success response onto the client error taxonomy.
pub(crate) fn classify(status: StatusCode, body: &[u8]) -> Error {
	match status {
		StatusCode::BAD_REQUEST => Error::Validation {
			message: server_message(body).unwrap_or_else(|| VALIDATION_FALLBACK.into()),
		},
		StatusCode::UNAUTHORIZED => Error::Unauthorized,
		StatusCode::CONFLICT => Error::Conflict,
		StatusCode::INTERNAL_SERVER_ERROR => Error::Server,
		status => Error::Status {
			status: status.as_u16(),
			message: server_message(body).unwrap_or_else(|| STATUS_FALLBACK.into()),
		},
	}
}

fn server_message(body: &[u8]) -> Option<String> {
	serde_json::from_slice::<ErrorBody>(body)
		.ok()
		.and_then(|b| b.message)
		.filter(|m| !m.trim().is_empty())
}
