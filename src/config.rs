//! Client configuration: API base URL, timeout, endpoint paths, and storage keys.

// std
use std::time::Duration;
// self
use crate::_prelude::*;

/// Errors raised while constructing or validating a [`ClientConfig`].
#[derive(Debug, PartialEq, Eq, ThisError)]
pub enum ClientConfigError {
	/// The base URL cannot carry relative paths.
	#[error("Base URL `{url}` cannot be used as a base for API paths.")]
	InvalidBaseUrl {
		/// Base URL that failed validation.
		url: String,
	},
	/// Only HTTP(S) APIs are supported.
	#[error("Base URL must use http or https: {url}.")]
	UnsupportedScheme {
		/// Base URL that failed validation.
		url: String,
	},
	/// Requests need a non-zero timeout.
	#[error("Request timeout must be greater than zero.")]
	ZeroTimeout,
	/// The auth endpoint marker must be non-empty.
	#[error("Auth endpoint marker cannot be empty.")]
	EmptyAuthMarker,
	/// The refresh and login endpoints must be auth endpoints so they never carry a bearer.
	#[error("The {endpoint} path `{path}` must contain the auth marker `{marker}`.")]
	EndpointOutsideAuth {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Configured path.
		path: String,
		/// Configured auth marker.
		marker: String,
	},
	/// Storage keys must be non-empty and distinct.
	#[error("Access and refresh storage keys must be non-empty and distinct.")]
	InvalidStorageKeys,
}

/// Durable storage keys for the two session tokens.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageKeys {
	/// Key holding the access token.
	pub access_token: String,
	/// Key holding the refresh token.
	pub refresh_token: String,
}
impl Default for StorageKeys {
	fn default() -> Self {
		Self {
			access_token: ClientConfig::DEFAULT_ACCESS_TOKEN_KEY.into(),
			refresh_token: ClientConfig::DEFAULT_REFRESH_TOKEN_KEY.into(),
		}
	}
}

/// Immutable client configuration consumed by [`ApiClient`](crate::client::ApiClient).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
	/// API base URL every request path is joined onto.
	pub base_url: Url,
	/// Per-request timeout applied by the transport.
	pub timeout: Duration,
	/// Path substring identifying authentication endpoints.
	pub auth_marker: String,
	/// Path of the token refresh endpoint.
	pub refresh_path: String,
	/// Path of the login endpoint.
	pub login_path: String,
	/// Durable storage keys.
	pub storage_keys: StorageKeys,
}
impl ClientConfig {
	/// Default per-request timeout.
	pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
	/// Default auth endpoint marker.
	pub const DEFAULT_AUTH_MARKER: &'static str = "/auth/";
	/// Default refresh endpoint path.
	pub const DEFAULT_REFRESH_PATH: &'static str = "/auth/refresh";
	/// Default login endpoint path.
	pub const DEFAULT_LOGIN_PATH: &'static str = "/auth/login";
	/// Default storage key for the access token.
	pub const DEFAULT_ACCESS_TOKEN_KEY: &'static str = "psinder_jwt_token";
	/// Default storage key for the refresh token.
	pub const DEFAULT_REFRESH_TOKEN_KEY: &'static str = "psinder_refresh_token";

	/// Creates a new builder for the provided base URL.
	pub fn builder(base_url: Url) -> ClientConfigBuilder {
		ClientConfigBuilder::new(base_url)
	}

	/// Returns `true` when `path` addresses an authentication endpoint.
	pub fn is_auth_endpoint(&self, path: &str) -> bool {
		path.contains(&self.auth_marker)
	}

	/// Resolves an API path against the base URL, preserving any base path prefix.
	pub fn endpoint(&self, path: &str) -> Result<Url, url::ParseError> {
		let mut base = self.base_url.clone();

		if !base.path().ends_with('/') {
			let with_slash = format!("{}/", base.path());

			base.set_path(&with_slash);
		}

		base.join(path.trim_start_matches('/'))
	}

	fn validate(&self) -> Result<(), ClientConfigError> {
		if self.base_url.cannot_be_a_base() {
			return Err(ClientConfigError::InvalidBaseUrl { url: self.base_url.to_string() });
		}
		if !matches!(self.base_url.scheme(), "http" | "https") {
			return Err(ClientConfigError::UnsupportedScheme { url: self.base_url.to_string() });
		}
		if self.timeout.is_zero() {
			return Err(ClientConfigError::ZeroTimeout);
		}
		if self.auth_marker.is_empty() {
			return Err(ClientConfigError::EmptyAuthMarker);
		}

		self.validate_auth_path("refresh", &self.refresh_path)?;
		self.validate_auth_path("login", &self.login_path)?;

		let keys = &self.storage_keys;

		if keys.access_token.is_empty()
			|| keys.refresh_token.is_empty()
			|| keys.access_token == keys.refresh_token
		{
			return Err(ClientConfigError::InvalidStorageKeys);
		}

		Ok(())
	}

	fn validate_auth_path(
		&self,
		endpoint: &'static str,
		path: &str,
	) -> Result<(), ClientConfigError> {
		if self.is_auth_endpoint(path) {
			Ok(())
		} else {
			Err(ClientConfigError::EndpointOutsideAuth {
				endpoint,
				path: path.to_owned(),
				marker: self.auth_marker.clone(),
			})
		}
	}
}

/// Builder for [`ClientConfig`] values.
#[derive(Debug)]
pub struct ClientConfigBuilder {
	base_url: Url,
	timeout: Duration,
	auth_marker: String,
	refresh_path: String,
	login_path: String,
	storage_keys: StorageKeys,
}
impl ClientConfigBuilder {
	/// Creates a new builder seeded with the provided base URL and defaults.
	pub fn new(base_url: Url) -> Self {
		Self {
			base_url,
			timeout: ClientConfig::DEFAULT_TIMEOUT,
			auth_marker: ClientConfig::DEFAULT_AUTH_MARKER.into(),
			refresh_path: ClientConfig::DEFAULT_REFRESH_PATH.into(),
			login_path: ClientConfig::DEFAULT_LOGIN_PATH.into(),
			storage_keys: StorageKeys::default(),
		}
	}

	/// Overrides the per-request timeout (defaults to 10 seconds).
	pub fn timeout(mut self, timeout: Duration) -> Self {
		self.timeout = timeout;

		self
	}

	/// Overrides the auth endpoint marker (defaults to `/auth/`).
	pub fn auth_marker(mut self, marker: impl Into<String>) -> Self {
		self.auth_marker = marker.into();

		self
	}

	/// Overrides the refresh endpoint path.
	pub fn refresh_path(mut self, path: impl Into<String>) -> Self {
		self.refresh_path = path.into();

		self
	}

	/// Overrides the login endpoint path.
	pub fn login_path(mut self, path: impl Into<String>) -> Self {
		self.login_path = path.into();

		self
	}

	/// Overrides the durable storage keys.
	pub fn storage_keys(mut self, keys: StorageKeys) -> Self {
		self.storage_keys = keys;

		self
	}

	/// Consumes the builder and validates the resulting config.
	pub fn build(self) -> Result<ClientConfig, ClientConfigError> {
		let config = ClientConfig {
			base_url: self.base_url,
			timeout: self.timeout,
			auth_marker: self.auth_marker,
			refresh_path: self.refresh_path,
			login_path: self.login_path,
			storage_keys: self.storage_keys,
		};

		config.validate()?;

		Ok(config)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn url(value: &str) -> Url {
		Url::parse(value).expect("Failed to parse config test URL.")
	}

	#[test]
	fn defaults_match_the_app_backend() {
		let config = ClientConfig::builder(url("http://192.168.0.185:8080"))
			.build()
			.expect("Default config should build.");

		assert_eq!(config.timeout, Duration::from_secs(10));
		assert_eq!(config.storage_keys.access_token, "psinder_jwt_token");
		assert_eq!(config.storage_keys.refresh_token, "psinder_refresh_token");
		assert!(config.is_auth_endpoint("/auth/login"));
		assert!(config.is_auth_endpoint("/api/auth/refresh"));
		assert!(!config.is_auth_endpoint("/users/me"));
		assert!(!config.is_auth_endpoint("/authors"));
	}

	#[test]
	fn endpoint_preserves_base_path_prefix() {
		let config = ClientConfig::builder(url("http://localhost:8080/api"))
			.build()
			.expect("Config with base path should build.");

		assert_eq!(
			config.endpoint("/users/me").expect("Path should join.").as_str(),
			"http://localhost:8080/api/users/me"
		);
		assert_eq!(
			config.endpoint("dogs?page=2").expect("Path should join.").as_str(),
			"http://localhost:8080/api/dogs?page=2"
		);
	}

	#[test]
	fn build_rejects_invalid_settings() {
		let err = ClientConfig::builder(url("http://localhost"))
			.timeout(Duration::ZERO)
			.build()
			.expect_err("Zero timeout should be rejected.");

		assert_eq!(err, ClientConfigError::ZeroTimeout);

		let err = ClientConfig::builder(url("ftp://localhost"))
			.build()
			.expect_err("Non-HTTP schemes should be rejected.");

		assert!(matches!(err, ClientConfigError::UnsupportedScheme { .. }));

		let err = ClientConfig::builder(url("http://localhost"))
			.refresh_path("/token/refresh")
			.build()
			.expect_err("Refresh path outside the auth marker should be rejected.");

		assert!(matches!(err, ClientConfigError::EndpointOutsideAuth { endpoint: "refresh", .. }));

		let err = ClientConfig::builder(url("http://localhost"))
			.storage_keys(StorageKeys { access_token: "same".into(), refresh_token: "same".into() })
			.build()
			.expect_err("Colliding storage keys should be rejected.");

		assert_eq!(err, ClientConfigError::InvalidStorageKeys);
	}
}
