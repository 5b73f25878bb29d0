//! Signs in against a running Psinder API and fetches the current user's profile.
//!
//! ```sh
//! PSINDER_API_URL=http://localhost:8080/api \
//! PSINDER_USERNAME=rex PSINDER_PASSWORD=woof \
//! cargo run --example login_flow
//! ```
//!
//! Tokens are kept in a JSON file under the system temp directory, so a second run starts
//! signed in and skips the login call.

// std
use std::{env, sync::Arc};
// crates.io
use color_eyre::Result;
use serde::{Deserialize, Serialize};
// self
use psinder_api::{client::ReqwestApiClient, config::ClientConfig, store::FileStore, url::Url};

#[derive(Serialize)]
struct Credentials {
	username: String,
	password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Profile {
	username: String,
	#[serde(default)]
	dog_name: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let base_url =
		env::var("PSINDER_API_URL").unwrap_or_else(|_| "http://localhost:8080/api".into());
	let config = ClientConfig::builder(Url::parse(&base_url)?).build()?;
	let store = FileStore::open(env::temp_dir().join("psinder-api-demo.json"))?;

	println!("Tokens are stored in {}.", store.path().display());

	let client = ReqwestApiClient::new(config, Arc::new(store))?;

	client.hydrate().await;

	if !client.is_authenticated() {
		let credentials = Credentials {
			username: env::var("PSINDER_USERNAME").unwrap_or_else(|_| "rex".into()),
			password: env::var("PSINDER_PASSWORD").unwrap_or_else(|_| "woof".into()),
		};

		client.login(&credentials).await?;
		println!("Signed in as {}.", credentials.username);
	}

	match client.get::<Profile>("/users/me").await {
		Ok(profile) => println!(
			"Profile: {} ({}).",
			profile.username,
			profile.dog_name.as_deref().unwrap_or("no dog yet")
		),
		Err(e) if e.requires_reauthentication() => {
			println!("Session expired; run the demo again to sign in.");
		},
		Err(e) => println!("Request failed with {}: {e}", e.code()),
	}

	println!(
		"Refresh attempts: {}, successes: {}, failures: {}.",
		client.refresh_metrics.attempts(),
		client.refresh_metrics.successes(),
		client.refresh_metrics.failures(),
	);

	Ok(())
}
