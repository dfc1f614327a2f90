//! OAuth2 credential files for the installed-application flow.
//!
//! [`ClientSecrets`] is the file downloaded from the cloud console
//! (`credentials.json`). [`AuthorizedUser`] is the token cache written after a
//! successful consent (`token.json`).

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Tokens this close to expiry are treated as expired.
const EXPIRY_SKEW_SECS: i64 = 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientSecrets {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub installed: Option<InstalledApp>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub web: Option<InstalledApp>,
}

impl ClientSecrets {
	/// The configured client, preferring the installed-app entry.
	pub fn app(&self) -> Option<&InstalledApp> {
		self.installed.as_ref().or(self.web.as_ref())
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstalledApp {
	pub client_id: String,
	pub client_secret: String,
	#[serde(default = "default_auth_uri")]
	pub auth_uri: String,
	#[serde(default = "default_token_uri")]
	pub token_uri: String,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub redirect_uris: Vec<String>,
}

fn default_auth_uri() -> String {
	DEFAULT_AUTH_URI.to_string()
}

fn default_token_uri() -> String {
	DEFAULT_TOKEN_URI.to_string()
}

/// Cached user credentials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorizedUser {
	#[serde(alias = "token")]
	pub access_token: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub refresh_token: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub expiry: Option<DateTime<Utc>>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub scopes: Vec<String>,
	pub client_id: String,
	pub client_secret: String,
	#[serde(default = "default_token_uri")]
	pub token_uri: String,
}

impl AuthorizedUser {
	/// Builds credentials from a token-endpoint response.
	pub fn from_response(app: &InstalledApp, response: TokenResponse, scopes: &[String], now: DateTime<Utc>) -> Self {
		let mut user = Self {
			access_token: String::new(),
			refresh_token: None,
			expiry: None,
			scopes: scopes.to_vec(),
			client_id: app.client_id.clone(),
			client_secret: app.client_secret.clone(),
			token_uri: app.token_uri.clone(),
		};
		user.apply(response, now);
		user
	}

	/// Folds a refresh response into the cached credentials.
	///
	/// Refresh responses usually omit `refresh_token`; the old one is kept.
	pub fn apply(&mut self, response: TokenResponse, now: DateTime<Utc>) {
		self.access_token = response.access_token;
		if response.refresh_token.is_some() {
			self.refresh_token = response.refresh_token;
		}
		self.expiry = response.expires_in.map(|secs| now + Duration::seconds(secs));
	}

	pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
		if self.access_token.is_empty() {
			return false;
		}
		match self.expiry {
			Some(expiry) => expiry - Duration::seconds(EXPIRY_SKEW_SECS) > now,
			None => true,
		}
	}

	pub fn can_refresh(&self) -> bool {
		self.refresh_token.as_deref().is_some_and(|t| !t.is_empty())
	}

	/// True when every requested scope was granted to this token.
	pub fn covers(&self, scopes: &[String]) -> bool {
		self.scopes.is_empty() || scopes.iter().all(|s| self.scopes.contains(s))
	}
}

/// Token endpoint response (`grant_type=authorization_code` or `refresh_token`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenResponse {
	pub access_token: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub expires_in: Option<i64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub refresh_token: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub scope: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub token_type: Option<String>,
}

#[cfg(test)]
mod tests {
	use super::*;

	fn app() -> InstalledApp {
		InstalledApp {
			client_id: "client.apps.example".into(),
			client_secret: "secret".into(),
			auth_uri: DEFAULT_AUTH_URI.into(),
			token_uri: DEFAULT_TOKEN_URI.into(),
			redirect_uris: vec!["http://localhost".into()],
		}
	}

	fn response(refresh: Option<&str>) -> TokenResponse {
		TokenResponse {
			access_token: "ya29.fresh".into(),
			expires_in: Some(3599),
			refresh_token: refresh.map(Into::into),
			scope: None,
			token_type: Some("Bearer".into()),
		}
	}

	#[test]
	fn client_secrets_prefers_installed() {
		let json = r#"{"installed":{"client_id":"a","client_secret":"b"}}"#;
		let secrets: ClientSecrets = serde_json::from_str(json).unwrap();
		let app = secrets.app().unwrap();
		assert_eq!(app.client_id, "a");
		assert_eq!(app.token_uri, DEFAULT_TOKEN_URI);
	}

	#[test]
	fn reads_token_key_alias() {
		let json = r#"{"token":"ya29.old","refresh_token":"1//r","client_id":"a","client_secret":"b"}"#;
		let user: AuthorizedUser = serde_json::from_str(json).unwrap();
		assert_eq!(user.access_token, "ya29.old");
		assert!(user.can_refresh());
	}

	#[test]
	fn expiry_respects_skew() {
		let now = Utc::now();
		let scopes = vec!["https://www.googleapis.com/auth/script.scriptapp".to_string()];
		let mut user = AuthorizedUser::from_response(&app(), response(Some("1//r")), &scopes, now);

		assert!(user.is_valid_at(now));
		assert!(!user.is_valid_at(now + Duration::seconds(3599 - 30)));

		user.expiry = None;
		assert!(user.is_valid_at(now + Duration::days(30)));
	}

	#[test]
	fn refresh_keeps_existing_refresh_token() {
		let now = Utc::now();
		let mut user = AuthorizedUser::from_response(&app(), response(Some("1//keep")), &[], now);
		user.apply(response(None), now);
		assert_eq!(user.refresh_token.as_deref(), Some("1//keep"));
	}

	#[test]
	fn scope_coverage() {
		let now = Utc::now();
		let granted = vec!["a".to_string(), "b".to_string()];
		let user = AuthorizedUser::from_response(&app(), response(None), &granted, now);
		assert!(user.covers(&["a".to_string()]));
		assert!(!user.covers(&["c".to_string()]));
	}
}
