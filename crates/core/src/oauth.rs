//! OAuth2 credentials for the script-execution API.
//!
//! Tokens are cached in `token.json`. An expired token is refreshed when a
//! refresh token is available; otherwise the installed-app loopback flow runs:
//! a one-shot HTTP listener on 127.0.0.1 receives the authorization code from
//! the consent redirect.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::extract::{Query, State};
use axum::response::Html;
use axum::routing::get;
use chrono::Utc;
use gasprobe_protocol::{AuthorizedUser, ClientSecrets, InstalledApp, TokenResponse};
use serde::Deserialize;
use tokio::sync::oneshot;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::settings::ApiSettings;

/// How long the loopback listener waits for the consent redirect.
const CONSENT_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Deserialize)]
struct Callback {
	code: Option<String>,
	state: Option<String>,
	error: Option<String>,
}

type CallbackSlot = Arc<Mutex<Option<oneshot::Sender<Callback>>>>;

#[derive(Debug, Clone)]
pub struct Authorizer {
	secrets_path: PathBuf,
	token_path: PathBuf,
	scopes: Vec<String>,
	http: reqwest::Client,
}

impl Authorizer {
	pub fn new(secrets_path: impl Into<PathBuf>, token_path: impl Into<PathBuf>, scopes: Vec<String>) -> Self {
		Self {
			secrets_path: secrets_path.into(),
			token_path: token_path.into(),
			scopes,
			http: reqwest::Client::new(),
		}
	}

	pub fn from_settings(settings: &ApiSettings) -> Self {
		Self::new(&settings.credentials, &settings.token, settings.scopes.clone())
	}

	pub fn token_path(&self) -> &Path {
		&self.token_path
	}

	/// Returns usable credentials, refreshing or re-authorizing as needed.
	pub async fn credentials(&self) -> Result<AuthorizedUser> {
		if let Some(user) = self.load_token()? {
			if user.covers(&self.scopes) {
				if user.is_valid_at(Utc::now()) {
					return Ok(user);
				}
				if user.can_refresh() {
					match self.refresh(user).await {
						Ok(user) => return Ok(user),
						Err(err) => warn!(target = "gasprobe", error = %err, "token refresh failed; re-authorizing"),
					}
				}
			} else {
				info!(target = "gasprobe", "cached token lacks requested scopes; re-authorizing");
			}
		}
		self.authorize().await
	}

	/// Refreshes the cached token when possible, else runs the consent flow.
	pub async fn login(&self) -> Result<AuthorizedUser> {
		match self.load_token()? {
			Some(user) if user.can_refresh() && user.covers(&self.scopes) => match self.refresh(user).await {
				Ok(user) => Ok(user),
				Err(err) => {
					warn!(target = "gasprobe", error = %err, "token refresh failed; re-authorizing");
					self.authorize().await
				}
			},
			_ => self.authorize().await,
		}
	}

	fn load_token(&self) -> Result<Option<AuthorizedUser>> {
		if !self.token_path.exists() {
			return Ok(None);
		}
		let content = fs::read_to_string(&self.token_path)?;
		match serde_json::from_str(&content) {
			Ok(user) => Ok(Some(user)),
			Err(err) => {
				warn!(target = "gasprobe", path = %self.token_path.display(), error = %err, "ignoring unreadable token file");
				Ok(None)
			}
		}
	}

	fn load_app(&self) -> Result<InstalledApp> {
		let content = fs::read_to_string(&self.secrets_path)
			.map_err(|e| Error::Auth(format!("client secrets not readable at {}: {e}", self.secrets_path.display())))?;
		let secrets: ClientSecrets = serde_json::from_str(&content)
			.map_err(|e| Error::Auth(format!("invalid client secrets {}: {e}", self.secrets_path.display())))?;
		secrets
			.app()
			.cloned()
			.ok_or_else(|| Error::Auth("client secrets define neither \"installed\" nor \"web\"".into()))
	}

	async fn refresh(&self, mut user: AuthorizedUser) -> Result<AuthorizedUser> {
		info!(target = "gasprobe", "refreshing access token");
		let refresh_token = user.refresh_token.clone().unwrap_or_default();
		let form = [
			("grant_type", "refresh_token"),
			("refresh_token", refresh_token.as_str()),
			("client_id", user.client_id.as_str()),
			("client_secret", user.client_secret.as_str()),
		];
		let response = self.token_request(&user.token_uri, &form).await?;
		user.apply(response, Utc::now());
		save_token(&self.token_path, &user)?;
		Ok(user)
	}

	async fn authorize(&self) -> Result<AuthorizedUser> {
		let app = self.load_app()?;

		let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
		let redirect_uri = format!("http://127.0.0.1:{}/", listener.local_addr()?.port());
		let state = generate_state();
		let consent = consent_url(&app, &redirect_uri, &self.scopes, &state)?;

		let (tx, rx) = oneshot::channel();
		let slot: CallbackSlot = Arc::new(Mutex::new(Some(tx)));
		let router = Router::new().route("/", get(callback)).with_state(slot);
		let server = tokio::spawn(async move { axum::serve(listener, router).await });

		eprintln!("Open this URL in a browser to authorize gasprobe:\n\n{consent}\n");
		info!(target = "gasprobe", redirect = %redirect_uri, "waiting for consent redirect");

		let received = tokio::time::timeout(CONSENT_TIMEOUT, rx).await;
		server.abort();
		let callback = match received {
			Ok(Ok(callback)) => callback,
			Ok(Err(_)) => return Err(Error::Auth("consent listener stopped".into())),
			Err(_) => {
				return Err(Error::Timeout {
					ms: CONSENT_TIMEOUT.as_millis() as u64,
					condition: "OAuth consent redirect".into(),
				});
			}
		};

		let code = check_callback(callback, &state)?;
		let form = [
			("grant_type", "authorization_code"),
			("code", code.as_str()),
			("redirect_uri", redirect_uri.as_str()),
			("client_id", app.client_id.as_str()),
			("client_secret", app.client_secret.as_str()),
		];
		let response = self.token_request(&app.token_uri, &form).await?;
		let user = AuthorizedUser::from_response(&app, response, &self.scopes, Utc::now());
		save_token(&self.token_path, &user)?;
		info!(target = "gasprobe", path = %self.token_path.display(), "token saved");
		Ok(user)
	}

	async fn token_request(&self, token_uri: &str, form: &[(&str, &str)]) -> Result<TokenResponse> {
		let response = self.http.post(token_uri).form(form).send().await?;
		let status = response.status();
		let body = response.text().await?;
		if !status.is_success() {
			return Err(Error::Auth(format!("token endpoint returned HTTP {}: {}", status.as_u16(), body.trim())));
		}
		Ok(serde_json::from_str(&body)?)
	}
}

async fn callback(State(slot): State<CallbackSlot>, Query(params): Query<Callback>) -> Html<&'static str> {
	let sender = slot.lock().ok().and_then(|mut guard| guard.take());
	if let Some(sender) = sender {
		let _ = sender.send(params);
	}
	Html("<html><body>Authorization received. You can close this tab.</body></html>")
}

fn check_callback(callback: Callback, expected_state: &str) -> Result<String> {
	if let Some(error) = callback.error {
		return Err(Error::Auth(format!("consent denied: {error}")));
	}
	if callback.state.as_deref() != Some(expected_state) {
		return Err(Error::Auth("state mismatch in consent redirect".into()));
	}
	callback
		.code
		.filter(|c| !c.is_empty())
		.ok_or_else(|| Error::Auth("consent redirect carried no code".into()))
}

/// Consent URL for the installed-app flow with offline access.
pub fn consent_url(app: &InstalledApp, redirect_uri: &str, scopes: &[String], state: &str) -> Result<String> {
	let scope = scopes.join(" ");
	let url = url::Url::parse_with_params(
		&app.auth_uri,
		&[
			("client_id", app.client_id.as_str()),
			("redirect_uri", redirect_uri),
			("response_type", "code"),
			("scope", scope.as_str()),
			("access_type", "offline"),
			("prompt", "consent"),
			("state", state),
		],
	)
	.map_err(|e| Error::Auth(format!("invalid auth_uri {}: {e}", app.auth_uri)))?;
	Ok(url.into())
}

/// Writes the token cache, readable by the owner only on unix.
pub fn save_token(path: &Path, user: &AuthorizedUser) -> Result<()> {
	if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
		fs::create_dir_all(parent)?;
	}
	let json = serde_json::to_string_pretty(user)?;

	let mut options = fs::OpenOptions::new();
	options.write(true).create(true).truncate(true);
	#[cfg(unix)]
	{
		use std::os::unix::fs::OpenOptionsExt;
		options.mode(0o600);
	}
	let mut file = options.open(path)?;
	// mode only applies on create; tighten a file left by an older run too
	#[cfg(unix)]
	{
		use std::os::unix::fs::PermissionsExt;
		file.set_permissions(fs::Permissions::from_mode(0o600))?;
	}
	file.write_all(json.as_bytes())?;
	Ok(())
}

fn generate_state() -> String {
	Uuid::new_v4().simple().to_string()
}
