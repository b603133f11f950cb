// =============================================================================
// GOOGLE OAUTH FOR THE SHEETS SINK
// =============================================================================
//
// Installed-app OAuth2 flow with a typed, self-describing token cache.
//
// **Flow:**
// 1. Load `token.json`. If the cached credential is still fresh, use it.
// 2. If it is expired but carries a refresh token, refresh against the
//    token endpoint and re-save.
// 3. Otherwise run the interactive consent flow: open a loopback listener,
//    print the consent URL, capture the authorization code from the
//    browser redirect, exchange it for tokens, and save them.
//
// **Setup:**
// 1. Create an OAuth client ID of type "Desktop app" in Google Cloud
//    Console ("APIs & Services" > "Credentials").
// 2. Enable the Google Sheets and Google Drive APIs for the project.
// 3. Download the client secrets JSON and save it as `credentials.json`
//    next to the binary.
//
// The token cache is a single default location; concurrent runs sharing it
// are not a supported scenario.

use crate::core::export::ExportError;
use chrono::{DateTime, Duration, Utc};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Scopes needed to create a spreadsheet and change its sharing policy.
const SHEETS_SCOPES: &str =
    "https://www.googleapis.com/auth/spreadsheets https://www.googleapis.com/auth/drive";

/// Refresh this long before actual expiry, so a token never dies mid-export.
const EXPIRY_MARGIN_SECS: i64 = 60;

const DEFAULT_SECRETS_PATH: &str = "credentials.json";
const DEFAULT_TOKEN_PATH: &str = "token.json";

/// A cached OAuth credential, serialized as JSON between runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredCredential {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expiry: DateTime<Utc>,
}

impl StoredCredential {
    /// Whether the access token can still be used directly.
    pub fn is_fresh(&self) -> bool {
        self.expiry > Utc::now() + Duration::seconds(EXPIRY_MARGIN_SECS)
    }
}

/// Loads the cached credential. A missing file is `Ok(None)`; a file that
/// no longer parses is treated as an invalid cache (also `None`) so the
/// caller falls through to the interactive flow instead of failing.
pub fn load_credential(path: &Path) -> Result<Option<StoredCredential>, std::io::Error> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };

    match serde_json::from_str(&content) {
        Ok(credential) => Ok(Some(credential)),
        Err(e) => {
            tracing::warn!("Ignoring unreadable token cache at {}: {}", path.display(), e);
            Ok(None)
        }
    }
}

/// Saves the credential for future runs.
pub fn save_credential(path: &Path, credential: &StoredCredential) -> Result<(), std::io::Error> {
    let json = serde_json::to_string_pretty(credential).map_err(std::io::Error::other)?;
    std::fs::write(path, json)
}

/// OAuth client secrets from the downloaded `credentials.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_auth_uri() -> String {
    "https://accounts.google.com/o/oauth2/auth".to_string()
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

/// The secrets file wraps the actual values in an `installed` object.
#[derive(Debug, Deserialize)]
struct SecretsFile {
    installed: ClientSecrets,
}

fn load_client_secrets(path: &Path) -> Result<ClientSecrets, ExportError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        ExportError::Auth(format!(
            "Could not read {} ({}). Follow the setup instructions in this module's header.",
            path.display(),
            e
        ))
    })?;

    let file: SecretsFile = serde_json::from_str(&content)
        .map_err(|e| ExportError::Auth(format!("Invalid client secrets file: {}", e)))?;

    Ok(file.installed)
}

/// Response from Google's token endpoint.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
    refresh_token: Option<String>,
}

/// Authenticator that produces a valid access token for the Sheets sink,
/// via the cache / refresh / interactive-login cascade.
pub struct GoogleAuthenticator {
    client: Client,
    secrets_path: PathBuf,
    token_path: PathBuf,
}

impl GoogleAuthenticator {
    pub fn new() -> Self {
        Self::with_paths(DEFAULT_SECRETS_PATH, DEFAULT_TOKEN_PATH)
    }

    pub fn with_paths(secrets_path: impl Into<PathBuf>, token_path: impl Into<PathBuf>) -> Self {
        Self {
            client: Client::new(),
            secrets_path: secrets_path.into(),
            token_path: token_path.into(),
        }
    }

    /// Gets a valid access token, refreshing or re-authorizing as needed.
    pub async fn get_access_token(&self) -> Result<String, ExportError> {
        if let Some(credential) = load_credential(&self.token_path)? {
            if credential.is_fresh() {
                return Ok(credential.access_token);
            }

            if let Some(refresh_token) = credential.refresh_token {
                match self.refresh(&refresh_token).await {
                    Ok(refreshed) => return Ok(refreshed.access_token),
                    Err(e) => {
                        tracing::warn!(
                            "Token refresh failed, falling back to interactive login: {}",
                            e
                        );
                    }
                }
            }
        }

        let credential = self.interactive_login().await?;
        Ok(credential.access_token)
    }

    /// Exchanges a refresh token for a new access token and re-saves the
    /// cache. Google usually omits the refresh token here, so the old one
    /// is carried forward.
    async fn refresh(&self, refresh_token: &str) -> Result<StoredCredential, ExportError> {
        let secrets = load_client_secrets(&self.secrets_path)?;

        tracing::debug!("Refreshing Google access token");

        let response = self
            .client
            .post(&secrets.token_uri)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", secrets.client_id.as_str()),
                ("client_secret", secrets.client_secret.as_str()),
            ])
            .send()
            .await
            .map_err(|e| ExportError::Auth(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ExportError::Auth(format!(
                "Token refresh failed ({}): {}",
                status, text
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| ExportError::Auth(e.to_string()))?;

        let credential = StoredCredential {
            access_token: token.access_token,
            refresh_token: token
                .refresh_token
                .or_else(|| Some(refresh_token.to_string())),
            expiry: Utc::now() + Duration::seconds(token.expires_in),
        };

        save_credential(&self.token_path, &credential)?;
        Ok(credential)
    }

    /// Runs the interactive installed-app consent flow.
    async fn interactive_login(&self) -> Result<StoredCredential, ExportError> {
        let secrets = load_client_secrets(&self.secrets_path)?;

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let port = listener.local_addr()?.port();
        let redirect_uri = format!("http://localhost:{}", port);

        let auth_url = Url::parse_with_params(
            &secrets.auth_uri,
            &[
                ("response_type", "code"),
                ("client_id", secrets.client_id.as_str()),
                ("redirect_uri", redirect_uri.as_str()),
                ("scope", SHEETS_SCOPES),
                // Offline access so we get a refresh token to cache.
                ("access_type", "offline"),
                ("prompt", "consent"),
            ],
        )
        .map_err(|e| ExportError::Auth(format!("Invalid auth URI: {}", e)))?;

        println!("🔑 Open this URL in your browser to authorize access:");
        println!("   {}", auth_url);

        let code = wait_for_auth_code(&listener).await?;

        tracing::debug!("Exchanging authorization code for tokens");

        let response = self
            .client
            .post(&secrets.token_uri)
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code.as_str()),
                ("client_id", secrets.client_id.as_str()),
                ("client_secret", secrets.client_secret.as_str()),
                ("redirect_uri", redirect_uri.as_str()),
            ])
            .send()
            .await
            .map_err(|e| ExportError::Auth(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ExportError::Auth(format!(
                "Code exchange failed ({}): {}",
                status, text
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| ExportError::Auth(e.to_string()))?;

        let credential = StoredCredential {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expiry: Utc::now() + Duration::seconds(token.expires_in),
        };

        save_credential(&self.token_path, &credential)?;
        tracing::info!("Authorization complete, credentials cached");
        Ok(credential)
    }
}

impl Default for GoogleAuthenticator {
    fn default() -> Self {
        Self::new()
    }
}

/// Accepts one connection on the loopback listener and pulls the `code`
/// query parameter out of the redirect request.
async fn wait_for_auth_code(listener: &TcpListener) -> Result<String, ExportError> {
    let (mut stream, _) = listener.accept().await?;

    let mut buf = vec![0u8; 4096];
    let n = stream.read(&mut buf).await?;
    let request = String::from_utf8_lossy(&buf[..n]).into_owned();

    let code = parse_auth_code(&request)
        .ok_or_else(|| ExportError::Auth("Authorization redirect carried no code".to_string()))?;

    let body = "Authorization complete. You can close this tab.";
    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: {}\r\n\r\n{}",
        body.len(),
        body
    );
    // Best effort; the code is already in hand.
    let _ = stream.write_all(response.as_bytes()).await;

    Ok(code)
}

/// Parses the `code` parameter from the request line of the redirect,
/// e.g. `GET /?code=4%2Fabc&scope=... HTTP/1.1`.
///
/// Google's authorization codes contain `/`, so the value arrives
/// percent-encoded and must be decoded here; the token exchange re-encodes
/// it as form data, and a still-encoded code would be rejected.
fn parse_auth_code(request: &str) -> Option<String> {
    let line = request.lines().next()?;
    let path = line.split_whitespace().nth(1)?;
    let query = path.split_once('?')?.1;

    query.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        (key == "code").then(|| percent_decode(value))
    })
}

/// Decodes a URL query component: `%XX` byte escapes and `+` as space.
fn percent_decode(value: &str) -> String {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'%' if i + 2 < bytes.len() => {
                let escaped = std::str::from_utf8(&bytes[i + 1..i + 3])
                    .ok()
                    .and_then(|hex| u8::from_str_radix(hex, 16).ok());
                match escaped {
                    Some(byte) => {
                        out.push(byte);
                        i += 3;
                    }
                    None => {
                        out.push(b'%');
                        i += 1;
                    }
                }
            }
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            other => {
                out.push(other);
                i += 1;
            }
        }
    }

    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_auth_code_is_percent_decoded() {
        // Real Google codes look like `4/0Axyz...` and arrive as `4%2F...`;
        // the decoded form must be handed to the token exchange.
        let request = "GET /?code=4%2Fabc123&scope=https://example HTTP/1.1\r\nHost: localhost\r\n\r\n";
        assert_eq!(parse_auth_code(request), Some("4/abc123".to_string()));
    }

    #[test]
    fn test_parse_auth_code_plain_value() {
        let request = "GET /?state=x&code=plaincode HTTP/1.1\r\n\r\n";
        assert_eq!(parse_auth_code(request), Some("plaincode".to_string()));
    }

    #[test]
    fn test_percent_decode() {
        assert_eq!(percent_decode("4%2F0Aabc%3D%3D"), "4/0Aabc==");
        assert_eq!(percent_decode("a+b"), "a b");
        assert_eq!(percent_decode("untouched"), "untouched");
        // Malformed escapes pass through rather than panicking.
        assert_eq!(percent_decode("100%"), "100%");
        assert_eq!(percent_decode("%zz"), "%zz");
    }

    #[test]
    fn test_parse_auth_code_denied() {
        let request = "GET /?error=access_denied HTTP/1.1\r\n\r\n";
        assert_eq!(parse_auth_code(request), None);
    }

    #[test]
    fn test_credential_freshness() {
        let fresh = StoredCredential {
            access_token: "t".to_string(),
            refresh_token: None,
            expiry: Utc::now() + Duration::hours(1),
        };
        assert!(fresh.is_fresh());

        let expired = StoredCredential {
            access_token: "t".to_string(),
            refresh_token: None,
            expiry: Utc::now() - Duration::hours(1),
        };
        assert!(!expired.is_fresh());

        // Inside the safety margin counts as stale.
        let nearly = StoredCredential {
            access_token: "t".to_string(),
            refresh_token: None,
            expiry: Utc::now() + Duration::seconds(EXPIRY_MARGIN_SECS - 5),
        };
        assert!(!nearly.is_fresh());
    }

    #[test]
    fn test_credential_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");

        let credential = StoredCredential {
            access_token: "access".to_string(),
            refresh_token: Some("refresh".to_string()),
            expiry: Utc::now() + Duration::hours(1),
        };

        save_credential(&path, &credential).unwrap();
        let loaded = load_credential(&path).unwrap().unwrap();

        assert_eq!(loaded.access_token, "access");
        assert_eq!(loaded.refresh_token.as_deref(), Some("refresh"));
        assert_eq!(loaded.expiry, credential.expiry);
    }

    #[test]
    fn test_load_missing_credential_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = load_credential(&dir.path().join("nope.json")).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_load_corrupt_credential_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        std::fs::write(&path, "not json at all").unwrap();

        let loaded = load_credential(&path).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_client_secrets_defaults() {
        let json = r#"{"installed": {"client_id": "id", "client_secret": "secret"}}"#;
        let file: SecretsFile = serde_json::from_str(json).unwrap();
        assert_eq!(file.installed.client_id, "id");
        assert_eq!(
            file.installed.token_uri,
            "https://oauth2.googleapis.com/token"
        );
    }
}
