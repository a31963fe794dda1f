//! Layered GitHub token acquisition and persistence
//!
//! Resolution order: process environment, then the local env-file, then an
//! interactive prompt. A prompted token is validated against the API and
//! persisted on success.

use std::{
    fs,
    io::{self, BufRead, Write},
    path::{Path, PathBuf},
};

use compact_str::{CompactString, ToCompactString};
use tracing::{debug, warn};

use crate::{
    client::{ClientConfig, GithubApi, config::GITHUB_API_URL},
    result::{GhprobeError, Result},
};

/// Environment variables consulted before any file or prompt.
const TOKEN_ENV_KEYS: [&str; 2] = ["GITHUB_TOKEN", "GH_TOKEN"];
const TOKEN_FILE_KEY: &str = "GITHUB_TOKEN";

const ENV_FILE_NAME: &str = ".env";
const IGNORE_FILE_NAME: &str = ".gitignore";

const FINE_GRAINED_TOKEN_URL: &str = "https://github.com/settings/personal-access-tokens/new";
const CLASSIC_TOKEN_URL: &str =
    "https://github.com/settings/tokens/new?description=ghprobe&scopes=repo,delete_repo";

/// Key-value store backed by a dotenv-style file.
#[derive(Debug, Clone)]
pub struct EnvFileStore {
    env_path: PathBuf,
    ignore_path: PathBuf,
}

impl Default for EnvFileStore {
    fn default() -> Self {
        Self::new(Path::new("."))
    }
}

impl EnvFileStore {
    pub fn new(dir: &Path) -> Self {
        Self {
            env_path: dir.join(ENV_FILE_NAME),
            ignore_path: dir.join(IGNORE_FILE_NAME),
        }
    }

    pub fn env_path(&self) -> &Path {
        &self.env_path
    }

    /// Parse `KEY=VALUE` lines; comments and malformed lines are skipped.
    fn load(&self) -> Vec<(String, String)> {
        let Ok(content) = fs::read_to_string(&self.env_path) else {
            return Vec::new();
        };

        content
            .lines()
            .filter_map(|line| {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    return None;
                }
                line.split_once('=')
                    .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
            })
            .collect()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.load().into_iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Upsert a key, rewriting the file with unrelated entries preserved.
    /// The file is written with owner-only permissions and shielded from
    /// version control through the ignore file.
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.load();
        match entries.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value.to_string(),
            None => entries.push((key.to_string(), value.to_string())),
        }

        let content: String = entries
            .iter()
            .map(|(k, v)| format!("{k}={v}\n"))
            .collect();
        fs::write(&self.env_path, content)
            .map_err(|e| GhprobeError::token_save(self.env_path.clone(), e))?;

        restrict_permissions(&self.env_path);
        self.ensure_ignored();
        Ok(())
    }

    /// Append the env-file name to the ignore file unless already present.
    fn ensure_ignored(&self) {
        let existing = fs::read_to_string(&self.ignore_path).unwrap_or_default();
        if existing.lines().any(|line| line.trim() == ENV_FILE_NAME) {
            return;
        }

        let mut content = existing;
        if !content.is_empty() && !content.ends_with('\n') {
            content.push('\n');
        }
        content.push_str(ENV_FILE_NAME);
        content.push('\n');

        if let Err(e) = fs::write(&self.ignore_path, content) {
            warn!(error = %e, "Failed to update {IGNORE_FILE_NAME}");
        }
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) {
    use std::os::unix::fs::PermissionsExt;

    if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(0o600)) {
        warn!(error = %e, "Failed to restrict token file permissions");
    }
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) {}

/// Interactive token input, abstracted for tests.
pub trait Prompter {
    fn prompt_token(&self) -> io::Result<String>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct StdinPrompter;

impl Prompter for StdinPrompter {
    fn prompt_token(&self) -> io::Result<String> {
        eprint!("Paste your GitHub personal access token: ");
        io::stderr().flush()?;

        let mut token = String::new();
        io::stdin().lock().read_line(&mut token)?;
        Ok(token.trim().to_string())
    }
}

/// Layered token resolution.
#[derive(Debug)]
pub struct TokenResolver<P = StdinPrompter> {
    store: EnvFileStore,
    prompter: P,
    open_browser: bool,
    api_base_url: CompactString,
}

impl TokenResolver<StdinPrompter> {
    pub fn new(store: EnvFileStore, open_browser: bool) -> Self {
        Self::with_prompter(store, StdinPrompter, open_browser)
    }
}

impl<P: Prompter> TokenResolver<P> {
    pub fn with_prompter(store: EnvFileStore, prompter: P, open_browser: bool) -> Self {
        Self {
            store,
            prompter,
            open_browser,
            api_base_url: GITHUB_API_URL.into(),
        }
    }

    /// Validate prompted tokens against a different API endpoint.
    #[allow(dead_code)]
    pub fn with_api_base_url(mut self, base_url: impl Into<CompactString>) -> Self {
        self.api_base_url = base_url.into();
        self
    }

    /// Non-interactive layers only: environment, then the env-file.
    pub fn stored_token(&self) -> Option<String> {
        for key in TOKEN_ENV_KEYS {
            if let Ok(token) = std::env::var(key)
                && !token.trim().is_empty()
            {
                debug!(source = key, "Using token from environment");
                return Some(token.trim().to_string());
            }
        }

        let token = self.store.get(TOKEN_FILE_KEY).filter(|t| !t.is_empty());
        if token.is_some() {
            debug!(path = %self.store.env_path().display(), "Using stored token");
        }
        token
    }

    /// Resolve a token, falling back to the interactive prompt. A prompted
    /// token is validated against `GET /user` and persisted on success.
    pub async fn resolve(&self) -> Result<String> {
        if let Some(token) = self.stored_token() {
            return Ok(token);
        }

        eprintln!("No GitHub token found.");
        if self.open_browser {
            eprintln!("Opening the token settings page (Contents: write, Administration: write)...");
            if let Err(e) = open::that(CLASSIC_TOKEN_URL) {
                warn!(error = %e, "Failed to open browser");
                eprintln!("Create a token at: {CLASSIC_TOKEN_URL}");
            }
            eprintln!("Fine-grained alternative: {FINE_GRAINED_TOKEN_URL}");
        } else {
            eprintln!("Create a fine-grained token at: {FINE_GRAINED_TOKEN_URL}");
            eprintln!("Or a classic token at: {CLASSIC_TOKEN_URL}");
        }

        let token = self
            .prompter
            .prompt_token()
            .map_err(|e| GhprobeError::General(e.to_compact_string()))?;
        if token.is_empty() {
            return Err(GhprobeError::MissingToken);
        }

        self.validate(&token).await?;
        self.store.set(TOKEN_FILE_KEY, &token)?;
        eprintln!("Saved token to {}.", self.store.env_path().display());
        Ok(token)
    }

    /// Check the token resolves to a user before persisting it.
    async fn validate(&self, token: &str) -> Result<()> {
        let config = ClientConfig::new(token).with_base_url(self.api_base_url.clone());
        let api = GithubApi::new(config)?;
        let identity = api
            .identity()
            .await
            .map_err(|e| GhprobeError::TokenValidation(e.to_compact_string()))?;
        debug!(login = %identity.login, "Token validated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use serial_test::serial;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    struct FixedPrompter(&'static str);

    impl Prompter for FixedPrompter {
        fn prompt_token(&self) -> io::Result<String> {
            Ok(self.0.to_string())
        }
    }

    fn clear_token_env() {
        for key in TOKEN_ENV_KEYS {
            unsafe { std::env::remove_var(key) };
        }
    }

    #[test]
    fn env_file_round_trips_and_preserves_unrelated_keys() {
        let dir = TempDir::new().unwrap();
        let store = EnvFileStore::new(dir.path());

        fs::write(store.env_path(), "# comment\nOTHER=keepme\nbroken line\n").unwrap();
        store.set("GITHUB_TOKEN", "tok123").unwrap();

        assert_eq!(store.get("GITHUB_TOKEN").as_deref(), Some("tok123"));
        assert_eq!(store.get("OTHER").as_deref(), Some("keepme"));

        store.set("GITHUB_TOKEN", "tok456").unwrap();
        assert_eq!(store.get("GITHUB_TOKEN").as_deref(), Some("tok456"));

        let content = fs::read_to_string(store.env_path()).unwrap();
        assert_eq!(content.matches("GITHUB_TOKEN").count(), 1);
    }

    #[test]
    fn ignore_entry_is_appended_exactly_once() {
        let dir = TempDir::new().unwrap();
        let store = EnvFileStore::new(dir.path());

        store.set("GITHUB_TOKEN", "tok123").unwrap();
        store.set("GITHUB_TOKEN", "tok456").unwrap();

        let ignore = fs::read_to_string(dir.path().join(IGNORE_FILE_NAME)).unwrap();
        assert_eq!(ignore.lines().filter(|l| *l == ENV_FILE_NAME).count(), 1);
    }

    #[test]
    fn ignore_file_contents_are_preserved() {
        let dir = TempDir::new().unwrap();
        let store = EnvFileStore::new(dir.path());

        fs::write(dir.path().join(IGNORE_FILE_NAME), "target/").unwrap();
        store.set("GITHUB_TOKEN", "tok123").unwrap();

        let ignore = fs::read_to_string(dir.path().join(IGNORE_FILE_NAME)).unwrap();
        let lines: Vec<&str> = ignore.lines().collect();
        assert_eq!(lines, vec!["target/", ENV_FILE_NAME]);
    }

    #[cfg(unix)]
    #[test]
    fn token_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let store = EnvFileStore::new(dir.path());
        store.set("GITHUB_TOKEN", "tok123").unwrap();

        let mode = fs::metadata(store.env_path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    #[serial]
    fn environment_takes_precedence_over_the_env_file() {
        clear_token_env();
        let dir = TempDir::new().unwrap();
        let store = EnvFileStore::new(dir.path());
        store.set("GITHUB_TOKEN", "from-file").unwrap();

        let resolver = TokenResolver::new(store, false);
        assert_eq!(resolver.stored_token().as_deref(), Some("from-file"));

        unsafe { std::env::set_var("GH_TOKEN", "from-env") };
        assert_eq!(resolver.stored_token().as_deref(), Some("from-env"));
        clear_token_env();
    }

    #[tokio::test]
    #[serial]
    async fn prompted_token_is_validated_and_persisted() {
        clear_token_env();
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"login": "probe-owner"})))
            .expect(1)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let store = EnvFileStore::new(dir.path());
        let resolver = TokenResolver::with_prompter(store.clone(), FixedPrompter("tok123"), false)
            .with_api_base_url(server.uri());

        let token = resolver.resolve().await.unwrap();
        assert_eq!(token, "tok123");
        assert_eq!(store.get("GITHUB_TOKEN").as_deref(), Some("tok123"));
    }

    #[tokio::test]
    #[serial]
    async fn rejected_token_is_not_persisted() {
        clear_token_env();
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({"message": "Bad credentials"})),
            )
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let store = EnvFileStore::new(dir.path());
        let resolver = TokenResolver::with_prompter(store.clone(), FixedPrompter("bad"), false)
            .with_api_base_url(server.uri());

        let result = resolver.resolve().await;
        assert!(matches!(result, Err(GhprobeError::TokenValidation(_))));
        assert!(store.get("GITHUB_TOKEN").is_none());
    }

    #[tokio::test]
    #[serial]
    async fn empty_prompt_input_is_a_missing_token() {
        clear_token_env();
        let dir = TempDir::new().unwrap();
        let resolver =
            TokenResolver::with_prompter(EnvFileStore::new(dir.path()), FixedPrompter(""), false);

        let result = resolver.resolve().await;
        assert!(matches!(result, Err(GhprobeError::MissingToken)));
    }
}
