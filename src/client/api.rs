//! Core HTTP client for the GitHub API

use std::sync::RwLock;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use compact_str::{CompactString, format_compact};
use reqwest::{Client, Method, Response};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::{debug, instrument};

use super::{
    config::{ClientConfig, GITHUB_API_VERSION},
    error::{ClientError, Result},
};
use crate::{
    domain::{
        CommitDto, CommitSignature, ContentsWriteDto, CreateRepositoryRequest, Identity, Profile,
        RepositoryDto, Resolution, WriteFileRequest,
    },
    email::EmailAddress,
};

/// File written into the throwaway repository to produce the probe commit.
const PROBE_FILE_PATH: &str = "probe.txt";

const USER_AGENT: &str = concat!("ghprobe/", env!("CARGO_PKG_VERSION"));

/// Pure HTTP client for the GitHub API
#[derive(Debug)]
pub struct GithubApi {
    client: Client,
    config: ClientConfig,
    identity: RwLock<Option<Identity>>,
}

impl GithubApi {
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;

        let client = Client::builder()
            .timeout(config.request.timeout)
            .build()
            .map_err(ClientError::from_reqwest)?;

        Ok(Self {
            client,
            config,
            identity: RwLock::new(None),
        })
    }

    /// Authenticated user's identity, fetched once and cached for the
    /// lifetime of the client. Subsequent calls make no network request.
    #[instrument(skip(self))]
    pub async fn identity(&self) -> Result<Identity> {
        if let Some(cached) = self.identity.read().unwrap().clone() {
            return Ok(cached);
        }

        let identity: Identity = self.request(Method::GET, "/user", None::<&()>).await?;
        debug!(login = %identity.login, "Fetched authenticated identity");
        *self.identity.write().unwrap() = Some(identity.clone());
        Ok(identity)
    }

    /// Create a private, auto-initialized repository under the
    /// authenticated user.
    #[instrument(skip(self), fields(repo = %name))]
    pub async fn create_repository(&self, name: &str) -> Result<RepositoryDto> {
        let body = CreateRepositoryRequest::throwaway(name);
        self.request(Method::POST, "/user/repos", Some(&body)).await
    }

    /// Delete a repository. Callers are expected to treat failure here as
    /// non-fatal; the probe result stands either way.
    #[instrument(skip(self), fields(repo = %name))]
    pub async fn delete_repository(&self, owner: &str, name: &str) -> Result<()> {
        let path = format_compact!("/repos/{owner}/{name}");
        let response = self.send(Method::DELETE, &path, None::<&()>).await?;
        Self::expect_success(response).await
    }

    /// Write the probe file, producing a commit whose author block carries
    /// the target email. Returns the new commit's SHA.
    #[instrument(skip(self, email), fields(repo = %repo))]
    pub async fn create_probe_commit(
        &self,
        owner: &str,
        repo: &str,
        email: &EmailAddress,
    ) -> Result<CompactString> {
        let body = WriteFileRequest {
            message: format_compact!("probe: {email}"),
            content: BASE64.encode(format!("probe {email}")).into(),
            author: CommitSignature::synthetic(email),
            committer: CommitSignature::neutral(),
        };

        let path = format_compact!("/repos/{owner}/{repo}/contents/{PROBE_FILE_PATH}");
        let written: ContentsWriteDto = self.request(Method::PUT, &path, Some(&body)).await?;
        Ok(written.commit.sha)
    }

    /// Read commit metadata and report whether GitHub has attributed the
    /// author email to an account yet.
    #[instrument(skip(self), fields(repo = %repo, sha = %sha))]
    pub async fn resolve_commit_author(
        &self,
        owner: &str,
        repo: &str,
        sha: &str,
    ) -> Result<Resolution> {
        let path = format_compact!("/repos/{owner}/{repo}/commits/{sha}");
        let commit: CommitDto = self.request(Method::GET, &path, None::<&()>).await?;

        Ok(Resolution {
            login: commit.author.map(|actor| actor.login),
            author_email: commit.commit.author.email,
        })
    }

    /// Fetch the public profile for a resolved login.
    #[instrument(skip(self))]
    pub async fn get_profile(&self, login: &str) -> Result<Profile> {
        let path = format_compact!("/users/{login}");
        self.request(Method::GET, &path, None::<&()>).await
    }

    /// Authenticated request primitive: send, then deserialize the JSON body
    /// or surface the server's error.
    async fn request<T, B>(&self, method: Method, path: &str, body: Option<&B>) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let response = self.send(method, path, body).await?;
        Self::handle_response(response).await
    }

    async fn send<B>(&self, method: Method, path: &str, body: Option<&B>) -> Result<Response>
    where
        B: Serialize + ?Sized,
    {
        let url = format!("{}{}", self.config.base_url, path);
        let mut request = self
            .client
            .request(method, url)
            .header("Authorization", format!("Bearer {}", self.config.token))
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", GITHUB_API_VERSION)
            .header("User-Agent", USER_AGENT);

        if let Some(body) = body {
            request = request.json(body);
        }

        request.send().await.map_err(ClientError::from_reqwest)
    }

    /// Deserialize a successful response's JSON body.
    async fn handle_response<T>(response: Response) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let endpoint: CompactString = response.url().path().into();
        let status = response.status();
        let body = response.text().await.map_err(ClientError::from_reqwest)?;

        if status.is_success() {
            serde_json::from_str(&body).map_err(|e| ClientError::json_parse(endpoint, e))
        } else {
            Err(Self::error_from_response(status.as_u16(), &body))
        }
    }

    /// Succeed on any 2xx, discarding the body.
    async fn expect_success(response: Response) -> Result<()> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.map_err(ClientError::from_reqwest)?;
        Err(Self::error_from_response(status.as_u16(), &body))
    }

    /// Map a non-2xx response into the error taxonomy, preferring the
    /// server-provided `message` field over the raw body.
    fn error_from_response(status: u16, body: &str) -> ClientError {
        #[derive(Deserialize)]
        struct ApiErrorBody {
            message: CompactString,
        }

        let message = serde_json::from_str::<ApiErrorBody>(body)
            .map(|parsed| parsed.message)
            .unwrap_or_else(|_| body.into());

        match status {
            401 => ClientError::Authentication,
            404 => ClientError::NotFound { resource: message },
            _ => ClientError::Api { status, message },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn api_against(server: &MockServer) -> GithubApi {
        let config = ClientConfig::new("ghp_sometesttoken").with_base_url(server.uri());
        GithubApi::new(config).unwrap()
    }

    #[test]
    fn server_message_is_preferred_over_raw_body() {
        let err = GithubApi::error_from_response(422, r#"{"message": "name already exists"}"#);
        match err {
            ClientError::Api { status, message } => {
                assert_eq!(status, 422);
                assert_eq!(message, "name already exists");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn unparsable_error_bodies_fall_back_to_raw_text() {
        let err = GithubApi::error_from_response(500, "<html>oops</html>");
        match err {
            ClientError::Api { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "<html>oops</html>");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn unauthorized_maps_to_authentication() {
        let err = GithubApi::error_from_response(401, r#"{"message": "Bad credentials"}"#);
        assert!(matches!(err, ClientError::Authentication));
    }

    #[tokio::test]
    async fn identity_is_fetched_once_and_cached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user"))
            .and(header("X-GitHub-Api-Version", GITHUB_API_VERSION))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"login": "probe-owner"})))
            .expect(1)
            .mount(&server)
            .await;

        let api = api_against(&server).await;
        let first = api.identity().await.unwrap();
        let second = api.identity().await.unwrap();
        assert_eq!(first.login, "probe-owner");
        assert_eq!(second.login, "probe-owner");
    }

    #[tokio::test]
    async fn requests_carry_bearer_auth() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user"))
            .and(header("Authorization", "Bearer ghp_sometesttoken"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"login": "probe-owner"})))
            .expect(1)
            .mount(&server)
            .await;

        let api = api_against(&server).await;
        api.identity().await.unwrap();
    }

    #[tokio::test]
    async fn resolution_reports_unattributed_commits_as_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/probe-owner/some-repo/commits/abc123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "author": null,
                "commit": {"author": {"name": "Alex Smith", "email": "alice@example.com", "date": "2024-01-01T00:00:00Z"}}
            })))
            .mount(&server)
            .await;

        let api = api_against(&server).await;
        let resolution = api
            .resolve_commit_author("probe-owner", "some-repo", "abc123")
            .await
            .unwrap();
        assert!(resolution.login.is_none());
        assert_eq!(resolution.author_email, "alice@example.com");
    }
}
