//! GitHub API Client
//!
//! Collaborator interfaces used by the labeler and their GitHub implementation

use async_trait::async_trait;
use octocrab::Octocrab;

use crate::error::{Error, Result};

/// Check if an octocrab error is a 404 Not Found
fn is_not_found_error(err: &octocrab::Error) -> bool {
    err.to_string().contains("Not Found")
}

/// Pull Request Reference
///
/// Identifies the pull request (issue) whose labels are managed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestRef {
    /// Repository owner
    pub owner: String,

    /// Repository name
    pub repo: String,

    /// Pull request number
    pub number: u64,
}

impl PullRequestRef {
    pub fn new(owner: &str, repo: &str, number: u64) -> Self {
        Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
            number,
        }
    }
}

impl std::fmt::Display for PullRequestRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}#{}", self.owner, self.repo, self.number)
    }
}

/// Source of the labeler configuration file
#[async_trait]
pub trait ConfigSource: Send + Sync {
    /// Fetch the raw configuration content at `path`
    async fn fetch_config(&self, path: &str) -> Result<String>;
}

/// Source of pull request state
#[async_trait]
pub trait PullRequestSource: Send + Sync {
    /// List every file path changed by the pull request
    async fn changed_files(&self, pr: &PullRequestRef) -> Result<Vec<String>>;

    /// List the names of labels currently on the pull request
    async fn current_labels(&self, pr: &PullRequestRef) -> Result<Vec<String>>;
}

/// Destination for label changes
#[async_trait]
pub trait LabelSink: Send + Sync {
    /// Add all given labels in one request
    async fn add_labels(&self, pr: &PullRequestRef, labels: &[String]) -> Result<()>;

    /// Remove a single label
    async fn remove_label(&self, pr: &PullRequestRef, name: &str) -> Result<()>;
}

/// GitHub API Client
///
/// Client responsible for interactions with the GitHub API
#[derive(Clone)]
pub struct GitHubClient {
    octocrab: Octocrab,
    owner: String,
    repo: String,
    config_ref: Option<String>,
}

impl GitHubClient {
    /// Create a new GitHub client
    ///
    /// # Arguments
    /// - `access_token`: GitHub access token
    /// - `owner`: Repository owner
    /// - `repo`: Repository name
    ///
    /// # Errors
    /// Returns an error if client initialization fails
    pub fn new(access_token: &str, owner: &str, repo: &str) -> Result<Self> {
        let octocrab = Octocrab::builder()
            .personal_token(access_token.to_string())
            .build()?;

        Ok(Self::from_octocrab(octocrab, owner, repo))
    }

    /// Create a client for a GitHub Enterprise Server or other API root
    ///
    /// # Errors
    /// Returns an error if `api_url` is not a valid URI or client initialization fails
    pub fn with_api_url(access_token: &str, owner: &str, repo: &str, api_url: &str) -> Result<Self> {
        let octocrab = Octocrab::builder()
            .base_uri(api_url)?
            .personal_token(access_token.to_string())
            .build()?;

        Ok(Self::from_octocrab(octocrab, owner, repo))
    }

    fn from_octocrab(octocrab: Octocrab, owner: &str, repo: &str) -> Self {
        Self {
            octocrab,
            owner: owner.to_string(),
            repo: repo.to_string(),
            config_ref: None,
        }
    }

    /// Read the configuration file at a specific git ref
    pub fn with_config_ref(mut self, config_ref: Option<String>) -> Self {
        self.config_ref = config_ref;
        self
    }

    /// Reference to a pull request in this client's repository
    pub fn pull_request(&self, number: u64) -> PullRequestRef {
        PullRequestRef::new(&self.owner, &self.repo, number)
    }
}

#[async_trait]
impl ConfigSource for GitHubClient {
    async fn fetch_config(&self, path: &str) -> Result<String> {
        let repos = self.octocrab.repos(&self.owner, &self.repo);
        let mut request = repos.get_content().path(path);
        if let Some(config_ref) = &self.config_ref {
            request = request.r#ref(config_ref);
        }

        let content_items = request.send().await.map_err(|e| {
            if is_not_found_error(&e) {
                Error::ConfigNotFound(format!("{}/{}:{}", self.owner, self.repo, path))
            } else {
                Error::GitHubApi(e)
            }
        })?;

        let file = content_items
            .items
            .first()
            .ok_or_else(|| Error::config_validation("Remote file returned empty content"))?;

        file.decoded_content()
            .ok_or_else(|| Error::config_validation("Failed to decode remote file content"))
    }
}

#[async_trait]
impl PullRequestSource for GitHubClient {
    async fn changed_files(&self, pr: &PullRequestRef) -> Result<Vec<String>> {
        let first_page = self
            .octocrab
            .pulls(&pr.owner, &pr.repo)
            .list_files(pr.number)
            .await?;

        let entries = self.octocrab.all_pages(first_page).await?;

        Ok(entries.into_iter().map(|entry| entry.filename).collect())
    }

    async fn current_labels(&self, pr: &PullRequestRef) -> Result<Vec<String>> {
        let first_page = self
            .octocrab
            .issues(&pr.owner, &pr.repo)
            .list_labels_for_issue(pr.number)
            .per_page(100)
            .send()
            .await?;

        let labels = self.octocrab.all_pages(first_page).await?;

        Ok(labels.into_iter().map(|label| label.name).collect())
    }
}

#[async_trait]
impl LabelSink for GitHubClient {
    async fn add_labels(&self, pr: &PullRequestRef, labels: &[String]) -> Result<()> {
        self.octocrab
            .issues(&pr.owner, &pr.repo)
            .add_labels(pr.number, labels)
            .await?;

        Ok(())
    }

    async fn remove_label(&self, pr: &PullRequestRef, name: &str) -> Result<()> {
        // octocrab percent-encodes the name itself
        self.octocrab
            .issues(&pr.owner, &pr.repo)
            .remove_label(pr.number, name)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Accept one request, answer it with `body` and return its request line
    async fn capture_request_line(listener: TcpListener, body: &'static str) -> String {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut chunk = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&chunk[..n]);
        }

        let response = format!(
            "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.unwrap();

        String::from_utf8_lossy(&request)
            .lines()
            .next()
            .unwrap_or_default()
            .to_string()
    }

    async fn local_client() -> (GitHubClient, TcpListener) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let client =
            GitHubClient::with_api_url("token", "o", "r", &format!("http://{addr}")).unwrap();
        (client, listener)
    }

    #[tokio::test]
    async fn test_remove_label_encodes_name_once() {
        let (client, listener) = local_client().await;
        let server = tokio::spawn(capture_request_line(listener, "[]"));

        client
            .remove_label(&client.pull_request(1), "good first issue")
            .await
            .unwrap();

        assert_eq!(
            server.await.unwrap(),
            "DELETE /repos/o/r/issues/1/labels/good%20first%20issue HTTP/1.1"
        );
    }

    #[tokio::test]
    async fn test_add_labels_posts_to_issue_labels() {
        let (client, listener) = local_client().await;
        let server = tokio::spawn(capture_request_line(listener, "[]"));

        client
            .add_labels(&client.pull_request(7), &["docs".to_string()])
            .await
            .unwrap();

        assert_eq!(
            server.await.unwrap(),
            "POST /repos/o/r/issues/7/labels HTTP/1.1"
        );
    }

    #[tokio::test]
    async fn test_current_labels_single_page() {
        let (client, listener) = local_client().await;
        let server = tokio::spawn(capture_request_line(listener, "[]"));

        let labels = client.current_labels(&client.pull_request(3)).await.unwrap();

        assert!(labels.is_empty());
        assert!(server
            .await
            .unwrap()
            .starts_with("GET /repos/o/r/issues/3/labels?"));
    }

    #[test]
    fn test_pull_request_ref_display() {
        let pr = PullRequestRef::new("owner", "repo", 123);
        assert_eq!(pr.to_string(), "owner/repo#123");
    }

    #[tokio::test]
    async fn test_client_pull_request_ref() {
        let client = GitHubClient::new("token", "owner", "repo").unwrap();
        assert_eq!(
            client.pull_request(5),
            PullRequestRef::new("owner", "repo", 5)
        );
    }
}
