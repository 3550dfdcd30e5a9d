//! [`GithubClient`]: the [`BoardClient`] implementation over GitHub REST v3.

use std::time::Duration;

use async_trait::async_trait;
use board::{
    Board, BoardClient, BoardError, BoardId, Card, CardId, Column, ColumnId, ContentId,
    ContentItem, ContentKind, Hook, IssueNumber, Repository, RepositoryName,
};
use reqwest::header::{HeaderMap, ACCEPT, LINK, RETRY_AFTER};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::wire::{
    ApiMessage, NewCard, NewHook, WireCard, WireColumn, WireHook, WireHookConfig, WireIssue,
    WireProject, WirePullRequest, WireRepository,
};

/// Public GitHub API root.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Media type that enables the classic Projects endpoints.
const PROJECTS_PREVIEW: &str = "application/vnd.github.inertia-preview+json";

const PER_PAGE: u32 = 100;

/// Errors constructing a [`GithubClient`].
#[derive(Debug, Error)]
pub enum GithubError {
    #[error("GitHub organisation name must not be empty")]
    MissingOrganisation,

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Connection settings for [`GithubClient`].
#[derive(Debug, Clone)]
pub struct GithubConfig {
    /// API root, without a trailing slash. Override for GitHub Enterprise.
    pub api_url: String,
    pub organisation: String,
    pub token: String,
    pub user_agent: String,
    /// Transport-level bound on each request.
    pub request_timeout: Duration,
}

impl GithubConfig {
    pub fn new(organisation: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            organisation: organisation.into(),
            token: token.into(),
            user_agent: concat!("projector/", env!("CARGO_PKG_VERSION")).to_string(),
            request_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// What a request is about, for error reporting.
struct Target<'a> {
    operation: &'a str,
    resource: &'a str,
    key: String,
}

/// Authenticated GitHub client scoped to one organisation.
///
/// Holds a single connection pool; cheap to share behind an `Arc`.
#[derive(Debug, Clone)]
pub struct GithubClient {
    http: reqwest::Client,
    api_url: String,
    organisation: String,
    token: String,
}

impl GithubClient {
    pub fn new(config: GithubConfig) -> Result<Self, GithubError> {
        if config.organisation.is_empty() {
            return Err(GithubError::MissingOrganisation);
        }
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent)
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            http,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            organisation: config.organisation,
            token: config.token,
        })
    }

    pub fn organisation(&self) -> &str {
        &self.organisation
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.http
            .request(method, url)
            .bearer_auth(&self.token)
            .header(ACCEPT, PROJECTS_PREVIEW)
    }

    async fn send(&self, target: &Target<'_>, request: RequestBuilder) -> Result<Response, BoardError> {
        let response = request.send().await.map_err(|err| {
            let message = if err.is_timeout() {
                "request timed out".to_string()
            } else {
                err.to_string()
            };
            BoardError::remote(target.operation, message)
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let retry_after = retry_after(response.headers());
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiMessage>(&body)
            .map(|m| m.message)
            .unwrap_or(body);
        Err(status_error(target, status, message, retry_after))
    }

    async fn get<T: DeserializeOwned>(&self, target: Target<'_>, path: &str) -> Result<T, BoardError> {
        let response = self.send(&target, self.request(Method::GET, &self.url(path))).await?;
        decode(&target, response).await
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        target: Target<'_>,
        path: &str,
        body: &B,
    ) -> Result<T, BoardError> {
        let request = self.request(Method::POST, &self.url(path)).json(body);
        let response = self.send(&target, request).await?;
        decode(&target, response).await
    }

    /// Fetches every page of a list endpoint, following `Link: rel="next"`.
    async fn get_all<T: DeserializeOwned>(
        &self,
        target: Target<'_>,
        path: &str,
    ) -> Result<Vec<T>, BoardError> {
        let separator = if path.contains('?') { '&' } else { '?' };
        let mut next = Some(self.url(&format!("{path}{separator}per_page={PER_PAGE}")));
        let mut all = Vec::new();
        while let Some(url) = next.take() {
            let response = self.send(&target, self.request(Method::GET, &url)).await?;
            next = next_link(response.headers());
            let page: Vec<T> = decode(&target, response).await?;
            debug!(operation = target.operation, items = page.len(), "Fetched page");
            all.extend(page);
        }
        Ok(all)
    }
}

async fn decode<T: DeserializeOwned>(target: &Target<'_>, response: Response) -> Result<T, BoardError> {
    response
        .json()
        .await
        .map_err(|err| BoardError::remote(target.operation, format!("invalid response body: {err}")))
}

fn status_error(
    target: &Target<'_>,
    status: StatusCode,
    message: String,
    retry_after: Option<Duration>,
) -> BoardError {
    match status {
        StatusCode::NOT_FOUND => BoardError::not_found(target.resource, &target.key),
        StatusCode::UNPROCESSABLE_ENTITY => BoardError::Conflict {
            operation: target.operation.to_string(),
            message,
        },
        _ => BoardError::RemoteUnavailable {
            operation: target.operation.to_string(),
            message,
            status: Some(status.as_u16()),
            retry_after,
        },
    }
}

fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
        .map(Duration::from_secs)
}

/// Extracts the `rel="next"` URL from a `Link` header.
fn next_link(headers: &HeaderMap) -> Option<String> {
    let link = headers.get(LINK)?.to_str().ok()?;
    link.split(',').find_map(|part| {
        let (url, params) = part.split_once(';')?;
        params
            .split(';')
            .any(|param| param.trim() == r#"rel="next""#)
            .then(|| url.trim().trim_start_matches('<').trim_end_matches('>').to_string())
    })
}

#[async_trait]
impl BoardClient for GithubClient {
    #[instrument(skip(self), fields(org = %self.organisation))]
    async fn list_repositories(&self) -> Result<Vec<Repository>, BoardError> {
        let target = Target {
            operation: "list_repositories",
            resource: "organisation",
            key: self.organisation.clone(),
        };
        let repos: Vec<WireRepository> = self
            .get_all(target, &format!("/orgs/{}/repos", self.organisation))
            .await?;
        Ok(repos.into_iter().filter_map(WireRepository::into_repository).collect())
    }

    #[instrument(skip(self), fields(org = %self.organisation))]
    async fn list_boards(&self) -> Result<Vec<Board>, BoardError> {
        let target = Target {
            operation: "list_boards",
            resource: "organisation",
            key: self.organisation.clone(),
        };
        let projects: Vec<WireProject> = self
            .get_all(target, &format!("/orgs/{}/projects?state=open", self.organisation))
            .await?;
        Ok(projects.into_iter().filter_map(WireProject::into_board).collect())
    }

    #[instrument(skip(self))]
    async fn list_columns(&self, board: BoardId) -> Result<Vec<Column>, BoardError> {
        let target = Target {
            operation: "list_columns",
            resource: "board",
            key: board.to_string(),
        };
        let columns: Vec<WireColumn> = self
            .get_all(target, &format!("/projects/{board}/columns"))
            .await?;
        Ok(columns
            .into_iter()
            .filter_map(|column| column.into_column(board))
            .collect())
    }

    #[instrument(skip(self))]
    async fn list_cards(&self, column: ColumnId) -> Result<Vec<Card>, BoardError> {
        let target = Target {
            operation: "list_cards",
            resource: "column",
            key: column.to_string(),
        };
        let cards: Vec<WireCard> = self
            .get_all(target, &format!("/projects/columns/{column}/cards"))
            .await?;
        Ok(cards.into_iter().map(|card| card.into_card(column)).collect())
    }

    #[instrument(skip(self))]
    async fn create_card(
        &self,
        column: ColumnId,
        kind: ContentKind,
        content: ContentId,
    ) -> Result<Card, BoardError> {
        let target = Target {
            operation: "create_card",
            resource: "column",
            key: column.to_string(),
        };
        let body = NewCard {
            content_id: content.as_u64(),
            content_type: kind,
        };
        let card: WireCard = self
            .post(target, &format!("/projects/columns/{column}/cards"), &body)
            .await?;
        Ok(card.into_card(column))
    }

    #[instrument(skip(self))]
    async fn delete_card(&self, card: CardId) -> Result<(), BoardError> {
        let target = Target {
            operation: "delete_card",
            resource: "card",
            key: card.to_string(),
        };
        let url = self.url(&format!("/projects/columns/cards/{card}"));
        self.send(&target, self.request(Method::DELETE, &url)).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn fetch_issue(
        &self,
        repository: &RepositoryName,
        number: IssueNumber,
    ) -> Result<ContentItem, BoardError> {
        let target = Target {
            operation: "fetch_issue",
            resource: "issue",
            key: format!("{repository}#{number}"),
        };
        let issue: WireIssue = self
            .get(target, &format!("/repos/{repository}/issues/{number}"))
            .await?;
        Ok(issue.into_item(repository))
    }

    #[instrument(skip(self))]
    async fn fetch_pull_request(
        &self,
        repository: &RepositoryName,
        number: IssueNumber,
    ) -> Result<ContentItem, BoardError> {
        let target = Target {
            operation: "fetch_pull_request",
            resource: "pull request",
            key: format!("{repository}#{number}"),
        };
        let pull: WirePullRequest = self
            .get(target, &format!("/repos/{repository}/pulls/{number}"))
            .await?;
        Ok(pull.into_item(repository))
    }

    #[instrument(skip(self), fields(org = %self.organisation))]
    async fn list_hooks(&self) -> Result<Vec<Hook>, BoardError> {
        let target = Target {
            operation: "list_hooks",
            resource: "organisation hooks",
            key: self.organisation.clone(),
        };
        let hooks: Vec<WireHook> = self
            .get_all(target, &format!("/orgs/{}/hooks", self.organisation))
            .await?;
        Ok(hooks.into_iter().map(WireHook::into_hook).collect())
    }

    #[instrument(skip(self), fields(org = %self.organisation))]
    async fn create_hook(&self, url: &str, events: &[&str]) -> Result<Hook, BoardError> {
        let target = Target {
            operation: "create_hook",
            resource: "organisation hooks",
            key: self.organisation.clone(),
        };
        let body = NewHook {
            name: "web",
            active: true,
            events,
            config: WireHookConfig {
                url: Some(url.to_string()),
                content_type: Some("json".to_string()),
            },
        };
        let hook: WireHook = self
            .post(target, &format!("/orgs/{}/hooks", self.organisation), &body)
            .await?;
        Ok(hook.into_hook())
    }
}
