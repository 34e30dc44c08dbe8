use std::sync::Mutex;

use color_eyre::eyre::{Result, WrapErr, bail};
use jiff::Timestamp;
use reqwest::blocking::{Client, Response};
use serde::{Deserialize, de::DeserializeOwned};
use tracing::{debug, instrument, warn};
use url::Url;

use crate::{config::Settings, rate_limit::RateLimit};

/// Page size requested from every paginated endpoint (the API maximum).
pub const PER_PAGE: usize = 100;

const USER_AGENT: &str = concat!("gh-issue-export/", env!("CARGO_PKG_VERSION"));

#[derive(Clone, Debug, Deserialize)]
pub struct GitHubIssue {
	pub number: u64,
	pub title: String,
	pub body: Option<String>,
	pub state: String, // "open" or "closed"
	pub created_at: Timestamp,
	pub assignee: Option<GitHubUser>,
	#[serde(default)]
	pub labels: Vec<GitHubLabel>,
	pub milestone: Option<GitHubMilestone>,
	/// Present only when the "issue" is a pull request.
	#[serde(default)]
	pub pull_request: Option<serde::de::IgnoredAny>,
}

impl GitHubIssue {
	pub fn is_pull_request(&self) -> bool {
		self.pull_request.is_some()
	}
}

#[derive(Clone, Debug, Deserialize)]
pub struct GitHubLabel {
	pub name: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct GitHubUser {
	pub login: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct GitHubMilestone {
	pub title: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct GitHubComment {
	pub id: u64,
	pub body: Option<String>,
	/// Null for comments of deleted accounts.
	pub user: Option<GitHubUser>,
	pub created_at: Timestamp,
}

#[derive(Clone, Debug, Deserialize)]
pub struct GitHubRepo {
	/// `owner/name`
	pub full_name: String,
	pub owner: GitHubUser,
}

#[derive(Clone, Debug, Deserialize)]
pub struct GitHubOrg {
	pub login: String,
}

//==============================================================================
// GitHub Client Trait
//==============================================================================

/// Read-only GitHub API operations used by the exporter.
/// Implemented by both the real HTTP client and the in-memory mock.
pub trait GitHubClient: Send + Sync {
	/// Fetch the authenticated user's login name
	fn fetch_authenticated_user(&self) -> Result<String>;

	/// Every repository the authenticated user can see, including those of other owners
	fn fetch_user_repos(&self) -> Result<Vec<GitHubRepo>>;

	/// Organizations the authenticated user is a member of
	fn fetch_orgs(&self) -> Result<Vec<GitHubOrg>>;

	fn fetch_org_repos(&self, org: &str) -> Result<Vec<GitHubRepo>>;

	/// All issues of a repository, open and closed. Pull requests are included.
	fn fetch_issues(&self, owner: &str, repo: &str) -> Result<Vec<GitHubIssue>>;

	/// Fetch all comments on an issue
	fn fetch_comments(&self, owner: &str, repo: &str, issue_number: u64) -> Result<Vec<GitHubComment>>;

	/// Current API quota
	fn rate_limit(&self) -> Result<RateLimit>;
}

/// Downloads remote files referenced from issue bodies.
pub trait AssetSource {
	/// Fetch the resource behind `url`; the response body is returned verbatim.
	fn fetch_asset(&self, url: &Url) -> Result<Vec<u8>>;
}

//==============================================================================
// Real GitHub Client Implementation
//==============================================================================

/// Real GitHub API client that makes blocking HTTP requests
pub struct RealGitHubClient {
	http_client: Client,
	github_token: String,
	api_url: String,
	/// Quota as of the last API response
	last_rate_limit: Mutex<Option<RateLimit>>,
}

impl RealGitHubClient {
	pub fn new(settings: &Settings, github_token: impl Into<String>) -> Result<Self> {
		let http_client = Client::builder().user_agent(USER_AGENT).build().wrap_err("Failed to build HTTP client")?;

		Ok(Self {
			http_client,
			github_token: github_token.into(),
			api_url: settings.api_url.trim_end_matches('/').to_string(),
			last_rate_limit: Mutex::new(None),
		})
	}

	fn auth_header(&self) -> String {
		format!("token {}", self.github_token)
	}

	fn record_rate_limit(&self, res: &Response) {
		if let Some(limit) = RateLimit::from_headers(res.headers()) {
			*self.last_rate_limit.lock().unwrap_or_else(|e| e.into_inner()) = Some(limit);
		}
	}

	/// GET an API path and decode the JSON response.
	fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
		let mut api_url = Url::parse(&format!("{}{path}", self.api_url)).wrap_err_with(|| format!("Invalid API url {}{path}", self.api_url))?;
		if !query.is_empty() {
			api_url.query_pairs_mut().extend_pairs(query);
		}

		let res = self
			.http_client
			.get(api_url.clone())
			.header("Accept", "application/vnd.github+json")
			.header("Authorization", self.auth_header())
			.send()
			.wrap_err_with(|| format!("Request to {api_url} failed"))?;
		self.record_rate_limit(&res);

		if !res.status().is_success() {
			let status = res.status();
			let body = res.text().unwrap_or_default();
			bail!("GET {path} failed: {status} - {body}");
		}

		res.json::<T>().wrap_err_with(|| format!("Malformed response from {path}"))
	}

	fn get_paginated<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<Vec<T>> {
		let items = collect_pages(|page| {
			let mut page_query = query.to_vec();
			page_query.push(("per_page", PER_PAGE.to_string()));
			page_query.push(("page", page.to_string()));
			self.get_json(path, &page_query)
		})?;
		debug!(path, count = items.len(), "fetched all pages");
		Ok(items)
	}
}

/// Request `page=1,2,..` until one comes back with fewer than [`PER_PAGE`] items.
fn collect_pages<T>(mut fetch_page: impl FnMut(usize) -> Result<Vec<T>>) -> Result<Vec<T>> {
	let mut items = Vec::new();
	for page in 1.. {
		let batch = fetch_page(page)?;
		let done = batch.len() < PER_PAGE;
		items.extend(batch);
		if done {
			break;
		}
	}
	Ok(items)
}

impl GitHubClient for RealGitHubClient {
	fn fetch_authenticated_user(&self) -> Result<String> {
		let user: GitHubUser = self.get_json("/user", &[])?;
		Ok(user.login)
	}

	fn fetch_user_repos(&self) -> Result<Vec<GitHubRepo>> {
		self.get_paginated("/user/repos", &[])
	}

	fn fetch_orgs(&self) -> Result<Vec<GitHubOrg>> {
		self.get_paginated("/user/orgs", &[])
	}

	fn fetch_org_repos(&self, org: &str) -> Result<Vec<GitHubRepo>> {
		self.get_paginated(&format!("/orgs/{org}/repos"), &[])
	}

	#[instrument(skip(self))]
	fn fetch_issues(&self, owner: &str, repo: &str) -> Result<Vec<GitHubIssue>> {
		self.get_paginated(&format!("/repos/{owner}/{repo}/issues"), &[("state", "all".to_string())])
	}

	fn fetch_comments(&self, owner: &str, repo: &str, issue_number: u64) -> Result<Vec<GitHubComment>> {
		self.get_paginated(&format!("/repos/{owner}/{repo}/issues/{issue_number}/comments"), &[])
	}

	fn rate_limit(&self) -> Result<RateLimit> {
		if let Some(limit) = *self.last_rate_limit.lock().unwrap_or_else(|e| e.into_inner()) {
			return Ok(limit);
		}

		#[derive(Deserialize)]
		struct RateLimitResponse {
			rate: RateLimit,
		}

		let res: RateLimitResponse = self.get_json("/rate_limit", &[])?;
		*self.last_rate_limit.lock().unwrap_or_else(|e| e.into_inner()) = Some(res.rate);
		Ok(res.rate)
	}
}

impl AssetSource for RealGitHubClient {
	/// Assets live on arbitrary hosts, so the token is not sent along.
	fn fetch_asset(&self, url: &Url) -> Result<Vec<u8>> {
		let res = self.http_client.get(url.clone()).send().wrap_err_with(|| format!("Failed to download {url}"))?;

		if !res.status().is_success() {
			warn!(%url, status = %res.status(), "asset request was not successful, saving the response body anyway");
		}

		let bytes = res.bytes().wrap_err_with(|| format!("Failed to read body of {url}"))?;
		Ok(bytes.to_vec())
	}
}
