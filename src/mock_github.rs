//! Mock GitHub client for testing purposes.
//!
//! Implements [`GitHubClient`] and [`AssetSource`] over in-memory state, so the
//! whole export can be driven without hitting the real API.

use std::{
	collections::{BTreeMap, HashMap},
	sync::Mutex,
};

use color_eyre::eyre::{Result, eyre};
use jiff::Timestamp;
use tracing::instrument;
use url::Url;

use crate::{
	github::{AssetSource, GitHubClient, GitHubComment, GitHubIssue, GitHubLabel, GitHubMilestone, GitHubOrg, GitHubRepo, GitHubUser},
	rate_limit::RateLimit,
};

/// Key for looking up issues/comments by owner/repo
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
struct RepoKey {
	owner: String,
	repo: String,
}

impl RepoKey {
	fn new(owner: &str, repo: &str) -> Self {
		Self {
			owner: owner.to_string(),
			repo: repo.to_string(),
		}
	}

	fn full_name(&self) -> String {
		format!("{}/{}", self.owner, self.repo)
	}
}

/// Internal representation of a comment in the mock
#[derive(Clone, Debug)]
struct MockCommentData {
	issue_number: u64,
	comment: GitHubComment,
}

/// Mock GitHub client that stores all state in memory.
pub struct MockGitHubClient {
	/// The authenticated user's login
	user_login: String,

	/// Repositories visible to the user (`/user/repos`), in insertion order
	visible_repos: Mutex<Vec<RepoKey>>,

	/// Organization login -> repositories listed under it
	orgs: Mutex<BTreeMap<String, Vec<RepoKey>>>,

	/// All issues, keyed by (owner, repo) -> issue_number -> issue
	issues: Mutex<HashMap<RepoKey, BTreeMap<u64, GitHubIssue>>>,

	/// All comments, keyed by (owner, repo), in insertion order
	comments: Mutex<HashMap<RepoKey, Vec<MockCommentData>>>,

	/// Downloadable files, keyed by URL
	assets: Mutex<HashMap<String, Vec<u8>>>,

	rate_limit: Mutex<RateLimit>,

	/// Call log for debugging
	call_log: Mutex<Vec<String>>,
}

impl MockGitHubClient {
	/// Create a new mock client with the given authenticated user login.
	/// The quota starts out full.
	pub fn new(user_login: &str) -> Self {
		Self {
			user_login: user_login.to_string(),
			visible_repos: Mutex::new(Vec::new()),
			orgs: Mutex::new(BTreeMap::new()),
			issues: Mutex::new(HashMap::new()),
			comments: Mutex::new(HashMap::new()),
			assets: Mutex::new(HashMap::new()),
			rate_limit: Mutex::new(RateLimit {
				limit: 5000,
				remaining: 5000,
				reset: Timestamp::now(),
			}),
			call_log: Mutex::new(Vec::new()),
		}
	}

	/// Make a repository visible to the authenticated user
	pub fn add_repo(&self, owner: &str, repo: &str) {
		self.visible_repos.lock().unwrap().push(RepoKey::new(owner, repo));
	}

	/// Add a repository listed under an organization
	pub fn add_org_repo(&self, org: &str, owner: &str, repo: &str) {
		self.orgs.lock().unwrap().entry(org.to_string()).or_default().push(RepoKey::new(owner, repo));
	}

	/// Add an organization without any repositories
	pub fn add_org(&self, org: &str) {
		self.orgs.lock().unwrap().entry(org.to_string()).or_default();
	}

	/// Add an issue to the mock state. `created_at` is an RFC 3339 timestamp.
	pub fn add_issue(&self, owner: &str, repo: &str, number: u64, title: &str, body: Option<&str>, created_at: &str) {
		let issue = GitHubIssue {
			number,
			title: title.to_string(),
			body: body.map(str::to_string),
			state: "open".to_string(),
			created_at: created_at.parse().expect("mock timestamps must be RFC 3339"),
			assignee: None,
			labels: Vec::new(),
			milestone: None,
			pull_request: None,
		};
		self.issues.lock().unwrap().entry(RepoKey::new(owner, repo)).or_default().insert(number, issue);
	}

	/// Mutate a previously added issue (state, assignee, labels, ...)
	pub fn update_issue(&self, owner: &str, repo: &str, number: u64, f: impl FnOnce(&mut GitHubIssue)) {
		let mut issues = self.issues.lock().unwrap();
		let issue = issues
			.get_mut(&RepoKey::new(owner, repo))
			.and_then(|repo_issues| repo_issues.get_mut(&number))
			.expect("issue must be added before it is updated");
		f(issue);
	}

	/// Convenience over [`Self::update_issue`] for the common metadata fields
	#[expect(clippy::too_many_arguments)]
	pub fn set_issue_meta(&self, owner: &str, repo: &str, number: u64, state: &str, assignee: Option<&str>, labels: &[&str], milestone: Option<&str>) {
		self.update_issue(owner, repo, number, |issue| {
			issue.state = state.to_string();
			issue.assignee = assignee.map(|login| GitHubUser { login: login.to_string() });
			issue.labels = labels.iter().map(|name| GitHubLabel { name: name.to_string() }).collect();
			issue.milestone = milestone.map(|title| GitHubMilestone { title: title.to_string() });
		});
	}

	/// Flag an issue as a pull request
	pub fn mark_pull_request(&self, owner: &str, repo: &str, number: u64) {
		self.update_issue(owner, repo, number, |issue| issue.pull_request = Some(serde::de::IgnoredAny));
	}

	/// Add a comment to an issue. `author` of None models a deleted account.
	#[expect(clippy::too_many_arguments)]
	pub fn add_comment(&self, owner: &str, repo: &str, issue_number: u64, comment_id: u64, body: &str, author: Option<&str>, created_at: &str) {
		let comment = GitHubComment {
			id: comment_id,
			body: Some(body.to_string()),
			user: author.map(|login| GitHubUser { login: login.to_string() }),
			created_at: created_at.parse().expect("mock timestamps must be RFC 3339"),
		};
		self.comments
			.lock()
			.unwrap()
			.entry(RepoKey::new(owner, repo))
			.or_default()
			.push(MockCommentData { issue_number, comment });
	}

	/// Serve `bytes` for `url`. Unregistered URLs fail like a network error.
	pub fn add_asset(&self, url: &str, bytes: &[u8]) {
		self.assets.lock().unwrap().insert(url.to_string(), bytes.to_vec());
	}

	pub fn set_rate_limit(&self, remaining: u32, reset: Timestamp) {
		let mut limit = self.rate_limit.lock().unwrap();
		limit.remaining = remaining;
		limit.reset = reset;
	}

	/// Get the call log for debugging
	pub fn get_call_log(&self) -> Vec<String> {
		self.call_log.lock().unwrap().clone()
	}

	/// Clear the call log
	pub fn clear_call_log(&self) {
		self.call_log.lock().unwrap().clear();
	}

	fn log_call(&self, call: &str) {
		self.call_log.lock().unwrap().push(call.to_string());
	}

	fn to_github_repo(key: &RepoKey) -> GitHubRepo {
		GitHubRepo {
			full_name: key.full_name(),
			owner: GitHubUser { login: key.owner.clone() },
		}
	}
}

impl GitHubClient for MockGitHubClient {
	#[instrument(skip(self), name = "MockGitHubClient::fetch_authenticated_user")]
	fn fetch_authenticated_user(&self) -> Result<String> {
		tracing::info!(target: "mock_github", "fetch_authenticated_user");
		self.log_call("fetch_authenticated_user()");
		Ok(self.user_login.clone())
	}

	#[instrument(skip(self), name = "MockGitHubClient::fetch_user_repos")]
	fn fetch_user_repos(&self) -> Result<Vec<GitHubRepo>> {
		tracing::info!(target: "mock_github", "fetch_user_repos");
		self.log_call("fetch_user_repos()");
		Ok(self.visible_repos.lock().unwrap().iter().map(Self::to_github_repo).collect())
	}

	#[instrument(skip(self), name = "MockGitHubClient::fetch_orgs")]
	fn fetch_orgs(&self) -> Result<Vec<GitHubOrg>> {
		tracing::info!(target: "mock_github", "fetch_orgs");
		self.log_call("fetch_orgs()");
		Ok(self.orgs.lock().unwrap().keys().map(|login| GitHubOrg { login: login.clone() }).collect())
	}

	#[instrument(skip(self), name = "MockGitHubClient::fetch_org_repos")]
	fn fetch_org_repos(&self, org: &str) -> Result<Vec<GitHubRepo>> {
		tracing::info!(target: "mock_github", org, "fetch_org_repos");
		self.log_call(&format!("fetch_org_repos({org})"));

		let orgs = self.orgs.lock().unwrap();
		let repos = orgs.get(org).ok_or_else(|| eyre!("Organization not found: {org}"))?;
		Ok(repos.iter().map(Self::to_github_repo).collect())
	}

	#[instrument(skip(self), name = "MockGitHubClient::fetch_issues")]
	fn fetch_issues(&self, owner: &str, repo: &str) -> Result<Vec<GitHubIssue>> {
		tracing::info!(target: "mock_github", owner, repo, "fetch_issues");
		self.log_call(&format!("fetch_issues({owner}, {repo})"));

		let issues = self.issues.lock().unwrap();
		// the API lists newest first
		Ok(issues.get(&RepoKey::new(owner, repo)).map(|repo_issues| repo_issues.values().rev().cloned().collect()).unwrap_or_default())
	}

	#[instrument(skip(self), name = "MockGitHubClient::fetch_comments")]
	fn fetch_comments(&self, owner: &str, repo: &str, issue_number: u64) -> Result<Vec<GitHubComment>> {
		tracing::info!(target: "mock_github", owner, repo, issue_number, "fetch_comments");
		self.log_call(&format!("fetch_comments({owner}, {repo}, {issue_number})"));

		let comments = self.comments.lock().unwrap();
		Ok(comments
			.get(&RepoKey::new(owner, repo))
			.map(|all| all.iter().filter(|c| c.issue_number == issue_number).map(|c| c.comment.clone()).collect())
			.unwrap_or_default())
	}

	fn rate_limit(&self) -> Result<RateLimit> {
		self.log_call("rate_limit()");
		Ok(*self.rate_limit.lock().unwrap())
	}
}

impl AssetSource for MockGitHubClient {
	#[instrument(skip(self), name = "MockGitHubClient::fetch_asset")]
	fn fetch_asset(&self, url: &Url) -> Result<Vec<u8>> {
		tracing::info!(target: "mock_github", url = url.as_str(), "fetch_asset");
		self.log_call(&format!("fetch_asset({url})"));

		self.assets
			.lock()
			.unwrap()
			.get(url.as_str())
			.cloned()
			.ok_or_else(|| eyre!("error sending request for url ({url})"))
	}
}
