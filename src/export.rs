//! Export of every listed repository's issues to disk.
//!
//! Layout:
//! ```text
//! {output_dir}/{owner}/{repo}/{number}.{html,json}
//! {output_dir}/{owner}/{repo}/data/{number}[_comment_{id}]_image_{n}{ext}
//! ```
//! Files are overwritten on every run, so an interrupted export can simply be restarted.

use std::{
	fs,
	path::{Path, PathBuf},
	time::Duration,
};

use color_eyre::eyre::{Result, WrapErr};
use jiff::Timestamp;
use tracing::{info, instrument, warn};

use crate::{
	ExportFormat,
	config::Settings,
	github::{AssetSource, GitHubClient, GitHubIssue},
	markdown::{AssetTarget, Rewriter},
	render::{CommentRecord, IssueRecord, date_and_time},
	repo_list::{RepoList, RepoSlug},
};

/// Name of the per-repository directory holding downloaded assets.
pub const DATA_DIR: &str = "data";

/// Login shown for comments whose author account no longer exists.
const GHOST_LOGIN: &str = "ghost";

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ExportSummary {
	pub repos: usize,
	pub issues: usize,
	pub skipped_pull_requests: usize,
}

pub struct Exporter<'a, C: ?Sized> {
	client: &'a C,
	settings: &'a Settings,
	format: ExportFormat,
	sleep: Box<dyn Fn(Duration) + 'a>,
}

impl<'a, C: GitHubClient + AssetSource + ?Sized> Exporter<'a, C> {
	pub fn new(client: &'a C, settings: &'a Settings, format: ExportFormat) -> Self {
		Self {
			client,
			settings,
			format,
			sleep: Box::new(std::thread::sleep),
		}
	}

	/// Replace the function used to wait out an exhausted rate window.
	pub fn with_sleep(mut self, sleep: impl Fn(Duration) + 'a) -> Self {
		self.sleep = Box::new(sleep);
		self
	}

	pub fn export_all(&self, repo_list: &RepoList) -> Result<ExportSummary> {
		let mut summary = ExportSummary::default();
		for slug in repo_list.slugs() {
			let repo_summary = self.export_repo(&slug)?;
			summary.repos += 1;
			summary.issues += repo_summary.issues;
			summary.skipped_pull_requests += repo_summary.skipped_pull_requests;
		}
		info!(repos = summary.repos, issues = summary.issues, "export finished");
		Ok(summary)
	}

	/// Directory all files of `slug` are written to.
	pub fn repo_dir(&self, slug: &RepoSlug) -> PathBuf {
		self.settings.output_dir.join(&slug.owner).join(&slug.name)
	}

	#[instrument(skip(self), fields(repo = %slug))]
	pub fn export_repo(&self, slug: &RepoSlug) -> Result<ExportSummary> {
		let limit = self.client.rate_limit()?;
		info!(remaining = limit.remaining, limit = limit.limit, reset = %limit.reset, "rate limit");

		let repo_dir = self.repo_dir(slug);
		let data_dir = repo_dir.join(DATA_DIR);
		fs::create_dir_all(&data_dir).wrap_err_with(|| format!("Failed to create {}", data_dir.display()))?;

		info!("exporting repository");
		let mut summary = ExportSummary { repos: 1, ..Default::default() };

		for issue in self.client.fetch_issues(&slug.owner, &slug.name)? {
			if self.settings.skip_pull_requests && issue.is_pull_request() {
				summary.skipped_pull_requests += 1;
				continue;
			}

			self.wait_for_quota()?;

			let record = self.build_record(slug, &issue, &repo_dir, &data_dir)?;
			let path = self.write_record(&record, &repo_dir)?;
			summary.issues += 1;
			info!(number = issue.number, path = %path.display(), "issue saved as {}", self.format.as_str().to_uppercase());
		}

		Ok(summary)
	}

	/// Block until the rate window resets if fewer than the configured threshold of calls remain.
	fn wait_for_quota(&self) -> Result<()> {
		let limit = self.client.rate_limit()?;
		if let Some(wait) = limit.wait_duration(self.settings.rate_limit_threshold, Timestamp::now()) {
			warn!(remaining = limit.remaining, wait_minutes = wait.as_secs_f64() / 60.0, "rate limit reached, waiting for the window to reset");
			(self.sleep)(wait);
		}
		Ok(())
	}

	fn build_record(&self, slug: &RepoSlug, issue: &GitHubIssue, repo_dir: &Path, data_dir: &Path) -> Result<IssueRecord> {
		let rewriter = Rewriter::new(self.client, self.format).include_pdfs(self.settings.include_pdfs);
		let mut target = AssetTarget {
			repo_dir,
			data_dir,
			issue_number: issue.number,
			comment_id: None,
		};

		let body = rewriter.rewrite(issue.body.as_deref(), &target).wrap_err_with(|| format!("Failed to mirror assets of {slug}#{}", issue.number))?;

		let mut comments = Vec::new();
		for comment in self.client.fetch_comments(&slug.owner, &slug.name, issue.number)? {
			target.comment_id = Some(comment.id);
			let body = rewriter
				.rewrite(comment.body.as_deref(), &target)
				.wrap_err_with(|| format!("Failed to mirror assets of comment {} on {slug}#{}", comment.id, issue.number))?;

			let (date, time) = date_and_time(comment.created_at);
			comments.push(CommentRecord {
				author: comment.user.map(|u| u.login).unwrap_or_else(|| GHOST_LOGIN.to_string()),
				date,
				time,
				body,
			});
		}

		let (date, time) = date_and_time(issue.created_at);
		Ok(IssueRecord {
			repo_name: slug.to_string(),
			number: issue.number,
			title: issue.title.clone(),
			state: issue.state.clone(),
			date,
			time,
			assignee: issue.assignee.as_ref().map(|u| u.login.clone()),
			labels: issue.labels.iter().map(|l| l.name.clone()).collect(),
			milestone: issue.milestone.as_ref().map(|m| m.title.clone()),
			body,
			comments,
		})
	}

	fn write_record(&self, record: &IssueRecord, repo_dir: &Path) -> Result<PathBuf> {
		let content = match self.format {
			ExportFormat::Html => record.to_html(),
			ExportFormat::Json => record.to_json()?,
		};
		let path = repo_dir.join(format!("{}.{}", record.number, self.format.as_str()));
		fs::write(&path, content).wrap_err_with(|| format!("Failed to write {}", path.display()))?;
		Ok(path)
	}
}
