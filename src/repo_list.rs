//! The list of repositories to export, grouped by owning account.
//!
//! Produced by `--repo`, consumed by the export modes. On disk it is a JSON object
//! mapping owner login to `owner/name` full names:
//! ```json
//! {
//!     "octocat": [
//!         "octocat/Hello-World",
//!         "octocat/linguist"
//!     ]
//! }
//! ```

use std::{
	collections::BTreeMap,
	fs,
	io,
	path::{Path, PathBuf},
};

use color_eyre::eyre::{Result, WrapErr};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;
use tracing::{debug, info};

use crate::github::{GitHubClient, GitHubRepo};

#[derive(Debug, thiserror::Error)]
pub enum RepoListError {
	#[error("repository list {} could not be read", path.display())]
	Unreadable {
		path: PathBuf,
		#[source]
		source: io::Error,
	},

	#[error("repository list {} is not valid JSON", path.display())]
	Malformed {
		path: PathBuf,
		#[source]
		source: serde_json::Error,
	},
}

/// `owner/name` pair as used in paths and API routes.
#[derive(Clone, Debug, Display, Eq, PartialEq)]
#[display("{owner}/{name}")]
pub struct RepoSlug {
	pub owner: String,
	pub name: String,
}

impl RepoSlug {
	/// Split a full name. None unless it is exactly two `/`-separated parts, neither of them
	/// empty, `.` or `..`, so the slug can always be used as a directory below the output root.
	pub fn parse(full_name: &str) -> Option<Self> {
		let (owner, name) = full_name.split_once('/')?;
		let valid = |part: &str| !matches!(part, "" | "." | "..") && !part.contains(['/', '\\']);
		if !valid(owner) || !valid(name) {
			return None;
		}
		Some(Self {
			owner: owner.to_string(),
			name: name.to_string(),
		})
	}
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RepoList(pub BTreeMap<String, Vec<String>>);

impl RepoList {
	/// Gather every repository owned by the authenticated user or one of their organizations.
	///
	/// Repositories the user merely has access to (forks elsewhere, collaborations) are left out,
	/// as are accounts that own nothing.
	pub fn collect(client: &dyn GitHubClient) -> Result<Self> {
		let mut list = Self::default();

		let login = client.fetch_authenticated_user()?;
		list.insert_owned(&login, client.fetch_user_repos()?);

		for org in client.fetch_orgs()? {
			let repos = client.fetch_org_repos(&org.login)?;
			list.insert_owned(&org.login, repos);
		}

		info!(owners = list.0.len(), repos = list.repo_count(), "collected repository list");
		Ok(list)
	}

	fn insert_owned(&mut self, owner: &str, repos: Vec<GitHubRepo>) {
		let mut owned: Vec<String> = repos.into_iter().filter(|r| r.owner.login == owner).map(|r| r.full_name).collect();
		if owned.is_empty() {
			debug!(owner, "no owned repositories");
			return;
		}
		owned.sort_by_key(|name| name.to_lowercase());
		self.0.insert(owner.to_string(), owned);
	}

	pub fn repo_count(&self) -> usize {
		self.0.values().map(Vec::len).sum()
	}

	/// Every listed repository, owner by owner. Entries that are not `owner/name` are skipped with a warning.
	pub fn slugs(&self) -> impl Iterator<Item = RepoSlug> + '_ {
		self.0.values().flatten().filter_map(|full_name| {
			let slug = RepoSlug::parse(full_name);
			if slug.is_none() {
				tracing::warn!(full_name = full_name.as_str(), "skipping malformed repository name");
			}
			slug
		})
	}

	pub fn load(path: &Path) -> Result<Self, RepoListError> {
		let content = fs::read_to_string(path).map_err(|source| RepoListError::Unreadable { path: path.to_path_buf(), source })?;
		serde_json::from_str(&content).map_err(|source| RepoListError::Malformed { path: path.to_path_buf(), source })
	}

	/// Write as JSON indented by four spaces.
	pub fn save(&self, path: &Path) -> Result<()> {
		let mut buf = Vec::new();
		let mut ser = serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
		self.serialize(&mut ser)?;
		fs::write(path, buf).wrap_err_with(|| format!("Failed to write {}", path.display()))
	}
}
