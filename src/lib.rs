pub mod config;
pub mod export;
pub mod github;
pub mod markdown;
pub mod mock_github;
pub mod rate_limit;
pub mod render;
pub mod repo_list;

pub use config::Settings;
pub use export::{ExportSummary, Exporter};
pub use github::{AssetSource, GitHubClient, RealGitHubClient};
pub use markdown::{AssetTarget, Rewriter};
pub use mock_github::MockGitHubClient;
pub use rate_limit::RateLimit;
pub use render::{CommentRecord, IssueRecord};
pub use repo_list::{RepoList, RepoListError};

/// Output format of the exported issue files.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ExportFormat {
	/// Standalone HTML page per issue; images are embedded as `<img>` tags.
	#[default]
	Html,
	/// One JSON document per issue; image URLs are swapped for local paths.
	Json,
}

impl ExportFormat {
	/// File extension of the per-issue output file.
	pub fn as_str(&self) -> &'static str {
		match self {
			ExportFormat::Html => "html",
			ExportFormat::Json => "json",
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_export_format_extension() {
		assert_eq!(ExportFormat::Html.as_str(), "html");
		assert_eq!(ExportFormat::Json.as_str(), "json");
		assert_eq!(ExportFormat::default(), ExportFormat::Html);
	}
}
