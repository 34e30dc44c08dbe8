//! Shared fixtures: a mock GitHub account with a couple of repositories, and a
//! temporary output directory to export into.

use std::{
	fs,
	path::{Path, PathBuf},
};

use gh_issue_export::{ExportFormat, ExportSummary, Exporter, MockGitHubClient, RepoList, Settings};
use rstest::fixture;
use tempfile::TempDir;
use walkdir::WalkDir;

pub const PNG: &[u8] = b"\x89PNG\r\n\x1a\n";

pub struct ExportContext {
	pub client: MockGitHubClient,
	pub settings: Settings,
	_tmp: TempDir,
}

impl ExportContext {
	pub fn new() -> Self {
		let tmp = tempfile::tempdir().unwrap();
		let settings = Settings {
			output_dir: tmp.path().join("github_issues"),
			repo_list: tmp.path().join("repo_list.json"),
			..Default::default()
		};
		Self {
			client: MockGitHubClient::new("octocat"),
			settings,
			_tmp: tmp,
		}
	}

	/// Build the repository list through the mock and export it in `format`.
	pub fn export(&self, format: ExportFormat) -> ExportSummary {
		let list = RepoList::collect(&self.client).unwrap();
		list.save(&self.settings.repo_list).unwrap();

		let list = RepoList::load(&self.settings.repo_list).unwrap();
		Exporter::new(&self.client, &self.settings, format).with_sleep(|_| {}).export_all(&list).unwrap()
	}

	pub fn repo_dir(&self, owner: &str, repo: &str) -> PathBuf {
		self.settings.output_dir.join(owner).join(repo)
	}

	pub fn read(&self, owner: &str, repo: &str, file: &str) -> String {
		fs::read_to_string(self.repo_dir(owner, repo).join(file)).unwrap()
	}

	/// Every file below the output directory, relative to it, `/`-separated and sorted.
	pub fn exported_files(&self) -> Vec<String> {
		let root: &Path = &self.settings.output_dir;
		let mut files: Vec<String> = WalkDir::new(root)
			.into_iter()
			.map(|e| e.unwrap())
			.filter(|e| e.file_type().is_file())
			.map(|e| e.path().strip_prefix(root).unwrap().components().map(|c| c.as_os_str().to_string_lossy().into_owned()).collect::<Vec<_>>().join("/"))
			.collect();
		files.sort();
		files
	}
}

/// `octocat/hello-world` with one image-bearing issue and a commented one,
/// plus `acme/api` (organization) with an issue without body.
#[fixture]
pub fn ctx() -> ExportContext {
	let ctx = ExportContext::new();
	let client = &ctx.client;

	client.add_repo("octocat", "hello-world");
	client.add_repo("someone", "forked-elsewhere");
	client.add_org_repo("acme", "acme", "api");

	client.add_issue(
		"octocat",
		"hello-world",
		1,
		"Logo renders blurry",
		Some("Compare ![before](https://cdn.example.com/before.png) with ![after](https://cdn.example.com/after.jpg)\n\nSee also ![local](docs/logo.svg)"),
		"2024-03-10T14:05:09Z",
	);
	client.set_issue_meta("octocat", "hello-world", 1, "closed", Some("octocat"), &["bug", "design"], Some("v1.0"));

	client.add_issue("octocat", "hello-world", 2, "Add dark mode", Some("no images here"), "2024-03-11T09:00:00Z");
	client.add_comment(
		"octocat",
		"hello-world",
		2,
		7001,
		"Mockup: ![dark](https://cdn.example.com/dark.png)",
		Some("hubot"),
		"2024-03-12T10:20:30Z",
	);
	client.add_comment("octocat", "hello-world", 2, 7002, "+1", None, "2024-03-12T11:00:00Z");

	client.add_issue("acme", "api", 10, "Timeouts", None, "2023-01-01T00:00:00Z");

	client.add_asset("https://cdn.example.com/before.png", PNG);
	client.add_asset("https://cdn.example.com/after.jpg", b"JFIF");
	client.add_asset("https://cdn.example.com/dark.png", PNG);

	ctx
}
