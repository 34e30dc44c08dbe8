use std::path::{Path, PathBuf};

use color_eyre::eyre::{Result, WrapErr};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;
use tracing::debug;

/// Prefix of the environment variables that override settings, e.g. `GH_ISSUE_EXPORT__OUTPUT_DIR`.
pub const ENV_PREFIX: &str = "GH_ISSUE_EXPORT";
/// Config file picked up from the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "gh_issue_export.toml";

#[derive(Clone, Debug, Deserialize, Serialize, SmartDefault)]
pub struct Settings {
	/// Root of the exported tree; every repository gets `{output_dir}/{owner}/{repo}`.
	#[default(PathBuf::from("github_issues"))]
	pub output_dir: PathBuf,
	/// Location of the repository list produced by `--repo`.
	#[default(PathBuf::from("repo_list.json"))]
	pub repo_list: PathBuf,
	#[default("https://api.github.com".to_string())]
	pub api_url: String,
	/// Remaining API calls below which the exporter waits for the rate window to reset.
	#[default(20)]
	pub rate_limit_threshold: u32,
	/// Also mirror inline links to `.pdf` documents.
	pub include_pdfs: bool,
	/// The issues endpoint also returns pull requests; drop them when set.
	pub skip_pull_requests: bool,
}

impl Settings {
	/// Layer defaults, the config file and the environment.
	///
	/// An explicitly requested file must exist; the default file is optional.
	pub fn load(config_path: Option<&Path>) -> Result<Self> {
		Self::load_with_env(config_path, Self::environment())
	}

	fn environment() -> Environment {
		Environment::with_prefix(ENV_PREFIX).separator("__").try_parsing(true)
	}

	fn load_with_env(config_path: Option<&Path>, env: Environment) -> Result<Self> {
		let file = match config_path {
			Some(path) => File::from(path).required(true),
			None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
		};
		debug!(?config_path, "loading settings");

		let config = Config::builder()
			.add_source(Config::try_from(&Settings::default())?)
			.add_source(file)
			.add_source(env)
			.build()
			.wrap_err("Failed to assemble settings")?;

		config
			.try_deserialize()
			.wrap_err("The config file is not correctly formatted TOML\nand/or\n has fields of the wrong type")
	}
}
