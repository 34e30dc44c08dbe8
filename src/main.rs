use std::{fs, path::PathBuf, sync::Mutex};

use clap::{Args, Parser};
use color_eyre::eyre::{Result, WrapErr};
use gh_issue_export::{ExportFormat, Exporter, RealGitHubClient, RepoList, Settings};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// When set, trace events are additionally written to this file as JSON lines.
const TRACE_FILE_ENV: &str = "GH_ISSUE_EXPORT_TRACE_FILE";

/// Export GitHub issues, their comments and images to HTML or JSON files.
#[derive(Parser)]
#[command(author, version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_HASH"), ")"), about, long_about = None)]
struct Cli {
	/// GitHub personal access token
	access_token: String,
	#[command(flatten)]
	mode: Mode,
	/// Settings file (TOML); defaults to ./gh_issue_export.toml if present
	#[arg(long)]
	config: Option<PathBuf>,
	/// Also download linked PDF documents
	#[arg(long)]
	include_pdfs: bool,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct Mode {
	/// Export every listed repository's issues as HTML pages
	#[arg(long)]
	html: bool,
	/// Export every listed repository's issues as JSON documents
	#[arg(long)]
	json: bool,
	/// Write the list of repositories owned by you and your organizations
	#[arg(long)]
	repo: bool,
}

impl Mode {
	/// None for `--repo`.
	fn export_format(&self) -> Option<ExportFormat> {
		match (self.html, self.json) {
			(true, _) => Some(ExportFormat::Html),
			(_, true) => Some(ExportFormat::Json),
			_ => None,
		}
	}
}

fn main() -> Result<()> {
	color_eyre::install()?;

	// usage errors print the usage and exit cleanly
	let cli = match Cli::try_parse() {
		Ok(cli) => cli,
		Err(e) => {
			e.print()?;
			return Ok(());
		}
	};

	init_tracing()?;

	let mut settings = Settings::load(cli.config.as_deref())?;
	settings.include_pdfs |= cli.include_pdfs;

	let client = RealGitHubClient::new(&settings, cli.access_token)?;

	let Some(format) = cli.mode.export_format() else {
		let list = RepoList::collect(&client)?;
		list.save(&settings.repo_list)?;
		println!("Repository list saved to {}", settings.repo_list.display());
		return Ok(());
	};

	let repo_list = match RepoList::load(&settings.repo_list) {
		Ok(list) => list,
		Err(e) => {
			tracing::debug!(error = ?e, "no usable repository list");
			println!("{e}. Run with --repo first to create the repository list.");
			return Ok(());
		}
	};

	fs::create_dir_all(&settings.output_dir).wrap_err_with(|| format!("Failed to create {}", settings.output_dir.display()))?;
	let summary = Exporter::new(&client, &settings, format).export_all(&repo_list)?;
	info!(?summary, output_dir = %settings.output_dir.display(), "done");

	Ok(())
}

fn init_tracing() -> Result<()> {
	let default_directives = option_env!("LOG_DIRECTIVES").unwrap_or("info");
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives));

	let json_layer = match std::env::var(TRACE_FILE_ENV) {
		Ok(path) => {
			let file = fs::File::create(&path).wrap_err_with(|| format!("Failed to create trace file {path}"))?;
			Some(fmt::layer().json().with_writer(Mutex::new(file)))
		}
		Err(_) => None,
	};

	tracing_subscriber::registry()
		.with(filter)
		.with(fmt::layer().with_writer(std::io::stderr).with_target(false))
		.with(json_layer)
		.init();
	Ok(())
}
