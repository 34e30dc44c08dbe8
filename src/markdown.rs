//! Mirroring of remote images referenced from issue and comment bodies.
//!
//! Bodies are parsed as Markdown, every inline image with an `http(s)` destination is
//! downloaded into the repository's data directory, and the body is rewritten to point
//! at the local copy. Files are named `{issue}[_comment_{id}]_image_{n}{ext}`, with `n`
//! counting up from 1 per body in order of appearance.

use std::{
	fs,
	ops::Range,
	path::{Component, Path},
};

use color_eyre::eyre::{Result, WrapErr};
use pulldown_cmark::{Event, LinkType, Options, Parser, Tag, TagEnd};
use tracing::debug;
use url::Url;

use crate::{ExportFormat, github::AssetSource};

/// Markdown extensions enabled for both scanning and rendering.
pub(crate) fn markdown_options() -> Options {
	Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS
}

/// `url` parsed, if it is an absolute `http`/`https` URL.
pub fn remote_url(url: &str) -> Option<Url> {
	Url::parse(url).ok().filter(|u| matches!(u.scheme(), "http" | "https"))
}

/// File extension of the URL's last path segment, dot included. Query and fragment are ignored.
pub fn url_extension(url: &Url) -> String {
	url.path_segments()
		.and_then(|mut segments| segments.next_back())
		.and_then(|segment| Path::new(segment).extension())
		.map(|ext| format!(".{}", ext.to_string_lossy()))
		.unwrap_or_default()
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AssetKind {
	Image,
	/// Inline link to a `.pdf`, mirrored only when enabled.
	Pdf,
}

impl AssetKind {
	fn as_str(&self) -> &'static str {
		match self {
			AssetKind::Image => "image",
			AssetKind::Pdf => "pdf",
		}
	}
}

/// Where the assets of one body go, and how they are named.
#[derive(Clone, Copy, Debug)]
pub struct AssetTarget<'a> {
	/// Root of the repository's export; rewritten links are relative to it.
	pub repo_dir: &'a Path,
	/// Directory the downloaded files are written to. Must exist.
	pub data_dir: &'a Path,
	pub issue_number: u64,
	/// Set when the body belongs to a comment rather than the issue itself.
	pub comment_id: Option<u64>,
}

impl AssetTarget<'_> {
	pub fn file_name(&self, kind: AssetKind, sequence: usize, extension: &str) -> String {
		let kind = kind.as_str();
		match self.comment_id {
			Some(comment_id) => format!("{}_comment_{comment_id}_{kind}_{sequence}{extension}", self.issue_number),
			None => format!("{}_{kind}_{sequence}{extension}", self.issue_number),
		}
	}

	/// `/`-separated path of `file_name` inside the data directory, relative to the repository directory.
	pub fn relative_path(&self, file_name: &str) -> String {
		let path = self.data_dir.join(file_name);
		match path.strip_prefix(self.repo_dir) {
			Ok(relative) => relative
				.components()
				.filter_map(|c| match c {
					Component::Normal(part) => Some(part.to_string_lossy()),
					_ => None,
				})
				.collect::<Vec<_>>()
				.join("/"),
			Err(_) => path.display().to_string(),
		}
	}
}

/// A downloadable reference found in a body.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FoundAsset {
	pub kind: AssetKind,
	pub url: Url,
	/// Byte range of the whole tag, `![alt](url)` or `[text](url)`.
	pub tag: Range<usize>,
	/// Byte range of the destination inside the tag.
	pub url_range: Range<usize>,
}

/// Image or link whose end event has not been seen yet.
struct OpenTag {
	kind: Option<AssetKind>,
	url: Option<(Url, String)>,
	inline: bool,
	span: Range<usize>,
	/// End of the alt text / link text seen so far; the destination comes after it.
	content_end: usize,
}

/// Find every remote inline image (and `.pdf` link, if `include_pdfs`) in `body`, ordered by position.
///
/// Reference-style tags, autolinks and anything inside code are skipped. Tags whose destination
/// is spelled differently in the source than it parses (escapes, entities) are skipped as well,
/// since there is nothing to substitute.
pub fn find_assets(body: &str, include_pdfs: bool) -> Vec<FoundAsset> {
	let mut open: Vec<OpenTag> = Vec::new();
	let mut found = Vec::new();

	for (event, range) in Parser::new_ext(body, markdown_options()).into_offset_iter() {
		let (kind, dest, link_type, marker_len) = match &event {
			Event::Start(Tag::Image { link_type, dest_url, .. }) => (Some(AssetKind::Image), dest_url, *link_type, 2),
			Event::Start(Tag::Link { link_type, dest_url, .. }) => {
				let kind = remote_url(dest_url).filter(|url| include_pdfs && url.path().to_ascii_lowercase().ends_with(".pdf")).map(|_| AssetKind::Pdf);
				(kind, dest_url, *link_type, 1)
			}
			Event::End(TagEnd::Image | TagEnd::Link) => {
				let Some(tag) = open.pop() else { continue };
				let end = range.end.max(tag.span.end);
				for parent in open.iter_mut() {
					parent.content_end = parent.content_end.max(end);
				}

				let (Some(kind), Some((url, dest)), true) = (tag.kind, tag.url, tag.inline) else { continue };
				let Some(offset) = body[tag.content_end..tag.span.end].find(dest.as_str()) else {
					debug!(%url, "destination not found verbatim in tag, leaving it alone");
					continue;
				};
				let start = tag.content_end + offset;
				found.push(FoundAsset {
					kind,
					url,
					tag: tag.span,
					url_range: start..start + dest.len(),
				});
				continue;
			}
			_ => {
				for tag in open.iter_mut() {
					tag.content_end = tag.content_end.max(range.end);
				}
				continue;
			}
		};

		let url = kind.and_then(|_| remote_url(dest)).map(|url| (url, dest.to_string()));
		open.push(OpenTag {
			kind,
			url,
			inline: link_type == LinkType::Inline,
			content_end: (range.start + marker_len).min(range.end),
			span: range,
		});
	}

	found.sort_by_key(|asset| asset.tag.start);
	found
}

struct Edit {
	range: Range<usize>,
	text: String,
}

/// Downloads the remote images of a body and points the body at the local copies.
pub struct Rewriter<'a, S: ?Sized> {
	source: &'a S,
	format: ExportFormat,
	include_pdfs: bool,
}

impl<'a, S: AssetSource + ?Sized> Rewriter<'a, S> {
	pub fn new(source: &'a S, format: ExportFormat) -> Self {
		Self {
			source,
			format,
			include_pdfs: false,
		}
	}

	/// Also mirror inline links to `.pdf` documents, named `..._pdf_{n}{ext}`.
	pub fn include_pdfs(mut self, include_pdfs: bool) -> Self {
		self.include_pdfs = include_pdfs;
		self
	}

	/// Rewrite `body`, writing every downloaded asset into `target.data_dir`.
	///
	/// An absent body becomes an empty string. In HTML mode an image tag is replaced by an
	/// `<img>` element; in JSON mode (and for PDF links) only the URL is swapped for the local path.
	/// Download errors are propagated as-is.
	pub fn rewrite(&self, body: Option<&str>, target: &AssetTarget) -> Result<String> {
		let Some(body) = body else {
			return Ok(String::new());
		};

		let mut edits = Vec::new();
		let mut images = 0;
		let mut pdfs = 0;
		// end of the last tag replaced as a whole; anything nested in it disappears with it
		let mut replaced_until = 0;

		for asset in find_assets(body, self.include_pdfs) {
			if asset.tag.start < replaced_until {
				continue;
			}

			let sequence = match asset.kind {
				AssetKind::Image => {
					images += 1;
					images
				}
				AssetKind::Pdf => {
					pdfs += 1;
					pdfs
				}
			};
			let file_name = target.file_name(asset.kind, sequence, &url_extension(&asset.url));
			let relative = target.relative_path(&file_name);

			let bytes = self.source.fetch_asset(&asset.url)?;
			let path = target.data_dir.join(&file_name);
			fs::write(&path, &bytes).wrap_err_with(|| format!("Failed to write {}", path.display()))?;
			debug!(url = %asset.url, path = %path.display(), size = bytes.len(), "saved asset");

			let edit = match (asset.kind, self.format) {
				(AssetKind::Image, ExportFormat::Html) => {
					replaced_until = asset.tag.end;
					Edit {
						range: asset.tag,
						text: format!("<img src='{relative}' alt='{file_name}'>"),
					}
				}
				_ => Edit {
					range: asset.url_range,
					text: relative,
				},
			};
			edits.push(edit);
		}

		Ok(apply_edits(body, edits))
	}
}

fn apply_edits(body: &str, mut edits: Vec<Edit>) -> String {
	edits.sort_by_key(|edit| edit.range.start);

	let mut out = String::with_capacity(body.len());
	let mut cursor = 0;
	for edit in edits {
		out.push_str(&body[cursor..edit.range.start]);
		out.push_str(&edit.text);
		cursor = edit.range.end;
	}
	out.push_str(&body[cursor..]);
	out
}
