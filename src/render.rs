//! Per-issue output documents.

use std::ops::Range;

use color_eyre::eyre::Result;
use html_escape::encode_text;
use jiff::{Timestamp, tz::TimeZone};
use pulldown_cmark::{Event, Parser, Tag, TagEnd, html};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;

use crate::markdown::markdown_options;

/// Everything exported for one issue. Field order is the order of the JSON document.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct IssueRecord {
	/// `owner/name`
	pub repo_name: String,
	pub number: u64,
	pub title: String,
	pub state: String,
	/// `%Y-%m-%d`, UTC
	pub date: String,
	/// `%H:%M:%S`, UTC
	pub time: String,
	pub assignee: Option<String>,
	pub labels: Vec<String>,
	pub milestone: Option<String>,
	/// Body with remote images pointed at their local copies
	pub body: String,
	pub comments: Vec<CommentRecord>,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct CommentRecord {
	pub author: String,
	pub date: String,
	pub time: String,
	pub body: String,
}

/// Split a timestamp into the `(date, time)` pair used by the records.
pub fn date_and_time(ts: Timestamp) -> (String, String) {
	let utc = ts.to_zoned(TimeZone::UTC);
	(utc.strftime("%Y-%m-%d").to_string(), utc.strftime("%H:%M:%S").to_string())
}

impl IssueRecord {
	/// Pretty JSON, indented by four spaces.
	pub fn to_json(&self) -> Result<String> {
		let mut buf = Vec::new();
		let mut ser = serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
		self.serialize(&mut ser)?;
		Ok(String::from_utf8(buf)?)
	}

	/// Standalone HTML page. Metadata is escaped; bodies are rendered as Markdown, so the
	/// `<img>` tags put in place of remote images pass through untouched.
	pub fn to_html(&self) -> String {
		let title = encode_text(&self.title);
		let labels = self.labels.iter().map(|l| encode_text(l).into_owned()).collect::<Vec<_>>().join(", ");

		let mut page = format!(
			r#"<!DOCTYPE html>
<html>
<head>
	<meta charset="utf-8">
	<title>{title}</title>
	<style>
		body {{ font-family: Arial, sans-serif; margin: 20px; }}
		h1 {{ font-size: 24px; }}
		h2 {{ font-size: 20px; margin-top: 20px; }}
		p {{ margin-top: 5px; }}
		div {{ margin-top: 10px; margin-bottom: 10px; }}
		.comment {{ border: 1px solid #ccc; padding: 10px; }}
		.comment p {{ margin: 0; }}
	</style>
</head>
<body>
	<h1>{title}</h1>
	<div>
		<p><strong>Repository:</strong> {repo}</p>
		<p><strong>Issue Number:</strong> {number}</p>
		<p><strong>State:</strong> {state}</p>
		<p><strong>Date:</strong> {date}</p>
		<p><strong>Time:</strong> {time}</p>
		<p><strong>Assignee:</strong> {assignee}</p>
		<p><strong>Labels:</strong> {labels}</p>
		<p><strong>Milestone:</strong> {milestone}</p>
		<h2>Body</h2>
		<div>{body}</div>
	</div>
"#,
			repo = encode_text(&self.repo_name),
			number = self.number,
			state = encode_text(&self.state),
			date = self.date,
			time = self.time,
			assignee = encode_text(self.assignee.as_deref().unwrap_or("None")),
			milestone = encode_text(self.milestone.as_deref().unwrap_or("None")),
			body = markdown_to_html(&self.body),
		);

		for comment in &self.comments {
			page.push_str(&format!(
				r#"	<div class="comment">
		<p><strong>Author:</strong> {author}</p>
		<p><strong>Date:</strong> {date}</p>
		<p><strong>Time:</strong> {time}</p>
		<div>{body}</div>
	</div>
"#,
				author = encode_text(&comment.author),
				date = comment.date,
				time = comment.time,
				body = markdown_to_html(&comment.body),
			));
		}

		page.push_str("</body>\n</html>\n");
		page
	}
}

/// Empty inline image put where a standalone `<img>` line was, so the line parses as a paragraph.
const IMG_PLACEHOLDER: &str = "![]()";

/// Render a body to HTML.
///
/// An `<img>` alone on a line would open a raw HTML block that swallows the rest of the paragraph
/// unrendered. Such tags are parsed as an empty image instead and emitted back as inline HTML.
fn markdown_to_html(markdown: &str) -> String {
	let mut out = String::with_capacity(markdown.len() * 3 / 2);
	let standalone = standalone_img_tags(markdown);
	if standalone.is_empty() {
		html::push_html(&mut out, Parser::new_ext(markdown, markdown_options()));
		return out;
	}

	let mut source = String::with_capacity(markdown.len());
	let mut placeholders = Vec::with_capacity(standalone.len());
	let mut cursor = 0;
	for tag in standalone {
		source.push_str(&markdown[cursor..tag.start]);
		placeholders.push((source.len(), &markdown[tag.clone()]));
		source.push_str(IMG_PLACEHOLDER);
		cursor = tag.end;
	}
	source.push_str(&markdown[cursor..]);

	let mut events = Vec::new();
	let mut in_placeholder = false;
	for (event, range) in Parser::new_ext(&source, markdown_options()).into_offset_iter() {
		match event {
			Event::Start(Tag::Image { .. }) if !in_placeholder => match placeholders.iter().find(|(at, _)| *at == range.start) {
				Some((_, tag)) => {
					events.push(Event::InlineHtml((*tag).into()));
					in_placeholder = true;
				}
				None => events.push(event),
			},
			Event::End(TagEnd::Image) if in_placeholder => in_placeholder = false,
			_ if in_placeholder => {}
			event => events.push(event),
		}
	}
	html::push_html(&mut out, events.into_iter());
	out
}

/// Byte ranges of `<img>` tags that open a raw HTML block, i.e. sit alone on their line.
fn standalone_img_tags(markdown: &str) -> Vec<Range<usize>> {
	Parser::new_ext(markdown, markdown_options())
		.into_offset_iter()
		.filter_map(|(event, range)| {
			let Event::Start(Tag::HtmlBlock) = event else { return None };
			let line = markdown[range.clone()].lines().next()?;
			let tag = line.trim();
			let is_img = tag.starts_with("<img ") && tag.ends_with('>') && !tag[1..].contains('<');
			is_img.then(|| {
				let start = range.start + (line.len() - line.trim_start().len());
				start..start + tag.len()
			})
		})
		.collect()
}
