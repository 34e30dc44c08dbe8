//! End-to-end HTML export against the mock account from [`crate::fixtures::ctx`].

use gh_issue_export::{ExportFormat, Exporter, RepoList};
use rstest::rstest;

use crate::fixtures::{ExportContext, ctx};

#[rstest]
fn test_html_export_embeds_local_images(ctx: ExportContext) {
	let summary = ctx.export(ExportFormat::Html);
	assert_eq!(summary.issues, 3);

	let page = ctx.read("octocat", "hello-world", "1.html");
	assert!(page.contains("<title>Logo renders blurry</title>"));
	assert!(page.contains("<img src='data/1_image_1.png' alt='1_image_1.png'>"));
	assert!(page.contains("<img src='data/1_image_2.jpg' alt='1_image_2.jpg'>"));
	assert!(!page.contains("cdn.example.com"));
	// non-remote images are rendered but not mirrored
	assert!(page.contains(r#"src="docs/logo.svg""#));
	assert!(page.contains("<p><strong>Labels:</strong> bug, design</p>"));
}

#[rstest]
fn test_screenshot_line_followed_by_text(ctx: ExportContext) {
	ctx.client.add_issue(
		"octocat",
		"hello-world",
		3,
		"Save button",
		Some("![shot](https://cdn.example.com/before.png)\nSteps: **click** [save](https://example.com/docs)"),
		"2024-03-13T00:00:00Z",
	);
	ctx.export(ExportFormat::Html);

	let page = ctx.read("octocat", "hello-world", "3.html");
	assert!(
		page.contains("<p><img src='data/3_image_1.png' alt='3_image_1.png'>\nSteps: <strong>click</strong> <a href=\"https://example.com/docs\">save</a></p>"),
		"{page}"
	);
}

#[rstest]
fn test_html_comments(ctx: ExportContext) {
	ctx.export(ExportFormat::Html);

	let page = ctx.read("octocat", "hello-world", "2.html");
	assert!(page.contains("<p><strong>Assignee:</strong> None</p>"));
	assert_eq!(page.matches(r#"<div class="comment">"#).count(), 2);
	assert!(page.contains("<p><strong>Author:</strong> hubot</p>"));
	assert!(page.contains("<p><strong>Author:</strong> ghost</p>"));
	assert!(page.contains("<img src='data/2_comment_7001_image_1.png' alt='2_comment_7001_image_1.png'>"));
	assert!(ctx.exported_files().contains(&"octocat/hello-world/data/2_comment_7001_image_1.png".to_string()));
}

#[rstest]
fn test_unreachable_image_aborts_the_run(ctx: ExportContext) {
	ctx.client.add_issue("octocat", "hello-world", 3, "Broken", Some("![gone](https://cdn.example.com/gone.png)"), "2024-03-13T00:00:00Z");

	let list = RepoList::collect(&ctx.client).unwrap();
	let err = Exporter::new(&ctx.client, &ctx.settings, ExportFormat::Html).with_sleep(|_| {}).export_all(&list).unwrap_err();

	assert!(err.chain().any(|cause| cause.to_string().contains("gone.png")));
}
