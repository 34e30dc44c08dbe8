//! End-to-end JSON export against the mock account from [`crate::fixtures::ctx`].

use std::fs;

use gh_issue_export::ExportFormat;
use rstest::rstest;
use serde_json::{Value, json};

use crate::fixtures::{ExportContext, PNG, ctx};

#[rstest]
fn test_json_export_writes_issue_files_and_assets(ctx: ExportContext) {
	let summary = ctx.export(ExportFormat::Json);

	assert_eq!(summary.repos, 2);
	assert_eq!(summary.issues, 3);
	assert_eq!(
		ctx.exported_files(),
		vec![
			"acme/api/10.json",
			"octocat/hello-world/1.json",
			"octocat/hello-world/2.json",
			"octocat/hello-world/data/1_image_1.png",
			"octocat/hello-world/data/1_image_2.jpg",
			"octocat/hello-world/data/2_comment_7001_image_1.png",
		]
	);
	assert_eq!(fs::read(ctx.repo_dir("octocat", "hello-world").join("data/1_image_1.png")).unwrap(), PNG);
	assert_eq!(fs::read(ctx.repo_dir("octocat", "hello-world").join("data/1_image_2.jpg")).unwrap(), b"JFIF");
}

#[rstest]
fn test_json_issue_document(ctx: ExportContext) {
	ctx.export(ExportFormat::Json);

	insta::assert_snapshot!(ctx.read("octocat", "hello-world", "1.json"), @r#"
	{
	    "repo_name": "octocat/hello-world",
	    "number": 1,
	    "title": "Logo renders blurry",
	    "state": "closed",
	    "date": "2024-03-10",
	    "time": "14:05:09",
	    "assignee": "octocat",
	    "labels": [
	        "bug",
	        "design"
	    ],
	    "milestone": "v1.0",
	    "body": "Compare ![before](data/1_image_1.png) with ![after](data/1_image_2.jpg)\n\nSee also ![local](docs/logo.svg)",
	    "comments": []
	}
	"#);
}

#[rstest]
fn test_json_comments(ctx: ExportContext) {
	ctx.export(ExportFormat::Json);

	let issue: Value = serde_json::from_str(&ctx.read("octocat", "hello-world", "2.json")).unwrap();
	assert_eq!(issue["body"], "no images here");
	assert_eq!(
		issue["comments"],
		json!([
			{
				"author": "hubot",
				"date": "2024-03-12",
				"time": "10:20:30",
				"body": "Mockup: ![dark](data/2_comment_7001_image_1.png)"
			},
			{
				"author": "ghost",
				"date": "2024-03-12",
				"time": "11:00:00",
				"body": "+1"
			}
		])
	);
}

#[rstest]
fn test_json_absent_body_and_metadata(ctx: ExportContext) {
	ctx.export(ExportFormat::Json);

	let issue: Value = serde_json::from_str(&ctx.read("acme", "api", "10.json")).unwrap();
	assert_eq!(issue["repo_name"], "acme/api");
	assert_eq!(issue["state"], "open");
	assert_eq!(issue["body"], "");
	assert_eq!(issue["assignee"], Value::Null);
	assert_eq!(issue["milestone"], Value::Null);
	assert_eq!(issue["labels"], json!([]));
}

#[rstest]
fn test_rerun_overwrites_with_identical_files(ctx: ExportContext) {
	ctx.export(ExportFormat::Json);
	let first_files = ctx.exported_files();
	let first = ctx.read("octocat", "hello-world", "1.json");

	ctx.export(ExportFormat::Json);
	assert_eq!(ctx.exported_files(), first_files);
	assert_eq!(ctx.read("octocat", "hello-world", "1.json"), first);
}

#[rstest]
fn test_repo_list_on_disk(ctx: ExportContext) {
	ctx.export(ExportFormat::Json);

	let list: Value = serde_json::from_str(&fs::read_to_string(&ctx.settings.repo_list).unwrap()).unwrap();
	assert_eq!(list, json!({ "acme": ["acme/api"], "octocat": ["octocat/hello-world"] }));
}
