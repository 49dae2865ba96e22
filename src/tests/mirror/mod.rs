use std::{path::PathBuf, sync::Arc};

use sqlx::prelude::FromRow;

use crate::{
    job::{
        Outcome, SkipReason, SyncOptions, Synchronizer,
        mirror::FolderCache,
        storage::workspace::{Client, NewPage, list_all_children},
    },
    process_data::{
        FileDescriptor, FileKind,
        markdown::{Block, RemoteContent, Span},
    },
    progress::{EntryStatus, RecordingReporter},
};

use super::{FailingUploads, Recording, options, scenario1, workspace};

#[derive(FromRow, Debug, PartialEq, Eq)]
struct PageRow {
    title: String,
    icon: Option<String>,
}

async fn page_titled(pool: &sqlx::SqlitePool, parent: &str, title: &str) -> Vec<String> {
    sqlx::query_scalar::<_, String>(
        "SELECT id FROM blocks WHERE parent = ? AND kind = 'child_page' AND title = ?",
    )
    .bind(parent)
    .bind(title)
    .fetch_all(pool)
    .await
    .unwrap()
}

#[tokio::test]
async fn scenario_tree_is_mirrored() {
    let (config, files) = scenario1().await;
    let relatives = files
        .iter()
        .map(|file| file.relative.clone())
        .collect::<Vec<_>>();
    assert_eq!(
        relatives,
        [
            "LICENSE",
            "README.md",
            "assets/logo.png",
            "bundle.zip",
            "docs/deep/notes.md",
            "docs/guide.md",
            "src/main.py",
        ]
        .map(PathBuf::from)
    );

    let (workspace, root) = workspace().await;
    let reporter = Arc::new(RecordingReporter::default());
    let summary = Synchronizer::new(workspace.client(), options(&root, &config))
        .with_reporter(reporter.clone())
        .run(&files)
        .await;
    assert!(summary.is_success(), "{:?}", summary.failed);
    assert_eq!(summary.mirrored.len(), 6);
    assert_eq!(
        summary.skipped,
        vec![(PathBuf::from("bundle.zip"), SkipReason::NoExternalUrl)]
    );
    let stats = reporter.stats();
    assert_eq!(stats.mirrored, 6);
    assert_eq!(stats.skipped, 1);
    assert_eq!(stats.uploads, 1);

    let top = sqlx::query_as::<_, PageRow>(
        "SELECT title, icon FROM blocks WHERE parent = ? AND kind = 'child_page' ORDER BY title",
    )
    .bind(&root)
    .fetch_all(workspace.pool())
    .await
    .unwrap();
    assert_eq!(
        top,
        vec![
            PageRow {
                title: "LICENSE".into(),
                icon: Some("📃".into()),
            },
            PageRow {
                title: "README.md".into(),
                icon: Some("📝".into()),
            },
            PageRow {
                title: "assets".into(),
                icon: Some("📁".into()),
            },
            PageRow {
                title: "docs".into(),
                icon: Some("📁".into()),
            },
            PageRow {
                title: "src".into(),
                icon: Some("📁".into()),
            },
        ]
    );

    let docs = page_titled(workspace.pool(), &root, "docs").await;
    assert_eq!(docs.len(), 1);
    let deep = page_titled(workspace.pool(), &docs[0], "deep").await;
    assert_eq!(deep.len(), 1);
    let notes = page_titled(workspace.pool(), &deep[0], "notes.md").await;
    assert_eq!(notes.len(), 1);

    let client = workspace.client();
    let content = list_all_children(&client, &notes[0])
        .await
        .unwrap()
        .into_iter()
        .map(|child| child.content)
        .collect::<Vec<_>>();
    assert_eq!(
        content,
        vec![
            RemoteContent::Block(Block::paragraph("Notes")),
            RemoteContent::Block(Block::Quote(vec![Span::plain("remember the milk")])),
        ]
    );

    let src = page_titled(workspace.pool(), &root, "src").await;
    let main = page_titled(workspace.pool(), &src[0], "main.py").await;
    let code = list_all_children(&client, &main[0]).await.unwrap();
    assert_eq!(
        code[0].content,
        RemoteContent::Block(Block::code("python", "print('hi')"))
    );
}

#[tokio::test]
async fn mirroring_twice_replaces_content_and_keeps_containers() {
    let (config, files) = scenario1().await;
    let (workspace, root) = workspace().await;
    let client = workspace.client();

    let first = Synchronizer::new(workspace.client(), options(&root, &config))
        .run(&files)
        .await;
    assert!(first.is_success());

    let docs = page_titled(workspace.pool(), &root, "docs").await;
    let guide = page_titled(workspace.pool(), &docs[0], "guide.md").await;
    assert_eq!(guide.len(), 1);
    let nested = client
        .create_page(NewPage {
            parent: &guide[0],
            title: "attachments",
            icon: None,
        })
        .await
        .unwrap();
    let before = list_all_children(&client, &guide[0]).await.unwrap().len();

    let second = Synchronizer::new(workspace.client(), options(&root, &config))
        .run(&files)
        .await;
    assert!(second.is_success());
    assert_eq!(first.mirrored, second.mirrored);

    assert_eq!(page_titled(workspace.pool(), &root, "docs").await, docs);
    assert_eq!(
        page_titled(workspace.pool(), &docs[0], "guide.md").await,
        guide
    );
    let children = list_all_children(&client, &guide[0]).await.unwrap();
    assert_eq!(children.len(), before);
    assert_eq!(children[0].id, nested);
    assert_eq!(children[0].container_title(), Some("attachments"));
    assert_eq!(
        children[1..]
            .iter()
            .map(|child| match &child.content {
                RemoteContent::Block(block) => Some(block.kind()),
                RemoteContent::Container { .. } => None,
            })
            .collect::<Vec<_>>(),
        vec![
            Some("heading_2"),
            Some("bulleted_list_item"),
            Some("bulleted_list_item"),
            Some("code"),
        ]
    );
}

#[tokio::test]
async fn folder_pages_are_cached_per_run() {
    let (workspace, root) = workspace().await;
    let client = Recording::new(workspace.client());
    let dir = tempfile::tempdir().unwrap();
    for name in ["a.md", "b.md"] {
        let path = dir.path().join("docs").join(name);
        tokio::fs::create_dir_all(path.parent().unwrap())
            .await
            .unwrap();
        tokio::fs::write(&path, "x\n").await.unwrap();
    }
    let files = ["a.md", "b.md"]
        .map(|name| FileDescriptor::new(dir.path().join("docs").join(name), dir.path(), 2));

    let synchronizer = Synchronizer::new(client, SyncOptions::new(root.clone()));
    let mut cache = FolderCache::new();
    for file in &files {
        let outcome = synchronizer.sync_file(&mut cache, file).await.unwrap();
        assert!(matches!(outcome, Outcome::Mirrored(_)));
    }
    assert_eq!(cache.len(), 1);
    assert_eq!(page_titled(workspace.pool(), &root, "docs").await.len(), 1);
    assert_eq!(synchronizer.client().appends(), vec![1, 1]);
}

#[tokio::test]
async fn appends_are_chunked_in_order() {
    let (workspace, root) = workspace().await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("long.md");
    let document = (0..250).map(|i| format!("p{i}\n\n")).collect::<String>();
    tokio::fs::write(&path, &document).await.unwrap();
    let file = FileDescriptor::new(path, dir.path(), document.len() as u64);
    assert_eq!(file.kind, FileKind::Markdown);

    let synchronizer = Synchronizer::new(
        Recording::new(workspace.client()),
        SyncOptions::new(root.clone()),
    );
    let summary = synchronizer.run(std::slice::from_ref(&file)).await;
    assert!(summary.is_success());
    assert_eq!(synchronizer.client().appends(), vec![100, 100, 50]);

    let page = &summary.mirrored[0].1;
    let client = workspace.client();
    let children = list_all_children(&client, page).await.unwrap();
    let expected = (0..250)
        .map(|i| RemoteContent::Block(Block::paragraph(format!("p{i}"))))
        .collect::<Vec<_>>();
    assert_eq!(
        children
            .into_iter()
            .map(|child| child.content)
            .collect::<Vec<_>>(),
        expected
    );
}

#[tokio::test]
async fn failed_upload_does_not_stop_the_run() {
    let (config, files) = scenario1().await;
    let (workspace, root) = workspace().await;
    let reporter = Arc::new(RecordingReporter::default());
    let summary = Synchronizer::new(
        FailingUploads {
            inner: workspace.client(),
        },
        options(&root, &config),
    )
    .with_reporter(reporter.clone())
    .run(&files)
    .await;

    assert_eq!(summary.failed.len(), 1);
    assert_eq!(
        summary.failed[0].context.path,
        PathBuf::from("src/tests/scenario1/assets/logo.png")
    );
    assert!(matches!(
        *summary.failed[0].detail,
        crate::ErrorDetail::Upload(_)
    ));
    assert_eq!(summary.mirrored.len(), 5);
    assert!(
        reporter
            .statuses()
            .iter()
            .any(|(entry, status)| entry == "assets/logo.png"
                && matches!(status, EntryStatus::Failed(_)))
    );

    // Nothing is created for a file that failed before mirroring.
    let assets = page_titled(workspace.pool(), &root, "assets").await;
    assert_eq!(assets.len(), 0);
}

#[tokio::test]
async fn upload_policy() {
    let (mut config, files) = scenario1().await;
    config.max_upload_bytes = 4;
    config.repository_url = Some("https://example.com/repo/blob/main/".parse().unwrap());
    let (workspace, root) = workspace().await;
    let summary = Synchronizer::new(workspace.client(), options(&root, &config))
        .run(&files)
        .await;
    assert!(summary.is_success());
    assert_eq!(
        summary.skipped,
        vec![(
            PathBuf::from("assets/logo.png"),
            SkipReason::TooLarge {
                size: 17,
                limit: 4
            }
        )]
    );

    let client = workspace.client();
    let bundle = page_titled(workspace.pool(), &root, "bundle.zip").await;
    let children = list_all_children(&client, &bundle[0]).await.unwrap();
    assert_eq!(
        children[0].content,
        RemoteContent::Block(Block::Bookmark {
            url: "https://example.com/repo/blob/main/bundle.zip".into()
        })
    );
}

#[tokio::test]
async fn unclassified_binary_is_skipped() {
    let (workspace, root) = workspace().await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("blob.xyz");
    tokio::fs::write(&path, [0xff, 0xfe, 0x00]).await.unwrap();
    let file = FileDescriptor::new(path, dir.path(), 3);
    assert_eq!(file.kind, FileKind::Unclassified);

    let synchronizer = Synchronizer::new(workspace.client(), SyncOptions::new(root));
    let outcome = synchronizer
        .sync_file(&mut FolderCache::new(), &file)
        .await
        .unwrap();
    assert_eq!(outcome, Outcome::Skipped(SkipReason::Binary));
}

#[tokio::test]
async fn unknown_languages_are_reported_as_warnings() {
    let (workspace, root) = workspace().await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Cargo.lock");
    tokio::fs::write(&path, "version = 4\n").await.unwrap();
    let file = FileDescriptor::new(path, dir.path(), 12);

    let synchronizer = Synchronizer::new(workspace.client(), SyncOptions::new(root.clone()));
    let (outcome, warnings) = crate::warning::collect_warnings(
        synchronizer.sync_file(&mut FolderCache::new(), &file),
    )
    .await;
    let Outcome::Mirrored(mirrored) = outcome.unwrap() else {
        panic!("expected the file to be mirrored");
    };
    assert_eq!(warnings.len(), 1);

    let client = workspace.client();
    let children = list_all_children(&client, &mirrored.page_id).await.unwrap();
    assert_eq!(
        children[0].content,
        RemoteContent::Block(Block::code("plain text", "version = 4"))
    );
}

#[tokio::test]
async fn databases_are_not_used_as_folders() {
    let (workspace, root) = workspace().await;
    sqlx::query(
        "INSERT INTO blocks(id, parent, kind, title, body) VALUES ('db_1', ?, 'child_database', 'docs', ?)",
    )
    .bind(&root)
    .bind(r#"{"type":"child_database","child_database":{"title":"docs"}}"#)
    .execute(workspace.pool())
    .await
    .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("docs/a.md");
    tokio::fs::create_dir_all(path.parent().unwrap())
        .await
        .unwrap();
    tokio::fs::write(&path, "x\n").await.unwrap();
    let file = FileDescriptor::new(path, dir.path(), 2);

    let synchronizer = Synchronizer::new(workspace.client(), SyncOptions::new(root.clone()));
    let outcome = synchronizer
        .sync_file(&mut FolderCache::new(), &file)
        .await
        .unwrap();
    assert!(matches!(outcome, Outcome::Mirrored(_)));

    let docs = page_titled(workspace.pool(), &root, "docs").await;
    assert_eq!(docs.len(), 1);
    assert_ne!(docs[0], "db_1");
    let below_database =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM blocks WHERE parent = 'db_1'")
            .fetch_one(workspace.pool())
            .await
            .unwrap();
    assert_eq!(below_database, 0);
}
