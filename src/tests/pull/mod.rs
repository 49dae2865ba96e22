use std::path::PathBuf;

use crate::{
    job::{Mapping, PullOutcome, PullSource, Puller, SyncOptions, Synchronizer},
    process_data::{
        FileDescriptor,
        markdown::{decode, encode},
    },
};

use super::workspace;

const DOCUMENT: &str = "# Title\n\n\n\nIntro line\n- a\n- b\n\n```py\nprint(1)\n```\n";

/// Mirrors `DOCUMENT` and returns the id of its page.
async fn mirrored_page(client: crate::deploy::local::Client, root: &str) -> String {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("doc.md");
    tokio::fs::write(&path, DOCUMENT).await.unwrap();
    let file = FileDescriptor::new(path, dir.path(), DOCUMENT.len() as u64);
    let summary = Synchronizer::new(client, SyncOptions::new(root))
        .run(std::slice::from_ref(&file))
        .await;
    assert!(summary.is_success());
    summary.mirrored[0].1.clone()
}

#[tokio::test]
async fn pull_writes_once_then_reports_unchanged() {
    let (workspace, root) = workspace().await;
    let page = mirrored_page(workspace.client(), &root).await;

    let out = tempfile::tempdir().unwrap();
    let target = out.path().join("nested/dir/doc.md");
    let puller = Puller::new(workspace.client());

    let first = puller.pull(&page, &target).await.unwrap();
    let written = tokio::fs::read_to_string(&target).await.unwrap();
    assert_eq!(
        first,
        PullOutcome::Written {
            bytes: written.len()
        }
    );
    assert_eq!(written, encode(&decode(DOCUMENT)));
    assert_eq!(
        written,
        "# Title\n\nIntro line\n\n- a\n- b\n\n```python\nprint(1)\n```\n"
    );

    assert_eq!(
        puller.pull(&page, &target).await.unwrap(),
        PullOutcome::Unchanged
    );

    tokio::fs::write(&target, "edited locally\n").await.unwrap();
    assert!(matches!(
        puller.pull(&page, &target).await.unwrap(),
        PullOutcome::Written { .. }
    ));
    assert_eq!(tokio::fs::read_to_string(&target).await.unwrap(), written);
}

#[tokio::test]
async fn trailing_whitespace_edits_are_left_alone() {
    let (workspace, root) = workspace().await;
    let page = mirrored_page(workspace.client(), &root).await;

    let out = tempfile::tempdir().unwrap();
    let target = out.path().join("doc.md");
    let local = format!("{}\n", encode(&decode(DOCUMENT)));
    tokio::fs::write(&target, &local).await.unwrap();

    assert_eq!(
        Puller::new(workspace.client())
            .pull(&page, &target)
            .await
            .unwrap(),
        PullOutcome::Unchanged
    );
    assert_eq!(tokio::fs::read_to_string(&target).await.unwrap(), local);
}

#[tokio::test]
async fn unknown_blocks_keep_their_text() {
    let (workspace, root) = workspace().await;
    let page = mirrored_page(workspace.client(), &root).await;
    sqlx::query("INSERT INTO blocks(id, parent, kind, body) VALUES ('toggle_1', ?, 'toggle', ?)")
        .bind(&page)
        .bind(
            r#"{"type":"toggle","toggle":{"rich_text":[{"type":"text","text":{"content":"folded text"},"plain_text":"folded text"}]}}"#,
        )
        .execute(workspace.pool())
        .await
        .unwrap();

    let out = tempfile::tempdir().unwrap();
    let target = out.path().join("doc.md");
    Puller::new(workspace.client())
        .pull(&page, &target)
        .await
        .unwrap();
    let written = tokio::fs::read_to_string(&target).await.unwrap();
    assert!(written.ends_with("```\n\nfolded text\n"), "{written:?}");
}

#[tokio::test]
async fn failing_mappings_do_not_stop_the_run() {
    let (workspace, root) = workspace().await;
    let page = mirrored_page(workspace.client(), &root).await;

    let out = tempfile::tempdir().unwrap();
    let mappings = vec![
        Mapping {
            page_id: "missing".into(),
            path: out.path().join("missing.md"),
        },
        Mapping {
            page_id: page,
            path: out.path().join("doc.md"),
        },
    ];
    let summary = Puller::new(workspace.client()).run(&mappings).await;
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].context.page_id.as_deref(), Some("missing"));
    assert_eq!(summary.written, vec![out.path().join("doc.md")]);
    assert!(!out.path().join("missing.md").exists());
}

#[tokio::test]
async fn containers_are_left_out_of_the_document() {
    use crate::job::storage::workspace::{Client as _, NewPage};

    let (workspace, root) = workspace().await;
    let page = mirrored_page(workspace.client(), &root).await;
    workspace
        .client()
        .create_page(NewPage {
            parent: &page,
            title: "child",
            icon: None,
        })
        .await
        .unwrap();

    let out = tempfile::tempdir().unwrap();
    let target = out.path().join("doc.md");
    Puller::new(workspace.client())
        .pull(&page, &target)
        .await
        .unwrap();
    let written = tokio::fs::read_to_string(&target).await.unwrap();
    assert!(!written.contains("child"));
}

#[tokio::test]
async fn titled_targets_resolve_under_the_root_page() {
    use crate::job::storage::workspace::{Client as _, NewPage};

    let (workspace, root) = workspace().await;
    let page = mirrored_page(workspace.client(), &root).await;
    workspace
        .client()
        .create_page(NewPage {
            parent: &root,
            title: "Unmapped",
            icon: None,
        })
        .await
        .unwrap();

    let targets = vec![
        (
            PathBuf::from("out/doc.md"),
            PullSource::Titled {
                title: "doc.md".into(),
            },
        ),
        (PathBuf::from("out/by-id.md"), PullSource::Page("page_9".into())),
        (
            PathBuf::from("out/gone.md"),
            PullSource::Titled {
                title: "Gone".into(),
            },
        ),
    ];
    let (mappings, missing) = Puller::new(workspace.client())
        .resolve(&root, &targets)
        .await
        .unwrap();
    assert_eq!(
        mappings,
        vec![
            Mapping {
                page_id: page,
                path: PathBuf::from("out/doc.md"),
            },
            Mapping {
                page_id: "page_9".into(),
                path: PathBuf::from("out/by-id.md"),
            },
        ]
    );
    assert_eq!(missing, vec!["Gone".to_owned()]);
}
