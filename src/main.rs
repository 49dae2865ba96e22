use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand};

use notion_mirror::{
    config::Config,
    deploy::{local::LocalWorkspace, notion},
    job::{self, Puller, SyncOptions, Synchronizer, storage::workspace::Client},
    process_data::walk,
    progress::{self, BatchPhase, ProgressReporter},
    vcs,
};
use tracing::{error, info, warn};

#[derive(Parser)]
struct Opts {
    #[clap(short, long, env = "NOTION_MIRROR_CONFIG")]
    config: PathBuf,
    #[clap(long, env = "NOTION_TOKEN", hide_env_values = true)]
    token: Option<String>,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Mirror the local tree into the workspace.
    Push {
        /// Only mirror files changed since this revision.
        #[clap(long)]
        since: Option<String>,
        /// Mirror into a local SQLite workspace instead of the API.
        #[clap(long)]
        local: Option<PathBuf>,
    },
    /// Write mapped pages back to local files.
    Pull {
        #[clap(long)]
        local: Option<PathBuf>,
    },
}

async fn push<C: Client>(
    client: C,
    config: &Config,
    root_page_id: String,
    since: Option<String>,
    reporter: Arc<dyn ProgressReporter>,
) -> anyhow::Result<()> {
    reporter.set_phase(BatchPhase::Scanning);
    let paths = walk::walk(&config.base_dir, &config.roots[..], &config.exclude[..]);
    let mut files = job::describe(paths, &config.base_dir).await;

    let incremental = since
        .map(|base| {
            let head = config
                .incremental
                .as_ref()
                .map(|incremental| incremental.head.clone())
                .unwrap_or_else(|| "HEAD".to_owned());
            (base, head)
        })
        .or_else(|| {
            config
                .incremental
                .as_ref()
                .map(|incremental| (incremental.base.clone(), incremental.head.clone()))
        });
    if let Some((base, head)) = incremental {
        match vcs::changed_files(&config.base_dir, &base, &head).await {
            Ok(changed) => {
                files = job::restrict(files, &changed);
                info!(base, head, files = files.len(), "incremental run");
            }
            Err(error) => {
                warn!(%error, "cannot list changed files, mirroring everything");
                reporter.log_warn(&format!("incremental mode disabled: {error}"));
            }
        }
    }

    reporter.set_phase(BatchPhase::Mirroring);
    let options = SyncOptions {
        root_page_id,
        max_upload_bytes: config.max_upload_bytes,
        repository_url: config.repository_url.clone(),
    };
    let summary = Synchronizer::new(client, options)
        .with_reporter(reporter.clone())
        .run(&files)
        .await;
    info!(
        mirrored = summary.mirrored.len(),
        skipped = summary.skipped.len(),
        failed = summary.failed.len(),
        "push finished"
    );
    Ok(())
}

async fn pull<C: Client>(
    client: C,
    config: &Config,
    root_page_id: String,
    reporter: Arc<dyn ProgressReporter>,
) -> anyhow::Result<()> {
    reporter.set_phase(BatchPhase::Pulling);
    let targets = config
        .pull
        .iter()
        .map(|(path, source)| (config.resolve(path), source.clone()))
        .collect::<Vec<_>>();
    let puller = Puller::new(client).with_reporter(reporter.clone());
    let (mappings, missing) = puller
        .resolve(&root_page_id, &targets)
        .await
        .context("list pages under the root page")?;
    for title in &missing {
        reporter.log_warn(&format!("no page titled {title}"));
    }
    let summary = puller.run(&mappings).await;
    info!(
        written = summary.written.len(),
        unchanged = summary.unchanged.len(),
        failed = summary.failed.len(),
        "pull finished"
    );
    Ok(())
}

async fn open_local(path: &std::path::Path) -> anyhow::Result<LocalWorkspace> {
    let url = format!("sqlite://{}", path.display());
    LocalWorkspace::open(&url)
        .await
        .with_context(|| format!("open local workspace {}", path.display()))
}

fn notion_client(opts: &Opts, config: &Config) -> anyhow::Result<notion::Client> {
    let token = opts
        .token
        .clone()
        .ok_or_else(|| anyhow!("an API token is required (--token or NOTION_TOKEN)"))?;
    Ok(notion::Client::new(
        config.api.base_url.clone(),
        token,
        config.api.version.clone(),
    ))
}

async fn run(opts: Opts, reporter: Arc<dyn ProgressReporter>) -> anyhow::Result<()> {
    reporter.set_phase(BatchPhase::LoadingConfig);
    let config = tokio::fs::read_to_string(&opts.config)
        .await
        .with_context(|| "read config")?;
    let config: Config = serde_yaml::from_str(&config)
        .with_context(|| format!("parse config from {}", opts.config.display()))?;
    config.validate().map_err(|msg| anyhow!("{msg}"))?;

    match &opts.command {
        Command::Push {
            since,
            local: Some(db),
        } => {
            let workspace = open_local(db).await?;
            let root = workspace
                .root_page(&config.root_page_id)
                .await
                .context("prepare local root page")?;
            push(workspace.client(), &config, root, since.clone(), reporter).await
        }
        Command::Push { since, local: None } => {
            let client = notion_client(&opts, &config)?;
            let root = config.root_page_id.clone();
            push(client, &config, root, since.clone(), reporter).await
        }
        Command::Pull { local: Some(db) } => {
            let workspace = open_local(db).await?;
            let root = workspace
                .root_page(&config.root_page_id)
                .await
                .context("prepare local root page")?;
            pull(workspace.client(), &config, root, reporter).await
        }
        Command::Pull { local: None } => {
            let client = notion_client(&opts, &config)?;
            let root = config.root_page_id.clone();
            pull(client, &config, root, reporter).await
        }
    }
}

fn main() {
    let opts = Opts::parse();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(?e, "failed to start runtime");
            std::process::exit(1);
        }
    };
    let reporter = progress::create_reporter();
    let result = runtime.block_on(run(opts, reporter.clone()));
    match result {
        Ok(()) => {
            reporter.set_phase(BatchPhase::Completed);
            reporter.finish();
        }
        Err(e) => {
            reporter.set_phase(BatchPhase::Failed(e.to_string()));
            reporter.finish();
            error!(?e, "critical error");
            std::process::exit(1);
        }
    }
}
