use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use clipscribe::acquire::{AudioAcquirer, SourceAcquirer};
use clipscribe::delivery::{PlayerChannel, SubtitleSink};
use clipscribe::orchestrator::SystemClipboard;
use clipscribe::{backend, utils, Cli, Config, Orchestrator};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let default_filter = if cli.verbose {
        "clipscribe=debug"
    } else {
        "clipscribe=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Check for required external tools (non-fatal)
    let missing_deps = utils::check_dependencies().await;
    if !missing_deps.is_empty() {
        eprintln!("⚠️  Dependency check warnings:");
        for dep in missing_deps {
            eprintln!("   • {}", dep);
        }
        eprintln!("   (Continuing anyway - tools may be available)");
    }

    let mut config = Config::load(cli.config.as_deref()).await?;
    if let Some(backend) = cli.backend {
        config.backend = backend;
    }
    if let Some(language) = cli.language {
        config.language = language;
    }
    if cli.bypass_language_check {
        config.bypass_language_check = true;
    }
    config.validate()?;

    tracing::info!(
        "backend: {:?}, target language: {}, output: {}",
        config.backend,
        config.language,
        config.output_dir.display()
    );

    let transcription = backend::create_backend(&config)?;
    let acquirer: Arc<dyn AudioAcquirer> =
        Arc::new(SourceAcquirer::new(config.cookies_file.clone()));
    let sink: Arc<dyn SubtitleSink> = Arc::new(PlayerChannel::new(&config.delivery)?);

    let orchestrator = Arc::new(Orchestrator::new(config, acquirer, transcription, sink)?);

    tracing::info!("watching clipboard for YouTube links and media paths (Ctrl+C to stop)");
    orchestrator.run(Box::new(SystemClipboard::new())).await
}
