use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{Level, info};
use tracing_subscriber::{EnvFilter, fmt};

use picture_frame::config::Configuration;
use picture_frame::events::ControlMessage;
use picture_frame::tasks;
use picture_frame::tasks::viewer::{Slideshow, TracingRenderer};

#[derive(Debug, Parser)]
#[command(name = "picture-frame", version, about = "Digital picture frame slideshow")]
struct Args {
    /// Path to YAML config
    #[arg(value_name = "CONFIG")]
    config: PathBuf,
    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
    /// Ignore the mqtt section of the configuration
    #[arg(long = "no-mqtt")]
    no_mqtt: bool,
    /// Print the order of the next N pictures and exit
    #[arg(long = "dry-run", value_name = "N")]
    dry_run: Option<usize>,
}

fn init_tracing(verbosity: u8) -> Result<()> {
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let directive = format!("picture_frame={level}")
        .parse()
        .context("invalid log directive")?;
    let filter = EnvFilter::from_default_env().add_directive(directive);
    fmt().with_env_filter(filter).with_target(false).compact().init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let Args {
        config,
        verbose,
        no_mqtt,
        dry_run,
    } = Args::parse();
    init_tracing(verbose)?;

    let cfg = Configuration::from_yaml_file(&config)
        .with_context(|| format!("failed to load configuration from {}", config.display()))?
        .validated()
        .context("invalid configuration values")?;
    tracing::debug!("Loaded configuration from {}:\n{:#?}", config.display(), cfg);

    if let Some(count) = dry_run {
        run_dry_run(cfg, count);
        return Ok(());
    }

    let (control_tx, control_rx) = mpsc::channel::<ControlMessage>(32);
    let cancel = CancellationToken::new();

    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::warn!("ctrl-c handler failed: {err}");
                return;
            }
            info!("ctrl-c received; initiating shutdown");
            cancel.cancel();
        });
    }

    let mut tasks = JoinSet::new();

    if cfg.mqtt.enabled && !no_mqtt {
        tasks.spawn({
            let settings = cfg.mqtt.clone();
            let control = control_tx.clone();
            let cancel = cancel.clone();
            async move {
                tasks::mqtt::run(settings, control, cancel)
                    .await
                    .context("mqtt task failed")
            }
        });
    }

    if cfg.keyboard {
        tasks.spawn({
            let control = control_tx.clone();
            let cancel = cancel.clone();
            async move {
                tasks::keyboard::run(control, cancel)
                    .await
                    .context("keyboard task failed")
            }
        });
    }
    drop(control_tx);

    let show = Slideshow::from_config(cfg);
    if let Err(e) = tasks::viewer::run(show, TracingRenderer::default(), control_rx, cancel.clone())
        .await
        .context("viewer failed")
    {
        tracing::error!("{e:?}");
    }
    // Ensure other tasks are asked to stop
    cancel.cancel();

    while let Some(res) = tasks.join_next().await {
        match res {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!("task error: {e:?}"),
            Err(e) => tracing::error!("join error: {e}"),
        }
    }

    Ok(())
}

fn run_dry_run(cfg: Configuration, count: usize) {
    let root = cfg.picture_root(&cfg.subdirectory);
    let mut show = Slideshow::from_config(cfg);
    println!(
        "# dry run\n# root: {}\n# pictures: {}\n# advances: {}\n",
        root.display(),
        show.catalog().len(),
        count
    );
    let plan = show.plan(count);
    if plan.is_empty() {
        println!("(no pictures selected)");
        return;
    }
    for (idx, path) in plan.iter().enumerate() {
        println!("  {:>4}: {}", idx + 1, path.display());
    }
}
