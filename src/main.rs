use anyhow::{Context, Result};
use binsort_core::ClassNames;
use binsort_cv::traits::CommandPublisher;
use binsort_cv::{
    ImageSource, LogPublisher, MqttPublisher, Pipeline, ReplayDetector, RunSummary, SourceSpec,
    StopHandle,
};
use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod cli;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = cli::Args::parse();

    match run(&args) {
        Ok(summary) => {
            info!(
                frames = summary.frames,
                fires = summary.fires,
                suppressed = summary.suppressed,
                publish_failures = summary.publish_failures,
                persistence_failures = summary.persistence_failures,
                mean_fps = summary.mean_fps.unwrap_or(0.0),
                "Run finished"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &cli::Args) -> Result<RunSummary> {
    let config = args.resolve_config()?;

    let spec = SourceSpec::parse(&args.source);
    let source = ImageSource::open(&spec)?;

    let mut detector = ReplayDetector::load(&args.model)?;
    if let Some(path) = &args.names {
        detector = detector.with_names(ClassNames::load(path)?);
    }

    let publisher: Box<dyn CommandPublisher> = if args.dry_run {
        Box::new(LogPublisher::new(config.mqtt.topic.as_str()))
    } else {
        Box::new(MqttPublisher::connect(&config.mqtt)?)
    };

    let mut pipeline = Pipeline::new(&config, source, detector, publisher)?;
    install_interrupt_handler(pipeline.stop_handle())?;

    info!(
        source = %spec,
        lockout_secs = config.lockout_secs,
        history = ?config.log_path(),
        topic = %config.mqtt.topic,
        "System ready"
    );

    pipeline.run()
}

/// First Ctrl-C lets the current frame finish, a second one exits at once.
fn install_interrupt_handler(stop: StopHandle) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build signal runtime")?;

    std::thread::Builder::new()
        .name("interrupt".into())
        .spawn(move || {
            runtime.block_on(async {
                if tokio::signal::ctrl_c().await.is_err() {
                    return;
                }
                warn!("Interrupt received, stopping after the current frame");
                stop.request();

                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Second interrupt, exiting");
                    std::process::exit(130);
                }
            });
        })
        .context("Failed to start interrupt handler")?;

    Ok(())
}
