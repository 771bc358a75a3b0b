use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use ai_client::OpenAi;
use feedhound_agent::infra::{OpenAiOracle, PerplexityResearcher, XFeed, XPublisher};
use feedhound_agent::retry::RetryPolicy;
use feedhound_agent::scheduler::{AgentDeps, CycleConfig, CycleScheduler};
use feedhound_common::Settings;
use x_client::XClient;

const DEFAULT_LOG_FILTER: &str =
    "feedhound=info,feedhound_agent=info,feedhound_common=info,x_client=info,ai_client=warn";

#[derive(Parser)]
#[command(name = "feedhound", about = "Watches an X list and answers the best post of each cycle")]
struct Cli {
    /// Run a single cycle and exit
    #[arg(long)]
    once: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    if cli.json_logs {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::info!("Starting feedhound");

    let settings = Settings::load().context("Failed to load settings")?;
    let mut scheduler = build_scheduler(&settings);

    if cli.once {
        let outcome = scheduler.run_guarded_cycle().await;
        tracing::info!(outcome = ?outcome, "Single cycle complete");
        return Ok(());
    }

    tokio::select! {
        _ = scheduler.run_forever() => {}
        signal = shutdown_signal() => {
            signal.context("Failed to listen for shutdown signal")?;
            tracing::info!("Shutdown signal received, exiting");
        }
    }

    Ok(())
}

fn build_scheduler(settings: &Settings) -> CycleScheduler {
    let file = &settings.file;
    let app = &settings.app;

    let x = Arc::new(
        XClient::new(app.x_bearer_token.clone())
            .with_user_token(app.x_user_access_token.clone())
            .with_wait_on_rate_limit(true),
    );

    let ai = OpenAi::new(&app.openai_api_key, &file.models.generation);
    let oracle = Arc::new(OpenAiOracle::new(
        ai,
        file.models.vision_model(),
        settings.persona.clone(),
    ));

    let deps = AgentDeps::builder()
        .feed(Arc::new(XFeed::new(x.clone())))
        .describer(oracle.clone())
        .oracle(oracle)
        .research(Arc::new(PerplexityResearcher::new(
            &app.perplexity_api_key,
            &file.models.research,
        )))
        .posts(Arc::new(XPublisher::new(x, &file.identity.handle)))
        .generation_attempts(file.retry.generation_attempts)
        .publish_retry(RetryPolicy::fixed(
            file.retry.publish_attempts,
            Duration::from_secs(file.retry.publish_delay_secs),
        ))
        .build();

    CycleScheduler::new(
        deps,
        CycleConfig {
            list_id: file.feed.list_id.clone(),
            max_results: file.feed.max_results,
            base_interval: Duration::from_secs(file.cycle.length_secs),
        },
    )
}

/// Resolves on ctrl-c, or SIGTERM on unix.
async fn shutdown_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    let terminate = async {
        let mut signal =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
        signal.recv().await;
        Ok::<(), std::io::Error>(())
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<std::io::Result<()>>();

    tokio::select! {
        result = tokio::signal::ctrl_c() => result,
        result = terminate => result,
    }
}
