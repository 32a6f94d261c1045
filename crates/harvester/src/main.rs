// Copyright 2025 Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::process::ExitCode;

use clap::Parser;
use harvester::{cli::Cli, HarvestConfig, HarvestError, Harvester};
use rpc_batch::HttpTransport;
use tracing::{error, info, level_filters::LevelFilter, subscriber::set_global_default};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    if let Err(e) = run().await {
        error!("Harvest error: {e}");
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn init_tracing() {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    let subscriber_builder: tracing_subscriber::fmt::SubscriberBuilder<
        tracing_subscriber::fmt::format::DefaultFields,
        tracing_subscriber::fmt::format::Format,
        EnvFilter,
    > = FmtSubscriber::builder().with_env_filter(filter);
    set_global_default(subscriber_builder.with_ansi(true).finish()).expect(
        "Failed to set up the global default subscriber for logging. Please check if the RUST_LOG environment variable is set correctly.",
    );
}

async fn run() -> Result<(), HarvestError> {
    let cli = Cli::parse();
    let config = HarvestConfig::from(cli);

    let transport = HttpTransport::new(config.endpoint.as_str());
    let summary = Harvester::new(transport, config)?.run().await?;

    info!(
        blocks = summary.total_blocks,
        miners = summary.distinct_miners,
        errors = summary.error_count,
        "harvest complete"
    );

    Ok(())
}
