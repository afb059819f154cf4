// SPDX-License-Identifier: MPL-2.0

mod app;
mod archive;
mod cli;
mod config;
mod direct;
mod logging;
mod state;
#[cfg(test)]
mod testing;

use clap::Parser;
use tracing::info;

use app::{Application, RunOptions};
use archive::{HttpMediaSource, MediaFailurePolicy};
use cli::Cli;
use direct::{Credentials, DirectClient};
use logging::LogConfig;
use state::Settings;

/// Resolves on Ctrl-C. If the signal handler cannot be installed the run
/// simply cannot be interrupted, rather than being cut short.
async fn interrupted() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let settings = Settings::load();

    logging::init(LogConfig::new(cli.debug, cli.log_file.clone()))?;

    let service_url = cli.service_url.as_deref().unwrap_or(&settings.service_url);
    let timeout = settings.request_timeout();

    info!(target: "app", username = %cli.username, service = %service_url, "starting {}", config::APP_NAME);

    let client = DirectClient::with_service(
        Credentials {
            username: cli.username.clone(),
            password: cli.password.clone(),
        },
        service_url,
        &settings.user_agent,
        timeout,
    )?;
    let source = HttpMediaSource::new(&settings.user_agent, timeout)?;

    let options = RunOptions {
        thread_title: cli.thread_title.clone(),
        output_dir: cli.output.clone(),
        remove_after_backup: cli.remove,
        reverse: cli.reverse,
        media_failures: if cli.skip_failed_media {
            MediaFailurePolicy::Skip
        } else {
            settings.media_failures
        },
        timestamp_order: settings.timestamp_order,
    };

    let mut app = Application::new(client, source, options)?;
    app.run(interrupted()).await?;
    Ok(())
}
