/*!
 * Console host
 *
 * Startup: config → logging → discovery → lock and init → autosave timer.
 * Then every stdin line is dispatched until EOF, ctrl-c or the `shutdown`
 * command, after which the coordinator runs the final save and hooks.
 */

use std::sync::Arc;

use anyhow::Context;
use cmdgate_core::logging::init_logging;
use cmdgate_core::{
    AppResult, CodecBuilder, CommandRegistry, Dispatcher, EngineConfig, InboundMessage,
    LifecycleCoordinator,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cli::Cli;
use crate::commands::{catalog, CatalogContext};
use crate::transport::{ConsoleTransport, CONSOLE_CHANNEL};

pub async fn run(cli: Cli) -> AppResult<()> {
    let mut config = EngineConfig::load(&cli.config)?;
    cli.apply(&mut config);
    config.validate()?;
    init_logging(&cli.log_level)?;
    info!("cmdgate {} starting", env!("CARGO_PKG_VERSION"));

    let shutdown = CancellationToken::new();
    let registry = Arc::new(CommandRegistry::with_codec(CodecBuilder::new(
        config.pretty_storage,
    )));
    let catalog = catalog(CatalogContext {
        registry: Arc::downgrade(&registry),
        shutdown: shutdown.clone(),
        moderator_roles: cli.moderator_roles.clone(),
    });
    registry
        .discover(&catalog)
        .context("failed to register built-in commands")?;
    registry
        .complete(&config.data_dir)
        .context("failed to initialise command storage")?;

    let coordinator = LifecycleCoordinator::new(Arc::clone(&registry), &config);
    coordinator.start()?;

    let transport = Arc::new(ConsoleTransport::stdout());
    let dispatcher = Dispatcher::new(Arc::clone(&registry), transport, &config);
    let author = cli.invoker();
    let group = cli.origin_group();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("shutdown command received");
                break;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    let mut message = InboundMessage::new(line, author.clone(), CONSOLE_CHANNEL);
                    if let Some(group) = &group {
                        message = message.in_group(group.clone());
                    }
                    let outcome = dispatcher.handle_message(&message);
                    debug!("dispatch outcome: {:?}", outcome);
                }
                Ok(None) => {
                    info!("input closed");
                    break;
                }
                Err(e) => {
                    warn!("failed to read input: {}", e);
                    break;
                }
            }
        }
    }

    let report = coordinator.shutdown().await?;
    if !report.is_clean() {
        warn!("{} commands failed to save on shutdown", report.failed.len());
    }
    Ok(())
}
