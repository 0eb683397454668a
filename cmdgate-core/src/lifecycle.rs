/*!
 * Lifecycle coordinator
 *
 * Runs the autosave timer next to dispatch and performs the final save and
 * shutdown hooks when the process stops.
 */

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::{RegistryError, RegistryResult};
use crate::registry::CommandRegistry;

/// Result of one save pass across all commands.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveReport {
    pub saved: usize,
    pub failed: Vec<(String, String)>,
}

impl SaveReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Calls `save` on every registered command. A failing command is logged
/// and skipped; the rest are still saved.
pub fn save_pass(registry: &CommandRegistry) -> RegistryResult<SaveReport> {
    let storage = registry.storage().ok_or(RegistryError::NotLocked)?;
    let mut report = SaveReport::default();

    for command in registry.commands() {
        let handler = Arc::clone(command.handler());
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler.save(&storage)));
        match outcome {
            Ok(Ok(())) => report.saved += 1,
            Ok(Err(e)) => {
                warn!("failed to save command {}: {:#}", command.name(), e);
                report.failed.push((command.name().to_string(), e.to_string()));
            }
            Err(_) => {
                warn!("command {} panicked while saving", command.name());
                report
                    .failed
                    .push((command.name().to_string(), "panicked while saving".to_string()));
            }
        }
    }

    debug!(
        "save pass finished: {} saved, {} failed",
        report.saved,
        report.failed.len()
    );
    Ok(report)
}

pub struct LifecycleCoordinator {
    registry: Arc<CommandRegistry>,
    initial_delay: Duration,
    interval: Duration,
    cancel: CancellationToken,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl LifecycleCoordinator {
    pub fn new(registry: Arc<CommandRegistry>, config: &EngineConfig) -> Self {
        Self::with_schedule(
            registry,
            config.autosave_delay(),
            config.autosave_interval(),
        )
    }

    pub fn with_schedule(
        registry: Arc<CommandRegistry>,
        initial_delay: Duration,
        interval: Duration,
    ) -> Self {
        Self {
            registry,
            initial_delay,
            interval,
            cancel: CancellationToken::new(),
            handle: Mutex::new(None),
        }
    }

    /// Spawns the autosave task. The registry must already be locked.
    /// Each pass writes to disk, so it runs on the blocking pool.
    pub fn start(&self) -> RegistryResult<()> {
        if !self.registry.is_locked() {
            return Err(RegistryError::NotLocked);
        }
        let mut handle = self.handle.lock();
        if handle.is_some() {
            debug!("autosave timer already running");
            return Ok(());
        }

        let registry = Arc::clone(&self.registry);
        let cancel = self.cancel.clone();
        let mut ticker = interval_at(Instant::now() + self.initial_delay, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        *handle = Some(tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        let registry = Arc::clone(&registry);
                        match tokio::task::spawn_blocking(move || save_pass(&registry)).await {
                            Ok(Ok(report)) if !report.is_clean() => {
                                warn!("autosave finished with {} failures", report.failed.len());
                            }
                            Ok(Ok(_)) => {}
                            Ok(Err(e)) => warn!("autosave skipped: {}", e),
                            Err(e) => warn!("autosave task failed: {}", e),
                        }
                    }
                }
            }
            debug!("autosave timer stopped");
        }));

        info!(
            "autosave scheduled: first run in {:?}, then every {:?}",
            self.initial_delay, self.interval
        );
        Ok(())
    }

    pub fn save_all(&self) -> RegistryResult<SaveReport> {
        save_pass(&self.registry)
    }

    /// Stops the timer, runs one final save pass, then every `on_shutdown` hook.
    pub async fn shutdown(&self) -> RegistryResult<SaveReport> {
        self.cancel.cancel();
        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!("autosave task ended abnormally: {}", e);
            }
        }

        let report = save_pass(&self.registry)?;
        for command in self.registry.commands() {
            let handler = Arc::clone(command.handler());
            if panic::catch_unwind(AssertUnwindSafe(|| handler.on_shutdown())).is_err() {
                warn!("command {} panicked during shutdown", command.name());
            }
        }

        info!(
            "shutdown complete: {} commands saved, {} failed",
            report.saved,
            report.failed.len()
        );
        Ok(report)
    }
}
