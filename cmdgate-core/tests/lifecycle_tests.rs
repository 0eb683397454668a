/*!
 * Lifecycle tests: autosave schedule, final save and persistence across
 * registry instances.
 */

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::Duration;

use anyhow::anyhow;
use cmdgate_core::error::AppResult;
use cmdgate_core::lifecycle::save_pass;
use cmdgate_core::{
    CodecBuilder, CommandHandler, CommandRegistry, CommandResult, CommandSpec, InvocationContext,
    LifecycleCoordinator, RegistryError, StorageContext,
};
use parking_lot::Mutex;
use tempfile::TempDir;

/// Handler that counts saves and appends lifecycle events to a shared log.
struct Tracked {
    name: &'static str,
    saves: AtomicUsize,
    fail_saves: bool,
    log: Arc<Mutex<Vec<String>>>,
    save_thread: Mutex<Option<ThreadId>>,
}

impl Tracked {
    fn new(name: &'static str, log: Arc<Mutex<Vec<String>>>) -> Arc<Self> {
        Arc::new(Self {
            name,
            saves: AtomicUsize::new(0),
            fail_saves: false,
            log,
            save_thread: Mutex::new(None),
        })
    }

    fn failing(name: &'static str, log: Arc<Mutex<Vec<String>>>) -> Arc<Self> {
        Arc::new(Self {
            name,
            saves: AtomicUsize::new(0),
            fail_saves: true,
            log,
            save_thread: Mutex::new(None),
        })
    }

    fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl CommandHandler for Tracked {
    fn process(&self, _ctx: &InvocationContext) -> CommandResult<()> {
        Ok(())
    }

    fn save(&self, _storage: &StorageContext) -> AppResult<()> {
        *self.save_thread.lock() = Some(thread::current().id());
        self.log.lock().push(format!("save:{}", self.name));
        if self.fail_saves {
            return Err(anyhow!("{} cannot write", self.name));
        }
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn on_shutdown(&self) {
        self.log.lock().push(format!("shutdown:{}", self.name));
    }
}

fn locked_registry(dir: &TempDir, handlers: &[(&str, Arc<Tracked>)]) -> Arc<CommandRegistry> {
    let registry = Arc::new(CommandRegistry::new());
    for (name, handler) in handlers {
        registry
            .register(CommandSpec::new(name, handler.clone()))
            .unwrap();
    }
    registry.complete(dir.path()).unwrap();
    registry
}

#[test]
fn failing_save_does_not_stop_the_pass() {
    let dir = TempDir::new().unwrap();
    let log = Arc::new(Mutex::new(Vec::new()));
    let a = Tracked::new("a", log.clone());
    let b = Tracked::failing("b", log.clone());
    let c = Tracked::new("c", log.clone());
    let registry = locked_registry(&dir, &[("a", a.clone()), ("b", b), ("c", c.clone())]);

    let report = save_pass(&registry).unwrap();

    assert_eq!(report.saved, 2);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, "b");
    assert!(!report.is_clean());
    assert_eq!(a.saves(), 1);
    assert_eq!(c.saves(), 1);
    assert_eq!(*log.lock(), vec!["save:a", "save:b", "save:c"]);
}

#[test]
fn save_pass_requires_locked_registry() {
    let registry = CommandRegistry::new();
    assert!(matches!(save_pass(&registry), Err(RegistryError::NotLocked)));
}

#[tokio::test]
async fn coordinator_refuses_to_start_before_lock() {
    let registry = Arc::new(CommandRegistry::new());
    let coordinator = LifecycleCoordinator::with_schedule(
        registry,
        Duration::from_secs(30),
        Duration::from_secs(300),
    );
    assert!(matches!(coordinator.start(), Err(RegistryError::NotLocked)));
}

#[tokio::test(start_paused = true)]
async fn autosave_runs_after_delay_then_on_interval() {
    let dir = TempDir::new().unwrap();
    let log = Arc::new(Mutex::new(Vec::new()));
    let tracked = Tracked::new("quote", log);
    let registry = locked_registry(&dir, &[("quote", tracked.clone())]);

    let coordinator = LifecycleCoordinator::with_schedule(
        registry,
        Duration::from_secs(30),
        Duration::from_secs(300),
    );
    coordinator.start().unwrap();

    tokio::time::sleep(Duration::from_secs(29)).await;
    assert_eq!(tracked.saves(), 0);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(tracked.saves(), 1);

    tokio::time::sleep(Duration::from_secs(298)).await;
    assert_eq!(tracked.saves(), 1);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(tracked.saves(), 2);

    coordinator.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn autosave_runs_off_the_runtime_thread() {
    let dir = TempDir::new().unwrap();
    let log = Arc::new(Mutex::new(Vec::new()));
    let tracked = Tracked::new("quote", log);
    let registry = locked_registry(&dir, &[("quote", tracked.clone())]);

    let coordinator = LifecycleCoordinator::with_schedule(
        registry,
        Duration::from_secs(1),
        Duration::from_secs(300),
    );
    coordinator.start().unwrap();

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(tracked.saves(), 1);
    let save_thread = tracked.save_thread.lock().take();
    assert!(save_thread.is_some());
    assert_ne!(save_thread, Some(thread::current().id()));

    coordinator.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn shutdown_saves_before_shutdown_hooks_and_stops_timer() {
    let dir = TempDir::new().unwrap();
    let log = Arc::new(Mutex::new(Vec::new()));
    let a = Tracked::new("a", log.clone());
    let b = Tracked::new("b", log.clone());
    let registry = locked_registry(&dir, &[("a", a.clone()), ("b", b.clone())]);

    let coordinator = LifecycleCoordinator::with_schedule(
        registry,
        Duration::from_secs(30),
        Duration::from_secs(300),
    );
    coordinator.start().unwrap();

    let report = coordinator.shutdown().await.unwrap();
    assert!(report.is_clean());
    assert_eq!(
        *log.lock(),
        vec!["save:a", "save:b", "shutdown:a", "shutdown:b"]
    );

    tokio::time::sleep(Duration::from_secs(600)).await;
    assert_eq!(a.saves(), 1);
    assert_eq!(b.saves(), 1);
}

/// Keeps a name → count table in its own schema.
#[derive(Default)]
struct Tally {
    counts: Mutex<BTreeMap<String, u32>>,
}

impl CommandHandler for Tally {
    fn process(&self, _ctx: &InvocationContext) -> CommandResult<()> {
        Ok(())
    }

    fn contribute_codec(&self, builder: &mut CodecBuilder) {
        builder.register_schema("tally", 1);
    }

    fn init(&self, storage: &StorageContext) -> AppResult<()> {
        if let Some(counts) = storage.load::<BTreeMap<String, u32>>("tally")? {
            *self.counts.lock() = counts;
        }
        Ok(())
    }

    fn save(&self, storage: &StorageContext) -> AppResult<()> {
        storage.save("tally", &*self.counts.lock())?;
        Ok(())
    }
}

#[tokio::test]
async fn state_survives_restart() {
    let dir = TempDir::new().unwrap();

    let first = Arc::new(Tally::default());
    first.counts.lock().insert("apples".to_string(), 3);
    let registry = Arc::new(CommandRegistry::new());
    registry
        .register(CommandSpec::new("tally", first.clone()))
        .unwrap();
    registry.complete(dir.path()).unwrap();
    LifecycleCoordinator::with_schedule(
        registry,
        Duration::from_secs(30),
        Duration::from_secs(300),
    )
    .shutdown()
    .await
    .unwrap();

    let second = Arc::new(Tally::default());
    let registry = CommandRegistry::new();
    registry
        .register(CommandSpec::new("tally", second.clone()))
        .unwrap();
    registry.complete(dir.path()).unwrap();

    assert_eq!(second.counts.lock().get("apples"), Some(&3));
}
