/*!
 * CommandHandler trait
 *
 * `process` runs once per dispatch. The remaining hooks follow the registry
 * lifecycle: register/unregister while the registry is open, `init` once
 * after lock, `save` on every autosave pass and at shutdown, `on_shutdown`
 * once at process end.
 */

use std::sync::Arc;

use crate::context::InvocationContext;
use crate::error::{AppResult, CommandResult};
use crate::storage::{CodecBuilder, StorageContext};

pub trait CommandHandler: Send + Sync {
    fn process(&self, ctx: &InvocationContext) -> CommandResult<()>;

    fn on_register(&self) {}

    fn on_unregister(&self) {}

    /// Declares the state documents this handler persists.
    fn contribute_codec(&self, _builder: &mut CodecBuilder) {}

    fn init(&self, _storage: &StorageContext) -> AppResult<()> {
        Ok(())
    }

    fn save(&self, _storage: &StorageContext) -> AppResult<()> {
        Ok(())
    }

    fn on_shutdown(&self) {}
}

/// Stateless handler backed by a closure.
pub struct FnHandler<F> {
    f: F,
}

impl<F> CommandHandler for FnHandler<F>
where
    F: Fn(&InvocationContext) -> CommandResult<()> + Send + Sync,
{
    fn process(&self, ctx: &InvocationContext) -> CommandResult<()> {
        (self.f)(ctx)
    }
}

pub fn handler_fn<F>(f: F) -> Arc<dyn CommandHandler>
where
    F: Fn(&InvocationContext) -> CommandResult<()> + Send + Sync + 'static,
{
    Arc::new(FnHandler { f })
}
