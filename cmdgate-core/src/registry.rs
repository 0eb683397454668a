/*!
 * CommandRegistry - name → command storage
 *
 * Mutable until `complete` locks it. After that the command map is frozen and
 * only read, by dispatch and by the lifecycle coordinator.
 */

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::descriptor::{CommandSpec, Descriptor};
use crate::error::{AppResult, RegistryError, RegistryResult};
use crate::storage::{CodecBuilder, StorageContext};

pub type DescriptorFactory = Box<dyn Fn() -> AppResult<Descriptor> + Send + Sync>;

/// Static list of descriptor factories, built at process start.
#[derive(Default)]
pub struct CommandCatalog {
    entries: Vec<(String, DescriptorFactory)>,
}

impl CommandCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<F>(mut self, name: &str, factory: F) -> Self
    where
        F: Fn() -> AppResult<Descriptor> + Send + Sync + 'static,
    {
        self.entries.push((name.to_string(), Box::new(factory)));
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }
}

struct RegistryState {
    commands: BTreeMap<String, Arc<CommandSpec>>,
    codec: CodecBuilder,
    discovered: bool,
    locked: bool,
    storage: Option<StorageContext>,
}

pub struct CommandRegistry {
    state: RwLock<RegistryState>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::with_codec(CodecBuilder::default())
    }

    /// Starts from `codec`; handlers add their own settings during registration.
    pub fn with_codec(codec: CodecBuilder) -> Self {
        Self {
            state: RwLock::new(RegistryState {
                commands: BTreeMap::new(),
                codec,
                discovered: false,
                locked: false,
                storage: None,
            }),
        }
    }

    /// Builds and registers every catalog entry. Runs once; later calls are no-ops.
    ///
    /// All factories are evaluated before anything is registered, so a failing
    /// entry leaves the registry untouched.
    pub fn discover(&self, catalog: &CommandCatalog) -> RegistryResult<usize> {
        {
            let state = self.state.read();
            if state.discovered {
                debug!("command discovery already performed");
                return Ok(0);
            }
            if state.locked {
                return Err(RegistryError::Locked {
                    operation: "discover commands",
                });
            }
        }

        let mut descriptors = Vec::with_capacity(catalog.len());
        for (entry, factory) in &catalog.entries {
            let descriptor = factory().map_err(|source| RegistryError::Discovery {
                entry: entry.clone(),
                source,
            })?;
            descriptors.push(descriptor);
        }

        let before = self.len();
        for descriptor in descriptors {
            self.register(descriptor)?;
        }
        self.state.write().discovered = true;

        let added = self.len().saturating_sub(before);
        info!(
            "discovered {} commands from {} catalog entries",
            added,
            catalog.len()
        );
        Ok(added)
    }

    /// Registers a leaf, or every leaf below a group. Group nodes themselves
    /// are never addressable. An existing name is overwritten.
    pub fn register(&self, descriptor: impl Into<Descriptor>) -> RegistryResult<()> {
        let leaves = descriptor.into().into_leaves();
        let mut added = Vec::with_capacity(leaves.len());
        {
            let mut state = self.state.write();
            if state.locked {
                return Err(RegistryError::Locked {
                    operation: "register commands",
                });
            }
            for spec in leaves {
                let spec = Arc::new(spec);
                spec.handler().contribute_codec(&mut state.codec);
                if state
                    .commands
                    .insert(spec.name().to_string(), Arc::clone(&spec))
                    .is_some()
                {
                    debug!("command {} replaced an earlier registration", spec.name());
                }
                added.push(spec);
            }
        }

        for spec in added {
            spec.handler().on_register();
            debug!("registered command {}", spec.name());
        }
        Ok(())
    }

    pub fn unregister(&self, name: &str) -> RegistryResult<Option<Arc<CommandSpec>>> {
        let removed = {
            let mut state = self.state.write();
            if state.locked {
                return Err(RegistryError::Locked {
                    operation: "unregister commands",
                });
            }
            state.commands.remove(name)
        };
        if let Some(spec) = &removed {
            spec.handler().on_unregister();
            debug!("unregistered command {}", name);
        }
        Ok(removed)
    }

    /// Locks the registry and hands every command its storage context.
    ///
    /// The storage root is created here, and the shared codec is built from
    /// everything handlers contributed, so `init` sees the final settings.
    pub fn complete(&self, root: &Path) -> RegistryResult<StorageContext> {
        let (storage, commands) = {
            let mut state = self.state.write();
            if state.locked {
                return Err(RegistryError::Locked {
                    operation: "complete",
                });
            }
            std::fs::create_dir_all(root).map_err(|source| RegistryError::StorageRoot {
                path: root.to_path_buf(),
                source,
            })?;

            state.locked = true;
            let storage = StorageContext::new(root, Arc::new(state.codec.build()));
            state.storage = Some(storage.clone());
            let commands: Vec<Arc<CommandSpec>> = state.commands.values().cloned().collect();
            (storage, commands)
        };

        info!(
            "command registry locked with {} commands, storage at {}",
            commands.len(),
            root.display()
        );

        for spec in commands {
            spec.handler()
                .init(&storage)
                .map_err(|source| RegistryError::Init {
                    command: spec.name().to_string(),
                    source,
                })?;
        }
        Ok(storage)
    }

    pub fn find(&self, name: &str) -> Option<Arc<CommandSpec>> {
        self.state.read().commands.get(name).cloned()
    }

    /// Registered commands, ordered by name.
    pub fn commands(&self) -> Vec<Arc<CommandSpec>> {
        self.state.read().commands.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.state.read().commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_locked(&self) -> bool {
        self.state.read().locked
    }

    pub fn storage(&self) -> Option<StorageContext> {
        self.state.read().storage.clone()
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}
