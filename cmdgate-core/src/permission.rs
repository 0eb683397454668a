/*!
 * Permission gate, evaluated before any input is parsed.
 */

use std::collections::HashSet;

use crate::config::EngineConfig;
use crate::context::{Group, Invoker};
use crate::descriptor::CommandSpec;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionDecision {
    Allow,
    /// Admin-only command invoked by a non-operator: no reply at all.
    SilentDrop,
    /// Requirements not met: one transient denial reply.
    Deny,
}

#[derive(Debug, Clone)]
pub struct PermissionGate {
    operators: HashSet<u64>,
}

impl PermissionGate {
    pub fn new(operators: impl IntoIterator<Item = u64>) -> Self {
        Self {
            operators: operators.into_iter().collect(),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.operator_ids.iter().copied())
    }

    pub fn is_operator(&self, user_id: u64) -> bool {
        self.operators.contains(&user_id)
    }

    pub fn check(
        &self,
        command: &CommandSpec,
        invoker: &Invoker,
        group: Option<&Group>,
    ) -> PermissionDecision {
        if command.is_admin() && !self.is_operator(invoker.user_id) {
            return PermissionDecision::SilentDrop;
        }
        if !command.requirements().matches(invoker, group) {
            return PermissionDecision::Deny;
        }
        PermissionDecision::Allow
    }
}

impl Default for PermissionGate {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}
