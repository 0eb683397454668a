/*!
 * Command descriptors
 *
 * A descriptor is either a leaf command carrying a handler, or a group node
 * that only exists to register its children.
 */

use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::context::{Group, Invoker};
use crate::grammar::ParsedFlags;
use crate::handler::CommandHandler;

static WORD_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\S+").expect("valid word pattern"));
static REST_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r".+").expect("valid rest pattern"));

/// Schema of a named switch. Flags are identified by their long key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flag {
    short: String,
    long: String,
    needs_value: bool,
    can_have_value: bool,
    default_value: String,
    description: String,
}

impl Flag {
    /// A flag that never takes a value, e.g. `-v` / `--verbose`.
    pub fn switch(short: &str, long: &str) -> Self {
        Self {
            short: short.to_string(),
            long: long.to_string(),
            needs_value: false,
            can_have_value: false,
            default_value: "true".to_string(),
            description: String::new(),
        }
    }

    /// A flag that must be given a value, e.g. `--add "text"`.
    pub fn valued(short: &str, long: &str) -> Self {
        Self {
            short: short.to_string(),
            long: long.to_string(),
            needs_value: true,
            can_have_value: true,
            default_value: String::new(),
            description: String::new(),
        }
    }

    /// A flag whose value may be omitted, falling back to `default`.
    pub fn optional_value(short: &str, long: &str, default: &str) -> Self {
        Self {
            short: short.to_string(),
            long: long.to_string(),
            needs_value: false,
            can_have_value: true,
            default_value: default.to_string(),
            description: String::new(),
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn short(&self) -> &str {
        &self.short
    }

    pub fn long(&self) -> &str {
        &self.long
    }

    pub fn needs_value(&self) -> bool {
        self.needs_value
    }

    pub fn can_have_value(&self) -> bool {
        self.can_have_value
    }

    pub fn default_value(&self) -> &str {
        &self.default_value
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

pub type RequiredFn = Arc<dyn Fn(&ParsedFlags) -> bool + Send + Sync>;

#[derive(Clone)]
enum Required {
    Always,
    Never,
    UnlessFlag(String),
    When(RequiredFn),
}

/// Schema of a positional argument, recognised by a pattern.
#[derive(Clone)]
pub struct Argument {
    name: String,
    description: String,
    pattern: Regex,
    required: Required,
}

impl Argument {
    pub fn new(name: &str, pattern: Regex) -> Self {
        Self {
            name: name.to_string(),
            description: String::new(),
            pattern,
            required: Required::Always,
        }
    }

    /// A single whitespace-delimited token.
    pub fn word(name: &str) -> Self {
        Self::new(name, WORD_PATTERN.clone())
    }

    /// Everything that is left of the input.
    pub fn rest(name: &str) -> Self {
        Self::new(name, REST_PATTERN.clone())
    }

    pub fn optional(mut self) -> Self {
        self.required = Required::Never;
        self
    }

    /// Required unless `flag` was supplied.
    pub fn optional_with(mut self, flag: &Flag) -> Self {
        self.required = Required::UnlessFlag(flag.long().to_string());
        self
    }

    pub fn required_when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&ParsedFlags) -> bool + Send + Sync + 'static,
    {
        self.required = Required::When(Arc::new(predicate));
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }

    pub fn is_required(&self, flags: &ParsedFlags) -> bool {
        match &self.required {
            Required::Always => true,
            Required::Never => false,
            Required::UnlessFlag(long) => !flags.contains_key(long),
            Required::When(predicate) => predicate(flags),
        }
    }
}

impl fmt::Debug for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Argument")
            .field("name", &self.name)
            .field("pattern", &self.pattern.as_str())
            .finish()
    }
}

pub type ConditionFn = Arc<dyn Fn(&Invoker, Option<&Group>) -> bool + Send + Sync>;

#[derive(Clone)]
enum Condition {
    AllOfRoles(Vec<u64>),
    OneOfRoles(Vec<u64>),
    NoneOfRoles(Vec<u64>),
    InGroups(Vec<u64>),
    Custom(ConditionFn),
}

impl Condition {
    fn matches(&self, invoker: &Invoker, group: Option<&Group>) -> bool {
        match self {
            Condition::AllOfRoles(roles) => roles.iter().all(|r| invoker.has_role(*r)),
            Condition::OneOfRoles(roles) => roles.iter().any(|r| invoker.has_role(*r)),
            Condition::NoneOfRoles(roles) => !roles.iter().any(|r| invoker.has_role(*r)),
            Condition::InGroups(ids) => group.map(|g| ids.contains(&g.id)).unwrap_or(false),
            Condition::Custom(predicate) => predicate(invoker, group),
        }
    }
}

/// Permission predicate over (invoker, group). Every condition must hold.
#[derive(Clone, Default)]
pub struct Requirements {
    conditions: Vec<Condition>,
}

impl Requirements {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn all_of_roles(mut self, roles: impl IntoIterator<Item = u64>) -> Self {
        self.conditions
            .push(Condition::AllOfRoles(roles.into_iter().collect()));
        self
    }

    pub fn one_of_roles(mut self, roles: impl IntoIterator<Item = u64>) -> Self {
        self.conditions
            .push(Condition::OneOfRoles(roles.into_iter().collect()));
        self
    }

    pub fn none_of_roles(mut self, roles: impl IntoIterator<Item = u64>) -> Self {
        self.conditions
            .push(Condition::NoneOfRoles(roles.into_iter().collect()));
        self
    }

    pub fn in_groups(mut self, groups: impl IntoIterator<Item = u64>) -> Self {
        self.conditions
            .push(Condition::InGroups(groups.into_iter().collect()));
        self
    }

    pub fn custom<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Invoker, Option<&Group>) -> bool + Send + Sync + 'static,
    {
        self.conditions.push(Condition::Custom(Arc::new(predicate)));
        self
    }

    pub fn matches(&self, invoker: &Invoker, group: Option<&Group>) -> bool {
        self.conditions.iter().all(|c| c.matches(invoker, group))
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}

impl fmt::Debug for Requirements {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Requirements")
            .field("conditions", &self.conditions.len())
            .finish()
    }
}

/// An invocable command: metadata plus the handler that runs it.
#[derive(Clone)]
pub struct CommandSpec {
    name: String,
    description: String,
    admin: bool,
    requirements: Requirements,
    flags: Vec<Flag>,
    arguments: Vec<Argument>,
    handler: Arc<dyn CommandHandler>,
}

impl CommandSpec {
    pub fn new(name: &str, handler: Arc<dyn CommandHandler>) -> Self {
        Self {
            name: name.to_string(),
            description: String::new(),
            admin: false,
            requirements: Requirements::none(),
            flags: Vec::new(),
            arguments: Vec::new(),
            handler,
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    /// Restricts the command to the configured operator ids.
    pub fn admin_only(mut self) -> Self {
        self.admin = true;
        self
    }

    pub fn with_requirements(mut self, requirements: Requirements) -> Self {
        self.requirements = requirements;
        self
    }

    pub fn with_flag(mut self, flag: Flag) -> Self {
        self.flags.push(flag);
        self
    }

    pub fn with_argument(mut self, argument: Argument) -> Self {
        self.arguments.push(argument);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn is_admin(&self) -> bool {
        self.admin
    }

    pub fn requirements(&self) -> &Requirements {
        &self.requirements
    }

    pub fn flags(&self) -> &[Flag] {
        &self.flags
    }

    pub fn arguments(&self) -> &[Argument] {
        &self.arguments
    }

    pub fn handler(&self) -> &Arc<dyn CommandHandler> {
        &self.handler
    }

    /// One-line usage, e.g. `quote [-a|--add <value>] [id]`.
    pub fn usage(&self) -> String {
        let mut usage = self.name.clone();
        for flag in &self.flags {
            let value = if flag.needs_value() {
                " <value>"
            } else if flag.can_have_value() {
                " [value]"
            } else {
                ""
            };
            usage.push_str(&format!(" [-{}|--{}{}]", flag.short(), flag.long(), value));
        }
        let none = ParsedFlags::default();
        for arg in &self.arguments {
            if arg.is_required(&none) {
                usage.push_str(&format!(" <{}>", arg.name()));
            } else {
                usage.push_str(&format!(" [{}]", arg.name()));
            }
        }
        usage
    }
}

impl fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandSpec")
            .field("name", &self.name)
            .field("admin", &self.admin)
            .field("flags", &self.flags)
            .field("arguments", &self.arguments)
            .finish()
    }
}

/// A non-invocable node that fans out into its children at registration.
#[derive(Debug, Clone)]
pub struct CommandGroup {
    name: String,
    children: Vec<Descriptor>,
}

impl CommandGroup {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            children: Vec::new(),
        }
    }

    pub fn with_child(mut self, child: impl Into<Descriptor>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn children(&self) -> &[Descriptor] {
        &self.children
    }
}

#[derive(Debug, Clone)]
pub enum Descriptor {
    Group(CommandGroup),
    Leaf(CommandSpec),
}

impl Descriptor {
    pub fn name(&self) -> &str {
        match self {
            Descriptor::Group(group) => group.name(),
            Descriptor::Leaf(spec) => spec.name(),
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Descriptor::Group(_))
    }

    /// Flattens the tree into its leaves, depth first, in declaration order.
    pub fn into_leaves(self) -> Vec<CommandSpec> {
        let mut leaves = Vec::new();
        let mut stack = vec![self];
        while let Some(descriptor) = stack.pop() {
            match descriptor {
                Descriptor::Leaf(spec) => leaves.push(spec),
                Descriptor::Group(group) => stack.extend(group.children.into_iter().rev()),
            }
        }
        leaves
    }
}

impl From<CommandSpec> for Descriptor {
    fn from(spec: CommandSpec) -> Self {
        Descriptor::Leaf(spec)
    }
}

impl From<CommandGroup> for Descriptor {
    fn from(group: CommandGroup) -> Self {
        Descriptor::Group(group)
    }
}
