/*!
 * Quote book
 *
 * `quote` reads and edits a numbered list of quotes persisted under the
 * `quotes` schema. `forget` wipes it and is limited to moderator roles.
 */

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use cmdgate_core::{
    AppResult, Argument, CodecBuilder, CommandError, CommandHandler, CommandResult, CommandSpec,
    Flag, InvocationContext, Reply, Requirements, StorageContext,
};
use parking_lot::Mutex;
use rand::seq::IteratorRandom;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

const SCHEMA: &str = "quotes";
const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
struct QuoteDocument {
    next_id: u32,
    quotes: BTreeMap<u32, String>,
}

impl Default for QuoteDocument {
    fn default() -> Self {
        Self {
            next_id: 1,
            quotes: BTreeMap::new(),
        }
    }
}

/// Quote state shared by `quote` and `forget`.
#[derive(Default)]
pub struct QuoteBook {
    state: Mutex<QuoteDocument>,
}

impl QuoteBook {
    pub fn add(&self, text: &str) -> u32 {
        let mut state = self.state.lock();
        let id = state.next_id;
        state.quotes.insert(id, text.to_string());
        state.next_id += 1;
        id
    }

    pub fn remove(&self, id: u32) -> Option<String> {
        self.state.lock().quotes.remove(&id)
    }

    pub fn get(&self, id: u32) -> Option<String> {
        self.state.lock().quotes.get(&id).cloned()
    }

    pub fn random(&self) -> Option<(u32, String)> {
        let state = self.state.lock();
        state
            .quotes
            .iter()
            .choose(&mut rand::thread_rng())
            .map(|(id, text)| (*id, text.clone()))
    }

    /// Removes every quote and returns how many there were. Ids keep counting.
    pub fn clear(&self) -> usize {
        let mut state = self.state.lock();
        let count = state.quotes.len();
        state.quotes.clear();
        count
    }

    pub fn len(&self) -> usize {
        self.state.lock().quotes.len()
    }
}

fn quote_color(text: &str) -> u32 {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    (hasher.finish() & 0xff_ffff) as u32
}

fn parse_id(raw: &str) -> CommandResult<u32> {
    raw.trim()
        .parse()
        .map_err(|_| CommandError::protocol(format!("\"{}\" is not a quote id.", raw)))
}

struct Quote {
    book: Arc<QuoteBook>,
    add: Flag,
    remove: Flag,
    id: Argument,
}

impl Quote {
    fn show(&self, ctx: &InvocationContext, id: u32, text: String) -> CommandResult<()> {
        let color = quote_color(&text);
        ctx.reply(Reply::Embed {
            title: Some(format!("Quote #{}", id)),
            description: text,
            color,
        })?;
        Ok(())
    }
}

impl CommandHandler for Quote {
    fn process(&self, ctx: &InvocationContext) -> CommandResult<()> {
        if ctx.has_flag(&self.add) && ctx.has_flag(&self.remove) {
            return Err(CommandError::protocol(
                "Use either --add or --remove, not both.",
            ));
        }

        if let Some(text) = ctx.flag(&self.add) {
            let id = self.book.add(text);
            debug!("user {} added quote {}", ctx.author().user_id, id);
            ctx.reply(format!("Added quote #{}.", id))?;
            return Ok(());
        }

        if let Some(raw) = ctx.flag(&self.remove) {
            let id = parse_id(raw)?;
            self.book
                .remove(id)
                .ok_or_else(|| CommandError::protocol(format!("No quote with id {}.", id)))?;
            ctx.reply(format!("Removed quote #{}.", id))?;
            return Ok(());
        }

        match ctx.arg(&self.id) {
            Some(raw) => {
                let id = parse_id(raw)?;
                let text = self
                    .book
                    .get(id)
                    .ok_or_else(|| CommandError::protocol(format!("No quote with id {}.", id)))?;
                self.show(ctx, id, text)
            }
            None => {
                let (id, text) = self
                    .book
                    .random()
                    .ok_or_else(|| CommandError::protocol("The quote book is empty."))?;
                self.show(ctx, id, text)
            }
        }
    }

    fn contribute_codec(&self, builder: &mut CodecBuilder) {
        builder.register_schema(SCHEMA, SCHEMA_VERSION);
    }

    fn init(&self, storage: &StorageContext) -> AppResult<()> {
        if let Some(document) = storage.load::<QuoteDocument>(SCHEMA)? {
            *self.book.state.lock() = document;
            info!("loaded {} quotes", self.book.len());
        }
        Ok(())
    }

    fn save(&self, storage: &StorageContext) -> AppResult<()> {
        let document = self.book.state.lock().clone();
        storage.save(SCHEMA, &document)?;
        Ok(())
    }
}

pub fn descriptor(book: Arc<QuoteBook>) -> AppResult<CommandSpec> {
    let add = Flag::valued("a", "add").with_description("Add a quote");
    let remove = Flag::valued("r", "remove").with_description("Remove the quote with this id");
    let id = Argument::new("id", Regex::new(r"\d+")?)
        .optional()
        .with_description("Quote to show; random when omitted");

    Ok(CommandSpec::new(
        "quote",
        Arc::new(Quote {
            book,
            add: add.clone(),
            remove: remove.clone(),
            id: id.clone(),
        }),
    )
    .with_description("Shows, adds or removes quotes")
    .with_flag(add)
    .with_flag(remove)
    .with_argument(id))
}

struct Forget {
    book: Arc<QuoteBook>,
}

impl CommandHandler for Forget {
    fn process(&self, ctx: &InvocationContext) -> CommandResult<()> {
        let count = self.book.clear();
        info!("user {} cleared {} quotes", ctx.author().user_id, count);
        ctx.reply(format!(
            "Forgot {} quote{}.",
            count,
            if count == 1 { "" } else { "s" }
        ))?;
        Ok(())
    }
}

pub fn forget_descriptor(book: Arc<QuoteBook>, moderator_roles: &[u64]) -> CommandSpec {
    CommandSpec::new("forget", Arc::new(Forget { book }))
        .with_description("Clears the quote book")
        .with_requirements(Requirements::none().one_of_roles(moderator_roles.iter().copied()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::TestHost;
    use cmdgate_core::lifecycle::save_pass;
    use cmdgate_core::{CommandCatalog, DispatchOutcome, Invoker};
    use tempfile::TempDir;

    fn catalog(book: Arc<QuoteBook>) -> CommandCatalog {
        let forget_book = book.clone();
        CommandCatalog::new()
            .with("quote", move || Ok(descriptor(book.clone())?.into()))
            .with("forget", move || {
                Ok(forget_descriptor(forget_book.clone(), &[9]).into())
            })
    }

    #[test]
    fn add_show_and_remove() {
        let book = Arc::new(QuoteBook::default());
        let host = TestHost::new(&catalog(book.clone()));

        host.send(r#"!quote --add="to be or not to be""#);
        host.send("!quote -a solo");
        assert_eq!(host.take_replies(), vec!["Added quote #1.", "Added quote #2."]);

        host.send("!quote 1");
        assert_eq!(
            host.last_reply(),
            Some(Reply::Embed {
                title: Some("Quote #1".to_string()),
                description: "to be or not to be".to_string(),
                color: quote_color("to be or not to be"),
            })
        );
        host.take_replies();

        host.send("!quote --remove 1");
        host.send("!quote 1");
        assert_eq!(
            host.take_replies(),
            vec![
                "Removed quote #1.",
                "Could not process command: No quote with id 1.",
            ]
        );
        assert_eq!(book.len(), 1);
    }

    #[test]
    fn random_quote_and_empty_book() {
        let book = Arc::new(QuoteBook::default());
        let host = TestHost::new(&catalog(book.clone()));

        assert_eq!(host.send("!quote"), DispatchOutcome::ProtocolError);
        book.add("only one");
        host.send("!quote");
        assert_eq!(
            host.take_replies(),
            vec![
                "Could not process command: The quote book is empty.",
                "Quote #1\nonly one",
            ]
        );
    }

    #[test]
    fn add_and_remove_together_is_refused() {
        let host = TestHost::new(&catalog(Arc::new(QuoteBook::default())));
        host.send("!quote -a x -r 1");
        assert_eq!(
            host.take_replies(),
            vec!["Could not process command: Use either --add or --remove, not both."]
        );
    }

    #[test]
    fn forget_requires_moderator_role() {
        let book = Arc::new(QuoteBook::default());
        book.add("keep me");
        let host = TestHost::new(&catalog(book.clone()));

        assert_eq!(host.send("!forget"), DispatchOutcome::Denied);
        assert_eq!(book.len(), 1);

        assert_eq!(
            host.send_as(Invoker::new(2).with_roles([9]), "!forget"),
            DispatchOutcome::Completed
        );
        assert_eq!(book.len(), 0);
        assert_eq!(
            host.take_replies(),
            vec![
                "You do not have permission to use this command!",
                "Forgot 1 quote.",
            ]
        );
    }

    #[test]
    fn quotes_persist_across_restart() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().to_path_buf();

        let book = Arc::new(QuoteBook::default());
        let host = TestHost::in_dir(&catalog(book.clone()), dir);
        host.send(r#"!quote --add "persisted""#);
        let report = save_pass(&host.registry).unwrap();
        assert!(report.is_clean());
        assert!(root.join("quotes.json").is_file());

        let restored = Arc::new(QuoteBook::default());
        let registry = cmdgate_core::CommandRegistry::new();
        registry.discover(&catalog(restored.clone())).unwrap();
        registry.complete(&root).unwrap();

        assert_eq!(restored.get(1).as_deref(), Some("persisted"));
        assert_eq!(restored.add("next"), 2);
    }
}
