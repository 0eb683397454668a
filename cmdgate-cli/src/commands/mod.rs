//! Built-in console commands and the static catalog that registers them.

mod echo;
mod help;
mod quote;
mod roll;
mod shutdown;

use std::sync::{Arc, Weak};

use cmdgate_core::{CommandCatalog, CommandRegistry};
use tokio_util::sync::CancellationToken;

use quote::QuoteBook;

/// Host resources the catalog factories close over.
#[derive(Clone)]
pub struct CatalogContext {
    pub registry: Weak<CommandRegistry>,
    pub shutdown: CancellationToken,
    pub moderator_roles: Vec<u64>,
}

pub fn catalog(ctx: CatalogContext) -> CommandCatalog {
    let book = Arc::new(QuoteBook::default());
    let (help_registry, quote_book, forget_book) = (ctx.registry, book.clone(), book);
    let moderator_roles = ctx.moderator_roles;
    let stop = ctx.shutdown;

    CommandCatalog::new()
        .with("help", move || Ok(help::descriptor(help_registry.clone()).into()))
        .with("echo", || Ok(echo::descriptor().into()))
        .with("quote", move || Ok(quote::descriptor(quote_book.clone())?.into()))
        .with("forget", move || {
            Ok(quote::forget_descriptor(forget_book.clone(), &moderator_roles).into())
        })
        .with("roll", || Ok(roll::descriptor()?.into()))
        .with("shutdown", move || Ok(shutdown::descriptor(stop.clone()).into()))
}
