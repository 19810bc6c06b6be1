use std::collections::HashMap;
use std::sync::Arc;

use crate::commands::{self, Command};
use crate::config::Config;
use crate::invites::InviteLedger;
use crate::storage::Storage;

/// Shared state handed to every handler: configuration, the directory's
/// storage, the in-process invite ledger, and the command registry.
pub struct App {
    pub config: Config,
    pub storage: Arc<dyn Storage>,
    pub invites: InviteLedger,
    pub commands: HashMap<&'static str, Box<dyn Command>>
}

impl App {
    pub fn new(config: Config, storage: Arc<dyn Storage>) -> App {
        App {
            config,
            storage,
            invites: InviteLedger::new(),
            commands: commands::registry()
        }
    }
}
