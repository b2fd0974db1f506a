//! Application state shared across HTTP handlers

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use kameo::actor::ActorRef;
use bootrelay_core::HostActor;

use crate::config::Config;
use crate::confirm::ConfirmStore;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Reference to the host actor
    pub host: ActorRef<HostActor>,
    /// Application configuration
    pub config: Arc<Config>,
    /// Outstanding two-step confirmations
    pub confirmations: ConfirmStore,
    /// Cooperative cancellation flag shared with the actor's poll loop
    pub cancel: Arc<AtomicBool>,
    /// Selectable OS names, default first
    pub boot_choices: Vec<String>,
}

impl AppState {
    /// Create new application state
    pub fn new(
        host: ActorRef<HostActor>,
        config: Config,
        cancel: Arc<AtomicBool>,
        boot_choices: Vec<String>,
    ) -> Self {
        Self {
            host,
            config: Arc::new(config),
            confirmations: ConfirmStore::default(),
            cancel,
            boot_choices,
        }
    }
}
