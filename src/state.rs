//! Shared application state for all routes. Everything but the verbose flag is fixed after boot.

use crate::config::Registry;
use crate::routes::RouteTable;
use crate::service::Executor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub executor: Arc<dyn Executor>,
    pub registry: Arc<Registry>,
    pub routes: Arc<RouteTable>,
    pub verbose: VerboseFlag,
}

/// Process-wide verbose error logging switch. Last writer wins.
#[derive(Clone, Debug, Default)]
pub struct VerboseFlag(Arc<AtomicBool>);

impl VerboseFlag {
    pub fn new(on: bool) -> Self {
        VerboseFlag(Arc::new(AtomicBool::new(on)))
    }

    pub fn get(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    pub fn set(&self, on: bool) {
        self.0.store(on, Ordering::Relaxed);
    }
}
