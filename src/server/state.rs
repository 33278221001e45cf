//! Shared state for HTTP handlers.

use crate::dispatch::Dispatcher;
use crate::store::Store;

pub struct ServerState {
    pub store: Store,
    pub dispatcher: Dispatcher,
}

impl ServerState {
    pub fn new(store: Store, dispatcher: Dispatcher) -> Self {
        Self { store, dispatcher }
    }
}
