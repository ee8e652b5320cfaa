use std::sync::Arc;

use crate::config::Config;
use crate::dispatcher::Dispatcher;

#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let dispatcher = Dispatcher::with_default_adapters(config.locations.clone());
        AppState {
            dispatcher: Arc::new(dispatcher),
            config: Arc::new(config),
        }
    }
}
