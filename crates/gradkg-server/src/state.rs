//! Shared application state.

use std::sync::Arc;

use gradkg_chat::{ChatService, ChatSettings, LLMConfig};
use gradkg_core::GradKgConfig;
use gradkg_store::GraphStore;
use parking_lot::RwLock;

/// Shared application state accessible from all route handlers.
pub struct AppState {
    pub config: GradKgConfig,
    pub store: Arc<GraphStore>,
    pub chat: ChatService,
    pub llm_config: RwLock<LLMConfig>,
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(config: GradKgConfig, store: GraphStore) -> Self {
        let llm_config = LLMConfig::load(&config.data_paths.llm_config_file);
        Self::with_llm_config(config, store, llm_config)
    }

    pub fn with_llm_config(config: GradKgConfig, store: GraphStore, llm_config: LLMConfig) -> Self {
        let store = Arc::new(store);
        let chat = ChatService::new(store.clone(), ChatSettings::from_config(&config));
        Self {
            config,
            store,
            chat,
            llm_config: RwLock::new(llm_config),
            http: gradkg_chat::http_client(),
        }
    }
}
