use std::sync::Arc;
use tokio::sync::Mutex;

use crate::utils::bank::Bank;
use crate::utils::config::ConfigManager;
use crate::utils::sessions::SessionManager;

#[derive(Clone)]
pub struct BotData {
    pub config: Arc<Mutex<ConfigManager>>,
    pub bank: Bank,
    pub sessions: Arc<SessionManager>,
}
