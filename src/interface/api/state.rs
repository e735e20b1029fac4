//! Shared handler state

use crate::application::SoftphoneService;
use crate::domain::call_log::CallLogRepository;
use crate::domain::conference::ConferenceRepository;
use crate::domain::contact::ContactRepository;
use crate::domain::settings::SettingsRepository;
use std::sync::Arc;

/// Application state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub softphone: Arc<SoftphoneService>,
    pub call_logs: Arc<dyn CallLogRepository>,
    pub contacts: Arc<dyn ContactRepository>,
    pub settings: Arc<dyn SettingsRepository>,
    pub conferences: Arc<dyn ConferenceRepository>,
}
