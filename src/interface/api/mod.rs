//! API interface implementations

pub mod call_log_handler;
pub mod conference_handler;
pub mod contact_handler;
pub mod error;
pub mod metrics_handler;
pub mod router;
pub mod settings_handler;
pub mod softphone_handler;
pub mod state;
pub mod ws_handler;

pub use error::{ApiError, ApiResult};
pub use metrics_handler::{detached_metrics, init_metrics};
pub use router::build_router;
pub use state::AppState;
