// Infrastructure module - Core background services and utilities
pub mod heartbeat;
pub mod http;
pub mod task_manager;
pub mod timer;

pub use heartbeat::HeartbeatManager;
pub use http::{PublishStatus, RestClient, http_to_ws_endpoint, parse_lookup_body};
pub use task_manager::TaskManager;
pub use timer::Timer;
