pub mod env_tools;
pub mod panic_extractor;
pub mod rfc6962;
pub mod wait_for_tasks;

pub use env_tools::{get_env, parse_env};
pub use panic_extractor::try_extract_panic_message;
pub use wait_for_tasks::wait_for_tasks;
