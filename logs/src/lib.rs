pub mod telemetry;

pub use telemetry::{get_subscriber, init_subscriber, set_panic_hook};
pub use tracing::{debug, error, info, trace, warn};
