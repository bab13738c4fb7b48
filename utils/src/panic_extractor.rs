use tokio::task::JoinError;

/// Best-effort extraction of a human-readable message from a panicking
/// task's `JoinError`, so cancellation/panic surfaces never leak a raw
/// `Any` payload into logs.
pub fn try_extract_panic_message(err: JoinError) -> String {
    if err.is_cancelled() {
        return "task was cancelled".to_string();
    }
    match err.try_into_panic() {
        Ok(panic) => {
            if let Some(s) = panic.downcast_ref::<&str>() {
                (*s).to_string()
            } else if let Some(s) = panic.downcast_ref::<String>() {
                s.clone()
            } else {
                "unknown panic payload".to_string()
            }
        }
        Err(_) => "task finished with an unknown error".to_string(),
    }
}
