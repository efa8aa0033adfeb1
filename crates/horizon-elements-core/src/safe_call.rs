//! Error boundary for callbacks.
//!
//! Event listeners, microtasks, timers and widget operations all run inside
//! [`safe_call`]. An `Err` or a panic is logged as a warning and turned into
//! `None`, so one faulty callback never unwinds through the event loop.

use std::panic::{AssertUnwindSafe, catch_unwind};

use crate::error::{Error, Result};
use crate::logging::targets;

/// Run `f`, logging and swallowing any error or panic.
///
/// `context` names the call site in the warning.
///
/// ```
/// use horizon_elements_core::{Error, safe_call};
///
/// assert_eq!(safe_call("ok", || Ok(2)), Some(2));
/// assert_eq!(safe_call::<(), _>("err", || Err(Error::Panicked("boom".into()))), None);
/// ```
pub fn safe_call<T, F>(context: &str, f: F) -> Option<T>
where
    F: FnOnce() -> Result<T>,
{
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => Some(value),
        Ok(Err(error)) => {
            tracing::warn!(target: targets::SAFE_CALL, context, %error, "operation failed");
            None
        }
        Err(payload) => {
            let error = Error::Panicked(panic_message(payload.as_ref()));
            tracing::warn!(target: targets::SAFE_CALL, context, %error, "callback panicked");
            None
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
