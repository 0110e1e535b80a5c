//! Transient user notifications (toasts).

/// Fire-and-forget success/error messages shown to the user.
pub trait Notifier: Send + Sync {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
}

/// Notifier that writes toasts to the log.
///
/// Headless hosts install this so messages reach the terminal through the
/// tracing subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn success(&self, message: &str) {
        tracing::info!(target: "doorstep::toast", "{message}");
    }

    fn error(&self, message: &str) {
        tracing::warn!(target: "doorstep::toast", "{message}");
    }
}
