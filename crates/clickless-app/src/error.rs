//! Session error taxonomy.
//!
//! Most conditions here are recovered, not propagated: permission waits
//! block until granted, a missing foreground target degrades to an empty
//! snapshot, and activation failure leaves the overlay hidden without a
//! retry. Only losing the interceptor ends the session loop.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    /// Accessibility trust not granted yet; a wait state, not fatal.
    #[error("accessibility trust has not been granted")]
    PermissionDenied,

    /// No eligible foreground process; the overlay shows zero elements.
    #[error("no foreground application to scan")]
    NoForegroundTarget,

    /// The activation capability reported failure, typically because the
    /// node vanished between scan and activation. Never retried.
    #[error("activation failed: the element no longer exists")]
    ActivationFailed,

    /// The key interceptor channel closed; captured keys are released
    /// back to the system and the session ends.
    #[error("key interceptor channel closed")]
    InterceptorClosed,
}
