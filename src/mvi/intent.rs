//! Base trait for intents dispatched into the engine.

/// Marker for the input of a reducer: a host action (cell edit, continue,
/// back, resend) or a system event (clock tick, submission outcome).
pub trait Intent: Send + 'static {}
