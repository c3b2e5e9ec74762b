//! Base trait for engine state.

/// Marker trait for state objects.
///
/// States should be:
/// - Cheap to clone (hosts render from snapshots)
/// - Self-contained (everything a host needs to draw the step)
/// - Comparable (PartialEq lets callers detect rejected transitions)
pub trait UiState: Clone + PartialEq + Default + Send + 'static {}
