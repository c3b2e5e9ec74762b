//! Step sequencer: the flow-level state machine.
//!
//! Uses MVI (Model-View-Intent) pattern:
//! - `definition.rs` - Immutable flow description (steps, guards, submit actions)
//! - `state.rs` - Mutable flow state and phase projection
//! - `intent.rs` - Host actions and submission outcomes
//! - `reducer.rs` - State transitions and their validation
//! - `snapshot.rs` - Serializable projection for hosts

mod definition;
mod intent;
mod reducer;
mod snapshot;
mod state;

pub use definition::{FlowDefinition, FlowDefinitionBuilder, ResendPolicy, StepKind, StepSpec};
pub use intent::FlowIntent;
pub use reducer::FlowReducer;
pub use snapshot::{FlowSnapshot, ResendView, StepView};
pub use state::{FlowPhase, FlowState, StepValue, Terminal};
