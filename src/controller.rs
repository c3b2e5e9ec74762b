//! Host-facing flow controller.
//!
//! Owns one flow instance: its state, the resend countdown of the active step,
//! the clock subscription driving that countdown, and the executor running
//! submit actions. Handles are cheap to clone; the state lock is never held
//! across an await point.

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::code_entry::CodeEntryIntent;
use crate::error::EngineError;
use crate::executor::{Execution, TransitionExecutor};
use crate::flow::{
    FlowDefinition, FlowIntent, FlowPhase, FlowReducer, FlowSnapshot, FlowState,
};
use crate::mvi::Reducer;
use crate::resend::{Clock, TimerIntent, TimerReducer, TimerState};

/// Aborts the clock pump task when dropped, which drops its subscription.
struct PumpGuard(JoinHandle<()>);

impl Drop for PumpGuard {
    fn drop(&mut self) {
        self.0.abort();
    }
}

struct Inner {
    id: Uuid,
    this: Weak<Mutex<Inner>>,
    definition: Arc<FlowDefinition>,
    state: FlowState,
    timer: TimerState,
    /// Step the running countdown belongs to.
    timer_step: Option<usize>,
    /// Bumped on every countdown start and stop. Ticks and resend outcomes
    /// carry the generation they were issued under.
    timer_generation: u64,
    pump: Option<PumpGuard>,
    clock: Option<Arc<dyn Clock>>,
    executor: TransitionExecutor,
}

impl Inner {
    fn dispatch(&mut self, intent: FlowIntent) -> Result<(), EngineError> {
        let definition = Arc::clone(&self.definition);
        let reducer = FlowReducer::new(&definition);
        if let Err(e) = reducer.validate(&self.state, &intent) {
            tracing::debug!(flow = %self.id, error = %e, "Flow intent rejected");
            return Err(e);
        }

        let before = self.state.phase();
        self.state = reducer.reduce(std::mem::take(&mut self.state), intent);
        let after = self.state.phase();

        if before != after {
            match &after {
                FlowPhase::Success | FlowPhase::Failure(_) => tracing::info!(
                    flow = definition.name(),
                    id = %self.id,
                    phase = ?after,
                    "Flow finished"
                ),
                FlowPhase::Submitting(_) => tracing::debug!(
                    flow = definition.name(),
                    id = %self.id,
                    phase = ?after,
                    "Submitting step"
                ),
                _ => tracing::info!(
                    flow = definition.name(),
                    id = %self.id,
                    from = ?before,
                    to = ?after,
                    "Flow transition"
                ),
            }
        }

        self.sync_timer();
        Ok(())
    }

    /// Starts the countdown when entering a step with a resend policy and
    /// stops it when that step is left or the flow ends.
    fn sync_timer(&mut self) {
        let active = if self.state.is_live() {
            Some(self.state.current_step_index())
        } else {
            None
        };
        if self.timer_step == active {
            return;
        }

        if self.timer_step.take().is_some() {
            self.stop_timer();
        }

        let duration = active.and_then(|index| {
            self.definition
                .step(index)
                .and_then(|step| step.resend_policy())
                .map(|policy| policy.duration_ticks)
        });
        if let (Some(index), Some(duration)) = (active, duration) {
            self.timer_step = Some(index);
            self.start_timer(duration);
        }
    }

    fn start_timer(&mut self, duration_ticks: u32) {
        self.timer_generation += 1;
        self.timer = TimerReducer.reduce(self.timer, TimerIntent::Start { duration_ticks });
        // Replacing the guard aborts the previous subscription: no stacking.
        self.pump = self.spawn_pump();
    }

    fn stop_timer(&mut self) {
        self.timer_generation += 1;
        self.timer = TimerReducer.reduce(self.timer, TimerIntent::Stop);
        self.pump = None;
    }

    /// Returns whether the countdown is still running.
    fn apply_tick(&mut self) -> bool {
        self.timer = TimerReducer.reduce(self.timer, TimerIntent::Tick);
        if !self.timer.is_running() {
            tracing::debug!(id = %self.id, "Resend countdown expired");
        }
        self.timer.is_running()
    }

    fn spawn_pump(&self) -> Option<PumpGuard> {
        let clock = self.clock.clone()?;
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(id = %self.id, "No Tokio runtime, resend countdown must be ticked by the host");
            return None;
        };

        let weak = self.this.clone();
        let generation = self.timer_generation;
        let task = runtime.spawn(async move {
            let mut ticker = clock.subscribe();
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                let running = {
                    let mut inner = inner.lock();
                    // An aborted pump can still be waiting on the lock.
                    if inner.timer_generation != generation {
                        break;
                    }
                    inner.apply_tick()
                };
                if !running {
                    break;
                }
            }
        });
        Some(PumpGuard(task))
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.executor.abandon();
        tracing::debug!(id = %self.id, "Flow torn down");
    }
}

pub struct FlowControllerBuilder {
    definition: FlowDefinition,
    clock: Option<Arc<dyn Clock>>,
    submit_timeout: Option<Duration>,
}

impl FlowControllerBuilder {
    /// Clock driving resend countdowns. Without one, the host calls
    /// [`FlowController::tick`].
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn submit_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.submit_timeout = timeout;
        self
    }

    /// Mounts the flow at step 0, starting its countdown if it has one.
    pub fn build(self) -> FlowController {
        let id = Uuid::new_v4();
        let definition = Arc::new(self.definition);
        let state = FlowState::new(&definition);
        let clock = self.clock;
        let executor = TransitionExecutor::new(self.submit_timeout);

        tracing::info!(flow = definition.name(), id = %id, steps = definition.len(), "Flow mounted");

        let inner = Arc::new_cyclic(|this| {
            Mutex::new(Inner {
                id,
                this: this.clone(),
                definition,
                state,
                timer: TimerState::default(),
                timer_step: None,
                timer_generation: 0,
                pump: None,
                clock,
                executor,
            })
        });
        inner.lock().sync_timer();

        FlowController { inner }
    }
}

/// Handle to one running flow.
#[derive(Clone)]
pub struct FlowController {
    inner: Arc<Mutex<Inner>>,
}

impl FlowController {
    pub fn new(definition: FlowDefinition) -> Self {
        Self::builder(definition).build()
    }

    pub fn builder(definition: FlowDefinition) -> FlowControllerBuilder {
        FlowControllerBuilder {
            definition,
            clock: None,
            submit_timeout: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.inner.lock().id
    }

    pub fn definition(&self) -> Arc<FlowDefinition> {
        Arc::clone(&self.inner.lock().definition)
    }

    pub fn state(&self) -> FlowState {
        self.inner.lock().state.clone()
    }

    pub fn phase(&self) -> FlowPhase {
        self.inner.lock().state.phase()
    }

    pub fn timer(&self) -> TimerState {
        self.inner.lock().timer
    }

    pub fn snapshot(&self) -> FlowSnapshot {
        let inner = self.inner.lock();
        FlowSnapshot::capture(&inner.definition, &inner.state, &inner.timer)
    }

    /// Whether the continue action is enabled for the active step.
    pub fn can_continue(&self) -> bool {
        let inner = self.inner.lock();
        inner.state.is_live()
            && !inner.state.is_submitting()
            && inner
                .definition
                .step(inner.state.current_step_index())
                .map(|step| step.can_continue(&inner.state))
                .unwrap_or(false)
    }

    fn edit(&self, intent: CodeEntryIntent) -> Result<(), EngineError> {
        self.inner.lock().dispatch(FlowIntent::Code(intent))
    }

    pub fn set_cell(&self, index: usize, value: &str) -> Result<(), EngineError> {
        self.edit(CodeEntryIntent::SetCell {
            index,
            value: value.to_string(),
        })
    }

    pub fn backspace(&self) -> Result<(), EngineError> {
        self.edit(CodeEntryIntent::Backspace)
    }

    pub fn paste(&self, text: &str) -> Result<(), EngineError> {
        self.edit(CodeEntryIntent::Paste {
            text: text.to_string(),
        })
    }

    pub fn focus(&self, index: usize) -> Result<(), EngineError> {
        self.edit(CodeEntryIntent::Focus { index })
    }

    pub fn set_text(&self, value: &str) -> Result<(), EngineError> {
        self.inner.lock().dispatch(FlowIntent::SetText {
            value: value.to_string(),
        })
    }

    /// Returns to the previous step. Entered values are kept.
    pub fn back(&self) -> Result<(), EngineError> {
        self.inner.lock().dispatch(FlowIntent::Back)
    }

    /// Tears the flow down: stops the countdown and abandons in-flight calls.
    pub fn cancel(&self) -> Result<(), EngineError> {
        let mut inner = self.inner.lock();
        inner.dispatch(FlowIntent::Cancel)?;
        inner.executor.abandon();
        Ok(())
    }

    /// Dismisses a terminal state; the flow accepts nothing afterwards.
    pub fn acknowledge(&self) -> Result<(), EngineError> {
        let mut inner = self.inner.lock();
        inner.dispatch(FlowIntent::Acknowledge)?;
        inner.executor.abandon();
        Ok(())
    }

    /// Counts the resend countdown down by one tick.
    pub fn tick(&self) -> TimerState {
        let mut inner = self.inner.lock();
        inner.apply_tick();
        inner.timer
    }

    /// Continues from the active step.
    ///
    /// Steps without a submit action move on immediately. Otherwise the
    /// action runs to completion (or until the flow is cancelled) and its
    /// outcome decides the next phase. Returns the phase after the attempt.
    pub async fn advance(&self) -> Result<FlowPhase, EngineError> {
        let (action, snapshot, step, executor) = {
            let mut inner = self.inner.lock();
            inner.dispatch(FlowIntent::Advance)?;
            if !inner.state.is_submitting() {
                return Ok(inner.state.phase());
            }

            let step = inner.state.current_step_index();
            let Some(action) = inner
                .definition
                .step(step)
                .and_then(|spec| spec.submit_action())
                .cloned()
            else {
                return Ok(inner.state.phase());
            };
            (action, inner.state.clone(), step, inner.executor.clone())
        };

        let execution = executor.execute(action.as_ref(), &snapshot).await;

        let mut inner = self.inner.lock();
        if let Execution::Resolved(outcome) = execution {
            if let Err(e) = inner.dispatch(FlowIntent::SubmissionResolved { step, outcome }) {
                tracing::debug!(error = %e, "Submission outcome dropped");
            }
        }
        Ok(inner.state.phase())
    }

    /// Requests a new code for the active step.
    ///
    /// Allowed only once the countdown has expired. Clears the step's code
    /// entry and restarts the countdown before the resend action runs. A
    /// rejected resend stops the countdown so the user can try again.
    pub async fn resend(&self) -> Result<TimerState, EngineError> {
        let (action, snapshot, step, generation, executor) = {
            let mut inner = self.inner.lock();
            let definition = Arc::clone(&inner.definition);
            FlowReducer::new(&definition).validate(&inner.state, &FlowIntent::ResendIssued)?;

            let step = inner.state.current_step_index();
            let spec = definition.step(step).ok_or(EngineError::FlowClosed)?;
            let policy = spec
                .resend_policy()
                .ok_or_else(|| EngineError::ResendUnavailable {
                    step: spec.name().to_string(),
                })?;
            if !inner.timer.is_eligible() {
                return Err(EngineError::ResendNotEligible {
                    remaining_ticks: inner.timer.remaining_ticks(),
                });
            }

            inner.dispatch(FlowIntent::ResendIssued)?;
            inner.start_timer(policy.duration_ticks);
            (
                Arc::clone(&policy.action),
                inner.state.clone(),
                step,
                inner.timer_generation,
                inner.executor.clone(),
            )
        };

        let execution = executor.execute(action.as_ref(), &snapshot).await;

        let mut inner = self.inner.lock();
        if let Execution::Resolved(outcome) = execution {
            if inner.timer_generation != generation {
                // The step was left or its countdown restarted meanwhile.
                tracing::debug!(id = %inner.id, step, "Stale resend outcome dropped");
                return Ok(inner.timer);
            }
            let rejected = !outcome.is_ok();
            match inner.dispatch(FlowIntent::ResendResolved { step, outcome }) {
                Ok(()) if rejected && inner.timer_step == Some(step) => inner.stop_timer(),
                Ok(()) => {}
                Err(e) => tracing::debug!(error = %e, "Resend outcome dropped"),
            }
        }
        Ok(inner.timer)
    }
}
