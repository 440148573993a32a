//! The run-to-completion controller.
//!
//! Drives the authority's step-wise simulation until a terminal
//! condition or a safety bound, sequencing step → animate → refresh
//! strictly within each iteration. The run lifecycle is an explicit
//! state machine (no boolean flag soup): `Idle → Running → (Completed
//! | Aborted | Faulted) → Idle`, with one pure transition function.
//!
//! Policy decisions, fixed and documented:
//!
//! - At most one run (or single step) per controller instance; a
//!   second start is rejected without touching the run in progress.
//! - A step whose transport call exhausts its retries always faults
//!   the run. There is no best-effort continue, so two runs against
//!   the same flaky authority behave the same way.
//! - The step-count bound guarantees termination even against a
//!   misbehaving authority or a routing cycle.
//! - A cooperative cancellation flag is checked at the top of every
//!   iteration; cancellation lands in `Aborted`.
//!
//! The controller performs its own snapshot refresh after each step
//! rather than relying on the poller's cadence, so interleaved poll
//! ticks can never leave it reasoning about a stale view.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use binwatch_client::{Authority, fetch_snapshot};
use binwatch_types::TruckId;
use chrono::Utc;
use tracing::{info, warn};

use crate::animator::{ANIMATION_STEPS, DEFAULT_ANIMATION_DURATION, animate_truck};
use crate::driver::{StepOutcome, drive_step};
use crate::error::EngineError;
use crate::view::{RunProgress, SharedView};

/// Default safety bound on steps per run.
pub const DEFAULT_MAX_RUN_STEPS: u32 = 50;

/// How long run failure banners stay visible.
const RUN_BANNER_TTL: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

/// Lifecycle state of the run controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// No run in progress.
    Idle,
    /// A run-to-completion (or guarded single step) is in progress.
    Running,
    /// The authority reported no more work.
    Completed,
    /// The safety bound was hit or the run was cancelled.
    Aborted,
    /// A step's transport call exhausted its retries.
    Faulted,
}

/// Events driving the run state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunEvent {
    /// A start request was accepted.
    Start,
    /// The authority sent a terminal "no more work" message.
    TerminalReported,
    /// The uncollected-bin count reached zero after a refresh.
    NoWorkLeft,
    /// The per-run step bound was reached.
    BoundReached,
    /// A cooperative cancellation was observed.
    Cancelled,
    /// A step or refresh exhausted its transport retries.
    StepFaulted,
    /// The run finished and the controller returns to idle.
    Reset,
}

impl RunState {
    /// The single transition function of the run state machine.
    ///
    /// Illegal combinations leave the state unchanged, which makes
    /// states like "idle and running" unrepresentable by construction.
    pub const fn apply(self, event: RunEvent) -> Self {
        match (self, event) {
            (Self::Idle, RunEvent::Start) => Self::Running,
            (Self::Running, RunEvent::TerminalReported | RunEvent::NoWorkLeft) => Self::Completed,
            (Self::Running, RunEvent::BoundReached | RunEvent::Cancelled) => Self::Aborted,
            (Self::Running, RunEvent::StepFaulted) => Self::Faulted,
            (Self::Completed | Self::Aborted | Self::Faulted, RunEvent::Reset) => Self::Idle,
            (state, _) => state,
        }
    }
}

// ---------------------------------------------------------------------------
// Policy and report
// ---------------------------------------------------------------------------

/// Tunable policy for run-to-completion.
#[derive(Debug, Clone, Copy)]
pub struct RunPolicy {
    /// Safety bound on steps per run.
    pub max_steps: u32,
    /// Total duration of each movement animation.
    pub animation_duration: Duration,
    /// Interpolation steps per movement animation.
    pub animation_steps: u32,
}

impl Default for RunPolicy {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_RUN_STEPS,
            animation_duration: DEFAULT_ANIMATION_DURATION,
            animation_steps: ANIMATION_STEPS,
        }
    }
}

/// Outcome of one run-to-completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// The terminal state the run ended in.
    pub final_state: RunState,
    /// Final progress counters (the view's progress slice is cleared
    /// at run end; this copy survives for the caller).
    pub progress: RunProgress,
    /// The authority's last terminal/informational message, if any.
    pub last_message: Option<String>,
    /// The transport failure that faulted the run, if any.
    pub error: Option<String>,
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

/// Orchestrates run-to-completion and guarded single steps.
#[derive(Debug)]
pub struct Controller<A> {
    authority: Arc<A>,
    view: SharedView,
    policy: RunPolicy,
    state: Mutex<RunState>,
    cancel: AtomicBool,
}

impl<A: Authority> Controller<A> {
    /// Create a controller over an authority and a shared view.
    pub const fn new(authority: Arc<A>, view: SharedView, policy: RunPolicy) -> Self {
        Self {
            authority,
            view,
            policy,
            state: Mutex::new(RunState::Idle),
            cancel: AtomicBool::new(false),
        }
    }

    /// The controller's current lifecycle state.
    pub fn state(&self) -> RunState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Request cooperative cancellation of the run in progress.
    ///
    /// Checked at the top of every loop iteration; a cancelled run
    /// ends in [`RunState::Aborted`].
    pub fn request_cancel(&self) {
        self.cancel.store(true, Ordering::Release);
    }

    /// Acquire the Running state, rejecting if a run is in progress.
    fn try_begin(&self) -> Result<(), EngineError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if *state == RunState::Running {
            return Err(EngineError::AlreadyRunning);
        }
        *state = RunState::Idle.apply(RunEvent::Start);
        self.cancel.store(false, Ordering::Release);
        Ok(())
    }

    /// Return to Idle after a run, regardless of how it ended.
    fn reset_to_idle(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        *state = RunState::Idle;
    }

    /// Drive the simulation until a terminal condition or the safety
    /// bound.
    ///
    /// Rejected with [`EngineError::AlreadyRunning`] while another run
    /// or single step is in progress; the rejected call is a no-op for
    /// the in-progress run. On exit the view's overrides and progress
    /// slice are cleared and the controller returns to idle.
    pub async fn run_to_completion(&self) -> Result<RunReport, EngineError> {
        self.try_begin()?;

        let report = self.run_loop().await;

        let mut view = self.view.write().await;
        view.clear_overrides();
        view.clear_progress();
        drop(view);
        self.reset_to_idle();

        info!(
            final_state = ?report.final_state,
            steps_taken = report.progress.steps_taken,
            completed = report.progress.completed,
            "run finished"
        );
        Ok(report)
    }

    /// Perform one guarded step: step, animate, refresh.
    ///
    /// Shares the run mutual exclusion: rejected while a
    /// run-to-completion is in progress.
    pub async fn single_step(&self) -> Result<StepOutcome, EngineError> {
        self.try_begin()?;
        let result = self.step_once().await;
        self.reset_to_idle();
        result
    }

    async fn step_once(&self) -> Result<StepOutcome, EngineError> {
        let outcome = drive_step(self.authority.as_ref(), &self.view).await?;
        match &outcome {
            StepOutcome::Moved(movement) => {
                animate_truck(
                    &self.view,
                    movement,
                    self.policy.animation_duration,
                    self.policy.animation_steps,
                )
                .await;
                self.refresh_after_step(Some(movement.truck_id)).await?;
            }
            StepOutcome::MovedUnresolved { .. } => {
                self.refresh_after_step(None).await?;
            }
            StepOutcome::Terminal(_) => {}
        }
        Ok(outcome)
    }

    /// The bounded step loop. Never returns `Running`.
    async fn run_loop(&self) -> RunReport {
        let estimated = { self.view.read().await.uncollected_count() };
        let mut progress = RunProgress {
            steps_taken: 0,
            estimated_total: u32::try_from(estimated).ok(),
            started_at: Utc::now(),
            completed: false,
        };
        self.view.write().await.set_progress(progress.clone());

        info!(
            estimated_total = estimated,
            max_steps = self.policy.max_steps,
            "run starting"
        );

        let mut state = RunState::Running;
        let mut last_message: Option<String> = None;
        let mut error: Option<String> = None;

        for _ in 1..=self.policy.max_steps.max(1) {
            if self.cancel.load(Ordering::Acquire) {
                info!("run cancelled");
                state = state.apply(RunEvent::Cancelled);
                break;
            }

            let outcome = match drive_step(self.authority.as_ref(), &self.view).await {
                Ok(outcome) => outcome,
                Err(transport) => {
                    warn!(error = %transport, "step faulted the run");
                    self.post_banner(format!("Simulation failed: {transport}"))
                        .await;
                    error = Some(transport.to_string());
                    state = state.apply(RunEvent::StepFaulted);
                    break;
                }
            };

            let animated = match outcome {
                StepOutcome::Terminal(message) => {
                    progress.completed = true;
                    last_message = Some(message);
                    state = state.apply(RunEvent::TerminalReported);
                    break;
                }
                StepOutcome::Moved(movement) => {
                    animate_truck(
                        &self.view,
                        &movement,
                        self.policy.animation_duration,
                        self.policy.animation_steps,
                    )
                    .await;
                    Some(movement.truck_id)
                }
                StepOutcome::MovedUnresolved { .. } => None,
            };

            progress.steps_taken = progress.steps_taken.saturating_add(1);
            if let Err(transport) = self.refresh_after_step(animated).await {
                warn!(error = %transport, "post-step refresh faulted the run");
                error = Some(transport.to_string());
                state = state.apply(RunEvent::StepFaulted);
                break;
            }

            let mut view = self.view.write().await;
            view.set_progress(progress.clone());
            let remaining = view.uncollected_count();
            drop(view);

            if remaining == 0 {
                progress.completed = true;
                state = state.apply(RunEvent::NoWorkLeft);
                break;
            }
        }

        // Loop exhausted without a terminal condition: safety bound.
        if state == RunState::Running {
            warn!(max_steps = self.policy.max_steps, "run hit the step bound");
            state = state.apply(RunEvent::BoundReached);
        }

        RunReport {
            final_state: state,
            progress,
            last_message,
            error,
        }
    }

    /// Refresh the snapshot after a step, preserving unrelated
    /// overrides and retiring the stepped truck's own override.
    async fn refresh_after_step(&self, animated: Option<TruckId>) -> Result<(), EngineError> {
        let snapshot = fetch_snapshot(self.authority.as_ref()).await?;
        let mut view = self.view.write().await;
        view.replace_snapshot(snapshot);
        if let Some(truck_id) = animated {
            view.clear_override(truck_id);
        }
        Ok(())
    }

    async fn post_banner(&self, message: String) {
        self.view
            .write()
            .await
            .set_banner(message, Utc::now(), RUN_BANNER_TTL);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use std::sync::atomic::AtomicU32;

    use binwatch_client::{Snapshot, TransportError};
    use binwatch_types::{Bin, BinId, GeoPoint, StepResponse, Truck, TruckStatus};

    use super::*;
    use crate::view::shared_view;

    // -----------------------------------------------------------------------
    // Transition table
    // -----------------------------------------------------------------------

    #[test]
    fn transition_table() {
        use RunEvent as E;
        use RunState as S;

        assert_eq!(S::Idle.apply(E::Start), S::Running);
        assert_eq!(S::Running.apply(E::TerminalReported), S::Completed);
        assert_eq!(S::Running.apply(E::NoWorkLeft), S::Completed);
        assert_eq!(S::Running.apply(E::BoundReached), S::Aborted);
        assert_eq!(S::Running.apply(E::Cancelled), S::Aborted);
        assert_eq!(S::Running.apply(E::StepFaulted), S::Faulted);
        assert_eq!(S::Completed.apply(E::Reset), S::Idle);
        assert_eq!(S::Aborted.apply(E::Reset), S::Idle);
        assert_eq!(S::Faulted.apply(E::Reset), S::Idle);

        // Illegal transitions are inert.
        assert_eq!(S::Running.apply(E::Start), S::Running);
        assert_eq!(S::Idle.apply(E::TerminalReported), S::Idle);
        assert_eq!(S::Idle.apply(E::Reset), S::Idle);
    }

    // -----------------------------------------------------------------------
    // Stub authorities
    // -----------------------------------------------------------------------

    /// Authority that reports a terminal condition on every step.
    struct TerminalAuthority {
        step_calls: AtomicU32,
    }

    impl TerminalAuthority {
        fn new() -> Self {
            Self {
                step_calls: AtomicU32::new(0),
            }
        }
    }

    impl Authority for TerminalAuthority {
        async fn list_bins(&self) -> Result<Vec<Bin>, TransportError> {
            Ok(Vec::new())
        }

        async fn list_trucks(&self) -> Result<Vec<Truck>, TransportError> {
            Ok(Vec::new())
        }

        async fn step(&self) -> Result<StepResponse, TransportError> {
            self.step_calls.fetch_add(1, Ordering::SeqCst);
            Ok(StepResponse {
                message: "All bins collected".to_owned(),
                truck_id: None,
                collected_bin_id: None,
            })
        }

        async fn reset_bins(&self) -> Result<StepResponse, TransportError> {
            Ok(StepResponse {
                message: "reset".to_owned(),
                truck_id: None,
                collected_bin_id: None,
            })
        }
    }

    /// Authority whose steps always succeed and whose bin is never
    /// collected -- a routing cycle, from the client's perspective.
    struct EndlessAuthority {
        step_calls: AtomicU32,
    }

    impl EndlessAuthority {
        fn new() -> Self {
            Self {
                step_calls: AtomicU32::new(0),
            }
        }
    }

    impl Authority for EndlessAuthority {
        async fn list_bins(&self) -> Result<Vec<Bin>, TransportError> {
            Ok(vec![Bin::new(BinId(2), GeoPoint::new(1.0, 1.0), 90)])
        }

        async fn list_trucks(&self) -> Result<Vec<Truck>, TransportError> {
            Ok(vec![Truck::new(
                TruckId(1),
                GeoPoint::new(0.0, 0.0),
                TruckStatus::Collecting,
            )])
        }

        async fn step(&self) -> Result<StepResponse, TransportError> {
            self.step_calls.fetch_add(1, Ordering::SeqCst);
            Ok(StepResponse {
                message: "Simulation step completed".to_owned(),
                truck_id: Some(TruckId(1)),
                collected_bin_id: Some(BinId(2)),
            })
        }

        async fn reset_bins(&self) -> Result<StepResponse, TransportError> {
            Ok(StepResponse {
                message: "reset".to_owned(),
                truck_id: None,
                collected_bin_id: None,
            })
        }
    }

    /// Authority whose step reports ids the cached snapshot cannot
    /// resolve; its lists return the already-collected aftermath.
    struct StaleIdsAuthority {
        step_calls: AtomicU32,
    }

    impl StaleIdsAuthority {
        fn new() -> Self {
            Self {
                step_calls: AtomicU32::new(0),
            }
        }
    }

    impl Authority for StaleIdsAuthority {
        async fn list_bins(&self) -> Result<Vec<Bin>, TransportError> {
            let mut bin = Bin::new(BinId(98), GeoPoint::new(1.0, 1.0), 90);
            bin.is_collected = true;
            Ok(vec![bin])
        }

        async fn list_trucks(&self) -> Result<Vec<Truck>, TransportError> {
            Ok(vec![Truck::new(
                TruckId(99),
                GeoPoint::new(1.0, 1.0),
                TruckStatus::Waiting,
            )])
        }

        async fn step(&self) -> Result<StepResponse, TransportError> {
            self.step_calls.fetch_add(1, Ordering::SeqCst);
            Ok(StepResponse {
                message: "Simulation step completed".to_owned(),
                truck_id: Some(TruckId(99)),
                collected_bin_id: Some(BinId(98)),
            })
        }

        async fn reset_bins(&self) -> Result<StepResponse, TransportError> {
            Ok(StepResponse {
                message: "reset".to_owned(),
                truck_id: None,
                collected_bin_id: None,
            })
        }
    }

    /// Authority whose step calls always fail at the transport level.
    struct BrokenAuthority;

    impl Authority for BrokenAuthority {
        async fn list_bins(&self) -> Result<Vec<Bin>, TransportError> {
            Ok(Vec::new())
        }

        async fn list_trucks(&self) -> Result<Vec<Truck>, TransportError> {
            Ok(Vec::new())
        }

        async fn step(&self) -> Result<StepResponse, TransportError> {
            Err(TransportError::RetriesExhausted {
                operation: "/api/simulate/step".to_owned(),
                attempts: 3,
                last: "connection refused".to_owned(),
            })
        }

        async fn reset_bins(&self) -> Result<StepResponse, TransportError> {
            Ok(StepResponse {
                message: "reset".to_owned(),
                truck_id: None,
                collected_bin_id: None,
            })
        }
    }

    fn fast_policy(max_steps: u32) -> RunPolicy {
        RunPolicy {
            max_steps,
            animation_duration: Duration::from_millis(20),
            animation_steps: 4,
        }
    }

    // -----------------------------------------------------------------------
    // Runs
    // -----------------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn terminal_on_first_step_completes_the_run() {
        let authority = Arc::new(TerminalAuthority::new());
        let view = shared_view();
        let controller = Controller::new(Arc::clone(&authority), view.clone(), fast_policy(50));

        let report = controller.run_to_completion().await.unwrap();

        assert_eq!(report.final_state, RunState::Completed);
        assert!(report.progress.completed);
        assert_eq!(report.last_message.as_deref(), Some("All bins collected"));
        assert_eq!(authority.step_calls.load(Ordering::SeqCst), 1);

        // Run-end cleanup: idle again, progress slice cleared.
        assert_eq!(controller.state(), RunState::Idle);
        assert!(view.read().await.progress().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn endless_authority_aborts_at_the_step_bound() {
        let authority = Arc::new(EndlessAuthority::new());
        let view = shared_view();
        // Seed the view so step endpoints resolve and animation runs.
        view.write().await.replace_snapshot(Snapshot {
            bins: vec![Bin::new(BinId(2), GeoPoint::new(1.0, 1.0), 90)],
            trucks: vec![Truck::new(
                TruckId(1),
                GeoPoint::new(0.0, 0.0),
                TruckStatus::Idle,
            )],
            fetched_at: Utc::now(),
        });
        let controller = Controller::new(Arc::clone(&authority), view, fast_policy(50));

        let report = controller.run_to_completion().await.unwrap();

        assert_eq!(report.final_state, RunState::Aborted);
        assert!(!report.progress.completed);
        assert_eq!(report.progress.steps_taken, 50);
        assert_eq!(authority.step_calls.load(Ordering::SeqCst), 50);
    }

    #[tokio::test(start_paused = true)]
    async fn unresolvable_step_refreshes_without_animating() {
        let authority = Arc::new(StaleIdsAuthority::new());
        // Empty view: the reported truck and bin are unknown locally.
        let view = shared_view();
        let controller = Controller::new(Arc::clone(&authority), view.clone(), fast_policy(50));

        let outcome = controller.single_step().await.unwrap();

        assert_eq!(
            outcome,
            StepOutcome::MovedUnresolved {
                truck_id: TruckId(99),
                collected_bin: BinId(98),
            }
        );
        let guard = view.read().await;
        // No animation was started for the unknown truck; the refresh
        // still replaced the snapshot.
        assert!(guard.override_for(TruckId(99)).is_none());
        assert_eq!(guard.snapshot().bins.len(), 1);
        assert_eq!(guard.snapshot().trucks.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn run_continues_past_an_unresolvable_step() {
        let authority = Arc::new(StaleIdsAuthority::new());
        let view = shared_view();
        let controller = Controller::new(Arc::clone(&authority), view, fast_policy(50));

        let report = controller.run_to_completion().await.unwrap();

        // The post-step refresh showed every bin collected, so the run
        // completed after the one unresolved step rather than faulting
        // or hitting the bound.
        assert_eq!(report.final_state, RunState::Completed);
        assert!(report.progress.completed);
        assert_eq!(report.progress.steps_taken, 1);
        assert_eq!(authority.step_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn transport_failure_faults_the_run() {
        let authority = Arc::new(BrokenAuthority);
        let view = shared_view();
        let controller = Controller::new(authority, view.clone(), fast_policy(50));

        let report = controller.run_to_completion().await.unwrap();

        assert_eq!(report.final_state, RunState::Faulted);
        assert!(report.error.unwrap().contains("gave up after 3 attempts"));
        // The failure is surfaced as a transient banner, not a crash.
        assert!(view.read().await.active_banner(Utc::now()).is_some());
        assert_eq!(controller.state(), RunState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn second_run_is_rejected_while_first_is_running() {
        let authority = Arc::new(EndlessAuthority::new());
        let view = shared_view();
        view.write().await.replace_snapshot(Snapshot {
            bins: vec![Bin::new(BinId(2), GeoPoint::new(1.0, 1.0), 90)],
            trucks: vec![Truck::new(
                TruckId(1),
                GeoPoint::new(0.0, 0.0),
                TruckStatus::Idle,
            )],
            fetched_at: Utc::now(),
        });
        let controller = Arc::new(Controller::new(
            Arc::clone(&authority),
            view,
            fast_policy(10),
        ));

        let background = Arc::clone(&controller);
        let first = tokio::spawn(async move { background.run_to_completion().await });
        // Let the first run reach its animation delay.
        tokio::task::yield_now().await;
        assert_eq!(controller.state(), RunState::Running);

        // The second start is a no-op rejection.
        let second = controller.run_to_completion().await;
        assert!(matches!(second, Err(EngineError::AlreadyRunning)));
        let single = controller.single_step().await;
        assert!(matches!(single, Err(EngineError::AlreadyRunning)));

        // The first run is undisturbed and still runs to its bound.
        let report = first.await.unwrap().unwrap();
        assert_eq!(report.final_state, RunState::Aborted);
        assert_eq!(report.progress.steps_taken, 10);
        assert_eq!(authority.step_calls.load(Ordering::SeqCst), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_cancel_request_does_not_poison_the_next_run() {
        let authority = Arc::new(EndlessAuthority::new());
        let controller = Controller::new(Arc::clone(&authority), shared_view(), fast_policy(5));

        // An accepted start clears any cancel left over from before it.
        controller.request_cancel();
        let report = controller.run_to_completion().await.unwrap();

        assert_eq!(report.final_state, RunState::Aborted);
        assert_eq!(report.progress.steps_taken, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_aborts_before_the_next_step() {
        let authority = Arc::new(EndlessAuthority::new());
        let controller = Arc::new(Controller::new(authority, shared_view(), RunPolicy {
            max_steps: 1000,
            animation_duration: Duration::from_millis(20),
            animation_steps: 4,
        }));
        let background = Arc::clone(&controller);
        let handle = tokio::spawn(async move { background.run_to_completion().await });
        tokio::task::yield_now().await;

        controller.request_cancel();

        let report = handle.await.unwrap().unwrap();
        assert_eq!(report.final_state, RunState::Aborted);
        assert!(report.progress.steps_taken < 1000);
    }

    #[tokio::test(start_paused = true)]
    async fn single_step_returns_to_idle() {
        let authority = Arc::new(TerminalAuthority::new());
        let controller = Controller::new(authority, shared_view(), fast_policy(50));

        let outcome = controller.single_step().await.unwrap();
        assert!(matches!(outcome, StepOutcome::Terminal(_)));
        assert_eq!(controller.state(), RunState::Idle);
    }
}
