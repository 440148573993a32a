//! Client-side orchestration engine for the BinWatch dashboard.
//!
//! The authority owns simulation truth; this crate owns everything the
//! dashboard does with it between fetches:
//!
//! - [`view`] -- the single reconciled [`ViewState`] behind a shared
//!   lock, with snapshot, animation override, progress, and banner
//!   slices
//! - [`poller`] -- periodic background snapshot refresh
//! - [`driver`] -- one authority step, interpreted into a
//!   [`StepOutcome`]
//! - [`animator`] -- interpolated truck movement with supersession
//! - [`controller`] -- the run-to-completion state machine
//!
//! All pieces communicate only through the shared view, so the
//! renderer reads one lock and never observes torn state.
//!
//! [`ViewState`]: view::ViewState
//! [`StepOutcome`]: driver::StepOutcome

pub mod animator;
pub mod controller;
pub mod driver;
pub mod error;
pub mod poller;
pub mod view;

pub use animator::{ANIMATION_STEPS, AnimationResult, DEFAULT_ANIMATION_DURATION, animate_truck};
pub use controller::{Controller, DEFAULT_MAX_RUN_STEPS, RunPolicy, RunReport, RunState};
pub use driver::{StepOutcome, drive_step};
pub use error::EngineError;
pub use poller::{DEFAULT_POLL_INTERVAL, Poller};
pub use view::{
    BinVisibility, RenderedBin, RenderedTruck, SharedView, ViewState, shared_view,
};
