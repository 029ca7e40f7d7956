//! Go/NoGo reaction training: the trial engine, session control and result
//! persistence. The terminal front end lives in the binary.
pub mod app_dirs;
pub mod config;
pub mod engine;
pub mod error;
pub mod game;
pub mod runtime;
pub mod session;
pub mod stats;
pub mod stimulus;
pub mod summary;
pub mod time_series;
pub mod util;

pub use engine::TrialEngine;
pub use error::{FocusError, Result};
pub use stimulus::{Reason, Response, Stimulus, StimulusKind};
