//! Core services: fingerprinting, history, stage planning, and the
//! shell manager.

pub mod fingerprint;
pub mod history;
pub mod manager;
pub mod planner;

pub use fingerprint::fingerprint;
pub use history::HistoryStore;
pub use manager::{BuildHandle, ManagerOptions, ShellManager, ShellStatus, SlotState};
pub use planner::{BuildPlan, StagePlanner};
