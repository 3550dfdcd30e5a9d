//! Board automation for Projector.
//!
//! This crate sequences calls between the domain rules in [`board`] and a
//! [`board::BoardClient`] implementation. It contains no transport code; the
//! client is injected at construction time.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`rules`] | Loading the ordered label rule set from YAML |
//! | [`engine`] | `RuleEngine`: per-event rule evaluation and card mutation |
//! | [`aggregator`] | `ReportAggregator`: concurrent per-board "Done" reports |
//! | [`report`] | Report types and the label-frequency fold |
//! | [`bootstrap`] | Org inventory logging and webhook registration |

pub mod aggregator;
pub mod bootstrap;
mod deadline;
pub mod engine;
pub mod report;
pub mod rules;

pub use aggregator::{ReportAggregator, DEFAULT_BOARD_DEADLINE, DONE_COLUMN};
pub use bootstrap::{ensure_org_hook, log_inventory, HookStatus, HOOK_EVENTS};
pub use engine::{
    DefaultPlacement, EvaluationReport, RuleEngine, RuleOutcome, RuleResult,
    DEFAULT_CALL_DEADLINE,
};
pub use report::{OmittedBoard, Report, ReportSet, ReportedCard};
pub use rules::{RuleSet, RuleSetError};
