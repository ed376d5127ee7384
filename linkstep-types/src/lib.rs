//! Shared DTOs for the linkstep workspace.
//!
//! # Design constraints
//! - Report types are serialized to disk; prefer adding optional fields over changing semantics.
//! - [`LoadAddress`] always renders as lowercase `0x`-prefixed hex, the same form the linker
//!   configuration uses.

pub mod address;
pub mod report;
pub mod target;

pub use address::{AddressParseError, LoadAddress};
pub use report::{
    BatchReport, BatchSummary, BuildOutcome, BuildStatus, PlanInfo, ToolInfo, Verdict,
    VerdictStatus,
};
pub use target::BuildTarget;

/// Schema identifiers.
pub mod schema {
    pub const LINKSTEP_REPORT_V1: &str = "linkstep.report.v1";
}
