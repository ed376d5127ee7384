//! Error types for linkstep-edit.
//!
//! This module defines error types that distinguish between:
//! - Policy blocks (exit code 2): required token missing, stale backup from an interrupted run
//! - Runtime errors (exit code 1): the linker config or its backup could not be read or written

use thiserror::Error;

/// The top-level error type for linkstep-edit operations.
#[derive(Debug, Error)]
pub enum EditError {
    /// A policy block occurred (exit code 2).
    /// The linker config was left untouched.
    #[error("policy block: {0}")]
    PolicyBlock(#[from] PolicyBlockError),

    /// A runtime error occurred (exit code 1).
    /// Covers every config access failure, including a failed restore.
    #[error("runtime error: {0:#}")]
    Runtime(#[from] anyhow::Error),
}

/// Policy block errors that should result in exit code 2.
#[derive(Debug, Error)]
pub enum PolicyBlockError {
    /// The linker config does not contain the base-address literal, so patching would be a no-op.
    #[error("token {token} not found in {location}")]
    TokenMissing {
        /// The literal that was searched for.
        token: String,
        /// Where the linker config lives.
        location: String,
    },

    /// A backup left behind by an interrupted run still exists.
    #[error(
        "stale backup at {location}: a previous run was interrupted; run `linkstep restore` first"
    )]
    StaleBackup {
        /// Where the backup lives.
        location: String,
    },
}

/// The linker config read back after a restore differs from the snapshot.
#[derive(Debug, Error)]
#[error("restored {location} does not match snapshot: expected sha256 {expected}, got {actual}")]
pub struct RestoreMismatch {
    pub location: String,
    pub expected: String,
    pub actual: String,
}

impl EditError {
    /// Returns true if this is a policy block error (exit code 2).
    pub fn is_policy_block(&self) -> bool {
        matches!(self, EditError::PolicyBlock(_))
    }

    /// Returns the recommended exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            EditError::PolicyBlock(_) => 2,
            EditError::Runtime(_) => 1,
        }
    }
}

/// Result type alias using EditError.
pub type EditResult<T> = Result<T, EditError>;

#[cfg(test)]
mod tests {
    use super::{EditError, PolicyBlockError};

    #[test]
    fn policy_block_reports_exit_code_2() {
        let err = EditError::from(PolicyBlockError::TokenMissing {
            token: "0x80400000".to_string(),
            location: "src/linker.ld".to_string(),
        });
        assert!(err.is_policy_block());
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("policy block"));
        assert!(err.to_string().contains("0x80400000"));
    }

    #[test]
    fn runtime_error_reports_exit_code_1() {
        let err = EditError::from(anyhow::anyhow!("boom"));
        assert!(!err.is_policy_block());
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().contains("runtime error"));
    }

    #[test]
    fn stale_backup_mentions_restore() {
        let err = PolicyBlockError::StaleBackup {
            location: "src/linker.ld.linkstep.bak".to_string(),
        };
        assert!(err.to_string().contains("linkstep restore"));
    }
}
