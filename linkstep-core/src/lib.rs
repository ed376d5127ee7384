//! Embeddable core library for linkstep.
//!
//! Provides a clap-free, I/O-abstracted entry point for building a batch of
//! executables, each linked at its own load address.
//!
//! # Port traits
//!
//! All I/O is abstracted behind port traits:
//! - [`TargetSource`](linkstep_domain::TargetSource): list the build targets
//! - [`LinkerConfig`](linkstep_edit::LinkerConfig) / [`BackupStore`](linkstep_edit::BackupStore): the shared linker script
//! - [`BuildInvoker`](ports::BuildInvoker): run one external build
//! - [`BatchObserver`](ports::BatchObserver): per-target progress
//! - [`WritePort`](ports::WritePort): write report artifacts
//!
//! The [`adapters`] module provides default process/filesystem-backed implementations.
//!
//! # Entry points
//!
//! - [`run_batch`](pipeline::run_batch): patch, build, restore for every target; fail fast
//! - [`run_plan`](pipeline::run_plan): show targets, addresses, and patch previews without writing
//! - [`run_restore`](pipeline::run_restore): recover the linker script after an interrupted run

pub mod adapters;
pub mod pipeline;
pub mod ports;
pub mod settings;

pub use linkstep_domain::{FsTargetSource, InMemoryTargetSource, TargetSource};
pub use linkstep_edit::{
    BackupStore, FsBackupStore, FsLinkerConfig, InMemoryBackupStore, InMemoryLinkerConfig,
    LinkerConfig, TokenPolicy,
};
