//! Target enumeration and address planning.
//!
//! Both halves are pure: the only I/O is behind the [`TargetSource`] port, so the
//! ordering and address rules can be tested without touching the filesystem.

pub mod address_plan;
pub mod enumerate;
pub mod ports;

pub use address_plan::{AddressError, AddressPlan};
pub use enumerate::{canonical_name, duplicate_names, enumerate_targets, load_targets};
pub use ports::{FsTargetSource, InMemoryTargetSource, TargetSource};
