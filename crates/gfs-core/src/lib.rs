//! gfs-core library: grandfather-father-son backup retention.
//!
//! Given candidate timestamps and a [`RetentionPolicy`] (cycle -> number of
//! buckets), the [`RetentionEngine`] selects the timestamps to keep: the
//! latest timestamp of each of the newest buckets of every cycle.
//!
//! ```
//! use gfs_core::{Cycle, DateFormat, Gfs, RetentionPolicy};
//!
//! let policy = RetentionPolicy::new([(Cycle::Daily, 2), (Cycle::Monthly, 1)])?;
//! let gfs = Gfs::new(DateFormat::new("%Y-%m-%d")?, policy);
//! let kept = gfs.filter_strings(&["2024-03-01", "2024-03-02", "2024-03-03"])?;
//! assert_eq!(kept, ["2024-03-02", "2024-03-03"]);
//! # Ok::<(), gfs_core::GfsError>(())
//! ```
//!
//! # Conventions
//!
//! - **Errors**: `thiserror` enums with stable [`ErrorCode`]s; `anyhow` only
//!   for config file I/O.
//! - **Logging**: `tracing` macros only; subscribers are installed by the
//!   binary.

pub mod collection;
pub mod config;
pub mod cycle;
pub mod date;
pub mod engine;
pub mod error;
pub mod policy;
pub mod timing;

pub use collection::{BoundedSortedList, BoundedSortedSet};
pub use cycle::Cycle;
pub use date::{DEFAULT_DATE_FORMAT, DateFormat};
pub use engine::{CycleSelection, CycleSurvivors, Gfs, Partition, RetentionEngine};
pub use error::{ConfigError, ErrorCode, GfsError, ParseError};
pub use policy::{RetentionPolicy, RetentionPolicyBuilder};
