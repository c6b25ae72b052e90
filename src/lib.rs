//! sched-analyzer configuration layer.
//!
//! Turns the command line into the [`Config`] that drives BPF collection and
//! perfetto trace emission. Nothing here touches the system, parsing is a
//! single pass over the arguments that either yields a complete
//! configuration or the first [`ParseError`] it hit.
//!
//! # Example
//!
//! ```
//! let config = sched_analyzer::parse(["sched-analyzer", "--util_avg", "--pid", "1"])
//!     .expect("valid arguments");
//! assert!(config.util_avg_thermal);
//! assert_eq!(config.pid, 1);
//! ```

pub mod config;
pub mod error;
pub mod numeric;
pub mod options;

pub use config::{Config, TASK_COMM_LEN};
pub use error::ParseError;
pub use options::{command, parse, usage, OptionSpec, OPTIONS};
