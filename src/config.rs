//! The configuration handed to the collection and trace emission stages.
//!
//! A [`Config`] starts out as [`Config::default`] and is mutated once per
//! command line option by [`crate::options::parse`]. Once parsing finishes it
//! is treated as read-only by everything downstream.

use std::ffi::CStr;
use std::path::PathBuf;

use anyhow::Result;
use serde::{Serialize, Serializer};

/// Size of the kernel's task name buffer, including the terminating NUL.
pub const TASK_COMM_LEN: usize = 16;

/// Trace file name used when `--output` is not given.
pub const DEFAULT_OUTPUT: &str = "sched-analyzer.perfetto-trace";

/// 250MiB
pub const DEFAULT_MAX_SIZE_BYTES: u64 = 250 * 1024 * 1024;

/// Runtime options for a sched-analyzer session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Config {
    /// Verbosity level (0 = warn, 1 = info, 2 = debug, 3+ = trace)
    pub verbosity: u8,

    /// Collect system wide data through traced and traced_probes
    pub system: bool,
    /// Collect only the data generated by this process, standalone
    pub app: bool,

    /// File name of the perfetto trace to produce
    pub output: String,
    /// Directory to store the trace in, the working directory when unset
    pub output_path: Option<String>,
    /// Maximum trace size in bytes
    pub max_size: u64,

    pub load_avg_cpu: bool,
    pub runnable_avg_cpu: bool,
    pub util_avg_cpu: bool,
    pub load_avg_task: bool,
    pub runnable_avg_task: bool,
    pub util_avg_task: bool,
    pub util_avg_rt: bool,
    pub util_avg_dl: bool,
    pub util_avg_irq: bool,
    pub util_avg_thermal: bool,
    pub util_est_cpu: bool,
    pub util_est_task: bool,
    pub cpu_nr_running: bool,
    pub cpu_freq: bool,
    pub cpu_idle: bool,
    pub softirq: bool,
    pub sched_switch: bool,
    pub load_balance: bool,

    /// Only collect data for this pid, 0 disables the filter
    pub pid: i32,
    /// Only collect data for tasks whose name contains this, always NUL
    /// terminated, empty disables the filter
    #[serde(serialize_with = "serialize_comm")]
    pub comm: [u8; TASK_COMM_LEN],
}

impl Default for Config {
    fn default() -> Self {
        Config {
            verbosity: 0,
            system: true,
            app: false,
            output: DEFAULT_OUTPUT.to_string(),
            output_path: None,
            max_size: DEFAULT_MAX_SIZE_BYTES,
            load_avg_cpu: false,
            runnable_avg_cpu: false,
            util_avg_cpu: false,
            load_avg_task: false,
            runnable_avg_task: false,
            util_avg_task: false,
            util_avg_rt: false,
            util_avg_dl: false,
            util_avg_irq: false,
            util_avg_thermal: false,
            util_est_cpu: false,
            util_est_task: false,
            cpu_nr_running: false,
            cpu_freq: false,
            cpu_idle: false,
            softirq: false,
            sched_switch: false,
            load_balance: false,
            pid: 0,
            comm: [0; TASK_COMM_LEN],
        }
    }
}

fn serialize_comm<S: Serializer>(
    comm: &[u8; TASK_COMM_LEN],
    s: S,
) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_str(&comm_to_string(comm))
}

fn comm_to_string(comm: &[u8; TASK_COMM_LEN]) -> String {
    match CStr::from_bytes_until_nul(comm) {
        Ok(c) => c.to_string_lossy().into_owned(),
        Err(_) => String::from_utf8_lossy(comm).into_owned(),
    }
}

impl Config {
    /// Switch to system wide collection.
    pub fn set_system(&mut self) {
        self.system = true;
        self.app = false;
    }

    /// Switch to app only collection.
    pub fn set_app(&mut self) {
        self.system = false;
        self.app = true;
    }

    /// Copy `comm` into the fixed size name buffer.
    ///
    /// Anything past `TASK_COMM_LEN - 1` bytes is dropped and the buffer is
    /// always NUL terminated. Returns true if the name had to be truncated.
    pub fn set_comm(&mut self, comm: &str) -> bool {
        let bytes = comm.as_bytes();
        let len = bytes.len().min(TASK_COMM_LEN - 1);

        self.comm = [0; TASK_COMM_LEN];
        self.comm[..len].copy_from_slice(&bytes[..len]);
        len < bytes.len()
    }

    /// The comm filter as a string, lossily decoded if truncation split a
    /// multi-byte character.
    pub fn comm_str(&self) -> String {
        comm_to_string(&self.comm)
    }

    pub fn has_comm_filter(&self) -> bool {
        self.comm[0] != 0
    }

    pub fn has_pid_filter(&self) -> bool {
        self.pid != 0
    }

    /// Full path of the trace file to produce.
    pub fn trace_path(&self) -> PathBuf {
        let mut path = match &self.output_path {
            Some(dir) => PathBuf::from(dir),
            None => PathBuf::new(),
        };
        path.push(&self.output);
        path
    }

    /// Names of every enabled event toggle, in catalog order.
    pub fn enabled_events(&self) -> Vec<&'static str> {
        let events = [
            ("load_avg_cpu", self.load_avg_cpu),
            ("runnable_avg_cpu", self.runnable_avg_cpu),
            ("util_avg_cpu", self.util_avg_cpu),
            ("load_avg_task", self.load_avg_task),
            ("runnable_avg_task", self.runnable_avg_task),
            ("util_avg_task", self.util_avg_task),
            ("util_avg_rt", self.util_avg_rt),
            ("util_avg_dl", self.util_avg_dl),
            ("util_avg_irq", self.util_avg_irq),
            ("util_avg_thermal", self.util_avg_thermal),
            ("util_est_cpu", self.util_est_cpu),
            ("util_est_task", self.util_est_task),
            ("cpu_nr_running", self.cpu_nr_running),
            ("cpu_freq", self.cpu_freq),
            ("cpu_idle", self.cpu_idle),
            ("softirq", self.softirq),
            ("sched_switch", self.sched_switch),
            ("load_balance", self.load_balance),
        ];
        events
            .into_iter()
            .filter(|(_, enabled)| *enabled)
            .map(|(name, _)| name)
            .collect()
    }

    /// Render the configuration as pretty printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
