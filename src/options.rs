//! Command line option catalog and parser.
//!
//! Every option lives in [`OPTIONS`] as a single entry carrying its name,
//! argument, help text and the mutation it applies to a [`Config`]. The clap
//! [`Command`] is generated from that table, so adding an option is one new
//! entry. Options are applied in the order they appear on the command line
//! and the first failure aborts the whole parse.

use std::ffi::OsString;

use clap::error::{ContextKind, ContextValue, ErrorKind};
use clap::parser::ValueSource;
use clap::{Arg, ArgAction, ArgMatches, Command};
use tracing::{debug, warn};

use crate::config::{Config, TASK_COMM_LEN};
use crate::error::ParseError;
use crate::numeric::{parse_int, NumericError};

const ABOUT: &str = "Extract scheduler data using BPF and emit them into perfetto as track events";

type Apply = fn(&mut Config, &str) -> Result<(), ParseError>;

/// One entry of the option catalog.
pub struct OptionSpec {
    /// Long option name, used as `--<name>`.
    pub name: &'static str,
    /// Placeholder shown in `--help`, `None` for plain flags.
    pub value_name: Option<&'static str>,
    pub help: &'static str,
    /// Option that is cleared when this one is given later on the command line.
    pub overrides: Option<&'static str>,
    apply: Apply,
}

impl OptionSpec {
    pub fn takes_value(&self) -> bool {
        self.value_name.is_some()
    }

    /// Apply this option to `config`. `value` is ignored by plain flags.
    pub fn apply(&self, config: &mut Config, value: &str) -> Result<(), ParseError> {
        (self.apply)(config, value)
    }

    fn arg(&self) -> Arg {
        let arg = Arg::new(self.name).long(self.name).help(self.help);
        let arg = match self.value_name {
            Some(value_name) => arg
                .value_name(value_name)
                .action(ArgAction::Append)
                .allow_hyphen_values(true),
            None => arg.action(ArgAction::SetTrue),
        };
        match self.overrides {
            Some(other) => arg.overrides_with(other),
            None => arg,
        }
    }
}

/// Sets every listed event field.
macro_rules! enable {
    ($($field:ident),+ $(,)?) => {
        |config: &mut Config, _: &str| {
            $(config.$field = true;)+
            Ok(())
        }
    };
}

macro_rules! flag {
    ($name:literal, $help:literal, $apply:expr) => {
        OptionSpec {
            name: $name,
            value_name: None,
            help: $help,
            overrides: None,
            apply: $apply,
        }
    };
}

macro_rules! value {
    ($name:literal, $value_name:literal, $help:literal, $apply:expr) => {
        OptionSpec {
            name: $name,
            value_name: Some($value_name),
            help: $help,
            overrides: None,
            apply: $apply,
        }
    };
}

pub static OPTIONS: &[OptionSpec] = &[
    // perfetto modes
    OptionSpec {
        name: "system",
        value_name: None,
        help: "Collect system wide data, requires traced and traced_probes to be running (default).",
        overrides: Some("app"),
        apply: |config: &mut Config, _: &str| {
            config.set_system();
            Ok(())
        },
    },
    OptionSpec {
        name: "app",
        value_name: None,
        help: "Collect only data generated by this app. Runs standalone without external dependencies on traced.",
        overrides: Some("system"),
        apply: |config: &mut Config, _: &str| {
            config.set_app();
            Ok(())
        },
    },
    // controls
    value!(
        "output",
        "FILE",
        "Filename of the perfetto-trace file to produce.",
        set_output
    ),
    value!(
        "output_path",
        "PATH",
        "Path to store perfetto-trace. PWD by default for perfetto.",
        |config: &mut Config, value: &str| {
            config.output_path = Some(value.to_string());
            Ok(())
        }
    ),
    value!(
        "max_size",
        "SIZE(KiB)",
        "Maximum size of perfetto file to produce, 250MiB by default.",
        set_max_size
    ),
    // events
    flag!(
        "load_avg",
        "Collect load_avg for CPU and tasks.",
        enable!(load_avg_cpu, load_avg_task)
    ),
    // Enables load_avg_cpu, not runnable_avg_cpu.
    flag!(
        "runnable_avg",
        "Collect runnable_avg for CPU and tasks.",
        enable!(load_avg_cpu, runnable_avg_task)
    ),
    flag!(
        "util_avg",
        "Collect util_avg for CPU, tasks, irq, dl and rt.",
        enable!(
            util_avg_cpu,
            util_avg_task,
            util_avg_rt,
            util_avg_dl,
            util_avg_irq,
            util_avg_thermal,
        )
    ),
    flag!(
        "load_avg_cpu",
        "Collect load_avg for CPU.",
        enable!(load_avg_cpu)
    ),
    flag!(
        "runnable_avg_cpu",
        "Collect runnable_avg for CPU.",
        enable!(runnable_avg_cpu)
    ),
    flag!(
        "util_avg_cpu",
        "Collect util_avg for CPU.",
        enable!(util_avg_cpu)
    ),
    flag!(
        "load_avg_task",
        "Collect load_avg for tasks.",
        enable!(load_avg_task)
    ),
    flag!(
        "runnable_avg_task",
        "Collect runnable_avg for tasks.",
        enable!(runnable_avg_task)
    ),
    flag!(
        "util_avg_task",
        "Collect util_avg for tasks.",
        enable!(util_avg_task)
    ),
    flag!("util_avg_rt", "Collect util_avg for rt.", enable!(util_avg_rt)),
    flag!("util_avg_dl", "Collect util_avg for dl.", enable!(util_avg_dl)),
    flag!(
        "util_avg_irq",
        "Collect util_avg for irq.",
        enable!(util_avg_irq)
    ),
    flag!(
        "util_avg_thermal",
        "Collect util_avg for thermal pressure.",
        enable!(util_avg_thermal)
    ),
    flag!(
        "util_est",
        "Collect util_est for CPU and tasks.",
        enable!(util_est_cpu, util_est_task)
    ),
    flag!(
        "util_est_cpu",
        "Collect util_est for CPU.",
        enable!(util_est_cpu)
    ),
    flag!(
        "util_est_task",
        "Collect util_est for tasks.",
        enable!(util_est_task)
    ),
    flag!(
        "cpu_nr_running",
        "Collect nr_running tasks for each CPU.",
        enable!(cpu_nr_running)
    ),
    flag!(
        "load_balance",
        "Collect load balance related info.",
        enable!(load_balance)
    ),
    // filters
    value!(
        "pid",
        "PID",
        "Collect data for task match pid only.",
        set_pid
    ),
    value!(
        "comm",
        "COMM",
        "Collect data for tasks that contain comm only.",
        set_comm
    ),
];

fn set_output(config: &mut Config, value: &str) -> Result<(), ParseError> {
    if value.is_empty() {
        return Err(ParseError::EmptyValue { option: "output" });
    }
    config.output = value.to_string();
    Ok(())
}

fn parse_number(option: &'static str, value: &str) -> Result<i64, ParseError> {
    parse_int(value).map_err(|e| match e {
        NumericError::NoDigits => ParseError::UnparseableNumber {
            option,
            value: value.to_string(),
        },
        NumericError::Overflow => ParseError::NumberOutOfRange {
            option,
            value: value.to_string(),
        },
    })
}

fn set_max_size(config: &mut Config, value: &str) -> Result<(), ParseError> {
    let kib = parse_number("max_size", value)?;
    config.max_size = u64::try_from(kib)
        .ok()
        .and_then(|kib| kib.checked_mul(1024))
        .ok_or_else(|| ParseError::NumberOutOfRange {
            option: "max_size",
            value: value.to_string(),
        })?;
    Ok(())
}

fn set_pid(config: &mut Config, value: &str) -> Result<(), ParseError> {
    let pid = parse_number("pid", value)?;
    config.pid = i32::try_from(pid).map_err(|_| ParseError::NumberOutOfRange {
        option: "pid",
        value: value.to_string(),
    })?;
    Ok(())
}

fn set_comm(config: &mut Config, value: &str) -> Result<(), ParseError> {
    if config.set_comm(value) {
        warn!(
            "comm '{}' is longer than {} bytes, filtering on '{}'",
            value,
            TASK_COMM_LEN - 1,
            config.comm_str()
        );
    }
    Ok(())
}

/// Look up a catalog entry by its long name.
fn find(name: &str) -> Option<&'static OptionSpec> {
    OPTIONS.iter().find(|opt| opt.name == name)
}

/// Build the clap command for the whole catalog.
pub fn command() -> Command {
    let cmd = Command::new("sched-analyzer")
        .version(env!("CARGO_PKG_VERSION"))
        .about(ABOUT)
        // Only repeated plain flags are affected, value options append.
        .args_override_self(true)
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::Count)
                .help("Increase log verbosity, may be repeated."),
        );

    OPTIONS.iter().fold(cmd, |cmd, opt| cmd.arg(opt.arg()))
}

/// One-line usage summary, printed alongside parse failures.
pub fn usage() -> String {
    command().render_usage().to_string()
}

fn classify(err: clap::Error) -> ParseError {
    if err.kind() == ErrorKind::UnknownArgument {
        if let Some(ContextValue::String(arg)) = err.get(ContextKind::InvalidArg) {
            let arg = arg.clone();
            return if arg.starts_with('-') {
                ParseError::UnknownOption { option: arg }
            } else {
                ParseError::UnexpectedPositionalArgument { arg }
            };
        }
    }
    ParseError::Usage(err)
}

/// Replay the raw tokens in order and return the first value option whose
/// argument is rejected. Stops at the first token the catalog does not cover,
/// clap's own error is the right one from there on.
fn first_rejected_value(args: &[OsString]) -> Option<ParseError> {
    let mut scratch = Config::default();
    let mut tokens = args.iter().skip(1);

    while let Some(token) = tokens.next() {
        let token = token.to_str()?;
        let Some(long) = token.strip_prefix("--") else {
            // Only -v, -vv, ... are known short options.
            if token.len() > 1
                && token.starts_with('-')
                && token[1..].chars().all(|c| c == 'v')
            {
                continue;
            }
            return None;
        };
        if long == "verbose" {
            continue;
        }

        let (name, attached) = match long.split_once('=') {
            Some((name, value)) => (name, Some(value)),
            None => (long, None),
        };
        let opt = find(name)?;

        if !opt.takes_value() {
            if attached.is_some() {
                return None;
            }
            continue;
        }

        let value = match attached {
            Some(value) => value,
            None => tokens.next()?.to_str()?,
        };
        if let Err(e) = opt.apply(&mut scratch, value) {
            return Some(e);
        }
    }
    None
}

/// Every option given on the command line, with its value, in the order the
/// user typed them.
fn in_arrival_order(matches: &ArgMatches) -> Vec<(usize, &'static OptionSpec, &str)> {
    let mut given = Vec::new();

    for opt in OPTIONS {
        if matches.value_source(opt.name) != Some(ValueSource::CommandLine) {
            continue;
        }
        let Some(indices) = matches.indices_of(opt.name) else {
            continue;
        };

        if opt.takes_value() {
            let values = matches.get_many::<String>(opt.name).into_iter().flatten();
            for (idx, value) in indices.zip(values) {
                given.push((idx, opt, value.as_str()));
            }
        } else {
            for idx in indices {
                given.push((idx, opt, ""));
            }
        }
    }

    given.sort_by_key(|(idx, _, _)| *idx);
    given
}

/// Build a [`Config`] from a full argument vector.
///
/// The first item is the program name, as with [`std::env::args_os`].
pub fn parse<I, T>(args: I) -> Result<Config, ParseError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let args: Vec<OsString> = args.into_iter().map(Into::into).collect();
    let matches = match command().try_get_matches_from(args.clone()) {
        Ok(matches) => matches,
        Err(e) => return Err(first_rejected_value(&args).unwrap_or_else(|| classify(e))),
    };

    let mut config = Config {
        verbosity: matches.get_count("verbose"),
        ..Default::default()
    };

    for (_, opt, value) in in_arrival_order(&matches) {
        if opt.takes_value() {
            debug!("--{} {}", opt.name, value);
        } else {
            debug!("--{}", opt.name);
        }
        opt.apply(&mut config, value)?;
    }

    Ok(config)
}
