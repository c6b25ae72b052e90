use thiserror::Error;

/// Failure to turn the command line into a [`crate::Config`].
///
/// Parsing stops at the first of these, no partial configuration is ever
/// returned.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("unrecognized option '{option}'")]
    UnknownOption { option: String },

    #[error("unexpected argument '{arg}', only options are accepted")]
    UnexpectedPositionalArgument { arg: String },

    #[error("{option}: no digits were found in '{value}'")]
    UnparseableNumber { option: &'static str, value: String },

    #[error("{option}: unsupported value '{value}'")]
    NumberOutOfRange { option: &'static str, value: String },

    #[error("{option}: value must not be empty")]
    EmptyValue { option: &'static str },

    /// Anything else clap rejected or asked to display (missing values,
    /// `--help`, `--version`).
    #[error(transparent)]
    Usage(#[from] clap::Error),
}

impl ParseError {
    /// Process exit status for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            ParseError::Usage(e) => e.exit_code(),
            _ => 2,
        }
    }

    /// The option the failure is about, if there is one.
    pub fn option(&self) -> Option<&str> {
        match self {
            ParseError::UnknownOption { option } => Some(option.as_str()),
            ParseError::UnparseableNumber { option, .. }
            | ParseError::NumberOutOfRange { option, .. }
            | ParseError::EmptyValue { option } => Some(*option),
            ParseError::UnexpectedPositionalArgument { .. } | ParseError::Usage(_) => None,
        }
    }
}
