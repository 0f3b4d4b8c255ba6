//! Process exit codes
//!
//! Scripts can tell a missing tool apart from unrecognised output or a
//! failure the tool itself reported.

use akv_core::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    UsageError = 2,
    /// The storage tool could not be started
    LaunchError = 3,
    /// The tool's output matched no known grammar
    ParseError = 4,
    /// The tool reported a structured error
    RemoteError = 5,
    ConfigError = 6,
}

impl ExitCode {
    pub fn code(self) -> i32 {
        self as i32
    }
}

impl From<&Error> for ExitCode {
    fn from(error: &Error) -> Self {
        match error {
            Error::Launch { .. } => ExitCode::LaunchError,
            Error::Parse { .. } => ExitCode::ParseError,
            Error::InvalidInput(_) => ExitCode::UsageError,
            Error::Config(_) | Error::TomlParse(_) | Error::TomlSerialize(_) => {
                ExitCode::ConfigError
            }
            _ => ExitCode::GeneralError,
        }
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        std::process::ExitCode::from(code.code() as u8)
    }
}
