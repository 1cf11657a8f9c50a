//! Process exit codes
//!
//! Scripts rely on these values, so they only ever gain new variants.

use cosn_core::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    /// Bad arguments or configuration
    UsageError = 2,
    /// Transport failure or server faults that outlasted the retry budget
    NetworkError = 3,
    AuthError = 4,
    NotFound = 5,
    /// A rename copied its source but could not delete it
    Conflict = 6,
    UnsupportedFeature = 7,
}

impl ExitCode {
    pub fn from_error(error: &Error) -> Self {
        Self::from(error.exit_code())
    }
}

impl From<i32> for ExitCode {
    fn from(code: i32) -> Self {
        match code {
            0 => Self::Success,
            2 => Self::UsageError,
            3 => Self::NetworkError,
            4 => Self::AuthError,
            5 => Self::NotFound,
            6 => Self::Conflict,
            7 => Self::UnsupportedFeature,
            _ => Self::GeneralError,
        }
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        std::process::ExitCode::from(code as u8)
    }
}
