//! Process exit codes
//!
//! Scripts can branch on these without parsing output.

use bgw_core::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    /// Bad arguments or configuration
    UsageError = 2,
    NetworkError = 3,
    AuthError = 4,
    NotFound = 5,
    /// Target already exists
    Conflict = 6,
}

impl ExitCode {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl From<&Error> for ExitCode {
    fn from(error: &Error) -> Self {
        match error {
            Error::BucketNotFound(_) | Error::NotFound(_) | Error::FolderNotFound(_) => {
                ExitCode::NotFound
            }
            Error::AlreadyExists(_) => ExitCode::Conflict,
            Error::SameName(_) | Error::InvalidKey(_) | Error::Config(_) => ExitCode::UsageError,
            Error::Network(_) => ExitCode::NetworkError,
            Error::Auth(_) => ExitCode::AuthError,
            Error::Unconfirmed(_) | Error::Archive(_) | Error::Io(_) | Error::General(_) => {
                ExitCode::GeneralError
            }
        }
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        std::process::ExitCode::from(code.as_u8())
    }
}
