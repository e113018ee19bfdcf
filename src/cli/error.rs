//! CLI-level errors (wraps infrastructure errors)

use thiserror::Error;

use crate::application::ApplicationError;
use crate::domain::DomainError;
use crate::exitcode;
use crate::infrastructure::InfraError;

/// CLI errors are the top-level error type.
/// These are what get displayed to the user.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Infra(#[from] InfraError),

    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("{0}")]
    Usage(String),
}

impl From<ApplicationError> for CliError {
    fn from(e: ApplicationError) -> Self {
        CliError::Infra(InfraError::Application(e))
    }
}

impl From<DomainError> for CliError {
    fn from(e: DomainError) -> Self {
        ApplicationError::Domain(e).into()
    }
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

impl CliError {
    /// Get the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::InvalidArgs(_) | CliError::Usage(_) => exitcode::USAGE,
            CliError::Infra(e) => match e {
                InfraError::Io { .. } => exitcode::IOERR,
                InfraError::Json(_) => exitcode::SOFTWARE,
                InfraError::Application(app) => match app {
                    ApplicationError::Domain(DomainError::MemberNotFound(_)) => exitcode::NOINPUT,
                    ApplicationError::Domain(DomainError::InvalidViewMode(_)) => exitcode::USAGE,
                    ApplicationError::Domain(DomainError::InvalidSnapshot { .. }) => {
                        exitcode::DATAERR
                    }
                    ApplicationError::NoSnapshot => exitcode::USAGE,
                    ApplicationError::SnapshotNotFound(_) => exitcode::NOINPUT,
                    ApplicationError::Config { .. } => exitcode::CONFIG,
                    ApplicationError::OperationFailed { .. } => exitcode::IOERR,
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MemberId;
    use std::path::PathBuf;

    #[test]
    fn given_unknown_member_when_mapping_exit_code_then_noinput() {
        let err: CliError = DomainError::MemberNotFound(MemberId::from("x")).into();
        assert_eq!(err.exit_code(), exitcode::NOINPUT);
    }

    #[test]
    fn given_malformed_snapshot_when_mapping_exit_code_then_dataerr() {
        let err: CliError = DomainError::InvalidSnapshot {
            message: "eof".into(),
        }
        .into();
        assert_eq!(err.exit_code(), exitcode::DATAERR);
    }

    #[test]
    fn given_app_errors_when_mapping_exit_code_then_sysexits() {
        let missing: CliError = ApplicationError::SnapshotNotFound(PathBuf::from("f.json")).into();
        let config: CliError = ApplicationError::Config {
            message: "bad".into(),
        }
        .into();
        assert_eq!(missing.exit_code(), exitcode::NOINPUT);
        assert_eq!(config.exit_code(), exitcode::CONFIG);
        assert_eq!(CliError::Usage("x".into()).exit_code(), exitcode::USAGE);
    }
}
