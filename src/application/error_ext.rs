//! Path context for I/O results crossing into the application layer

use std::io;
use std::path::Path;

use crate::application::{ApplicationError, ApplicationResult};

/// Turns `io::Result` into `ApplicationResult`, naming the action and file.
pub trait IoResultExt<T> {
    /// ```ignore
    /// fs.read_to_string(path)
    ///     .with_path_context("read member snapshot", path)?;
    /// ```
    fn with_path_context(self, action: &str, path: &Path) -> ApplicationResult<T>;
}

impl<T> IoResultExt<T> for io::Result<T> {
    fn with_path_context(self, action: &str, path: &Path) -> ApplicationResult<T> {
        self.map_err(|e| ApplicationError::OperationFailed {
            context: format!("{action} {}", path.display()),
            source: Box::new(e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_io_error_when_adding_context_then_action_and_path_in_message() {
        let result: io::Result<()> = Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"));

        let err = result
            .with_path_context("write export", Path::new("/tmp/stats.csv"))
            .unwrap_err();

        assert_eq!(err.to_string(), "operation failed: write export /tmp/stats.csv");
    }
}
