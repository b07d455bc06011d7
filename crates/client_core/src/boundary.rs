use std::fmt;

use tracing::error;

/// Holds the first unrecovered error raised by a view so the shell can show a
/// fallback instead of the view itself.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ErrorBoundary {
    error: Option<String>,
}

impl ErrorBoundary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn capture(&mut self, err: impl fmt::Display) {
        let message = err.to_string();
        error!("boundary: captured error={message}");
        if self.error.is_none() {
            self.error = Some(message);
        }
    }

    /// Runs `f`, capturing its error. Returns `None` once an error is held.
    pub fn guard<T, E: fmt::Display>(&mut self, f: impl FnOnce() -> Result<T, E>) -> Option<T> {
        if self.error.is_some() {
            return None;
        }
        match f() {
            Ok(value) => Some(value),
            Err(err) => {
                self.capture(err);
                None
            }
        }
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn retry(&mut self) {
        self.error = None;
    }
}

#[cfg(test)]
#[path = "tests/boundary_tests.rs"]
mod tests;
