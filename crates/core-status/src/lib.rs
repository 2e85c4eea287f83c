//! Shared status/result type threaded through every editing primitive.
//!
//! The original engine carried a semi-global `rc.status` code updated by
//! whichever primitive last ran. Here that collapses into an ordinary
//! [`Status`] error type: plain success is `Ok(())`/`Ok(T)`, everything else
//! is one of the variants below. Propagation is then just `?`.

use thiserror::Error;

/// Non-success outcome of an editing, search, or macro operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Status {
    /// Quiet failure: no match, boundary hit, nothing to do. Never shown as
    /// an error to the user beyond a message-line note and a bell.
    #[error("not found")]
    NotFound,
    /// User-visible diagnostic, reported on the message line.
    #[error("{0}")]
    Failure(String),
    /// A macro statement failed; carries the source line at which it failed.
    #[error("{message} (line {line})")]
    ScriptError { message: String, line: usize },
    /// A bug-guard invariant was violated. Unwinds everything to the main loop.
    #[error("fatal: {0}")]
    Fatal(String),
    /// Out of memory. The process is expected to exit after this propagates.
    #[error("out of memory")]
    Panic,
}

impl Status {
    pub fn failure(msg: impl Into<String>) -> Self {
        Status::Failure(msg.into())
    }

    pub fn script_error(msg: impl Into<String>, line: usize) -> Self {
        Status::ScriptError {
            message: msg.into(),
            line,
        }
    }

    /// `NotFound` is never surfaced as a hard error; callers downgrade it to
    /// a quiet no-op (bell + message) rather than aborting a command chain.
    pub fn is_quiet(&self) -> bool {
        matches!(self, Status::NotFound)
    }

    /// Fatal/Panic unwind through everything, including `force` statements.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Status::Fatal(_) | Status::Panic)
    }

    /// Swallow a non-fatal status, as the `force` macro directive does.
    /// Returns `None` when the status should continue propagating.
    pub fn forced(self) -> Option<Status> {
        if self.is_fatal() { Some(self) } else { None }
    }
}

/// Result alias used by every primitive in the core.
pub type EdResult<T> = Result<T, Status>;
