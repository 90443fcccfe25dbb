//! Lifecycle of a single artifact download.
//!
//! ```text
//! Idle ──► Transferring ──┬──► Completed ──► Verifying ──┬──► Verified
//!                         ├──► Failed                     └──► VerifyFailed
//!                         └──► Cancelled
//! ```
//!
//! `Verified`, `Failed`, `Cancelled` and `VerifyFailed` are terminal.

use std::fmt;

/// Phase of a single download.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum DownloadPhase {
    /// Not started.
    #[default]
    Idle,
    /// Bytes are streaming to the destination.
    Transferring,
    /// All bytes written; digest not yet computed.
    Completed,
    /// The backend reported a failure or local write failed.
    Failed,
    /// The caller cancelled the transfer.
    Cancelled,
    /// Computing the digest of the written file.
    Verifying,
    /// Digest attached to the asset.
    Verified,
    /// Digest computation failed.
    VerifyFailed,
}

impl DownloadPhase {
    /// Whether no further transition is possible.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Verified | Self::Failed | Self::Cancelled | Self::VerifyFailed
        )
    }

    /// Whether `self -> next` is a legal transition.
    pub fn can_advance_to(self, next: Self) -> bool {
        use DownloadPhase::*;
        matches!(
            (self, next),
            (Idle, Transferring)
                | (Idle, Failed)
                | (Idle, Cancelled)
                | (Transferring, Completed)
                | (Transferring, Failed)
                | (Transferring, Cancelled)
                | (Completed, Verifying)
                | (Verifying, Verified)
                | (Verifying, VerifyFailed)
        )
    }

    /// Move to `next`, returning the new phase.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidTransition`] if the move is not allowed.
    pub fn advance(self, next: Self) -> Result<Self, InvalidTransition> {
        if self.can_advance_to(next) {
            Ok(next)
        } else {
            Err(InvalidTransition {
                from: self,
                to: next,
            })
        }
    }
}

impl fmt::Display for DownloadPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Transferring => "transferring",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::Verifying => "verifying",
            Self::Verified => "verified",
            Self::VerifyFailed => "verify-failed",
        };
        f.write_str(name)
    }
}

/// Rejected phase transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid download transition {from} -> {to}")]
pub struct InvalidTransition {
    /// Phase before the attempted move.
    pub from: DownloadPhase,
    /// Requested phase.
    pub to: DownloadPhase,
}
