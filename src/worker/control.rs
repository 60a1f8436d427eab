//! Control Channel
//!
//! Commands the hosting application sends to force activation or wipe all
//! cached data.

use serde::{Deserialize, Serialize};

// == Control Message ==
/// A fire-and-forget command, tagged by `type` on the wire.
///
/// ```json
/// {"type": "SKIP_WAITING"}
/// {"type": "CLEAR_CACHE"}
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlMessage {
    /// Activate a waiting generation now, even while an older one serves
    SkipWaiting,
    /// Delete every prefixed namespace, current generation included
    ClearCache,
}

impl ControlMessage {
    pub fn as_str(self) -> &'static str {
        match self {
            ControlMessage::SkipWaiting => "SKIP_WAITING",
            ControlMessage::ClearCache => "CLEAR_CACHE",
        }
    }
}

// == Message Outcome ==
/// What handling a control message did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageOutcome {
    /// The receiving worker will move on to activation
    SkipWaitingRequested,
    /// Names of the namespaces that were deleted
    Cleared(Vec<String>),
    /// No worker was in a position to act on the message
    Ignored,
}
