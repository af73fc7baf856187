//! Archive and activate transitions.
//!
//! Every kind has the same two states. Either transition may be requested
//! from either state; the server's reply is authoritative, and a reply
//! carrying any tag other than the transition's target is rejected.

use crate::error::{ClientError, ClientResult};
use subledger_protocol::{Action, EntityKind, LifecycleState, StateTag};

/// A requested lifecycle transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    /// Move to the archived state.
    Archive,
    /// Move to the active state.
    Activate,
}

impl Transition {
    /// State the entity is in once the transition succeeds.
    pub fn target(&self) -> LifecycleState {
        match self {
            Transition::Archive => LifecycleState::Archived,
            Transition::Activate => LifecycleState::Active,
        }
    }

    /// Path action that requests this transition.
    pub fn action(&self) -> Action {
        match self {
            Transition::Archive => Action::Archive,
            Transition::Activate => Action::Activate,
        }
    }

    /// Tag the server must answer with for `kind`.
    pub fn target_tag(&self, kind: EntityKind) -> StateTag {
        StateTag::new(kind, self.target())
    }

    /// Checks the tag returned by the server.
    pub fn accept(&self, kind: EntityKind, returned: &str) -> ClientResult<StateTag> {
        let expected = self.target_tag(kind);
        if returned == expected.as_str() {
            Ok(expected)
        } else {
            Err(ClientError::UnexpectedStateTag {
                expected: expected.as_str(),
                found: returned.to_string(),
            })
        }
    }
}
