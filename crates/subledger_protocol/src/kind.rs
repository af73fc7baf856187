//! Entity kinds and their state tags.

use crate::error::{ProtocolError, ProtocolResult};
use std::fmt;

/// The four kinds of remote resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// Owner of one or more books.
    Organization,
    /// A book of accounts, usually one per currency or asset.
    Book,
    /// An account within a book.
    Account,
    /// A dated set of balancing lines within a book.
    JournalEntry,
}

impl EntityKind {
    /// All kinds, root first.
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Organization,
        EntityKind::Book,
        EntityKind::Account,
        EntityKind::JournalEntry,
    ];

    /// Stem used to build state tags (`active_<stem>`).
    pub fn tag_stem(&self) -> &'static str {
        match self {
            EntityKind::Organization => "org",
            EntityKind::Book => "book",
            EntityKind::Account => "account",
            EntityKind::JournalEntry => "journal_entry",
        }
    }

    /// Plural used in listing response keys (`active_<plural>`).
    pub fn plural(&self) -> &'static str {
        match self {
            EntityKind::Organization => "orgs",
            EntityKind::Book => "books",
            EntityKind::Account => "accounts",
            EntityKind::JournalEntry => "journal_entries",
        }
    }

    /// Path segment naming this kind's collection.
    pub fn segment(&self) -> &'static str {
        match self {
            EntityKind::Organization => "orgs",
            EntityKind::Book => "books",
            EntityKind::Account => "accounts",
            EntityKind::JournalEntry => "entries",
        }
    }

    /// Names of the ancestor ids needed to address this kind, root first.
    pub fn required_ancestors(&self) -> &'static [&'static str] {
        match self {
            EntityKind::Organization => &[],
            EntityKind::Book => &["org"],
            EntityKind::Account | EntityKind::JournalEntry => &["org", "book"],
        }
    }

    /// The kind's closed tag set: `[active, archived]`.
    pub fn tags(&self) -> [&'static str; 2] {
        match self {
            EntityKind::Organization => ["active_org", "archived_org"],
            EntityKind::Book => ["active_book", "archived_book"],
            EntityKind::Account => ["active_account", "archived_account"],
            EntityKind::JournalEntry => ["active_journal_entry", "archived_journal_entry"],
        }
    }

    /// Key under which a listing of this kind in `state` is returned.
    pub fn list_key(&self, state: LifecycleState) -> String {
        format!("{}_{}", state.as_str(), self.plural())
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Organization => "organization",
            EntityKind::Book => "book",
            EntityKind::Account => "account",
            EntityKind::JournalEntry => "journal entry",
        };
        f.write_str(name)
    }
}

/// Lifecycle state shared by every kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    /// Usable.
    Active,
    /// Retired; can be re-activated.
    Archived,
}

impl LifecycleState {
    /// Parses the wire spelling.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "active" => Some(LifecycleState::Active),
            "archived" => Some(LifecycleState::Archived),
            _ => None,
        }
    }

    /// Wire spelling used in tags and the `state` query parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Active => "active",
            LifecycleState::Archived => "archived",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated state tag: always a member of its kind's tag set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateTag {
    kind: EntityKind,
    state: LifecycleState,
}

impl StateTag {
    /// Builds a tag from its parts.
    pub fn new(kind: EntityKind, state: LifecycleState) -> Self {
        Self { kind, state }
    }

    /// Validates a server-reported tag against `kind`'s tag set.
    pub fn parse(kind: EntityKind, tag: &str) -> ProtocolResult<Self> {
        let [active, archived] = kind.tags();
        let state = if tag == active {
            LifecycleState::Active
        } else if tag == archived {
            LifecycleState::Archived
        } else {
            return Err(ProtocolError::UnknownStateTag {
                kind,
                tag: tag.to_string(),
                expected: kind.tags(),
            });
        };
        Ok(Self { kind, state })
    }

    /// The kind this tag belongs to.
    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// The lifecycle state encoded by this tag.
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Wire spelling, e.g. `archived_book`.
    pub fn as_str(&self) -> &'static str {
        let [active, archived] = self.kind.tags();
        match self.state {
            LifecycleState::Active => active,
            LifecycleState::Archived => archived,
        }
    }

    /// True for the kind's `active_*` tag.
    pub fn is_active(&self) -> bool {
        self.as_str().starts_with("active")
    }
}

impl fmt::Display for StateTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
