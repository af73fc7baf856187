//! Resource address resolution.
//!
//! Every resource lives under its ancestors:
//!
//! ```text
//! /orgs/{org}
//! /orgs/{org}/books/{book}
//! /orgs/{org}/books/{book}/accounts/{account}
//! /orgs/{org}/books/{book}/entries/{entry}
//! ```
//!
//! Leaving the own id out addresses the collection, which is where creates
//! and listings go. Paths never end in `/`: the server answers such paths
//! with an authorization failure.

use crate::error::{ProtocolError, ProtocolResult};
use crate::kind::EntityKind;

/// Ancestor ids used to address a resource.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ancestors {
    /// Owning organization id.
    pub org: Option<String>,
    /// Owning book id.
    pub book: Option<String>,
}

impl Ancestors {
    /// No ancestors (organizations).
    pub fn none() -> Self {
        Self::default()
    }

    /// Ancestors of a book.
    pub fn org(org: impl Into<String>) -> Self {
        Self {
            org: Some(org.into()),
            book: None,
        }
    }

    /// Ancestors of an account or journal entry.
    pub fn book(org: impl Into<String>, book: impl Into<String>) -> Self {
        Self {
            org: Some(org.into()),
            book: Some(book.into()),
        }
    }

    /// Fills any missing id from `fallback`.
    pub fn or(self, fallback: &Ancestors) -> Self {
        Self {
            org: self.org.or_else(|| fallback.org.clone()),
            book: self.book.or_else(|| fallback.book.clone()),
        }
    }

    fn get(&self, name: &str) -> Option<&str> {
        let id = match name {
            "org" => self.org.as_deref(),
            "book" => self.book.as_deref(),
            _ => None,
        };
        id.filter(|id| !id.is_empty())
    }
}

/// Lifecycle actions addressed below an entity path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// `POST {path}/archive`
    Archive,
    /// `POST {path}/activate`
    Activate,
    /// `GET {path}/balance` (accounts only)
    Balance,
}

impl Action {
    /// Path suffix for the action.
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Archive => "archive",
            Action::Activate => "activate",
            Action::Balance => "balance",
        }
    }
}

/// Path used to create identities and their API keys.
pub const IDENTITIES_PATH: &str = "/identities";

/// Builds the canonical path for `kind`.
///
/// `id` of `None` or `""` addresses the collection.
pub fn resource_path(kind: EntityKind, ancestors: &Ancestors, id: Option<&str>) -> ProtocolResult<String> {
    let mut path = String::new();
    for ancestor in kind.required_ancestors() {
        let ancestor_id = ancestors
            .get(ancestor)
            .ok_or(ProtocolError::MissingAncestor { kind, ancestor })?;
        let segment = match *ancestor {
            "org" => EntityKind::Organization.segment(),
            _ => EntityKind::Book.segment(),
        };
        path.push('/');
        path.push_str(segment);
        path.push('/');
        path.push_str(ancestor_id);
    }
    path.push('/');
    path.push_str(kind.segment());
    path.push('/');
    path.push_str(id.unwrap_or_default());

    let trimmed = path.trim_end_matches('/');
    Ok(trimmed.to_string())
}

/// Builds the path of an action on a persisted entity.
pub fn action_path(kind: EntityKind, ancestors: &Ancestors, id: &str, action: Action) -> ProtocolResult<String> {
    let base = resource_path(kind, ancestors, Some(id))?;
    Ok(format!("{}/{}", base, action.as_str()))
}
