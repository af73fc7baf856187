//! Listing filters.

use crate::kind::LifecycleState;

/// Position of a listing relative to the `id` / `description` anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListAction {
    /// Items before the anchor.
    Before,
    /// Items up to and including the anchor.
    Ending,
    /// Items from the anchor on.
    Starting,
    /// Items after the anchor.
    After,
    /// Items immediately preceding the anchor.
    Preceding,
    /// Items immediately following the anchor.
    Following,
}

impl ListAction {
    /// Every action, in wire order.
    pub const ALL: [ListAction; 6] = [
        ListAction::Before,
        ListAction::Ending,
        ListAction::Starting,
        ListAction::After,
        ListAction::Preceding,
        ListAction::Following,
    ];

    /// Parses the wire spelling.
    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|action| action.as_str() == raw)
    }

    /// Wire spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            ListAction::Before => "before",
            ListAction::Ending => "ending",
            ListAction::Starting => "starting",
            ListAction::After => "after",
            ListAction::Preceding => "preceding",
            ListAction::Following => "following",
        }
    }
}

/// Query parameters of a collection listing.
///
/// Defaults to active items, starting from the beginning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListFilter {
    /// Lifecycle state to list.
    pub state: LifecycleState,
    /// Listing direction.
    pub action: Option<ListAction>,
    /// Anchor id.
    pub id: Option<String>,
    /// Anchor description.
    pub description: Option<String>,
    /// Maximum number of items the server should return.
    pub limit: Option<u32>,
}

impl ListFilter {
    /// Creates the default filter (`state=active&action=starting`).
    pub fn new() -> Self {
        Self {
            state: LifecycleState::Active,
            action: Some(ListAction::Starting),
            id: None,
            description: None,
            limit: None,
        }
    }

    /// Sets the lifecycle state.
    pub fn with_state(mut self, state: LifecycleState) -> Self {
        self.state = state;
        self
    }

    /// Sets the listing action.
    pub fn with_action(mut self, action: ListAction) -> Self {
        self.action = Some(action);
        self
    }

    /// Sets the anchor id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets the anchor description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the page size.
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Renders the filter as query pairs, in a stable order.
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut query = vec![("state".to_string(), self.state.as_str().to_string())];
        if let Some(action) = self.action {
            query.push(("action".into(), action.as_str().into()));
        }
        if let Some(id) = &self.id {
            query.push(("id".into(), id.clone()));
        }
        if let Some(description) = &self.description {
            query.push(("description".into(), description.clone()));
        }
        if let Some(limit) = self.limit {
            query.push(("limit".into(), limit.to_string()));
        }
        query
    }
}

impl Default for ListFilter {
    fn default() -> Self {
        Self::new()
    }
}
