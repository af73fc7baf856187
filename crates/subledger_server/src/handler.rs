//! Request routing and handlers.

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::store::{ListQuery, LedgerStore};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use subledger_protocol::{
    opt_str_field, parse_timestamp, str_field, Action, Ancestors, EntityKind, LifecycleState,
    ListAction,
};

/// A parsed request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// `/identities`
    Identities,
    /// A collection, e.g. `/orgs/{org}/books`.
    Collection {
        /// Kind of the items.
        kind: EntityKind,
        /// Parent ids.
        ancestors: Ancestors,
    },
    /// A single entity.
    Entity {
        /// Kind.
        kind: EntityKind,
        /// Parent ids.
        ancestors: Ancestors,
        /// Entity id.
        id: String,
    },
    /// An action on an entity, e.g. `/orgs/{org}/archive`.
    Action {
        /// Kind.
        kind: EntityKind,
        /// Parent ids.
        ancestors: Ancestors,
        /// Entity id.
        id: String,
        /// Action.
        action: Action,
    },
}

impl Route {
    /// Parses a path relative to the API root.
    ///
    /// Paths with a trailing `/` are refused with an authentication error,
    /// matching the hosted API.
    pub fn parse(path: &str) -> ServerResult<Self> {
        if path.len() > 1 && path.ends_with('/') {
            return Err(ServerError::AuthenticationFailed(format!("no route for {path}")));
        }
        let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();
        if segments == ["identities"] {
            return Ok(Route::Identities);
        }

        let not_found = || ServerError::NotFound(path.to_string());
        let mut ancestors = Ancestors::none();
        let mut rest = segments.as_slice();
        let mut depth = 0;
        loop {
            let (segment, tail) = rest.split_first().ok_or_else(not_found)?;
            let kind = kind_at(depth, segment).ok_or_else(not_found)?;
            match tail {
                [] => return Ok(Route::Collection { kind, ancestors }),
                [id] if !id.is_empty() => {
                    return Ok(Route::Entity {
                        kind,
                        ancestors,
                        id: id.to_string(),
                    })
                }
                [id, action] if parse_action(action).is_some() => {
                    let action = parse_action(action).ok_or_else(not_found)?;
                    return Ok(Route::Action {
                        kind,
                        ancestors,
                        id: id.to_string(),
                        action,
                    });
                }
                [id, next @ ..] if !id.is_empty() && !next.is_empty() => {
                    match kind {
                        EntityKind::Organization => ancestors.org = Some(id.to_string()),
                        EntityKind::Book => ancestors.book = Some(id.to_string()),
                        _ => return Err(not_found()),
                    }
                    rest = next;
                    depth += 1;
                }
                _ => return Err(not_found()),
            }
        }
    }
}

fn kind_at(depth: usize, segment: &str) -> Option<EntityKind> {
    let kind = match (depth, segment) {
        (0, "orgs") => EntityKind::Organization,
        (1, "books") => EntityKind::Book,
        (2, "accounts") => EntityKind::Account,
        (2, "entries") => EntityKind::JournalEntry,
        _ => return None,
    };
    Some(kind)
}

fn parse_action(raw: &str) -> Option<Action> {
    match raw {
        "archive" => Some(Action::Archive),
        "activate" => Some(Action::Activate),
        "balance" => Some(Action::Balance),
        _ => None,
    }
}

/// Context for request handling.
pub struct HandlerContext {
    /// Server configuration.
    pub config: ServerConfig,
    /// Entity store, shared across handlers.
    pub store: Arc<LedgerStore>,
}

impl HandlerContext {
    /// Creates a new handler context.
    pub fn new(config: ServerConfig, store: Arc<LedgerStore>) -> Self {
        Self { config, store }
    }
}

/// Dispatches parsed requests to the store.
pub struct RequestHandler {
    context: Arc<HandlerContext>,
}

impl RequestHandler {
    /// Creates a new request handler.
    pub fn new(context: Arc<HandlerContext>) -> Self {
        Self { context }
    }

    /// Handles one request and returns the success status and body.
    pub fn handle(
        &self,
        method: &str,
        route: &Route,
        query: &[(String, String)],
        body: Option<&Value>,
    ) -> ServerResult<(u16, Value)> {
        let store = &self.context.store;
        match (method, route) {
            ("POST", Route::Identities) => self.handle_create_identity(body_of(body)?),
            ("GET", Route::Collection { kind, ancestors }) => {
                let query = self.list_query(query)?;
                let items: Vec<Value> = store
                    .list(*kind, ancestors, &query)?
                    .iter()
                    .map(|entity| entity.payload())
                    .collect();
                let mut response = Map::new();
                response.insert(kind.list_key(query.state), Value::Array(items));
                Ok((200, Value::Object(response)))
            }
            ("POST", Route::Collection { kind, ancestors }) => {
                let entity = store.create(*kind, ancestors, body_of(body)?)?;
                Ok((201, entity.envelope()))
            }
            ("GET", Route::Entity { kind, ancestors, id }) => Ok((200, store.get(*kind, ancestors, id)?.envelope())),
            ("PATCH", Route::Entity { kind, ancestors, id }) => {
                let entity = store.update(*kind, ancestors, id, body_of(body)?)?;
                Ok((200, entity.envelope()))
            }
            (
                "POST",
                Route::Action {
                    kind,
                    ancestors,
                    id,
                    action: action @ (Action::Archive | Action::Activate),
                },
            ) => {
                let state = match action {
                    Action::Archive => LifecycleState::Archived,
                    _ => LifecycleState::Active,
                };
                Ok((200, store.transition(*kind, ancestors, id, state)?.envelope()))
            }
            (
                "GET",
                Route::Action {
                    kind: EntityKind::Account,
                    ancestors,
                    id,
                    action: Action::Balance,
                },
            ) => {
                let at = query_param(query, "at")
                    .ok_or_else(|| ServerError::InvalidRequest("missing `at` parameter".into()))?;
                let at = parse_timestamp("at", at)?;
                let balance = store.balance(ancestors, id, &at)?;
                let balance = serde_json::to_value(balance).map_err(|e| ServerError::Internal(e.to_string()))?;
                Ok((200, json!({ "balance": balance })))
            }
            _ => Err(ServerError::MethodNotAllowed {
                method: method.to_string(),
                path: format!("{route:?}"),
            }),
        }
    }

    fn handle_create_identity(&self, body: &Value) -> ServerResult<(u16, Value)> {
        let email = str_field(body, "email")?;
        let description = str_field(body, "description")?;
        let reference = opt_str_field(body, "reference")?;
        let (identity, key) = self.context.store.create_identity(email, description, reference)?;
        Ok((
            201,
            json!({
                "active_identity": {
                    "id": identity.id,
                    "email": identity.email,
                    "description": identity.description,
                    "reference": identity.reference,
                    "version": identity.version,
                },
                "active_key": {
                    "id": key.id,
                    "identity": key.identity,
                    "secret": key.secret,
                },
            }),
        ))
    }

    fn list_query(&self, query: &[(String, String)]) -> ServerResult<ListQuery> {
        let state = match query_param(query, "state") {
            None => LifecycleState::Active,
            Some(raw) => LifecycleState::parse(raw)
                .ok_or_else(|| ServerError::InvalidRequest(format!("unknown state `{raw}`")))?,
        };
        let action = match query_param(query, "action") {
            None => ListAction::Starting,
            Some(raw) => ListAction::parse(raw)
                .ok_or_else(|| ServerError::InvalidRequest(format!("unknown action `{raw}`")))?,
        };
        let max = self.context.config.max_list_limit;
        let limit = match query_param(query, "limit") {
            None => max,
            Some(raw) => raw
                .parse::<u32>()
                .map_err(|_| ServerError::InvalidRequest(format!("invalid limit `{raw}`")))?
                .min(max),
        };
        Ok(ListQuery {
            state,
            action,
            id: query_param(query, "id").map(str::to_string),
            description: query_param(query, "description").map(str::to_string),
            limit: limit as usize,
        })
    }
}

fn body_of(body: Option<&Value>) -> ServerResult<&Value> {
    body.filter(|body| body.is_object())
        .ok_or_else(|| ServerError::InvalidRequest("expected a JSON object body".into()))
}

fn query_param<'a>(query: &'a [(String, String)], name: &str) -> Option<&'a str> {
    query
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
}
