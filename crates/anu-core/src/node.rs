use serde_json::Value;

use crate::document::LessonDocument;
use crate::error::AppError;
use crate::traits::NodeResolver;

/// Resolves the node a page is about from its embedded settings JSON.
///
/// The settings carry a `node` entry that is either the node itself or a
/// table of nodes keyed by id. For a table, `path.currentPath`
/// (`node/<id>`) selects the entry; without a current path a table
/// holding a single node resolves to that node.
#[derive(Debug, Default, Clone, Copy)]
pub struct CurrentNodeResolver;

impl CurrentNodeResolver {
    pub fn new() -> Self {
        Self
    }

    fn current_node<'a>(&self, settings: &'a Value) -> Result<&'a Value, AppError> {
        let node = settings
            .get("node")
            .ok_or_else(|| AppError::MalformedPage("settings have no `node` entry".into()))?;

        if node.get("type").is_some_and(Value::is_string) {
            return Ok(node);
        }

        let table = node
            .as_object()
            .ok_or_else(|| AppError::MalformedPage("`node` is not an object".into()))?;

        match current_node_id(settings) {
            Some(id) => table.get(id).ok_or_else(|| {
                AppError::MalformedPage(format!("current node {id} missing from node table"))
            }),
            None if table.len() == 1 => table
                .values()
                .next()
                .ok_or_else(|| AppError::MalformedPage("node table is empty".into())),
            None => Err(AppError::MalformedPage(format!(
                "cannot pick current node among {} entries",
                table.len()
            ))),
        }
    }
}

/// Node id from `path.currentPath`, e.g. `"node/42"` -> `"42"`.
fn current_node_id(settings: &Value) -> Option<&str> {
    settings
        .pointer("/path/currentPath")
        .and_then(Value::as_str)
        .and_then(|path| path.strip_prefix("node/"))
        .map(|rest| rest.split('/').next().unwrap_or(rest))
        .filter(|id| !id.is_empty())
}

impl NodeResolver for CurrentNodeResolver {
    fn resolve(&self, settings: &Value) -> Result<LessonDocument, AppError> {
        let node = self.current_node(settings)?;
        LessonDocument::deserialize_node(node)
    }
}

impl LessonDocument {
    /// Decode a single node object into a document.
    pub fn deserialize_node(node: &Value) -> Result<Self, AppError> {
        serde::Deserialize::deserialize(node)
            .map_err(|e| AppError::MalformedPage(format!("invalid node data: {e}")))
    }
}
