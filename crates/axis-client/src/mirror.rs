//! Context mirror shaping
//!
//! The mirror endpoint returns a loosely structured JSON object. This module
//! turns it into an ordered list of [`MirrorNode`]s plus pass-through
//! metadata, and renders that list into a compact text block for LLM prompts:
//!
//! ```text
//! Axis Context Mirror:
//! - src/main.rs (file)
//! - src/lib (directory)
//! ```

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::warn;

use crate::AxisError;

/// First line of every rendered prompt block
pub const PROMPT_HEADER: &str = "Axis Context Mirror:";

/// Placeholder for a node path or kind the server did not report
pub const UNKNOWN_FIELD: &str = "<unknown>";

/// Candidate keys for a node's path, in order of precedence
const PATH_KEYS: [&str; 2] = ["path", "name"];

/// One filesystem-like entry reported by the mirror endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MirrorNode {
    /// `path`, falling back to `name`
    pub path: Option<String>,
    /// Free-form category label (`type` on the wire)
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Size in bytes (`size` on the wire), 0 when not reported
    #[serde(rename = "size")]
    pub size_bytes: u64,
    /// Opaque timestamp, never parsed
    pub last_modified: Option<String>,
}

impl MirrorNode {
    /// Build a node from one element of the `nodes` array.
    ///
    /// Elements that are not objects, or fields with an unexpected JSON type,
    /// yield absent values instead of an error.
    pub fn from_value(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            return Self::empty();
        };

        Self {
            path: first_present(obj, &PATH_KEYS).map(str::to_owned),
            kind: string_field(obj, "type"),
            size_bytes: obj.get("size").and_then(Value::as_u64).unwrap_or(0),
            last_modified: string_field(obj, "last_modified"),
        }
    }

    fn empty() -> Self {
        Self {
            path: None,
            kind: None,
            size_bytes: 0,
            last_modified: None,
        }
    }

    /// One prompt line, without the trailing newline
    fn prompt_line(&self) -> String {
        format!(
            "- {} ({})",
            self.path.as_deref().unwrap_or(UNKNOWN_FIELD),
            self.kind.as_deref().unwrap_or(UNKNOWN_FIELD)
        )
    }
}

/// Return the value of the first key in `keys` holding a non-empty string.
pub fn first_present<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|key| obj.get(*key).and_then(Value::as_str))
        .find(|s| !s.is_empty())
}

fn string_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(Value::as_str).map(str::to_owned)
}

/// The shaped result of one mirror request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextMirror {
    nodes: Vec<MirrorNode>,
    metadata: Map<String, Value>,
    #[serde(skip)]
    raw: Value,
}

impl ContextMirror {
    /// Shape a raw mirror payload.
    ///
    /// Missing `nodes` or `metadata` (or `null`) fall back to empty values.
    /// The payload itself must be an object and `nodes` an array when present.
    /// A `metadata` value that is not an object is logged and replaced by an
    /// empty map; it stays reachable through [`ContextMirror::raw`].
    pub fn shape(payload: Value) -> Result<Self, AxisError> {
        let obj = payload
            .as_object()
            .ok_or_else(|| malformed("payload is not a JSON object", &payload))?;

        let nodes = match obj.get("nodes") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items.iter().map(MirrorNode::from_value).collect(),
            Some(other) => return Err(malformed("`nodes` is not an array", other)),
        };

        let metadata = match obj.get("metadata") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(map)) => map.clone(),
            Some(other) => {
                warn!(
                    "Mirror `metadata` is a {}, not an object; ignoring it",
                    json_kind(other)
                );
                Map::new()
            }
        };

        for index in unnamed_nodes(&nodes) {
            warn!("Mirror node #{} has neither `path` nor `name`", index);
        }

        Ok(Self {
            nodes,
            metadata,
            raw: payload,
        })
    }

    pub fn nodes(&self) -> &[MirrorNode] {
        &self.nodes
    }

    pub fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }

    /// The payload exactly as received
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn into_raw(self) -> Value {
        self.raw
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Render the mirror as a condensed prompt block.
    ///
    /// One header line, then `- {path} ({kind})` per node in server order.
    /// Every line ends with `\n`; paths and kinds are emitted verbatim.
    pub fn render_prompt(&self) -> String {
        let mut output = String::with_capacity(PROMPT_HEADER.len() + 1 + self.nodes.len() * 32);
        output.push_str(PROMPT_HEADER);
        output.push('\n');
        for node in &self.nodes {
            output.push_str(&node.prompt_line());
            output.push('\n');
        }
        output
    }

    /// Alias of [`ContextMirror::render_prompt`]
    pub fn to_prompt(&self) -> String {
        self.render_prompt()
    }
}

impl std::fmt::Display for ContextMirror {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render_prompt())
    }
}

impl TryFrom<Value> for ContextMirror {
    type Error = AxisError;

    fn try_from(payload: Value) -> Result<Self, Self::Error> {
        Self::shape(payload)
    }
}

/// Positions of nodes reported with neither `path` nor `name`
fn unnamed_nodes(nodes: &[MirrorNode]) -> Vec<usize> {
    nodes
        .iter()
        .enumerate()
        .filter(|(_, node)| node.path.is_none())
        .map(|(index, _)| index)
        .collect()
}

fn malformed(reason: &str, found: &Value) -> AxisError {
    AxisError::MalformedMirror(format!("{reason} (found {})", json_kind(found)))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_shape_empty_payload() {
        let mirror = ContextMirror::shape(json!({})).unwrap();
        assert!(mirror.nodes().is_empty());
        assert!(mirror.metadata().is_empty());
        assert_eq!(mirror.raw(), &json!({}));
    }

    #[test]
    fn test_shape_preserves_node_order() {
        let payload = json!({
            "nodes": [
                {"path": "z.rs", "type": "file"},
                {"path": "a.rs", "type": "file"},
                {"path": "m", "type": "directory"}
            ]
        });
        let mirror = ContextMirror::shape(payload).unwrap();
        let paths: Vec<_> = mirror.nodes().iter().map(|n| n.path.as_deref()).collect();
        assert_eq!(paths, vec![Some("z.rs"), Some("a.rs"), Some("m")]);
        assert_eq!(mirror.len(), 3);
    }

    #[test]
    fn test_name_fallback() {
        let node = MirrorNode::from_value(&json!({"name": "a.txt", "type": "file"}));
        assert_eq!(node.path.as_deref(), Some("a.txt"));
    }

    #[test]
    fn test_path_takes_precedence_over_name() {
        let node = MirrorNode::from_value(&json!({"path": "x", "name": "y"}));
        assert_eq!(node.path.as_deref(), Some("x"));
    }

    #[test]
    fn test_empty_path_falls_back_to_name() {
        let node = MirrorNode::from_value(&json!({"path": "", "name": "y"}));
        assert_eq!(node.path.as_deref(), Some("y"));

        let node = MirrorNode::from_value(&json!({"path": null, "name": "y"}));
        assert_eq!(node.path.as_deref(), Some("y"));
    }

    #[test]
    fn test_node_defaults() {
        let node = MirrorNode::from_value(&json!({"path": "a"}));
        assert_eq!(node.kind, None);
        assert_eq!(node.size_bytes, 0);
        assert_eq!(node.last_modified, None);
    }

    #[test]
    fn test_node_fields_pass_through() {
        let node = MirrorNode::from_value(&json!({
            "path": "src/lib.rs",
            "type": "file",
            "size": 2048,
            "last_modified": "2024-03-01T12:00:00+09:00"
        }));
        assert_eq!(node.kind.as_deref(), Some("file"));
        assert_eq!(node.size_bytes, 2048);
        assert_eq!(node.last_modified.as_deref(), Some("2024-03-01T12:00:00+09:00"));
    }

    #[test]
    fn test_malformed_element_yields_absent_fields() {
        let mirror = ContextMirror::shape(json!({"nodes": ["oops", 42, {"size": "big"}]})).unwrap();
        assert_eq!(mirror.len(), 3);
        for node in mirror.nodes() {
            assert_eq!(node, &MirrorNode::empty());
        }
    }

    #[test]
    fn test_metadata_is_kept_as_is() {
        let mirror = ContextMirror::shape(json!({
            "nodes": [],
            "metadata": {"root": ".", "depth": 2, "tags": ["a", "b"]}
        }))
        .unwrap();
        assert_eq!(mirror.metadata().get("depth"), Some(&json!(2)));
        assert_eq!(mirror.metadata().get("tags"), Some(&json!(["a", "b"])));
    }

    #[test]
    fn test_null_sections_use_defaults() {
        let mirror = ContextMirror::shape(json!({"nodes": null, "metadata": null})).unwrap();
        assert!(mirror.is_empty());
        assert!(mirror.metadata().is_empty());
    }

    #[test]
    fn test_raw_keeps_unmodeled_fields() {
        let payload = json!({"nodes": [], "cursor": "abc"});
        let mirror = ContextMirror::shape(payload.clone()).unwrap();
        assert_eq!(mirror.into_raw(), payload);
    }

    #[test]
    fn test_rejects_non_object_payload() {
        let err = ContextMirror::shape(json!([1, 2])).unwrap_err();
        assert!(matches!(err, AxisError::MalformedMirror(_)));
    }

    #[test]
    fn test_rejects_non_array_nodes() {
        let err = ContextMirror::shape(json!({"nodes": {"path": "a"}})).unwrap_err();
        assert!(err.to_string().contains("`nodes` is not an array"));
    }

    #[test]
    fn test_non_object_metadata_keeps_nodes() {
        let payload = json!({"nodes": [{"path": "a", "type": "file"}], "metadata": "v1"});
        let mirror = ContextMirror::shape(payload).unwrap();
        assert!(mirror.metadata().is_empty());
        assert_eq!(mirror.len(), 1);
        assert_eq!(mirror.nodes()[0].path.as_deref(), Some("a"));
        assert_eq!(mirror.raw()["metadata"], json!("v1"));
    }

    #[test]
    fn test_unnamed_node_stays_in_place() {
        let mirror = ContextMirror::shape(json!({
            "nodes": [
                {"path": "a", "type": "file"},
                {"type": "file", "size": 10},
                {"name": "c", "type": "dir"}
            ]
        }))
        .unwrap();
        assert_eq!(unnamed_nodes(mirror.nodes()), vec![1]);
        assert_eq!(mirror.nodes()[1].size_bytes, 10);
        assert_eq!(
            mirror.render_prompt(),
            "Axis Context Mirror:\n- a (file)\n- <unknown> (file)\n- c (dir)\n"
        );
    }

    #[test]
    fn test_serialized_form_uses_wire_names() {
        let mirror = ContextMirror::shape(json!({
            "nodes": [{"name": "a.txt", "type": "file", "size": 5}],
            "metadata": {"root": "."},
            "cursor": "abc"
        }))
        .unwrap();
        assert_eq!(
            serde_json::to_value(&mirror).unwrap(),
            json!({
                "nodes": [{"path": "a.txt", "type": "file", "size": 5, "last_modified": null}],
                "metadata": {"root": "."}
            })
        );
    }

    #[test]
    fn test_shape_is_idempotent() {
        let payload = json!({"nodes": [{"name": "a", "type": "file"}], "metadata": {"k": 1}});
        let first = ContextMirror::shape(payload.clone()).unwrap();
        let second = ContextMirror::shape(payload).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_render_prompt_exact() {
        let mirror = ContextMirror::shape(json!({
            "nodes": [
                {"path": "a", "type": "file"},
                {"path": "b", "type": "dir"}
            ]
        }))
        .unwrap();
        assert_eq!(mirror.render_prompt(), "Axis Context Mirror:\n- a (file)\n- b (dir)\n");
        assert_eq!(mirror.to_string(), mirror.render_prompt());
    }

    #[test]
    fn test_render_prompt_empty_mirror() {
        let mirror = ContextMirror::shape(json!({})).unwrap();
        assert_eq!(mirror.to_prompt(), "Axis Context Mirror:\n");
    }

    #[test]
    fn test_render_prompt_does_not_escape() {
        let mirror = ContextMirror::shape(json!({
            "nodes": [{"path": "dir with (parens)/\"q\".md", "type": "file\tx"}]
        }))
        .unwrap();
        assert_eq!(
            mirror.render_prompt(),
            "Axis Context Mirror:\n- dir with (parens)/\"q\".md (file\tx)\n"
        );
    }

    #[test]
    fn test_render_prompt_unknown_fields() {
        let mirror = ContextMirror::shape(json!({"nodes": [{"size": 3}]})).unwrap();
        assert_eq!(mirror.render_prompt(), "Axis Context Mirror:\n- <unknown> (<unknown>)\n");
    }

    #[test]
    fn test_first_present() {
        let obj = json!({"name": "n", "path": 7}).as_object().cloned().unwrap();
        assert_eq!(first_present(&obj, &["path", "name"]), Some("n"));
        assert_eq!(first_present(&obj, &["missing"]), None);
    }
}
