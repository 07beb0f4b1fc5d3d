//! Plain Rust types exchanged between the gRPC layer and the provider.
//!
//! These wrap the protobuf messages in [`crate::generated`] with decoded JSON
//! values so provider code never handles raw bytes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A change to a single attribute during a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeChange {
    /// The path to the attribute that changed.
    pub path: String,
    /// The value before the change, `None` when the attribute is added.
    pub before: Option<Value>,
    /// The value after the change, `None` when the attribute is removed.
    pub after: Option<Value>,
}

impl AttributeChange {
    /// Create a new attribute change.
    pub fn new(path: impl Into<String>, before: Option<Value>, after: Option<Value>) -> Self {
        Self {
            path: path.into(),
            before,
            after,
        }
    }

    /// A change for an attribute that did not exist before.
    pub fn added(path: impl Into<String>, value: Value) -> Self {
        Self::new(path, None, Some(value))
    }

    /// A change for an attribute that no longer exists.
    pub fn removed(path: impl Into<String>, value: Value) -> Self {
        Self::new(path, Some(value), None)
    }

    /// A change for an attribute whose value differs.
    pub fn modified(path: impl Into<String>, before: Value, after: Value) -> Self {
        Self::new(path, Some(before), Some(after))
    }
}

impl From<crate::generated::AttributeChange> for AttributeChange {
    fn from(proto: crate::generated::AttributeChange) -> Self {
        Self {
            path: proto.path,
            before: decode_optional(&proto.before),
            after: decode_optional(&proto.after),
        }
    }
}

impl From<AttributeChange> for crate::generated::AttributeChange {
    fn from(change: AttributeChange) -> Self {
        Self {
            path: change.path,
            before: encode_optional(change.before.as_ref()),
            after: encode_optional(change.after.as_ref()),
        }
    }
}

/// The result of planning a resource change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanResult {
    /// The state the resource will have once the plan is applied.
    pub planned_state: Value,
    /// The attribute changes, ordered by attribute name.
    pub changes: Vec<AttributeChange>,
    /// Whether the object must be destroyed and created again.
    pub requires_replace: bool,
}

impl PlanResult {
    /// A plan that leaves the resource untouched.
    pub fn no_change(state: Value) -> Self {
        Self {
            planned_state: state,
            changes: Vec::new(),
            requires_replace: false,
        }
    }

    /// A plan with changes.
    pub fn with_changes(
        planned_state: Value,
        changes: Vec<AttributeChange>,
        requires_replace: bool,
    ) -> Self {
        Self {
            planned_state,
            changes,
            requires_replace,
        }
    }

    /// Whether applying this plan does anything.
    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }
}

/// A resource produced by an import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportedResource {
    /// The resource type.
    pub resource_type: String,
    /// The imported state.
    pub state: Value,
}

impl ImportedResource {
    /// Create a new imported resource.
    pub fn new(resource_type: impl Into<String>, state: Value) -> Self {
        Self {
            resource_type: resource_type.into(),
            state,
        }
    }
}

impl From<ImportedResource> for crate::generated::ImportedResource {
    fn from(resource: ImportedResource) -> Self {
        Self {
            resource_type: resource.resource_type,
            state: encode(&resource.state),
        }
    }
}

/// Provider metadata returned by GetMetadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ProviderMetadata {
    /// Resource type names.
    pub resources: Vec<String>,
    /// Data source type names.
    pub data_sources: Vec<String>,
    /// Server capabilities.
    pub capabilities: ServerCapabilities,
}

/// Server capability flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ServerCapabilities {
    /// Whether the provider wants to be asked to plan destroy operations.
    pub plan_destroy: bool,
}

/// Version of the plugin handshake itself.
pub const CORE_PROTOCOL_VERSION: u32 = 1;

/// Version of the `Provider` gRPC protocol.
pub const PROTOCOL_VERSION: u32 = 1;

/// Environment variable the host sets before launching the plugin.
pub const MAGIC_COOKIE_KEY: &str = "TF_PLUGIN_MAGIC_COOKIE";

/// Value the host stores in [`MAGIC_COOKIE_KEY`].
pub const MAGIC_COOKIE_VALUE: &str =
    "d602bf8f470bc67ca7faa0386276bbdd4330efaf76d1a219cb4d6991ca9872b2";

/// Format the handshake line written to stdout once the server listens.
///
/// ```
/// use terraform_provider_fram::types::handshake_line;
///
/// let addr = "127.0.0.1:50051".parse().unwrap();
/// assert_eq!(handshake_line(addr), "1|1|tcp|127.0.0.1:50051|grpc");
/// ```
pub fn handshake_line(addr: std::net::SocketAddr) -> String {
    format!(
        "{}|{}|tcp|{}|grpc",
        CORE_PROTOCOL_VERSION, PROTOCOL_VERSION, addr
    )
}

/// Decode JSON bytes from the wire, treating empty payloads as `null`.
pub(crate) fn decode(bytes: &[u8]) -> Result<Value, serde_json::Error> {
    if bytes.is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_slice(bytes)
}

/// Encode a value for the wire.
pub(crate) fn encode(value: &Value) -> Vec<u8> {
    serde_json::to_vec(value).unwrap_or_default()
}

fn decode_optional(bytes: &[u8]) -> Option<Value> {
    if bytes.is_empty() {
        None
    } else {
        serde_json::from_slice(bytes).ok()
    }
}

fn encode_optional(value: Option<&Value>) -> Vec<u8> {
    value.map(encode).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_attribute_change_constructors() {
        let added = AttributeChange::added("name", json!("ci"));
        assert!(added.before.is_none());
        assert_eq!(added.after, Some(json!("ci")));

        let removed = AttributeChange::removed("name", json!("old"));
        assert_eq!(removed.before, Some(json!("old")));
        assert!(removed.after.is_none());

        let modified =
            AttributeChange::modified("source", json!("FIXED_VALUE"), json!("REQUEST_VALUES"));
        assert_eq!(modified.before, Some(json!("FIXED_VALUE")));
        assert_eq!(modified.after, Some(json!("REQUEST_VALUES")));
    }

    #[test]
    fn test_attribute_change_proto_keeps_absence() {
        let proto: crate::generated::AttributeChange =
            AttributeChange::added("scopes", json!(["fr:am:*"])).into();
        assert!(proto.before.is_empty());
        assert_eq!(proto.after, br#"["fr:am:*"]"#.to_vec());

        let back: AttributeChange = proto.into();
        assert!(back.before.is_none());
        assert_eq!(back.after, Some(json!(["fr:am:*"])));
    }

    #[test]
    fn test_plan_result() {
        let no_change = PlanResult::no_change(json!({"id": "baseurl"}));
        assert!(!no_change.has_changes());
        assert!(!no_change.requires_replace);

        let plan = PlanResult::with_changes(
            json!({"id": "baseurl", "context_path": "/am"}),
            vec![AttributeChange::modified("context_path", json!("/openam"), json!("/am"))],
            false,
        );
        assert!(plan.has_changes());
    }

    #[test]
    fn test_imported_resource_to_proto() {
        let imported = ImportedResource::new("fram_am_baseurlsource", json!({"id": "baseurl"}));
        let proto: crate::generated::ImportedResource = imported.into();
        assert_eq!(proto.resource_type, "fram_am_baseurlsource");
        assert_eq!(decode(&proto.state).unwrap()["id"], "baseurl");
    }

    #[test]
    fn test_decode_empty_is_null() {
        assert_eq!(decode(b"").unwrap(), Value::Null);
        assert_eq!(decode(b"null").unwrap(), Value::Null);
        assert!(decode(b"{").is_err());
    }

    #[test]
    fn test_handshake_line() {
        let addr: std::net::SocketAddr = "127.0.0.1:4000".parse().unwrap();
        assert_eq!(handshake_line(addr), "1|1|tcp|127.0.0.1:4000|grpc");
        assert_eq!(MAGIC_COOKIE_KEY, "TF_PLUGIN_MAGIC_COOKIE");
    }
}
