//! Validation of JSON configuration against a [`Schema`].
//!
//! # Example
//!
//! ```
//! use terraform_provider_fram::schema::{Attribute, Schema};
//! use terraform_provider_fram::validation::validate;
//! use serde_json::json;
//!
//! let schema = Schema::v0()
//!     .with_attribute("source", Attribute::required_string())
//!     .with_attribute("extension_class_name", Attribute::optional_string());
//!
//! assert!(validate(&schema, &json!({"source": "FIXED_VALUE"})).is_empty());
//!
//! let diagnostics = validate(&schema, &json!({"source": 42}));
//! assert_eq!(diagnostics.len(), 1);
//! assert_eq!(diagnostics[0].attribute.as_deref(), Some("source"));
//! ```

use crate::schema::{Attribute, AttributeType, Diagnostic, Schema};
use serde_json::Value;

/// Validate a JSON object against a schema.
///
/// - required attributes must be present and non-null;
/// - computed-only attributes are skipped;
/// - values must match the attribute type, recursively;
/// - attributes the schema does not declare are rejected.
pub fn validate(schema: &Schema, value: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    let obj = match value {
        Value::Object(map) => map,
        Value::Null => {
            for (name, attr) in &schema.attributes {
                validate_attribute(name, attr, None, &mut diagnostics);
            }
            return diagnostics;
        }
        other => {
            diagnostics.push(
                Diagnostic::error("Expected object")
                    .with_detail(format!("Got {}", type_name(other))),
            );
            return diagnostics;
        }
    };

    for (name, attr) in &schema.attributes {
        validate_attribute(name, attr, obj.get(name), &mut diagnostics);
    }

    for name in obj.keys() {
        if schema.attribute(name).is_none() {
            diagnostics.push(
                Diagnostic::error("Unsupported argument")
                    .with_detail(format!("An argument named '{}' is not expected here", name))
                    .with_attribute(name.clone()),
            );
        }
    }

    diagnostics
}

/// Validate a JSON object, returning the diagnostics as an error if any were found.
pub fn validate_result(schema: &Schema, value: &Value) -> Result<(), Vec<Diagnostic>> {
    let diagnostics = validate(schema, value);
    if diagnostics.is_empty() {
        Ok(())
    } else {
        Err(diagnostics)
    }
}

/// Check whether a JSON object is valid against a schema.
pub fn is_valid(schema: &Schema, value: &Value) -> bool {
    validate(schema, value).is_empty()
}

/// Check that a string attribute holds one of the allowed values.
///
/// Missing and null values are accepted; presence is enforced by the schema.
pub fn one_of(value: &Value, attribute: &str, allowed: &[&str]) -> Option<Diagnostic> {
    let actual = value.get(attribute).and_then(Value::as_str)?;
    if allowed.contains(&actual) {
        return None;
    }
    Some(
        Diagnostic::error(format!("Invalid value for '{}'", attribute))
            .with_detail(format!(
                "Expected one of {}, got '{}'",
                allowed.join(", "),
                actual
            ))
            .with_attribute(attribute),
    )
}

fn validate_attribute(
    name: &str,
    attr: &Attribute,
    value: Option<&Value>,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if attr.flags.is_computed_only() {
        return;
    }

    match value {
        None | Some(Value::Null) => {
            if attr.flags.required {
                diagnostics.push(
                    Diagnostic::error(format!("Missing required attribute '{}'", name))
                        .with_detail("This attribute is required and must be provided")
                        .with_attribute(name),
                );
            }
        }
        Some(v) => validate_type(&attr.attr_type, v, name, diagnostics),
    }
}

fn validate_type(
    attr_type: &AttributeType,
    value: &Value,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match attr_type {
        AttributeType::String if !value.is_string() => {
            diagnostics.push(type_error(path, "string", value));
        }
        AttributeType::Int64 if !is_int64(value) => {
            diagnostics.push(type_error(path, "int64", value));
        }
        AttributeType::Bool if !value.is_boolean() => {
            diagnostics.push(type_error(path, "bool", value));
        }
        AttributeType::List(element_type) => match value.as_array() {
            Some(items) => {
                for (i, item) in items.iter().enumerate() {
                    validate_type(element_type, item, &format!("{}.{}", path, i), diagnostics);
                }
            }
            None => diagnostics.push(type_error(path, "list", value)),
        },
        AttributeType::Map(value_type) => match value.as_object() {
            Some(entries) => {
                for (key, item) in entries {
                    validate_type(value_type, item, &format!("{}.{}", path, key), diagnostics);
                }
            }
            None => diagnostics.push(type_error(path, "map", value)),
        },
        _ => {}
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn is_int64(value: &Value) -> bool {
    match value {
        Value::Number(n) if n.is_i64() => true,
        Value::Number(n) => n
            .as_f64()
            .map(|f| f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64)
            .unwrap_or(false),
        _ => false,
    }
}

fn type_error(path: &str, expected: &str, got: &Value) -> Diagnostic {
    Diagnostic::error(format!("Invalid type for attribute '{}'", path))
        .with_detail(format!("Expected {}, got {}", expected, type_name(got)))
        .with_attribute(path)
}
