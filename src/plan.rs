//! Plan computation shared by every resource.
//!
//! Planning is a pure diff of the prior state against the proposed state,
//! driven by the resource [`Schema`]: computed-only attributes survive an
//! update unchanged and `force_new` attributes turn a change into a replace.

use serde_json::{Map, Value};

use crate::schema::Schema;
use crate::types::{AttributeChange, PlanResult};

/// Compute the plan for a resource.
///
/// `prior` is `None` when the resource does not exist yet. A `null`
/// `proposed` state plans the destruction of the resource.
pub fn plan_resource(schema: &Schema, prior: Option<&Value>, proposed: &Value) -> PlanResult {
    let prior = prior.filter(|value| !value.is_null());
    match (prior, proposed) {
        (None, Value::Null) => PlanResult::no_change(Value::Null),
        (None, proposed) => plan_create(proposed),
        (Some(prior), Value::Null) => plan_delete(prior),
        (Some(prior), proposed) => plan_update(schema, prior, proposed),
    }
}

fn plan_create(proposed: &Value) -> PlanResult {
    let changes = attributes(proposed)
        .filter(|(_, value)| !value.is_null())
        .map(|(name, value)| AttributeChange::added(name.clone(), value.clone()))
        .collect();
    PlanResult::with_changes(proposed.clone(), changes, false)
}

fn plan_delete(prior: &Value) -> PlanResult {
    let changes = attributes(prior)
        .filter(|(_, value)| !value.is_null())
        .map(|(name, value)| AttributeChange::removed(name.clone(), value.clone()))
        .collect();
    PlanResult::with_changes(Value::Null, changes, false)
}

fn plan_update(schema: &Schema, prior: &Value, proposed: &Value) -> PlanResult {
    let mut planned = proposed.as_object().cloned().unwrap_or_default();

    for (name, attr) in &schema.attributes {
        if !attr.flags.is_computed_only() {
            continue;
        }
        let unset = planned.get(name).map_or(true, Value::is_null);
        if unset {
            if let Some(value) = prior.get(name) {
                planned.insert(name.clone(), value.clone());
            }
        }
    }

    let empty = Map::new();
    let prior_obj = prior.as_object().unwrap_or(&empty);

    let mut names: Vec<&String> = prior_obj.keys().chain(planned.keys()).collect();
    names.sort();
    names.dedup();

    let mut changes = Vec::new();
    let mut requires_replace = false;
    for name in names {
        let before = prior_obj.get(name).filter(|v| !v.is_null());
        let after = planned.get(name).filter(|v| !v.is_null());
        if before == after {
            continue;
        }
        if schema.attribute(name).map_or(false, |attr| attr.force_new) {
            requires_replace = true;
        }
        changes.push(AttributeChange::new(
            name.clone(),
            before.cloned(),
            after.cloned(),
        ));
    }

    PlanResult::with_changes(Value::Object(planned), changes, requires_replace)
}

fn attributes(value: &Value) -> impl Iterator<Item = (&String, &Value)> {
    value.as_object().into_iter().flat_map(|obj| obj.iter())
}
