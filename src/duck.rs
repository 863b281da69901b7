//! Structural ("duck type") conformance checks.
//!
//! Generic controller code is written against a small shape such as "has a
//! `status.conditions` list". Before handing it a concrete kind we confirm
//! that kind serializes to a superset of that shape.

use std::fmt;

use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use serde_path_to_error::Segment;
use thiserror::Error;
use tracing::*;

pub mod v1;

/// A value that can fill itself with representative data, so every field
/// of its shape shows up when serialized.
pub trait Populatable {
    fn populate(&mut self);
}

/// A duck type: names the full shape a conforming kind must expose.
pub trait Implementable {
    type FullType: Populatable + Serialize + Default;

    fn full_type() -> Self::FullType {
        let mut full = Self::FullType::default();
        full.populate();
        full
    }
}

/// JSON leaf/branch kinds compared by the verifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueKind {
    Null,
    Bool,
    Number,
    String,
    Array,
    Object,
}

impl ValueKind {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Number(_) => ValueKind::Number,
            Value::String(_) => ValueKind::String,
            Value::Array(_) => ValueKind::Array,
            Value::Object(_) => ValueKind::Object,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Null => "null",
            ValueKind::Bool => "bool",
            ValueKind::Number => "number",
            ValueKind::String => "string",
            ValueKind::Array => "array",
            ValueKind::Object => "object",
        };
        f.write_str(name)
    }
}

/// One way a concrete kind falls short of a duck type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PathDiff {
    Missing {
        path: String,
    },
    KindMismatch {
        path: String,
        expected: ValueKind,
        found: ValueKind,
    },
    /// The concrete type refused the value the duck puts at `path`.
    Rejected {
        path: String,
        message: String,
    },
}

impl PathDiff {
    pub fn path(&self) -> &str {
        match self {
            PathDiff::Missing { path }
            | PathDiff::KindMismatch { path, .. }
            | PathDiff::Rejected { path, .. } => path,
        }
    }
}

impl fmt::Display for PathDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathDiff::Missing { path } => write!(f, "missing field `{path}`"),
            PathDiff::KindMismatch {
                path,
                expected,
                found,
            } => write!(f, "field `{path}` is {found}, expected {expected}"),
            PathDiff::Rejected { path, message } => write!(f, "field `{path}` rejected: {message}"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{concrete} does not implement {duck}:{}", render(.diffs))]
pub struct ConformanceError {
    pub concrete: &'static str,
    pub duck: &'static str,
    pub diffs: Vec<PathDiff>,
}

impl ConformanceError {
    pub fn is_missing(&self, path: &str) -> bool {
        self.diffs
            .iter()
            .any(|d| matches!(d, PathDiff::Missing { path: p } if p == path))
    }

    pub fn is_rejected(&self, path: &str) -> bool {
        self.diffs
            .iter()
            .any(|d| matches!(d, PathDiff::Rejected { path: p, .. } if p == path))
    }
}

fn render(diffs: &[PathDiff]) -> String {
    diffs.iter().map(|d| format!("\n  - {d}")).collect()
}

const ROOT: &str = "<root>";
const MAX_REPAIRS: usize = 64;

/// Check that `C` exposes every field of the duck type `D`.
///
/// The duck's populated document is laid over `instance`, read back into
/// `C` and serialized again; anything `C` dropped or retyped on the way is
/// reported. Values `C` refuses are reported at their path, then swapped
/// for the instance's own value (or dropped) so the read-back can go on.
pub fn verify_type<D, C>(instance: &C) -> Result<(), ConformanceError>
where
    D: Implementable,
    C: Serialize + DeserializeOwned,
{
    let concrete = std::any::type_name::<C>();
    let duck = std::any::type_name::<D>();
    let fail = |diffs| ConformanceError {
        concrete,
        duck,
        diffs,
    };

    let expected = serde_json::to_value(D::full_type()).map_err(|e| {
        fail(vec![PathDiff::Rejected {
            path: ROOT.to_string(),
            message: format!("duck type does not serialize: {e}"),
        }])
    })?;
    let representative = serde_json::to_value(instance).map_err(|e| {
        fail(vec![PathDiff::Rejected {
            path: ROOT.to_string(),
            message: format!("instance does not serialize: {e}"),
        }])
    })?;

    let mut overlaid = representative.clone();
    overlay(&mut overlaid, &expected);

    let mut diffs = Vec::new();
    let mut repaired: Vec<String> = Vec::new();
    if let Some(actual) = read_back::<C>(overlaid, &representative, &mut diffs, &mut repaired) {
        let mut found = Vec::new();
        walk(&mut String::new(), &expected, &actual, &mut found);
        // Paths already reported as rejected are not reported twice
        diffs.extend(
            found
                .into_iter()
                .filter(|d| !repaired.iter().any(|r| is_within(d.path(), r))),
        );
    }

    if diffs.is_empty() {
        debug!("{concrete} implements {duck}");
        Ok(())
    } else {
        let err = fail(diffs);
        warn!("{err}");
        Err(err)
    }
}

/// Deserialize `doc` as `C` and serialize it again, repairing every value
/// `C` refuses. `None` when the document cannot be repaired.
fn read_back<C>(
    mut doc: Value,
    representative: &Value,
    diffs: &mut Vec<PathDiff>,
    repaired: &mut Vec<String>,
) -> Option<Value>
where
    C: Serialize + DeserializeOwned,
{
    for _ in 0..MAX_REPAIRS {
        let err = match serde_path_to_error::deserialize::<_, C>(doc.clone()) {
            Ok(concrete) => match serde_json::to_value(concrete) {
                Ok(actual) => return Some(actual),
                Err(e) => {
                    diffs.push(PathDiff::Rejected {
                        path: ROOT.to_string(),
                        message: e.to_string(),
                    });
                    return None;
                }
            },
            Err(err) => err,
        };
        let steps = steps_of(err.path());
        let path = render_steps(&steps);
        // Refusals caused by an earlier repair (e.g. the field it dropped
        // was required) are not the duck's fault
        if !repaired.iter().any(|r| is_within(r, &path)) {
            diffs.push(PathDiff::Rejected {
                path: path.clone(),
                message: err.into_inner().to_string(),
            });
        }
        let fallback = lookup(representative, &steps)
            .filter(|v| lookup(&doc, &steps) != Some(*v))
            .cloned();
        if !replace(&mut doc, &steps, fallback) {
            return None;
        }
        repaired.push(path);
    }
    None
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Step {
    Key(String),
    Index(usize),
}

fn steps_of(path: &serde_path_to_error::Path) -> Vec<Step> {
    let mut steps = Vec::new();
    for segment in path.iter() {
        match segment {
            Segment::Seq { index } => steps.push(Step::Index(*index)),
            Segment::Map { key } => steps.push(Step::Key(key.clone())),
            Segment::Enum { variant } => steps.push(Step::Key(variant.clone())),
            _ => break,
        }
    }
    steps
}

fn render_steps(steps: &[Step]) -> String {
    let mut path = String::new();
    for step in steps {
        match step {
            Step::Key(key) => {
                if !path.is_empty() {
                    path.push('.');
                }
                path.push_str(key);
            }
            Step::Index(index) => path.push_str(&format!("[{index}]")),
        }
    }
    display_path(&path)
}

fn lookup<'v>(value: &'v Value, steps: &[Step]) -> Option<&'v Value> {
    steps.iter().try_fold(value, |node, step| match step {
        Step::Key(key) => node.get(key.as_str()),
        Step::Index(index) => node.get(*index),
    })
}

/// Put `with` at `steps`, or drop the node there when `with` is `None`.
fn replace(doc: &mut Value, steps: &[Step], with: Option<Value>) -> bool {
    let Some((last, parents)) = steps.split_last() else {
        return false;
    };
    let Some(parent) = parents.iter().try_fold(doc, |node, step| match step {
        Step::Key(key) => node.get_mut(key.as_str()),
        Step::Index(index) => node.get_mut(*index),
    }) else {
        return false;
    };
    match (parent, last, with) {
        (Value::Object(map), Step::Key(key), Some(value)) => {
            map.insert(key.clone(), value);
            true
        }
        (Value::Object(map), Step::Key(key), None) => map.remove(key).is_some(),
        (Value::Array(items), Step::Index(index), Some(value)) if *index < items.len() => {
            items[*index] = value;
            true
        }
        (Value::Array(items), Step::Index(index), None) if *index < items.len() => {
            items.remove(*index);
            true
        }
        _ => false,
    }
}

/// Whether `path` is `prefix` or lies below it.
fn is_within(path: &str, prefix: &str) -> bool {
    path == prefix
        || prefix == ROOT
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('.') || rest.starts_with('['))
}

/// Deep-merge `top` into `base`; `top` wins on conflicts.
fn overlay(base: &mut Value, top: &Value) {
    match (base, top) {
        (Value::Object(base), Value::Object(top)) => {
            for (key, value) in top {
                match base.get_mut(key) {
                    Some(existing) => overlay(existing, value),
                    None => {
                        base.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (base, top) => *base = top.clone(),
    }
}

fn walk(path: &mut String, expected: &Value, actual: &Value, diffs: &mut Vec<PathDiff>) {
    let (want, got) = (ValueKind::of(expected), ValueKind::of(actual));
    if want == ValueKind::Null {
        return;
    }
    if want != got {
        diffs.push(PathDiff::KindMismatch {
            path: display_path(path),
            expected: want,
            found: got,
        });
        return;
    }
    match (expected, actual) {
        (Value::Object(expected), Value::Object(actual)) => walk_fields(path, expected, actual, diffs),
        // Element shape is judged by the first element on each side
        (Value::Array(expected), Value::Array(actual)) => {
            if let (Some(want), Some(got)) = (expected.first(), actual.first()) {
                let len = path.len();
                path.push_str("[0]");
                walk(path, want, got, diffs);
                path.truncate(len);
            }
        }
        _ => {}
    }
}

fn walk_fields(
    path: &mut String,
    expected: &Map<String, Value>,
    actual: &Map<String, Value>,
    diffs: &mut Vec<PathDiff>,
) {
    for (key, want) in expected {
        let len = path.len();
        if !path.is_empty() {
            path.push('.');
        }
        path.push_str(key);
        match actual.get(key) {
            Some(got) => walk(path, want, got, diffs),
            None => diffs.push(PathDiff::Missing { path: path.clone() }),
        }
        path.truncate(len);
    }
}

fn display_path(path: &str) -> String {
    if path.is_empty() {
        ROOT.to_string()
    } else {
        path.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Serialize, Default)]
    struct Shape {
        spec: ShapeSpec,
    }

    #[derive(Serialize, Default)]
    struct ShapeSpec {
        replicas: i32,
        selector: Vec<String>,
        template: Option<Template>,
    }

    #[derive(Serialize, Default)]
    struct Template {
        name: String,
    }

    impl Populatable for Shape {
        fn populate(&mut self) {
            self.spec.replicas = 3;
            self.spec.selector = vec!["app".into()];
            self.spec.template = Some(Template { name: "t".into() });
        }
    }

    struct Scalable;
    impl Implementable for Scalable {
        type FullType = Shape;
    }

    #[derive(Serialize, Deserialize, Default)]
    struct Good {
        spec: GoodSpec,
        extra: bool,
    }

    #[derive(Serialize, Deserialize, Default)]
    struct GoodSpec {
        replicas: i64,
        selector: Vec<String>,
        template: Option<serde_json::Value>,
        paused: bool,
    }

    #[derive(Serialize, Deserialize, Default)]
    struct Retyped {
        spec: RetypedSpec,
    }

    #[derive(Serialize, Deserialize, Default)]
    struct RetypedSpec {
        replicas: String,
        template: Option<String>,
    }

    #[test]
    fn superset_conforms() {
        verify_type::<Scalable, _>(&Good::default()).expect("conforms");
    }

    #[test]
    fn refused_values_are_reported_at_their_path() {
        let err = verify_type::<Scalable, _>(&Retyped::default()).unwrap_err();
        assert!(err.is_missing("spec.selector"));
        assert!(err.is_rejected("spec.replicas"));
        assert!(err.is_rejected("spec.template"));
        // Each refused path is reported once, not again as a kind mismatch
        assert_eq!(err.diffs.len(), 3, "{err}");
        let rendered = err.to_string();
        assert!(rendered.contains("field `spec.replicas` rejected"), "{rendered}");
    }

    #[derive(Serialize, Deserialize, Default)]
    struct Tagged {
        spec: TaggedSpec,
    }

    #[derive(Serialize, Deserialize, Default)]
    struct TaggedSpec {
        replicas: i64,
        selector: Vec<u8>,
        template: Option<serde_json::Value>,
    }

    #[test]
    fn refused_array_element_names_its_index() {
        let err = verify_type::<Scalable, _>(&Tagged::default()).unwrap_err();
        assert_eq!(err.diffs.len(), 1, "{err}");
        assert_eq!(err.diffs[0].path(), "spec.selector[0]");
        assert!(matches!(err.diffs[0], PathDiff::Rejected { .. }));
    }

    #[test]
    fn is_within_respects_segment_boundaries() {
        assert!(is_within("status", "status"));
        assert!(is_within("status.conditions[0]", "status"));
        assert!(is_within("status.conditions[0]", "status.conditions"));
        assert!(!is_within("statusText", "status"));
        assert!(!is_within("status", "status.conditions"));
        assert!(is_within("anything", ROOT));
    }

    #[test]
    fn walk_checks_first_array_element() {
        let expected = json!({"items": [{"name": "a", "port": 80}]});
        let actual = json!({"items": [{"name": "b"}, {"name": "c", "port": 81}]});
        let mut diffs = Vec::new();
        walk(&mut String::new(), &expected, &actual, &mut diffs);
        assert_eq!(
            diffs,
            vec![PathDiff::Missing {
                path: "items[0].port".into()
            }]
        );
    }

    #[test]
    fn walk_collects_every_diff() {
        let expected = json!({"a": 1, "b": {"c": "x", "d": true}, "e": []});
        let actual = json!({"b": {"c": 2}, "e": {}});
        let mut diffs = Vec::new();
        walk(&mut String::new(), &expected, &actual, &mut diffs);
        let paths: Vec<&str> = diffs.iter().map(PathDiff::path).collect();
        assert_eq!(paths, vec!["a", "b.c", "b.d", "e"]);
    }

    #[test]
    fn overlay_merges_nested_objects() {
        let mut base = json!({"spec": {"a": 1, "b": 2}, "keep": true});
        overlay(&mut base, &json!({"spec": {"b": 3, "c": 4}}));
        assert_eq!(base, json!({"spec": {"a": 1, "b": 3, "c": 4}, "keep": true}));
    }
}
