use std::{borrow::Borrow, fmt};

use chrono::{DateTime, Utc};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

/// Name of a condition. Open ended: each resource kind brings its own.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, JsonSchema)]
#[serde(transparent)]
pub struct ConditionType(String);

impl ConditionType {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConditionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConditionType {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for ConditionType {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl Borrow<str> for ConditionType {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for ConditionType {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for ConditionType {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Happy type of long-running resources.
pub const CONDITION_READY: &str = "Ready";
/// Happy type of run-to-completion resources.
pub const CONDITION_SUCCEEDED: &str = "Succeeded";

/// Kubernetes conditions only allow `True`, `False` and `Unknown`.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, Default, PartialEq, Eq, JsonSchema)]
pub enum ConditionStatus {
    True,
    False,
    #[default]
    Unknown,
}

impl fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConditionStatus::True => write!(f, "True"),
            ConditionStatus::False => write!(f, "False"),
            ConditionStatus::Unknown => write!(f, "Unknown"),
        }
    }
}

/// How much a non-True condition matters to the aggregate.
///
/// Only `Error` participates in readiness; `Warning` and `Info` are surfaced
/// on their own condition entry and never pull the aggregate below True.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, Default, PartialEq, Eq, JsonSchema)]
pub enum ConditionSeverity {
    #[default]
    #[serde(alias = "")]
    Error,
    Warning,
    Info,
}

impl ConditionSeverity {
    pub fn is_error(&self) -> bool {
        matches!(self, ConditionSeverity::Error)
    }
}

/// A point-in-time fact about a resource's observed state.
#[skip_serializing_none]
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type")]
    pub type_: ConditionType,
    pub status: ConditionStatus,
    #[serde(default, skip_serializing_if = "ConditionSeverity::is_error")]
    pub severity: ConditionSeverity,
    /// Only moves when `status` changes value.
    pub last_transition_time: Option<Time>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reason: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
}

impl Condition {
    pub fn new(type_: impl Into<ConditionType>, status: ConditionStatus) -> Self {
        Self {
            type_: type_.into(),
            status,
            severity: ConditionSeverity::Error,
            last_transition_time: None,
            reason: String::new(),
            message: String::new(),
        }
    }

    pub fn with_severity(mut self, severity: ConditionSeverity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>, message: impl Into<String>) -> Self {
        self.reason = reason.into();
        self.message = message.into();
        self
    }

    pub fn is_true(&self) -> bool {
        self.status == ConditionStatus::True
    }

    pub fn is_false(&self) -> bool {
        self.status == ConditionStatus::False
    }

    pub fn is_unknown(&self) -> bool {
        self.status == ConditionStatus::Unknown
    }

    pub fn last_transition(&self) -> Option<DateTime<Utc>> {
        self.last_transition_time.as_ref().map(|t| t.0)
    }
}

/// Ordered, type-deduplicated list of conditions.
///
/// Order is insertion order; lookups go by type.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(transparent)]
pub struct ConditionStore(Vec<Condition>);

impl ConditionStore {
    pub fn get(&self, type_: &str) -> Option<&Condition> {
        self.0.iter().find(|c| c.type_ == type_)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Condition> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Insert or update a condition in place, moving `last_transition_time`
    /// to `now` only when the status changes. Returns whether anything changed.
    pub fn upsert(&mut self, mut new_cond: Condition, now: DateTime<Utc>) -> bool {
        match self.0.iter_mut().find(|c| c.type_ == new_cond.type_) {
            Some(existing) => {
                if existing.status != new_cond.status {
                    new_cond.last_transition_time = Some(Time(now));
                    *existing = new_cond;
                    return true;
                }
                new_cond.last_transition_time = existing
                    .last_transition_time
                    .clone()
                    .or_else(|| Some(Time(now)));
                if *existing == new_cond {
                    return false;
                }
                *existing = new_cond;
                true
            }
            None => {
                new_cond.last_transition_time = Some(Time(now));
                self.0.push(new_cond);
                true
            }
        }
    }

    /// Drop the condition of the given type, keeping the order of the rest.
    pub fn remove(&mut self, type_: &str) -> Option<Condition> {
        let pos = self.0.iter().position(|c| c.type_ == type_)?;
        Some(self.0.remove(pos))
    }

    pub fn into_inner(self) -> Vec<Condition> {
        self.0
    }
}

impl From<Vec<Condition>> for ConditionStore {
    /// Later duplicates of a type are dropped.
    fn from(conditions: Vec<Condition>) -> Self {
        let mut deduped: Vec<Condition> = Vec::with_capacity(conditions.len());
        for cond in conditions {
            if !deduped.iter().any(|c| c.type_ == cond.type_) {
                deduped.push(cond);
            }
        }
        Self(deduped)
    }
}

impl From<&[Condition]> for ConditionStore {
    fn from(conditions: &[Condition]) -> Self {
        Self::from(conditions.to_vec())
    }
}
