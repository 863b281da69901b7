use std::collections::BTreeMap;

use chrono::{TimeZone, Utc};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, Time};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use super::{Implementable, Populatable};
use crate::apis::{CONDITION_READY, Condition, ConditionStatus, DeriveConditions};

/// Status fields shared by every kind that reports conditions.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema, DeriveConditions)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    /// Spec generation this status was computed from.
    #[serde(default)]
    pub observed_generation: i64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

impl Populatable for Status {
    fn populate(&mut self) {
        self.observed_generation = 42;
        self.conditions = vec![Condition {
            last_transition_time: Some(Time(
                Utc.with_ymd_and_hms(1984, 2, 28, 18, 52, 0)
                    .single()
                    .unwrap_or_default(),
            )),
            ..Condition::new(CONDITION_READY, ConditionStatus::Unknown).with_reason("Foo", "Bar")
        }];
    }
}

/// Minimal resource shape: object metadata plus [`Status`].
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
pub struct KResource {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub status: Status,
}

impl Populatable for KResource {
    fn populate(&mut self) {
        self.status.populate();
    }
}

/// Duck type for "has `status.conditions`".
pub struct Conditions;

impl Implementable for Conditions {
    type FullType = KResource;
}

/// Something reachable at a URL.
#[skip_serializing_none]
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Addressable {
    pub name: Option<String>,
    pub url: Option<String>,
}

/// Reference to another object, possibly of a kind unknown at compile time.
#[skip_serializing_none]
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct KReference {
    pub kind: String,
    pub name: String,
    pub namespace: Option<String>,
    pub api_version: Option<String>,
}
