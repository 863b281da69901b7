use chrono::{DateTime, Utc};
use tracing::*;

use super::{
    Condition, ConditionSeverity, ConditionStatus, ConditionStore, ConditionType, StatusAccessor,
    CONDITION_READY, CONDITION_SUCCEEDED,
};
use crate::{Error, Result};

/// Source of `last_transition_time` values.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

static SYSTEM_CLOCK: SystemClock = SystemClock;

/// Declares which conditions roll up into a resource kind's top-level
/// ("happy") condition. Built once per kind and never mutated.
#[derive(Clone, Debug, PartialEq)]
pub struct ConditionSet {
    happy: ConditionType,
    dependents: Vec<ConditionType>,
}

impl ConditionSet {
    /// Validate and build a set. The happy type may not also be a dependent,
    /// and no dependent may be declared twice.
    pub fn try_new<I, T>(happy: impl Into<ConditionType>, dependents: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<ConditionType>,
    {
        let happy = happy.into();
        let mut deps: Vec<ConditionType> = Vec::new();
        for dep in dependents.into_iter().map(Into::into) {
            if dep == happy {
                return Err(Error::InvalidConditionSet(format!(
                    "dependent `{dep}` collides with the happy condition type"
                )));
            }
            if deps.contains(&dep) {
                return Err(Error::InvalidConditionSet(format!(
                    "dependent `{dep}` is declared more than once"
                )));
            }
            deps.push(dep);
        }
        Ok(Self {
            happy,
            dependents: deps,
        })
    }

    /// Set for long-running resources, happy type `Ready`.
    ///
    /// # Panics
    /// On an invalid declaration; sets are declared at process start.
    pub fn living<I, T>(dependents: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<ConditionType>,
    {
        Self::declare(CONDITION_READY, dependents)
    }

    /// Set for run-to-completion resources, happy type `Succeeded`.
    ///
    /// # Panics
    /// On an invalid declaration; sets are declared at process start.
    pub fn batch<I, T>(dependents: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<ConditionType>,
    {
        Self::declare(CONDITION_SUCCEEDED, dependents)
    }

    fn declare<I, T>(happy: &str, dependents: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<ConditionType>,
    {
        match Self::try_new(happy, dependents) {
            Ok(set) => set,
            Err(e) => panic!("invalid condition set declaration: {e}"),
        }
    }

    pub fn happy_type(&self) -> &ConditionType {
        &self.happy
    }

    pub fn dependents(&self) -> &[ConditionType] {
        &self.dependents
    }

    pub fn is_dependent(&self, type_: &str) -> bool {
        self.dependents.iter().any(|d| d == type_)
    }

    /// Happy and dependent types cannot be cleared.
    pub fn is_terminal(&self, type_: &str) -> bool {
        self.happy == type_ || self.is_dependent(type_)
    }

    fn default_severity(&self, type_: &str) -> ConditionSeverity {
        if self.is_terminal(type_) {
            ConditionSeverity::Error
        } else {
            ConditionSeverity::Info
        }
    }

    /// Roll the dependents up into the happy condition. `None` when the set
    /// has no dependents; such sets drive the happy type directly.
    fn aggregate(&self, store: &ConditionStore) -> Option<Condition> {
        if self.dependents.is_empty() {
            return None;
        }
        let failed = self
            .dependents
            .iter()
            .filter_map(|d| store.get(d.as_str()))
            .find(|c| c.is_false() && c.severity.is_error());
        if let Some(cond) = failed {
            return Some(
                Condition::new(self.happy.clone(), ConditionStatus::False)
                    .with_reason(cond.reason.clone(), cond.message.clone()),
            );
        }
        // A dependent that was never written counts as Unknown
        let unknown = self.dependents.iter().find_map(|d| match store.get(d.as_str()) {
            None => Some((String::new(), String::new())),
            Some(c) if c.is_unknown() => Some((c.reason.clone(), c.message.clone())),
            Some(_) => None,
        });
        if let Some((reason, message)) = unknown {
            return Some(
                Condition::new(self.happy.clone(), ConditionStatus::Unknown)
                    .with_reason(reason, message),
            );
        }
        Some(Condition::new(self.happy.clone(), ConditionStatus::True))
    }

    /// Bind this set to a status for mutation.
    pub fn manage<'a, S>(&'a self, status: &'a mut S) -> ConditionManager<'a, S>
    where
        S: StatusAccessor + ?Sized,
    {
        self.manage_with_clock(status, &SYSTEM_CLOCK)
    }

    pub fn manage_with_clock<'a, S>(
        &'a self,
        status: &'a mut S,
        clock: &'a dyn Clock,
    ) -> ConditionManager<'a, S>
    where
        S: StatusAccessor + ?Sized,
    {
        ConditionManager {
            set: self,
            status,
            clock,
        }
    }
}

/// Mutates the conditions of one status through its [`StatusAccessor`],
/// recomputing the happy condition after every dependent change.
pub struct ConditionManager<'a, S: ?Sized> {
    set: &'a ConditionSet,
    status: &'a mut S,
    clock: &'a dyn Clock,
}

impl<S> ConditionManager<'_, S>
where
    S: StatusAccessor + ?Sized,
{
    /// True iff the happy condition is present and True.
    pub fn is_happy(&self) -> bool {
        self.top_level_condition().is_some_and(Condition::is_true)
    }

    pub fn top_level_condition(&self) -> Option<&Condition> {
        self.condition(self.set.happy.as_str())
    }

    pub fn condition(&self, type_: &str) -> Option<&Condition> {
        self.status.conditions().iter().find(|c| c.type_ == type_)
    }

    /// Upsert a condition as given, without recomputing the happy condition.
    /// After writing a dependent this way the happy condition stays stale
    /// until the next `mark_*` call.
    pub fn set_condition(&mut self, cond: Condition) {
        self.update(|store, now| store.upsert(cond, now));
    }

    /// Remove an independent condition.
    pub fn clear_condition(&mut self, type_: &str) -> Result<()> {
        if self.set.is_terminal(type_) {
            return Err(Error::TerminalCondition(type_.to_string()));
        }
        self.update(|store, _| store.remove(type_).is_some());
        Ok(())
    }

    pub fn mark_true(&mut self, type_: impl Into<ConditionType>) {
        self.mark_true_with_reason(type_, "", "");
    }

    pub fn mark_true_with_reason(
        &mut self,
        type_: impl Into<ConditionType>,
        reason: impl Into<String>,
        message: impl Into<String>,
    ) {
        let type_ = type_.into();
        let severity = self.set.default_severity(type_.as_str());
        self.apply(
            Condition::new(type_, ConditionStatus::True)
                .with_severity(severity)
                .with_reason(reason, message),
        );
    }

    pub fn mark_false(
        &mut self,
        type_: impl Into<ConditionType>,
        severity: ConditionSeverity,
        reason: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.apply(
            Condition::new(type_, ConditionStatus::False)
                .with_severity(severity)
                .with_reason(reason, message),
        );
    }

    pub fn mark_unknown(
        &mut self,
        type_: impl Into<ConditionType>,
        reason: impl Into<String>,
        message: impl Into<String>,
    ) {
        let type_ = type_.into();
        let severity = self.set.default_severity(type_.as_str());
        self.apply(
            Condition::new(type_, ConditionStatus::Unknown)
                .with_severity(severity)
                .with_reason(reason, message),
        );
    }

    /// Seed every missing dependent as Unknown and recompute. Existing
    /// conditions are left alone, so repeated calls are no-ops.
    pub fn initialize_conditions(&mut self) {
        let set = self.set;
        self.update(|store, now| {
            let mut changed = false;
            for dep in &set.dependents {
                if store.get(dep.as_str()).is_none() {
                    changed |= store.upsert(Condition::new(dep.clone(), ConditionStatus::Unknown), now);
                }
            }
            match set.aggregate(store) {
                Some(happy) => changed |= store.upsert(happy, now),
                None if store.get(set.happy.as_str()).is_none() => {
                    changed |= store.upsert(
                        Condition::new(set.happy.clone(), ConditionStatus::Unknown),
                        now,
                    );
                }
                None => {}
            }
            changed
        });
    }

    fn apply(&mut self, cond: Condition) {
        let set = self.set;
        let recompute = set.is_dependent(cond.type_.as_str());
        self.update(|store, now| {
            trace!("Setting condition {} to {}", cond.type_, cond.status);
            let mut changed = store.upsert(cond, now);
            if recompute {
                if let Some(happy) = set.aggregate(store) {
                    let before = store.get(set.happy.as_str()).map(|c| c.status);
                    if before != Some(happy.status) {
                        debug!(
                            "Condition {} transitions to {} ({})",
                            set.happy, happy.status, happy.reason
                        );
                    }
                    changed |= store.upsert(happy, now);
                }
            }
            changed
        });
    }

    fn update(&mut self, f: impl FnOnce(&mut ConditionStore, DateTime<Utc>) -> bool) -> bool {
        let now = self.clock.now();
        let mut store = ConditionStore::from(self.status.conditions());
        let changed = f(&mut store, now);
        if changed {
            self.status.set_conditions(store.into_inner());
        }
        changed
    }
}
