use super::Condition;
pub use operator_derive::Conditions as DeriveConditions;

/// The capability a resource status must expose so conditions can be
/// managed on it without knowing its schema.
pub trait StatusAccessor {
    // Read the condition store in presentation order
    fn conditions(&self) -> &[Condition];
    // Replace the whole condition store
    fn set_conditions(&mut self, conditions: Vec<Condition>);

    fn observed_generation(&self) -> i64;
    fn set_observed_generation(&mut self, generation: i64);

    /// Record that the status now reflects `generation` of the spec.
    fn observe(&mut self, generation: Option<i64>) {
        self.set_observed_generation(generation.unwrap_or(0));
    }

    /// Whether the status was computed against the given spec generation.
    fn is_current(&self, generation: Option<i64>) -> bool {
        self.observed_generation() == generation.unwrap_or(0)
    }
}
