//! Conditions and the machinery that rolls them up into a resource's
//! top-level readiness.

mod accessor;
mod condition;
mod condition_set;

pub use accessor::*;
pub use condition::*;
pub use condition_set::{Clock, ConditionManager, ConditionSet, SystemClock};
