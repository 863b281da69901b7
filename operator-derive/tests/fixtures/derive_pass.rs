pub mod apis {
    #[derive(Clone, Debug, Default, PartialEq)]
    pub struct Condition {
        pub type_: String,
    }

    pub trait StatusAccessor {
        fn conditions(&self) -> &[Condition];
        fn set_conditions(&mut self, conditions: Vec<Condition>);
        fn observed_generation(&self) -> i64;
        fn set_observed_generation(&mut self, generation: i64);
    }
}

use apis::{Condition, StatusAccessor};

#[derive(Default, operator_derive::Conditions)]
pub struct DemoStatus {
    pub observed_generation: i64,
    pub conditions: Vec<Condition>,
    pub url: Option<String>,
}

fn main() {
    let mut status = DemoStatus::default();
    assert!(status.conditions().is_empty());
    status.set_conditions(vec![Condition { type_: "Ready".into() }]);
    status.set_observed_generation(3);
    assert_eq!(status.conditions().len(), 1);
    assert_eq!(status.observed_generation(), 3);
    assert!(status.url.is_none());
}
