#![allow(dead_code)]

pub mod apis {
    pub struct Condition;

    pub trait StatusAccessor {
        fn conditions(&self) -> &[Condition];
        fn set_conditions(&mut self, conditions: Vec<Condition>);
        fn observed_generation(&self) -> i64;
        fn set_observed_generation(&mut self, generation: i64);
    }
}

#[derive(operator_derive::Conditions)]
pub struct MissingFieldStatus {
    pub observed_generation: i64,
    pub entries: Vec<apis::Condition>,
}

fn main() {}
