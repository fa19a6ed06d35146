mod common;

use std::collections::HashSet;

use adp_engine::{bind, PluginRegistry, Registration, RegistryError, StageSpec};
use adp_sdk::prelude::*;
use adp_state::SqliteStateBackend;
use proptest::prelude::*;
use serde_json::json;

use common::{params, spec, Harness};

#[derive(Debug, Clone, Copy)]
enum Op {
    Add(i64),
    Mul(i64),
}

impl Op {
    fn apply(self, a: i64) -> i64 {
        match self {
            Op::Add(n) => a.wrapping_add(n),
            Op::Mul(n) => a.wrapping_mul(n),
        }
    }

    fn stage(self) -> StageSpec {
        match self {
            Op::Add(n) => StageSpec::new("mem:add").with_params(params(json!({ "n": n }))),
            Op::Mul(n) => StageSpec::new("mem:mul").with_params(params(json!({ "n": n }))),
        }
    }
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![(-50i64..50).prop_map(Op::Add), (-5i64..5).prop_map(Op::Mul)]
}

struct Unit;

impl Transform for Unit {
    fn apply<'a>(&'a self, _ctx: &StageContext, input: RecordStream<'a>) -> RecordStream<'a> {
        input
    }
}

fn unit(name: &str) -> Registration {
    Registration::transform(name, |_| Ok(Box::new(Unit) as Box<dyn Transform>))
}

proptest! {
    #[test]
    fn transforms_apply_in_declared_order(ops in prop::collection::vec(op(), 0..6), count in 1u64..6) {
        let harness = Harness::new();
        let pipeline = spec(
            "ordered",
            StageSpec::new("mem:cursor").with_params(params(json!({ "count": count }))),
            ops.iter().map(|op| op.stage()).collect(),
            StageSpec::new("mem:collect"),
        );
        let state = SqliteStateBackend::in_memory().unwrap();
        let summary = bind(&pipeline, &harness.registry).unwrap().run(&state).unwrap();
        prop_assert_eq!(summary.records_written, count);

        let got: Vec<i64> = harness
            .collected()
            .iter()
            .map(|r| r["a"].as_i64().unwrap())
            .collect();
        let expected: Vec<i64> = (0..count as i64)
            .map(|a| ops.iter().fold(a, |acc, op| op.apply(acc)))
            .collect();
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn registering_a_taken_name_always_fails(names in prop::collection::vec("[a-c]:[a-c]", 1..12)) {
        let mut registry = PluginRegistry::new();
        let mut taken = HashSet::new();
        for name in &names {
            let result = registry.register(unit(name));
            if taken.insert(name.clone()) {
                prop_assert!(result.is_ok());
            } else {
                let is_duplicate = matches!(result, Err(RegistryError::DuplicateName { .. }));
                prop_assert!(is_duplicate);
            }
        }
        prop_assert_eq!(registry.len(), taken.len());
    }
}
