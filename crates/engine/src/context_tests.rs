// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

fn inputs() -> Map<String, Value> {
    let mut map = Map::new();
    map.insert("branch".to_string(), json!("main"));
    map
}

#[test]
fn put_step_output_records_the_full_shape() {
    let mut ctx = ExecutionContext::new("deploy", inputs());
    ctx.put_step_output("build", json!({"artifact": "a.tar"}), true, 120, StepKind::Python);

    let state = &ctx.steps()["build"];
    assert_eq!(state["output"]["artifact"], "a.tar");
    assert_eq!(state["success"], true);
    assert_eq!(state["duration_ms"], 120);
    assert_eq!(state["kind"], "python");
}

#[test]
fn skipped_steps_store_null_output_with_success() {
    let mut ctx = ExecutionContext::new("deploy", inputs());
    ctx.put_step_output("skipped", Value::Null, true, 0, StepKind::Agent);

    let evaluator = ctx.evaluator();
    assert_eq!(
        evaluator.eval_str("steps.skipped.output").unwrap(),
        Value::Null
    );
    assert_eq!(
        evaluator.eval_str("steps.skipped.success").unwrap(),
        json!(true)
    );
}

#[test]
fn evaluator_sees_inputs_and_steps() {
    let mut ctx = ExecutionContext::new("deploy", inputs());
    ctx.put_step_output("build", json!("artifact"), true, 1, StepKind::Python);

    let evaluator = ctx.evaluator();
    assert_eq!(evaluator.eval_str("inputs.branch").unwrap(), json!("main"));
    assert_eq!(
        evaluator.eval_str("steps.build.output").unwrap(),
        json!("artifact")
    );
}

#[test]
fn iteration_partition_is_injected_on_copies() {
    let ctx = ExecutionContext::new("deploy", inputs());
    assert!(ctx.evaluator().eval_str("item").is_err());

    let child = ctx.with_iteration(Iteration {
        item: json!({"id": 3}),
        index: 1,
    });
    assert_eq!(child.evaluator().eval_str("item.id").unwrap(), json!(3));
    assert_eq!(child.evaluator().eval_str("index").unwrap(), json!(1));
    // the original is untouched
    assert!(ctx.evaluator().eval_str("item").is_err());
}

#[test]
fn rollbacks_accumulate_in_completion_order() {
    let mut ctx = ExecutionContext::new("deploy", inputs());
    ctx.push_rollback("a", "rb_a");
    ctx.push_rollback("b", "rb_b");
    let pending: Vec<&str> = ctx
        .pending_rollbacks()
        .iter()
        .map(|(step, _)| step.as_str())
        .collect();
    assert_eq!(pending, vec!["a", "b"]);
}

#[test]
fn absorb_steps_merges_without_overwriting() {
    let mut parent = ExecutionContext::new("deploy", inputs());
    parent.put_step_output("existing", json!("parent"), true, 1, StepKind::Python);

    let mut child = parent.clone();
    child.put_step_output("existing", json!("child"), true, 2, StepKind::Python);
    child.put_step_output("new", json!("from-child"), true, 3, StepKind::Python);
    child.push_rollback("new", "rb_new");

    parent.absorb_steps(&child);
    assert_eq!(parent.steps()["existing"]["output"], "parent");
    assert_eq!(parent.steps()["new"]["output"], "from-child");
    assert_eq!(parent.pending_rollbacks().len(), 1);

    // absorbing twice does not duplicate rollbacks
    parent.absorb_steps(&child);
    assert_eq!(parent.pending_rollbacks().len(), 1);
}
