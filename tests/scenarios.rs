//! End-to-end compilation scenarios, driving the full pipeline (abstraction, encoding,
//! netlist construction, external invocation, witness lifting) against small in-memory
//! module fixtures with a scripted stand-in for the external model checker.

mod common;

use ivyaiger::checker::run_model_checker;
use ivyaiger::driver::compile;
use ivyaiger::witness::{lift_witness, StepKind};

use common::{
    bitvector_wraparound_module, enum_saturation_module, immediate_violation_module,
    infinite_sort_abstraction_module, scratch_aiger_file, trivial_module, ScriptedChecker,
};

#[test]
fn s1_trivial_module_compiles_and_is_reported_proved() {
    let module = trivial_module();
    let compiled = compile(&module).expect("trivial module must compile");
    let aiger = compiled.serialize();
    assert!(aiger.starts_with("aag 3 0 2 1 1\n"));

    let checker = ScriptedChecker {
        verdict_text: "Property proved",
        witness: None,
    };
    let (_aig_file, aig_path) = scratch_aiger_file("s1", &aiger);
    let out_path = aig_path.with_extension("cex");
    let proved = run_model_checker(&checker, &aig_path, &out_path).unwrap();
    assert!(proved);
}

#[test]
fn s2_lifts_a_two_step_counterexample() {
    let (module, _b) = immediate_violation_module();
    let compiled = compile(&module).expect("module must compile");
    let header = compiled.serialize();
    let fields: Vec<&str> = header.lines().next().unwrap().split_whitespace().collect();
    assert_eq!(fields[2], "3"); // ordinary latch b, plus __init, __cnst

    let checker = ScriptedChecker {
        verdict_text: "counterexample found",
        witness: Some("1\n0 0 0 000\n1 0 0 100\n"),
    };
    let (_aig_file, aig_path) = scratch_aiger_file("s2", &header);
    let out_path = aig_path.with_extension("cex");
    let proved = run_model_checker(&checker, &aig_path, &out_path).unwrap();
    assert!(!proved);

    let witness_text = std::fs::read_to_string(&out_path).unwrap();
    let trace = lift_witness(&witness_text, &compiled.encoder, &compiled.stvars)
        .unwrap()
        .expect("a counterexample was reported");
    assert_eq!(trace.steps.len(), 2);
    assert_eq!(trace.steps[0].kind, StepKind::Initial);
    assert_eq!(trace.steps[0].assignments, vec![("b".to_string(), 0)]);
    assert_eq!(trace.steps[1].kind, StepKind::ExternalAction);
    assert_eq!(trace.steps[1].assignments, vec![("b".to_string(), 1)]);
}

#[test]
fn s3_enum_saturation_module_is_reported_proved() {
    let module = enum_saturation_module();
    let compiled = compile(&module).expect("enum module must compile");
    assert!(compiled.encoder.netlist().nb_latches() >= 3); // s, __init, __cnst
    let aiger = compiled.serialize();

    let checker = ScriptedChecker {
        verdict_text: "Property proved",
        witness: None,
    };
    let (_aig_file, aig_path) = scratch_aiger_file("s3", &aiger);
    let out_path = aig_path.with_extension("cex");
    let proved = run_model_checker(&checker, &aig_path, &out_path).unwrap();
    assert!(proved);
}

#[test]
fn s4_bitvector_wraparound_module_is_reported_proved() {
    let module = bitvector_wraparound_module();
    let compiled = compile(&module).expect("bit-vector module must compile");
    // x is a 4-bit latch, plus __init and __cnst.
    assert!(compiled.encoder.netlist().nb_latches() >= 3);
    let aiger = compiled.serialize();

    let checker = ScriptedChecker {
        verdict_text: "Property proved",
        witness: None,
    };
    let (_aig_file, aig_path) = scratch_aiger_file("s4", &aiger);
    let out_path = aig_path.with_extension("cex");
    let proved = run_model_checker(&checker, &aig_path, &out_path).unwrap();
    assert!(proved);
}

#[test]
fn s5_infinite_sort_abstraction_hides_the_unabstracted_variable() {
    let module = infinite_sort_abstraction_module();
    let compiled = compile(&module).expect("module with an infinite-sorted variable must still compile");
    assert!(compiled
        .stvars
        .iter()
        .any(|s| s.name().starts_with("__abs")));

    let n_bits = compiled.stvars.len();
    let post: String = "0".repeat(n_bits);
    let witness_text = format!("1\n0 0 0 {post}\n");
    let trace = lift_witness(&witness_text, &compiled.encoder, &compiled.stvars)
        .unwrap()
        .expect("scripted witness reports a counterexample");
    for step in &trace.steps {
        assert!(step.assignments.iter().all(|(name, _)| name != "n"));
    }
}

#[test]
fn s6_malformed_witness_length_is_rejected_without_panicking() {
    let module = trivial_module();
    let compiled = compile(&module).unwrap();
    let bad_witness = "1\n0 0 0 x\n";
    let result = lift_witness(bad_witness, &compiled.encoder, &compiled.stvars);
    assert!(result.is_err());
}
