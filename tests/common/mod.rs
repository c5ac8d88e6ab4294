//! Shared fixtures for the end-to-end compilation scenarios: small `Module`
//! generators, mirroring the way the host crate builds test networks with small
//! hand-written generator functions rather than a golden-file corpus.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use ivyaiger::checker::ModelChecker;
use ivyaiger::ir::{Action, Expr, LabeledConj, Module, Sort, Symbol, TransitionRelation};

/// A model checker stand-in that shells out to `sh` to deterministically "solve" the
/// AIGER it's handed, without depending on a real bounded/unbounded checker binary
/// being present in the test environment. `verdict_text` is what a real checker would
/// print to stdout; `witness` (if any) is written verbatim to the output path, exactly
/// as a real checker would write a captured counterexample there.
pub struct ScriptedChecker {
    pub verdict_text: &'static str,
    pub witness: Option<&'static str>,
}

impl ModelChecker for ScriptedChecker {
    fn command(&self, _aig_path: &Path, out_path: &Path) -> Vec<String> {
        let mut script = format!("echo '{}'", self.verdict_text);
        if let Some(w) = self.witness {
            script = format!("printf '%s' \"{}\" > {}; {}", w, out_path.display(), script);
        }
        vec!["sh".to_string(), "-c".to_string(), script]
    }

    fn scrape(&self, stdout_text: &str) -> bool {
        stdout_text.contains("Property proved")
    }
}

/// Writes `aiger_text` to a fresh temporary file and returns it alongside its path.
///
/// The scripted checker never actually reads this file back, but exercising a real
/// filesystem round trip here matches how the `check` subcommand hands the compiled
/// netlist to a real external model checker. The `NamedTempFile` must be kept alive
/// for as long as the path is used; it is removed when dropped.
pub fn scratch_aiger_file(name: &str, aiger_text: &str) -> (tempfile::NamedTempFile, PathBuf) {
    let mut file = tempfile::Builder::new()
        .prefix(&format!("ivyaiger-test-{name}-"))
        .suffix(".aag")
        .tempfile()
        .expect("failed to create scratch AIGER file");
    std::io::Write::write_all(&mut file, aiger_text.as_bytes())
        .expect("failed to write scratch AIGER file");
    let path = file.path().to_path_buf();
    (file, path)
}

fn public(names: &[&str]) -> HashSet<String> {
    names.iter().map(|s| s.to_string()).collect()
}

/// S1: no state, trivial initializer, one no-op action, invariant `true`.
pub fn trivial_module() -> Module {
    Module {
        actions: vec![Action {
            name: "nop".to_string(),
            relation: TransitionRelation::empty(),
        }],
        public_actions: public(&["nop"]),
        initializers: Vec::new(),
        labeled_conjs: vec![LabeledConj {
            label: "trivial".to_string(),
            formula: Expr::Bool(true),
        }],
        background_theory: Vec::new(),
    }
}

/// S2: one Boolean latch `b`, `init: b := false`, `step: b := true`, invariant `¬b`.
pub fn immediate_violation_module() -> (Module, Symbol) {
    let b = Symbol::new_symbol("b", Sort::Bool);
    let init = TransitionRelation {
        stvars: vec![b.clone()],
        defs: vec![(b.new(), Expr::Bool(false))],
        fmlas: Vec::new(),
        error: Expr::Bool(false),
    };
    let step = TransitionRelation {
        stvars: vec![b.clone()],
        defs: vec![(b.new(), Expr::Bool(true))],
        fmlas: Vec::new(),
        error: Expr::Bool(false),
    };
    let module = Module {
        actions: vec![Action {
            name: "step".to_string(),
            relation: step,
        }],
        public_actions: public(&["step"]),
        initializers: vec![Action {
            name: "init".to_string(),
            relation: init,
        }],
        labeled_conjs: vec![LabeledConj {
            label: "safety".to_string(),
            formula: Expr::Not(Box::new(Expr::var(b.clone()))),
        }],
        background_theory: Vec::new(),
    };
    (module, b)
}

/// S3: 3-valued enum `{A,B,C}`, `init: s := A`, `step: s := C`, invariant `s = C`.
/// The sort's 2-bit encoding has one unused code (`11`), exercising `eq`'s saturation.
pub fn enum_saturation_module() -> Module {
    let enum_sort = Sort::Enum { cardinality: 3 };
    let s = Symbol::new_symbol("s", enum_sort.clone());
    let a_ctor = Expr::constructor(0, enum_sort.clone());
    let c_ctor = Expr::constructor(2, enum_sort.clone());
    let init = TransitionRelation {
        stvars: vec![s.clone()],
        defs: vec![(s.new(), a_ctor)],
        fmlas: Vec::new(),
        error: Expr::Bool(false),
    };
    let step = TransitionRelation {
        stvars: vec![s.clone()],
        defs: vec![(s.new(), c_ctor.clone())],
        fmlas: Vec::new(),
        error: Expr::Bool(false),
    };
    Module {
        actions: vec![Action {
            name: "step".to_string(),
            relation: step,
        }],
        public_actions: public(&["step"]),
        initializers: vec![Action {
            name: "init".to_string(),
            relation: init,
        }],
        labeled_conjs: vec![LabeledConj {
            label: "reaches_c".to_string(),
            formula: Expr::Eq(Box::new(Expr::var(s)), Box::new(c_ctor)),
        }],
        background_theory: Vec::new(),
    }
}

/// S4: `x: bv(4)`, `init: x := 0`, `step: x := x + 1`, invariant `x ≠ 16` (which, under
/// mod-16 wraparound, is the same bit pattern as `x ≠ 0`).
pub fn bitvector_wraparound_module() -> Module {
    let bv4 = Sort::Bv { width: 4 };
    let x = Symbol::new_symbol("x", bv4.clone());
    let one = Expr::numeral(1, bv4.clone());
    let sixteen = Expr::numeral(16, bv4.clone());
    let init = TransitionRelation {
        stvars: vec![x.clone()],
        defs: vec![(x.new(), Expr::numeral(0, bv4.clone()))],
        fmlas: Vec::new(),
        error: Expr::Bool(false),
    };
    let next_x = Expr::op(
        ivyaiger::ir::Operator::Add,
        vec![Expr::var(x.clone()), one],
        vec![bv4.clone(), bv4.clone()],
        bv4.clone(),
    );
    let step = TransitionRelation {
        stvars: vec![x.clone()],
        defs: vec![(x.new(), next_x)],
        fmlas: Vec::new(),
        error: Expr::Bool(false),
    };
    Module {
        actions: vec![Action {
            name: "step".to_string(),
            relation: step,
        }],
        public_actions: public(&["step"]),
        initializers: vec![Action {
            name: "init".to_string(),
            relation: init,
        }],
        labeled_conjs: vec![LabeledConj {
            label: "no_overflow".to_string(),
            formula: Expr::Not(Box::new(Expr::Eq(
                Box::new(Expr::var(x)),
                Box::new(sixteen),
            ))),
        }],
        background_theory: Vec::new(),
    }
}

/// S5: `n: int` (infinite sort), `step: n := n + 1`, invariant `n ≥ 0`. The invariant's
/// comparison is over an infinite sort, so abstraction replaces it with a fresh `__abs[0]`.
pub fn infinite_sort_abstraction_module() -> Module {
    let int_sort = Sort::Infinite {
        theory: "int".to_string(),
    };
    let n = Symbol::new_symbol("n", int_sort.clone());
    let one = Expr::numeral(1, int_sort.clone());
    let next_n = Expr::op(
        ivyaiger::ir::Operator::Add,
        vec![Expr::var(n.clone()), one],
        vec![int_sort.clone(), int_sort.clone()],
        int_sort.clone(),
    );
    let step = TransitionRelation {
        stvars: vec![n.clone()],
        defs: vec![(n.new(), next_n)],
        fmlas: Vec::new(),
        error: Expr::Bool(false),
    };
    let lt_zero = Expr::op(
        ivyaiger::ir::Operator::Lt,
        vec![Expr::var(n.clone()), Expr::numeral(0, int_sort.clone())],
        vec![int_sort.clone(), int_sort.clone()],
        Sort::Bool,
    );
    Module {
        actions: vec![Action {
            name: "step".to_string(),
            relation: step,
        }],
        public_actions: public(&["step"]),
        initializers: Vec::new(),
        labeled_conjs: vec![LabeledConj {
            label: "non_negative".to_string(),
            formula: Expr::Not(Box::new(lt_zero)),
        }],
        background_theory: Vec::new(),
    }
}
