//! Compiler driver (C4): assembles a module's initializer and external action into one
//! transition, threads it through the abstractor then the encoder, wires up the
//! book-keeping latches, and serializes the result to AIGER.

use std::collections::HashSet;

use log::info;

use crate::abstractor::{Abstractor, CNST_LATCH, INIT_LATCH};
use crate::encoder::Encoder;
use crate::error::CompileError;
use crate::ir::{Expr, Module, Sort, Symbol, TransitionRelation};
use crate::netlist::Netlist;

/// Name of the output recording whether the abstracted system reached a violation.
pub const FAIL_OUTPUT: &str = "__fail";

/// The compiled result: the netlist (ready to serialize) and the encoder used to build
/// it, kept around so the trace lifter can decode a witness against the same
/// encoding map and latch ordering.
pub struct CompiledSystem {
    /// The encoder that built the netlist; exposes `get_state` for the trace lifter.
    pub encoder: Encoder,
    /// The state variables, in the order they were declared as latches (the order the
    /// witness's `post` bitstring follows). Includes the two trailing bookkeeping
    /// latches `__init` and `__cnst`.
    pub stvars: Vec<Symbol>,
}

impl CompiledSystem {
    /// Serialize the compiled netlist to ASCII AIGER.
    pub fn serialize(&self) -> String {
        self.encoder.netlist().serialize()
    }
}

/// Disjunctively compose a module's public actions into one external-action
/// transition relation, guarded by one fresh Boolean "was this action invoked"
/// input per action. Untouched state variables default to holding their value
/// (a valid stutter step when no action is chosen).
fn compose_actions(actions: &[&crate::ir::Action]) -> TransitionRelation {
    if actions.is_empty() {
        return TransitionRelation::empty();
    }
    if actions.len() == 1 {
        return actions[0].relation.clone();
    }

    let mut stvars: Vec<Symbol> = Vec::new();
    for a in actions {
        for s in &a.relation.stvars {
            if !stvars.contains(s) {
                stvars.push(s.clone());
            }
        }
    }

    let guards: Vec<Symbol> = actions
        .iter()
        .map(|a| Symbol::new_symbol(format!("__call[{}]", a.name), Sort::Bool))
        .collect();

    let mut defs: Vec<(Symbol, Expr)> = Vec::new();
    for s in &stvars {
        let next = s.new();
        // Nest the per-action next-value choices; default to holding `s` if nothing fires.
        let mut choice = Expr::var(s.clone());
        for (action, guard) in actions.iter().zip(&guards).rev() {
            let rhs = action
                .relation
                .def_of(&next)
                .cloned()
                .unwrap_or_else(|| Expr::var(s.clone()));
            choice = Expr::Ite(Box::new(Expr::var(guard.clone())), Box::new(rhs), Box::new(choice));
        }
        defs.push((next, choice));
    }

    let mut fmlas = Vec::new();
    for (action, guard) in actions.iter().zip(&guards) {
        let guarded = Expr::Or(vec![
            Expr::Not(Box::new(Expr::var(guard.clone()))),
            Expr::And(action.relation.fmlas.clone()),
        ]);
        fmlas.push(guarded);
    }

    TransitionRelation {
        stvars,
        defs,
        fmlas,
        error: Expr::Bool(false),
    }
}

/// Conjunctively compose a module's initializers into one transition relation. Later
/// initializers' definitions take precedence over earlier ones for the same symbol.
fn compose_initializers(initializers: &[crate::ir::Action]) -> TransitionRelation {
    let mut stvars: Vec<Symbol> = Vec::new();
    let mut defs: Vec<(Symbol, Expr)> = Vec::new();
    let mut fmlas = Vec::new();
    for init in initializers {
        for s in &init.relation.stvars {
            if !stvars.contains(s) {
                stvars.push(s.clone());
            }
        }
        for (sym, expr) in &init.relation.defs {
            defs.retain(|(s, _)| s != sym);
            defs.push((sym.clone(), expr.clone()));
        }
        fmlas.extend(init.relation.fmlas.clone());
    }
    TransitionRelation {
        stvars,
        defs,
        fmlas,
        error: Expr::Bool(false),
    }
}

/// Compile `module` against its invariant into a finished AIGER system (C4).
pub fn compile(module: &Module) -> Result<CompiledSystem, CompileError> {
    info!(
        "compiling module with {} public action(s), {} initializer(s)",
        module.public_actions.len(),
        module.initializers.len()
    );
    let ext_act = compose_actions(&module.public_action_relations());
    let init_act = compose_initializers(&module.initializers);
    let invariant = module.invariant();

    let mut abstractor = Abstractor::new();
    let (abstracted, abs_invariant) = abstractor.abstract_system(&ext_act, &init_act, &invariant);
    info!(
        "abstraction produced {} state variable(s)",
        abstracted.stvars.len()
    );

    let mut encoder = Encoder::new();

    // Split __init/__cnst bookkeeping latches out from the ordinary state variables:
    // they get deterministic, directly-encoded next-state functions, never nondet.
    let init_sym = abstracted
        .stvars
        .iter()
        .find(|s| s.name() == INIT_LATCH)
        .expect("abstractor always introduces __init")
        .clone();
    let mut ordinary: Vec<Symbol> = abstracted
        .stvars
        .iter()
        .filter(|s| s.name() != INIT_LATCH)
        .cloned()
        .collect();

    let cnst_sym = Symbol::new_symbol(CNST_LATCH, Sort::Bool);

    // C4 step 2: nondet-rewrite every ordinary state variable's next value.
    let mut top_level_fmlas = abstracted.fmlas.clone();
    let mut final_defs: Vec<(Symbol, Expr)> = Vec::new();
    for s in &ordinary {
        let next = s.new();
        let nondet = Symbol::new_symbol(format!("__nondet[{}]", s.name()), s.sort().clone());
        final_defs.push((next.clone(), Expr::var(nondet.clone())));
        if let Some(rhs) = abstracted.def_of(&next) {
            top_level_fmlas.push(Expr::Eq(
                Box::new(Expr::var(nondet)),
                Box::new(rhs.clone()),
            ));
        }
    }
    // Carry over every definition that isn't a next-value for an ordinary state var
    // (non-next helper definitions, and __init's own next-value def).
    for (sym, expr) in &abstracted.defs {
        let is_ordinary_next = sym.is_new() && ordinary.contains(&sym.new_of());
        if !is_ordinary_next {
            final_defs.push((sym.clone(), expr.clone()));
        }
    }

    // C4 step 3: __cnst latches whether the combined constraint held.
    let cnst_next = Expr::Not(Box::new(Expr::And(top_level_fmlas.clone())));
    final_defs.push((cnst_sym.new(), cnst_next));

    // Stable latch order: ordinary state vars, then __init, then __cnst.
    ordinary.sort_by(|a, b| a.name().cmp(b.name()));
    let mut all_stvars = ordinary.clone();
    all_stvars.push(init_sym.clone());
    all_stvars.push(cnst_sym.clone());

    // C4 step 4: partition remaining free symbols into inputs. AIGER requires every
    // input to be declared before any latch, so this runs before the latch loop below.
    let defined: HashSet<Symbol> = final_defs.iter().map(|(s, _)| s.clone()).collect();
    let mut free_syms: HashSet<Symbol> = HashSet::new();
    for (_, e) in &final_defs {
        crate::ir::free_symbols(e, &mut free_syms);
    }
    crate::ir::free_symbols(&abs_invariant, &mut free_syms);
    let stvar_set: HashSet<Symbol> = all_stvars.iter().cloned().collect();
    let mut inputs: Vec<Symbol> = free_syms
        .into_iter()
        .filter(|s| !defined.contains(s) && !stvar_set.contains(s))
        .collect();
    inputs.sort_by(|a, b| a.name().cmp(b.name()));
    for s in &inputs {
        encoder.declare_input(s)?;
    }

    for s in &all_stvars {
        encoder.declare_latch(s)?;
    }

    // C4 step 6: evaluate non-next-state definitions and alias them; evaluate
    // next-state definitions and wire them into their latch.
    let (next_defs, plain_defs): (Vec<_>, Vec<_>) =
        final_defs.into_iter().partition(|(s, _)| s.is_new());
    encoder.deflist(&plain_defs)?;
    for (sym, expr) in &next_defs {
        let bits = encoder.eval(expr)?;
        let cur = sym.new_of();
        let latch_bits = encoder
            .bits(&cur)
            .expect("every latch is declared before its next-value is wired")
            .to_vec();
        for (lb, nb) in latch_bits.iter().zip(bits.iter()) {
            encoder.netlist_mut().set_latch_next(*lb, *nb);
        }
    }

    // C4 step 5: __fail ≡ __init ∧ ¬__cnst ∧ ¬invariant.
    let init_lit = encoder.bits(&init_sym).unwrap()[0];
    let cnst_lit = encoder.bits(&cnst_sym).unwrap()[0];
    let inv_bits = encoder.eval(&abs_invariant)?;
    let not_cnst = encoder.netlist_mut().not_lit(cnst_lit);
    let not_inv = encoder.netlist_mut().not_lit(inv_bits[0]);
    let fail = encoder
        .netlist_mut()
        .and_many(&[init_lit, not_cnst, not_inv]);
    encoder.netlist_mut().add_output(fail);

    info!(
        "netlist has {} input(s), {} latch(es), {} gate(s)",
        encoder.netlist().nb_inputs(),
        encoder.netlist().nb_latches(),
        encoder.netlist().nb_gates()
    );

    Ok(CompiledSystem {
        encoder,
        stvars: all_stvars,
    })
}

/// Access the serialized netlist without going through [`CompiledSystem::serialize`],
/// useful for callers that already hold an owned [`Netlist`].
pub fn serialize_netlist(netlist: &Netlist) -> String {
    netlist.serialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Action, LabeledConj};

    fn trivial_module() -> Module {
        let nop = Action {
            name: "nop".to_string(),
            relation: TransitionRelation::empty(),
        };
        let mut public = HashSet::new();
        public.insert("nop".to_string());
        Module {
            actions: vec![nop],
            public_actions: public,
            initializers: Vec::new(),
            labeled_conjs: vec![LabeledConj {
                label: "trivial".to_string(),
                formula: Expr::Bool(true),
            }],
            background_theory: Vec::new(),
        }
    }

    #[test]
    fn s1_trivial_proved_header() {
        let module = trivial_module();
        let compiled = compile(&module).unwrap();
        let aiger = compiled.serialize();
        assert!(
            aiger.starts_with("aag 3 0 2 1 1\n"),
            "unexpected header: {}",
            aiger.lines().next().unwrap()
        );
    }

    #[test]
    fn s2_immediate_violation() {
        let b = Symbol::new_symbol("b", Sort::Bool);
        let init_relation = TransitionRelation {
            stvars: vec![b.clone()],
            defs: vec![(b.new(), Expr::Bool(false))],
            fmlas: Vec::new(),
            error: Expr::Bool(false),
        };
        let ext_relation = TransitionRelation {
            stvars: vec![b.clone()],
            defs: vec![(b.new(), Expr::Bool(true))],
            fmlas: Vec::new(),
            error: Expr::Bool(false),
        };
        let mut public = HashSet::new();
        public.insert("step".to_string());
        let module = Module {
            actions: vec![Action {
                name: "step".to_string(),
                relation: ext_relation,
            }],
            public_actions: public,
            initializers: vec![Action {
                name: "init".to_string(),
                relation: init_relation,
            }],
            labeled_conjs: vec![LabeledConj {
                label: "safety".to_string(),
                formula: Expr::Not(Box::new(Expr::var(b.clone()))),
            }],
            background_theory: Vec::new(),
        };
        let compiled = compile(&module).unwrap();
        let aiger = compiled.serialize();
        // One ordinary latch (b) plus __init, __cnst.
        let header = aiger.lines().next().unwrap();
        let parts: Vec<&str> = header.split_whitespace().collect();
        assert_eq!(parts[0], "aag");
        assert_eq!(parts[2], "3"); // L
    }
}
