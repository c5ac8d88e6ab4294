//! Propositional abstraction of a transition relation (C3).
//!
//! Replaces quantified subformulas and subterms over infinite sorts with fresh
//! Boolean propositions, preserving soundness of the abstraction for the property
//! under check: every fresh proposition is a free input, so the abstraction can only
//! over-approximate reachable states.

use std::collections::HashMap;

use log::warn;

use crate::ir::{
    contains_tagged, rename_current_to_new, rename_new_to_current, sort_of, Expr, Sort, Symbol,
    TransitionRelation,
};

/// Name of the book-keeping latch recording whether the initializer has fired.
pub const INIT_LATCH: &str = "__init";
/// Name of the book-keeping latch recording whether the transition constraint held.
pub const CNST_LATCH: &str = "__cnst";

/// Propositionally abstracts a composed transition relation and invariant.
///
/// One abstractor is used for a single compilation; `prop_abs_ctr` is a plain field,
/// not global state.
pub struct Abstractor {
    stvarset: std::collections::HashSet<Symbol>,
    memo: HashMap<Expr, Expr>,
    prop_abs_ctr: u32,
    fresh_stateful: Vec<Symbol>,
}

impl Default for Abstractor {
    fn default() -> Self {
        Self::new()
    }
}

impl Abstractor {
    /// A fresh abstractor with empty memoization state.
    pub fn new() -> Abstractor {
        Abstractor {
            stvarset: std::collections::HashSet::new(),
            memo: HashMap::new(),
            prop_abs_ctr: 0,
            fresh_stateful: Vec::new(),
        }
    }

    /// Run the full abstraction procedure (C3 steps 1-8).
    ///
    /// `ext_act` is the already-composed external action relation, `initializers` the
    /// already-composed initializer relation, and `invariant` the property to prove.
    /// Returns the abstracted transition relation (including the `__init` bookkeeping
    /// latch and every discovered stateful proposition in `stvars`) and the abstracted
    /// invariant.
    pub fn abstract_system(
        &mut self,
        ext_act: &TransitionRelation,
        initializers: &TransitionRelation,
        invariant: &Expr,
    ) -> (TransitionRelation, Expr) {
        self.stvarset = ext_act
            .stvars
            .iter()
            .chain(initializers.stvars.iter())
            .cloned()
            .collect();

        let init_sym = Symbol::new_symbol(INIT_LATCH, Sort::Bool);
        let init_cur = Expr::var(init_sym.clone());

        // Compose: if __init then ext_act else (initializers; __init := true).
        // __init's next value is a tautology (ite(__init, __init, true) == true) and is
        // wired directly rather than routed through the generic ite builder.
        let mut stvars: Vec<Symbol> = Vec::new();
        for s in ext_act.stvars.iter().chain(initializers.stvars.iter()) {
            if !stvars.contains(s) {
                stvars.push(s.clone());
            }
        }

        let mut defs: Vec<(Symbol, Expr)> = Vec::new();
        let mut seen_lhs: std::collections::HashSet<Symbol> = std::collections::HashSet::new();
        for s in stvars.iter() {
            let next = s.new();
            let from_ext = ext_act.def_of(&next).cloned();
            let from_init = initializers.def_of(&next).cloned();
            let combined = match (from_ext, from_init) {
                (Some(e), Some(i)) => Expr::Ite(
                    Box::new(init_cur.clone()),
                    Box::new(e),
                    Box::new(i),
                ),
                (Some(e), None) => Expr::Ite(
                    Box::new(init_cur.clone()),
                    Box::new(e),
                    Box::new(Expr::var(s.clone())),
                ),
                (None, Some(i)) => Expr::Ite(
                    Box::new(init_cur.clone()),
                    Box::new(Expr::var(s.clone())),
                    Box::new(i),
                ),
                (None, None) => Expr::var(s.clone()),
            };
            defs.push((next, combined));
            seen_lhs.insert(s.clone());
        }
        // Carry over non-next-state definitions from both branches, guarded the same way.
        for (sym, expr) in ext_act.defs.iter().chain(initializers.defs.iter()) {
            if sym.is_new() && seen_lhs.contains(&sym.new_of()) {
                continue;
            }
            defs.push((sym.clone(), expr.clone()));
        }

        let fmlas_ext = Expr::And(ext_act.fmlas.clone());
        let fmlas_init = Expr::And(initializers.fmlas.clone());
        let combined_fmla = Expr::Ite(
            Box::new(init_cur.clone()),
            Box::new(fmlas_ext),
            Box::new(fmlas_init),
        );

        // Step 4-6: abstract every subterm.
        let abs_defs: Vec<(Symbol, Expr)> = defs
            .into_iter()
            .filter_map(|(sym, expr)| {
                if self.needs_trivializing(&sym) {
                    None
                } else {
                    Some((sym, self.abs(&expr)))
                }
            })
            .collect();
        let abs_fmla = self.abs(&combined_fmla);

        // Step 7: abstract the invariant, plus a next-state pass to register any
        // latches the invariant's abstraction introduces under the next-state map.
        let abs_invariant = self.abs(invariant);
        let invariant_next = rename_current_to_new(invariant);
        let _ = self.abs(&invariant_next);

        let mut new_stvars: Vec<Symbol> = stvars
            .into_iter()
            .filter(|s| s.sort().is_finite())
            .collect();
        new_stvars.push(init_sym.clone());
        for s in self.fresh_stateful.drain(..) {
            if !new_stvars.contains(&s) {
                new_stvars.push(s);
            }
        }

        let mut result_defs = abs_defs;
        result_defs.push((init_sym.new(), Expr::Bool(true)));

        (
            TransitionRelation {
                stvars: new_stvars,
                defs: result_defs,
                fmlas: vec![abs_fmla],
                error: Expr::Bool(false),
            },
            abs_invariant,
        )
    }

    fn needs_trivializing(&self, sym: &Symbol) -> bool {
        let base = if sym.is_new() { sym.new_of() } else { sym.clone() };
        !sym.domain().is_empty() || !base.sort().is_finite()
    }

    /// `abs(t)`: the structural abstraction recursion (C3 step 4).
    fn abs(&mut self, t: &Expr) -> Expr {
        match t {
            Expr::Quant { .. } => self.new_prop(t),
            Expr::App { func, args } => {
                if args.is_empty() {
                    t.clone()
                } else {
                    let any_infinite = args.iter().any(|a| !sort_of(a).is_finite());
                    if any_infinite {
                        self.new_prop(t)
                    } else {
                        Expr::App {
                            func: func.clone(),
                            args: args.iter().map(|a| self.abs(a)).collect(),
                        }
                    }
                }
            }
            Expr::Bool(b) => Expr::Bool(*b),
            Expr::And(xs) => Expr::And(xs.iter().map(|x| self.abs(x)).collect()),
            Expr::Or(xs) => Expr::Or(xs.iter().map(|x| self.abs(x)).collect()),
            Expr::Not(x) => Expr::Not(Box::new(self.abs(x))),
            Expr::Eq(a, b) => {
                if !sort_of(a).is_finite() {
                    self.new_prop(t)
                } else {
                    Expr::Eq(Box::new(self.abs(a)), Box::new(self.abs(b)))
                }
            }
            Expr::Ite(c, th, e) => Expr::Ite(
                Box::new(self.abs(c)),
                Box::new(self.abs(th)),
                Box::new(self.abs(e)),
            ),
        }
    }

    /// `new_prop(t)`: memoized fresh-proposition introduction (C3 step 5).
    fn new_prop(&mut self, t: &Expr) -> Expr {
        if let Some(e) = self.memo.get(t) {
            return e.clone();
        }
        let has_current = contains_tagged(t, false);
        let has_next = contains_tagged(t, true);
        let result = if !has_current && has_next {
            let prev = rename_new_to_current(t);
            let prev_abs = self.new_prop(&prev);
            let sym = prev_abs
                .as_atom()
                .expect("new_prop always returns an atomic reference")
                .clone();
            if !self.fresh_stateful.contains(&sym) {
                self.fresh_stateful.push(sym.clone());
            }
            Expr::var(sym.new())
        } else {
            let idx = self.prop_abs_ctr;
            self.prop_abs_ctr += 1;
            let sort = sort_of(t);
            warn!("abstracting subterm into fresh proposition __abs[{idx}]");
            let sym = Symbol::new_symbol(format!("__abs[{idx}]"), sort);
            Expr::var(sym)
        };
        self.memo.insert(t.clone(), result.clone());
        result
    }
}
