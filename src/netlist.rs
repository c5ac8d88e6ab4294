//! Incremental And-Inverter Graph with canonical AIGER literal numbering.
//!
//! Variable indices are assigned in three strictly increasing bands, in declaration
//! order: inputs, then latches, then AND gates. A literal's low bit is its negation
//! flag; the rest of the literal is twice the variable index. `0`/`1` are the
//! constant literals.

use std::fmt;

/// An AIGER literal: a non-negative integer whose low bit is the negation flag.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Debug, Default)]
pub struct Lit {
    a: u32,
}

impl Lit {
    /// The constant `false` literal (`0`).
    pub fn zero() -> Lit {
        Lit { a: 0 }
    }

    /// The constant `true` literal (`1`).
    pub fn one() -> Lit {
        Lit { a: 1 }
    }

    /// The positive literal for 1-based AIGER variable index `v`.
    pub fn from_var(v: u32) -> Lit {
        assert!(v > 0, "variable index 0 is reserved for constants");
        Lit { a: v << 1 }
    }

    /// Whether this literal is one of the two constants.
    pub fn is_constant(&self) -> bool {
        self.a >> 1 == 0
    }

    /// The 1-based AIGER variable index. Panics on a constant literal.
    pub fn var(&self) -> u32 {
        assert!(!self.is_constant());
        self.a >> 1
    }

    /// The negation flag (`true` = complemented).
    pub fn pol(&self) -> bool {
        self.a & 1 != 0
    }

    /// The raw AIGER literal value, as written to the ASCII file.
    pub fn value(&self) -> u32 {
        self.a
    }
}

impl std::ops::Not for Lit {
    type Output = Lit;
    fn not(self) -> Lit {
        Lit { a: self.a ^ 1 }
    }
}

impl fmt::Display for Lit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.a)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Inputs,
    Latches,
    Gates,
}

/// The incremental netlist. Gates are appended without hashing or minimization;
/// downstream tools are expected to simplify the emitted AIGER.
#[derive(Clone, Debug)]
pub struct Netlist {
    nb_inputs: u32,
    nb_latches: u32,
    gates: Vec<(Lit, Lit)>,
    latch_next: Vec<Option<Lit>>,
    outputs: Vec<Lit>,
    phase: Phase,
}

impl Default for Netlist {
    fn default() -> Self {
        Self::new()
    }
}

impl Netlist {
    /// An empty netlist, ready to declare inputs.
    pub fn new() -> Netlist {
        Netlist {
            nb_inputs: 0,
            nb_latches: 0,
            gates: Vec::new(),
            latch_next: Vec::new(),
            outputs: Vec::new(),
            phase: Phase::Inputs,
        }
    }

    /// The constant `false` literal.
    pub fn constant_false(&self) -> Lit {
        Lit::zero()
    }

    /// The constant `true` literal.
    pub fn constant_true(&self) -> Lit {
        Lit::one()
    }

    /// Number of declared inputs.
    pub fn nb_inputs(&self) -> u32 {
        self.nb_inputs
    }

    /// Number of declared latches.
    pub fn nb_latches(&self) -> u32 {
        self.nb_latches
    }

    /// Number of AND gates appended so far.
    pub fn nb_gates(&self) -> u32 {
        self.gates.len() as u32
    }

    /// Declare a fresh primary input, returning its positive literal.
    pub fn declare_input(&mut self) -> Lit {
        assert_eq!(
            self.phase,
            Phase::Inputs,
            "inputs must all be declared before any latch or gate"
        );
        self.nb_inputs += 1;
        Lit::from_var(self.nb_inputs)
    }

    /// Declare a fresh latch, returning its (current-state) positive literal.
    ///
    /// Its next-state value must be set exactly once via [`Netlist::set_latch_next`]
    /// before [`Netlist::serialize`] is called.
    pub fn declare_latch(&mut self) -> Lit {
        assert!(
            self.phase != Phase::Gates,
            "latches must all be declared before any gate"
        );
        self.phase = Phase::Latches;
        self.nb_latches += 1;
        self.latch_next.push(None);
        Lit::from_var(self.nb_inputs + self.nb_latches)
    }

    fn append_and(&mut self, a: Lit, b: Lit) -> Lit {
        self.phase = Phase::Gates;
        let var = self.nb_inputs + self.nb_latches + self.gates.len() as u32 + 1;
        self.gates.push((a, b));
        Lit::from_var(var)
    }

    /// A 2-input AND gate, with local constant/tautology/contradiction folding.
    ///
    /// Folding is purely local to the two operands of this call: it never looks up
    /// whether an equivalent gate already exists elsewhere (no global CSE).
    pub fn and_gate(&mut self, a: Lit, b: Lit) -> Lit {
        if a == b {
            a
        } else if a == !b {
            Lit::zero()
        } else if a == Lit::zero() || b == Lit::zero() {
            Lit::zero()
        } else if a == Lit::one() {
            b
        } else if b == Lit::one() {
            a
        } else {
            self.append_and(a, b)
        }
    }

    /// Fold `and_gate` over `xs` left to right; `and_many(&[]) == constant_true()`.
    pub fn and_many(&mut self, xs: &[Lit]) -> Lit {
        xs.iter().fold(Lit::one(), |acc, &x| self.and_gate(acc, x))
    }

    /// `!x`, a pure literal operation costing no gate.
    pub fn not_lit(&self, x: Lit) -> Lit {
        !x
    }

    /// `or(xs) = !and(!xs)`; `or_many(&[]) == constant_false()`.
    pub fn or_many(&mut self, xs: &[Lit]) -> Lit {
        let negated: Vec<Lit> = xs.iter().map(|&x| !x).collect();
        !self.and_many(&negated)
    }

    /// Conditional selection `ite(c,t,e) = or(and(c,t), and(!c,e))`.
    pub fn ite(&mut self, c: Lit, t: Lit, e: Lit) -> Lit {
        let a = self.and_gate(c, t);
        let b = self.and_gate(!c, e);
        self.or_many(&[a, b])
    }

    /// Boolean biconditional `iff(x,y) = or(and(x,y), and(!x,!y))`.
    pub fn iff(&mut self, x: Lit, y: Lit) -> Lit {
        let a = self.and_gate(x, y);
        let b = self.and_gate(!x, !y);
        self.or_many(&[a, b])
    }

    /// Boolean exclusive-or `xor(x,y) = !iff(x,y)`.
    pub fn xor(&mut self, x: Lit, y: Lit) -> Lit {
        let v = self.iff(x, y);
        !v
    }

    /// Append a new primary output.
    pub fn add_output(&mut self, lit: Lit) {
        self.outputs.push(lit);
    }

    /// Assign the next-state function of a previously declared latch. Must be called
    /// exactly once per latch, before [`Netlist::serialize`].
    pub fn set_latch_next(&mut self, latch_lit: Lit, next_lit: Lit) {
        let var = latch_lit.var();
        assert!(
            var > self.nb_inputs && var <= self.nb_inputs + self.nb_latches,
            "{latch_lit} is not a latch output literal"
        );
        let idx = (var - self.nb_inputs - 1) as usize;
        assert!(
            self.latch_next[idx].is_none(),
            "latch {latch_lit} already has a next-state function"
        );
        self.latch_next[idx] = Some(next_lit);
    }

    /// Serialize to ASCII AIGER: header `aag M I L O A`, then inputs, latches
    /// (`lit_out lit_next`), outputs, and AND gates (`out a b`).
    pub fn serialize(&self) -> String {
        for (i, n) in self.latch_next.iter().enumerate() {
            assert!(
                n.is_some(),
                "latch {} never received a next-state function",
                i
            );
        }
        let i = self.nb_inputs;
        let l = self.nb_latches;
        let a = self.gates.len() as u32;
        let m = i + l + a;
        let o = self.outputs.len() as u32;

        let mut s = String::new();
        s.push_str(&format!("aag {m} {i} {l} {o} {a}\n"));
        for v in 1..=i {
            s.push_str(&format!("{}\n", Lit::from_var(v)));
        }
        for (k, next) in self.latch_next.iter().enumerate() {
            let out = Lit::from_var(i + k as u32 + 1);
            s.push_str(&format!("{} {}\n", out, next.unwrap()));
        }
        for out in &self.outputs {
            s.push_str(&format!("{out}\n"));
        }
        for (k, (ga, gb)) in self.gates.iter().enumerate() {
            let out = Lit::from_var(i + l + k as u32 + 1);
            s.push_str(&format!("{out} {ga} {gb}\n"));
        }
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_parity() {
        let l0 = Lit::zero();
        let l1 = Lit::one();
        assert_eq!(l0, !l1);
        assert_eq!(l1, !l0);
        assert!(!l0.pol());
        assert!(l1.pol());
        for v in 1u32..5 {
            let l = Lit::from_var(v);
            assert_eq!(l.var(), v);
            assert!(!l.pol());
            assert!((!l).pol());
            assert_eq!(l.value() % 2, 0);
        }
    }

    #[test]
    fn declaration_order_is_contiguous() {
        let mut n = Netlist::new();
        let i0 = n.declare_input();
        let i1 = n.declare_input();
        let l0 = n.declare_latch();
        assert_eq!(i0, Lit::from_var(1));
        assert_eq!(i1, Lit::from_var(2));
        assert_eq!(l0, Lit::from_var(3));
        let g = n.and_gate(i0, i1);
        assert_eq!(g, Lit::from_var(4));
        n.set_latch_next(l0, g);
        n.add_output(g);
        let aiger = n.serialize();
        assert!(aiger.starts_with("aag 4 2 1 1 1\n"));
    }

    #[test]
    #[should_panic]
    fn latch_after_gate_is_rejected() {
        let mut n = Netlist::new();
        let i0 = n.declare_input();
        n.and_gate(i0, i0);
        n.declare_latch();
    }

    #[test]
    fn and_gate_folds_constants_and_tautologies() {
        let mut n = Netlist::new();
        let i0 = n.declare_input();
        assert_eq!(n.and_gate(i0, i0), i0);
        assert_eq!(n.and_gate(i0, !i0), Lit::zero());
        assert_eq!(n.and_gate(i0, Lit::one()), i0);
        assert_eq!(n.and_gate(i0, Lit::zero()), Lit::zero());
        assert_eq!(n.nb_gates(), 0);
    }

    #[test]
    fn and_many_of_empty_is_true() {
        let mut n = Netlist::new();
        assert_eq!(n.and_many(&[]), Lit::one());
        assert_eq!(n.or_many(&[]), Lit::zero());
    }

    #[test]
    fn ite_with_equal_branches_needs_no_gate() {
        // ite(c, c, true) is a tautology and should fold away entirely.
        let mut n = Netlist::new();
        let c = n.declare_input();
        let result = n.ite(c, c, Lit::one());
        assert_eq!(result, Lit::one());
        assert_eq!(n.nb_gates(), 0);
    }
}
