//! Finite-sort encoder: bit-blasts finite-sort symbols and expressions to vectors of
//! [`Lit`]s over an owned [`Netlist`].

use std::collections::HashMap;

use itertools::Itertools;
use log::debug;

use crate::error::CompileError;
use crate::ir::{Expr, Operator, Sort, Symbol, SymbolKind};
use crate::netlist::{Lit, Netlist};

/// Wraps a [`Netlist`] and maintains the symbol-to-bits encoding map.
///
/// The encoder exclusively owns the netlist: it is composition, not inheritance.
/// Definitions are memoized aliases (no gates of their own); [`Encoder::deflist`]
/// evaluates a definition's right-hand side on demand the first time it's referenced.
pub struct Encoder {
    netlist: Netlist,
    encoding: HashMap<Symbol, Vec<Lit>>,
    pending_defs: HashMap<Symbol, Expr>,
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Encoder {
    /// A fresh encoder over a fresh, empty netlist.
    pub fn new() -> Encoder {
        Encoder {
            netlist: Netlist::new(),
            encoding: HashMap::new(),
            pending_defs: HashMap::new(),
        }
    }

    /// Borrow the underlying netlist.
    pub fn netlist(&self) -> &Netlist {
        &self.netlist
    }

    /// Mutably borrow the underlying netlist.
    pub fn netlist_mut(&mut self) -> &mut Netlist {
        &mut self.netlist
    }

    /// Consume the encoder, handing ownership of the netlist to the serializer.
    pub fn into_netlist(self) -> Netlist {
        self.netlist
    }

    /// The encoded bit vector for `sym`, if it has one.
    pub fn bits(&self, sym: &Symbol) -> Option<&[Lit]> {
        self.encoding.get(sym).map(|v| v.as_slice())
    }

    /// Declare a fresh primary input symbol and return its encoding.
    pub fn declare_input(&mut self, sym: &Symbol) -> Result<Vec<Lit>, CompileError> {
        let n = sym.sort().encoding_bits()?;
        let bits: Vec<Lit> = (0..n).map(|_| self.netlist.declare_input()).collect();
        self.encoding.insert(sym.clone(), bits.clone());
        Ok(bits)
    }

    /// Declare a fresh latch symbol and return its (current-state) encoding.
    pub fn declare_latch(&mut self, sym: &Symbol) -> Result<Vec<Lit>, CompileError> {
        let n = sym.sort().encoding_bits()?;
        let bits: Vec<Lit> = (0..n).map(|_| self.netlist.declare_latch()).collect();
        self.encoding.insert(sym.clone(), bits.clone());
        Ok(bits)
    }

    /// Register a pending definition `sym ≡ expr`, to be evaluated lazily on first
    /// reference by [`Encoder::eval`].
    pub fn register_def(&mut self, sym: Symbol, expr: Expr) {
        self.pending_defs.insert(sym, expr);
    }

    /// `define(sym, bits)`: alias `sym` to an already-computed bit vector. Definitions
    /// are literal aliases, never new gates.
    pub fn define(&mut self, sym: &Symbol, bits: Vec<Lit>) {
        self.encoding.insert(sym.clone(), bits);
    }

    /// Process a dependency-correct ordering of definitions, evaluating and aliasing
    /// each one. Referenced-but-undefined symbols are evaluated (and memoized)
    /// recursively on demand.
    pub fn deflist(&mut self, defs: &[(Symbol, Expr)]) -> Result<(), CompileError> {
        for (sym, expr) in defs {
            self.pending_defs.insert(sym.clone(), expr.clone());
        }
        for (sym, _) in defs {
            if self.encoding.contains_key(sym) {
                continue;
            }
            let bits = self.eval(&Expr::var(sym.clone()))?;
            self.define(sym, bits);
        }
        Ok(())
    }

    /// Pointwise AND over equal-length vectors.
    pub fn andv(&mut self, x: &[Lit], y: &[Lit]) -> Vec<Lit> {
        x.iter()
            .zip_eq(y)
            .map(|(&a, &b)| self.netlist.and_gate(a, b))
            .collect()
    }

    /// Pointwise OR over equal-length vectors.
    pub fn orv(&mut self, x: &[Lit], y: &[Lit]) -> Vec<Lit> {
        x.iter()
            .zip_eq(y)
            .map(|(&a, &b)| self.netlist.or_many(&[a, b]))
            .collect()
    }

    /// Pointwise negation.
    pub fn notv(&self, x: &[Lit]) -> Vec<Lit> {
        x.iter().map(|&a| self.netlist.not_lit(a)).collect()
    }

    /// `ite_v(c,t,e)`: vectorized conditional, using `c[0]` as the sole selector.
    pub fn ite_v(&mut self, c: &[Lit], t: &[Lit], e: &[Lit]) -> Vec<Lit> {
        assert_eq!(c.len(), 1, "ite_v's condition must be a single bit");
        t.iter()
            .zip_eq(e)
            .map(|(&tb, &eb)| self.netlist.ite(c[0], tb, eb))
            .collect()
    }

    /// MSB-first constant encoding of `m mod 2^n`.
    pub fn bin_enc(&self, m: i64, n: u32) -> Vec<Lit> {
        let modulus: i64 = if n >= 63 { i64::MAX } else { 1i64 << n };
        let v = m.rem_euclid(modulus.max(1));
        (0..n)
            .map(|i| {
                let bit = (v >> (n - 1 - i)) & 1;
                if bit == 1 {
                    Lit::one()
                } else {
                    Lit::zero()
                }
            })
            .collect()
    }

    /// Inverse of [`Encoder::bin_enc`], interpreting constant literals as 0/1.
    ///
    /// Panics if any bit is a non-constant literal (only meaningful on a fully
    /// constant-folded vector, e.g. the output of [`Encoder::bin_enc`]).
    pub fn bin_dec(&self, bits: &[Lit]) -> u64 {
        let mut v: u64 = 0;
        for &b in bits {
            assert!(b.is_constant(), "bin_dec requires a constant bit vector");
            v = (v << 1) | (b == Lit::one()) as u64;
        }
        v
    }

    /// True iff the unsigned MSB-first integer represented by `bits` is `>= n`.
    pub fn ge_bin(&mut self, bits: &[Lit], n: u64) -> Lit {
        self.ge_bin_rec(bits, n)
    }

    fn ge_bin_rec(&mut self, bits: &[Lit], n: u64) -> Lit {
        if n == 0 {
            return Lit::one();
        }
        if bits.is_empty() || n >= (1u64 << bits.len()) {
            return Lit::zero();
        }
        let half = 1u64 << (bits.len() - 1);
        let hi = bits[0];
        if n >= half {
            // High bit must be set, and the remainder must satisfy n - half.
            let rest = self.ge_bin_rec(&bits[1..], n - half);
            self.netlist.and_gate(hi, rest)
        } else {
            // Either the high bit is set (always satisfies), or it's clear and the
            // remainder alone must satisfy n.
            let rest = self.ge_bin_rec(&bits[1..], n);
            self.netlist.or_many(&[hi, rest])
        }
    }

    /// Equality of two equal-length operands of a sort with cardinality `card`
    /// (`None` for a plain bit-vector, which has no saturation class).
    pub fn eq(&mut self, x: &[Lit], y: &[Lit], card: Option<u32>) -> Lit {
        let pointwise: Vec<Lit> = x
            .iter()
            .zip(y)
            .map(|(&a, &b)| self.netlist.iff(a, b))
            .collect();
        let direct = self.netlist.and_many(&pointwise);
        match card {
            Some(c) if c < (1u32 << x.len()) => {
                let x_sat = self.ge_bin(x, (c - 1) as u64);
                let y_sat = self.ge_bin(y, (c - 1) as u64);
                let both_sat = self.netlist.and_gate(x_sat, y_sat);
                self.netlist.or_many(&[direct, both_sat])
            }
            _ => direct,
        }
    }

    /// Ripple-carry addition `x + y + cin`, MSB-first.
    pub fn add(&mut self, x: &[Lit], y: &[Lit], cin: Lit) -> Vec<Lit> {
        let w = x.len();
        let mut sum = vec![Lit::zero(); w];
        let mut carry = cin;
        for i in (0..w).rev() {
            let xb = x[i];
            let yb = y[i];
            sum[i] = self.netlist.xor(self.netlist.xor(xb, yb), carry);
            let ab = self.netlist.and_gate(xb, yb);
            let bc = self.netlist.and_gate(xb, carry);
            let ac = self.netlist.and_gate(yb, carry);
            carry = self.netlist.or_many(&[ab, bc, ac]);
        }
        sum
    }

    /// Two's-complement subtraction `x - y`.
    pub fn sub(&mut self, x: &[Lit], y: &[Lit]) -> Vec<Lit> {
        let not_y = self.notv(y);
        self.add(x, &not_y, Lit::one())
    }

    /// Shift-and-conditional-add multiplication.
    pub fn mul(&mut self, x: &[Lit], y: &[Lit]) -> Vec<Lit> {
        let w = x.len();
        let mut acc = vec![Lit::zero(); w];
        for i in 0..w {
            // acc <<= 1 (MSB-first left shift, dropping the overflowed top bit)
            let mut shifted = acc[1..].to_vec();
            shifted.push(Lit::zero());
            let sum = self.add(&shifted, y, Lit::zero());
            let bit = x[i];
            acc = shifted
                .iter()
                .zip(sum.iter())
                .map(|(&a, &s)| self.netlist.ite(bit, s, a))
                .collect();
        }
        acc
    }

    /// Restoring long division; quotient of `x / y`. `y` is assumed non-zero.
    pub fn div(&mut self, x: &[Lit], y: &[Lit]) -> Vec<Lit> {
        self.div_mod(x, y).0
    }

    /// `mod(x,y) = x - (x/y)*y`, the quotient-residue identity.
    pub fn modulo(&mut self, x: &[Lit], y: &[Lit]) -> Vec<Lit> {
        self.div_mod(x, y).1
    }

    fn div_mod(&mut self, x: &[Lit], y: &[Lit]) -> (Vec<Lit>, Vec<Lit>) {
        let w = x.len();
        let mut remainder = vec![Lit::zero(); w];
        let mut quotient = vec![Lit::zero(); w];
        for i in 0..w {
            // remainder = (remainder << 1) | x[i]
            let mut shifted = remainder[1..].to_vec();
            shifted.push(x[i]);
            let ge = self.ge_bin_lits(&shifted, y);
            let subtracted = self.sub(&shifted, y);
            remainder = shifted
                .iter()
                .zip(subtracted.iter())
                .map(|(&s, &sub)| self.netlist.ite(ge, sub, s))
                .collect();
            quotient[i] = ge;
        }
        let product = self.mul(&quotient, y);
        let residue = self.sub(x, &product);
        (quotient, residue)
    }

    /// `x >= y` as a single literal, for two equal-length operands (not the constant
    /// cardinality form used by [`Encoder::ge_bin`]).
    fn ge_bin_lits(&mut self, x: &[Lit], y: &[Lit]) -> Lit {
        let strict_lt = self.lt(y, x, Lit::one());
        strict_lt
    }

    /// `lt(x,y,seed)`: MSB-first carry recurrence. `seed = 0` gives strict `<`,
    /// `seed = 1` gives `<=`.
    pub fn lt(&mut self, x: &[Lit], y: &[Lit], seed: Lit) -> Lit {
        let mut carry = seed;
        for i in 0..x.len() {
            let xb = x[i];
            let yb = y[i];
            let not_xb = self.netlist.not_lit(xb);
            let and_xy = self.netlist.and_gate(not_xb, yb);
            let iff_xy = self.netlist.iff(xb, yb);
            let and_iff_c = self.netlist.and_gate(iff_xy, carry);
            carry = self.netlist.or_many(&[and_xy, and_iff_c]);
        }
        carry
    }

    /// Evaluate `expr` to a bit vector, recursing into pending definitions on demand.
    pub fn eval(&mut self, expr: &Expr) -> Result<Vec<Lit>, CompileError> {
        match expr {
            Expr::App { func, args } if args.is_empty() => self.eval_atom(func),
            Expr::App { func, args } => self.eval_app(func, args),
            Expr::Bool(b) => Ok(vec![if *b { Lit::one() } else { Lit::zero() }]),
            Expr::And(xs) => {
                let mut bits = Vec::new();
                for x in xs {
                    bits.push(self.eval(x)?[0]);
                }
                Ok(vec![self.netlist.and_many(&bits)])
            }
            Expr::Or(xs) => {
                let mut bits = Vec::new();
                for x in xs {
                    bits.push(self.eval(x)?[0]);
                }
                Ok(vec![self.netlist.or_many(&bits)])
            }
            Expr::Not(x) => {
                let v = self.eval(x)?;
                Ok(self.notv(&v))
            }
            Expr::Eq(a, b) => {
                let sort = crate::ir::sort_of(a);
                let va = self.eval(a)?;
                let vb = self.eval(b)?;
                let card = sort.cardinality();
                Ok(vec![self.eq(&va, &vb, card)])
            }
            Expr::Ite(c, t, e) => {
                let vc = self.eval(c)?;
                let vt = self.eval(t)?;
                let ve = self.eval(e)?;
                Ok(self.ite_v(&vc, &vt, &ve))
            }
            Expr::Quant { .. } => Err(CompileError::UnsupportedSort {
                sort: "quantified formula".to_string(),
                theory: None,
            }),
        }
    }

    fn eval_atom(&mut self, sym: &Symbol) -> Result<Vec<Lit>, CompileError> {
        if let Some(bits) = self.encoding.get(sym) {
            return Ok(bits.clone());
        }
        match sym.kind().clone() {
            SymbolKind::Constructor { index } => {
                let n = sym.sort().encoding_bits()?;
                let bits = self.bin_enc(index as i64, n);
                self.encoding.insert(sym.clone(), bits.clone());
                Ok(bits)
            }
            SymbolKind::Numeral { value } => {
                let n = sym.sort().encoding_bits()?;
                let bits = self.bin_enc(value, n);
                self.encoding.insert(sym.clone(), bits.clone());
                Ok(bits)
            }
            SymbolKind::Operator(_) => Err(CompileError::DefinitionDependency {
                symbol: sym.name().to_string(),
            }),
            SymbolKind::Uninterpreted => {
                if let Some(def) = self.pending_defs.get(sym).cloned() {
                    debug!("encoding pending definition for `{sym}`");
                    let bits = self.eval(&def)?;
                    self.encoding.insert(sym.clone(), bits.clone());
                    Ok(bits)
                } else {
                    Err(CompileError::DefinitionDependency {
                        symbol: sym.name().to_string(),
                    })
                }
            }
        }
    }

    fn eval_app(&mut self, func: &Symbol, args: &[Expr]) -> Result<Vec<Lit>, CompileError> {
        let op = match func.kind() {
            SymbolKind::Operator(op) => *op,
            _ => {
                return Err(CompileError::DefinitionDependency {
                    symbol: func.name().to_string(),
                })
            }
        };
        let mut vals = Vec::with_capacity(args.len());
        for a in args {
            vals.push(self.eval(a)?);
        }
        match op {
            Operator::Add => Ok(self.add(&vals[0], &vals[1], Lit::zero())),
            Operator::Sub => Ok(self.sub(&vals[0], &vals[1])),
            Operator::Mul => Ok(self.mul(&vals[0], &vals[1])),
            Operator::Div => Ok(self.div(&vals[0], &vals[1])),
            Operator::Mod => Ok(self.modulo(&vals[0], &vals[1])),
            Operator::Lt => Ok(vec![self.lt(&vals[0], &vals[1], Lit::zero())]),
        }
    }

    /// Decode a witness state-bitstring into source-level values, one per latch symbol
    /// in declaration order. `None` marks a don't-care (`x`) bit decoding to "unknown".
    pub fn get_state(
        &self,
        latch_syms: &[Symbol],
        post_bitstring: &str,
    ) -> Result<Vec<(Symbol, Option<i64>)>, CompileError> {
        let total_bits: usize = latch_syms
            .iter()
            .map(|s| s.sort().encoding_bits().unwrap_or(0) as usize)
            .sum();
        if post_bitstring.len() != total_bits {
            return Err(CompileError::MalformedWitness {
                reason: format!(
                    "post column has {} bits, expected {total_bits} latches",
                    post_bitstring.len()
                ),
            });
        }
        let chars: Vec<char> = post_bitstring.chars().collect();
        let mut offset = 0;
        let mut result = Vec::with_capacity(latch_syms.len());
        for sym in latch_syms {
            let n = sym.sort().encoding_bits().unwrap_or(0) as usize;
            let slice = &chars[offset..offset + n];
            offset += n;
            if slice.iter().any(|&c| c == 'x') {
                result.push((sym.clone(), None));
                continue;
            }
            let mut v: u64 = 0;
            for &c in slice {
                let bit = match c {
                    '0' => 0,
                    '1' => 1,
                    other => {
                        return Err(CompileError::MalformedWitness {
                            reason: format!("unexpected bit character `{other}`"),
                        })
                    }
                };
                v = (v << 1) | bit;
            }
            let decoded = match sym.sort() {
                Sort::Enum { cardinality } => v.min((*cardinality as u64).saturating_sub(1)),
                _ => v,
            };
            result.push((sym.clone(), Some(decoded as i64)));
        }
        Ok(result)
    }
}
