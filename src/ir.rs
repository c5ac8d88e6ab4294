//! First-order source vocabulary: sorts, symbols, expressions and transition relations.
//!
//! This is the input vocabulary the compiler works over. Evaluating an action into
//! a [`TransitionRelation`] is the job of an external symbolic-execution front end;
//! this module only defines the shape of what that front end hands us.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CompileError;

/// A sort is either one of the three finite encodings, or an infinite/uninterpreted sort.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sort {
    /// Single-bit Boolean sort.
    Bool,
    /// Enumerated sort with `cardinality` named constructors `c_0 .. c_{cardinality-1}`.
    Enum {
        /// Number of constructors.
        cardinality: u32,
    },
    /// Bit-vector sort of the given width.
    Bv {
        /// Bit width.
        width: u32,
    },
    /// An infinite or otherwise uninterpreted sort, named by its theory.
    Infinite {
        /// Name of the interpreting theory, e.g. `"int"` or the uninterpreted sort's name.
        theory: String,
    },
}

impl Sort {
    /// Whether this sort has a finite bit-blasted encoding.
    pub fn is_finite(&self) -> bool {
        !matches!(self, Sort::Infinite { .. })
    }

    /// Number of bits needed to encode a value of this sort, MSB-first.
    ///
    /// Raises [`CompileError::UnsupportedSort`] for infinite sorts.
    pub fn encoding_bits(&self) -> Result<u32, CompileError> {
        match self {
            Sort::Bool => Ok(1),
            Sort::Enum { cardinality } => Ok(bits_for_cardinality(*cardinality)),
            Sort::Bv { width } => Ok(*width),
            Sort::Infinite { theory } => Err(CompileError::UnsupportedSort {
                sort: "infinite".to_string(),
                theory: Some(theory.clone()),
            }),
        }
    }

    /// Cardinality of a finite sort (number of distinct representable values).
    pub fn cardinality(&self) -> Option<u32> {
        match self {
            Sort::Bool => Some(2),
            Sort::Enum { cardinality } => Some(*cardinality),
            Sort::Bv { width } => Some(1u32.checked_shl(*width).unwrap_or(u32::MAX)),
            Sort::Infinite { .. } => None,
        }
    }
}

/// `ceil(log2(k))`, with the convention that a single-valued sort needs zero bits.
fn bits_for_cardinality(k: u32) -> u32 {
    if k <= 1 {
        0
    } else {
        32 - (k - 1).leading_zeros()
    }
}

/// The fixed set of interpreted arithmetic/comparison operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    /// Addition.
    Add,
    /// Subtraction.
    Sub,
    /// Multiplication.
    Mul,
    /// Division.
    Div,
    /// Modulo.
    Mod,
    /// Strict less-than.
    Lt,
}

/// Distinguished roles a symbol can play, per the source vocabulary.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SymbolKind {
    /// An arbitrary uninterpreted symbol (state variable, defined symbol, or free input).
    Uninterpreted,
    /// A constructor of an enum sort, e.g. `c_2`.
    Constructor {
        /// Index of the constructor among the sort's constructors.
        index: u32,
    },
    /// A numeral of an interpreted sort.
    Numeral {
        /// The numeral's integer value.
        value: i64,
    },
    /// One of the fixed interpreted operators.
    Operator(Operator),
}

/// A symbol: a name, a sort, and (for function symbols) a domain.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Symbol {
    name: String,
    sort: Sort,
    domain: Vec<Sort>,
    kind: SymbolKind,
    is_new: bool,
}

impl Symbol {
    /// A nullary uninterpreted symbol.
    pub fn new_symbol(name: impl Into<String>, sort: Sort) -> Symbol {
        Symbol {
            name: name.into(),
            sort,
            domain: Vec::new(),
            kind: SymbolKind::Uninterpreted,
            is_new: false,
        }
    }

    /// An uninterpreted symbol with a function domain.
    pub fn with_domain(name: impl Into<String>, domain: Vec<Sort>, sort: Sort) -> Symbol {
        Symbol {
            name: name.into(),
            sort,
            domain,
            kind: SymbolKind::Uninterpreted,
            is_new: false,
        }
    }

    fn distinguished(name: String, sort: Sort, kind: SymbolKind) -> Symbol {
        Symbol {
            name,
            sort,
            domain: Vec::new(),
            kind,
            is_new: false,
        }
    }

    /// The symbol's name, as it appears in diagnostics and trace output.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The symbol's sort.
    pub fn sort(&self) -> &Sort {
        &self.sort
    }

    /// The symbol's function domain (empty for nullary symbols).
    pub fn domain(&self) -> &[Sort] {
        &self.domain
    }

    /// The symbol's distinguished role.
    pub fn kind(&self) -> &SymbolKind {
        &self.kind
    }

    /// Whether this is the "next-state" counterpart of some current-state symbol.
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    /// `new(s)`: the next-state counterpart of this symbol. Involutive.
    pub fn new(&self) -> Symbol {
        let mut s = self.clone();
        s.is_new = !self.is_new;
        s
    }

    /// `new_of(s)`: the inverse of [`Symbol::new`]. `new` is its own inverse.
    pub fn new_of(&self) -> Symbol {
        self.new()
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_new {
            write!(f, "{}'", self.name)
        } else {
            write!(f, "{}", self.name)
        }
    }
}

/// The quantifier kind of a [`Expr::Quant`] node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuantKind {
    /// Universal quantification.
    Forall,
    /// Existential quantification.
    Exists,
}

/// A first-order expression. All traversal is structural.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Expr {
    /// Application `func(args...)`; a nullary application is an atomic symbol reference.
    App {
        /// The applied symbol (possibly a constructor, numeral, operator or uninterpreted symbol).
        func: Symbol,
        /// Arguments, empty for an atomic reference.
        args: Vec<Expr>,
    },
    /// A Boolean literal.
    Bool(bool),
    /// Conjunction.
    And(Vec<Expr>),
    /// Disjunction.
    Or(Vec<Expr>),
    /// Negation.
    Not(Box<Expr>),
    /// Equality between two same-sorted terms.
    Eq(Box<Expr>, Box<Expr>),
    /// Conditional selection.
    Ite(Box<Expr>, Box<Expr>, Box<Expr>),
    /// A quantified formula.
    Quant {
        /// The quantifier kind.
        kind: QuantKind,
        /// Bound variables.
        vars: Vec<Symbol>,
        /// The quantifier body.
        body: Box<Expr>,
    },
}

impl Expr {
    /// An atomic reference to a nullary symbol.
    pub fn var(sym: Symbol) -> Expr {
        Expr::App {
            func: sym,
            args: Vec::new(),
        }
    }

    /// A numeral literal of the given sort.
    pub fn numeral(value: i64, sort: Sort) -> Expr {
        let sym = Symbol::distinguished(
            format!("#{value}"),
            sort,
            SymbolKind::Numeral { value },
        );
        Expr::var(sym)
    }

    /// A constructor application for the `index`-th constructor of an enum sort.
    pub fn constructor(index: u32, sort: Sort) -> Expr {
        let sym = Symbol::distinguished(
            format!("c_{index}"),
            sort,
            SymbolKind::Constructor { index },
        );
        Expr::var(sym)
    }

    /// An application of one of the fixed interpreted operators.
    pub fn op(operator: Operator, args: Vec<Expr>, domain: Vec<Sort>, result: Sort) -> Expr {
        let name = match operator {
            Operator::Add => "+",
            Operator::Sub => "-",
            Operator::Mul => "*",
            Operator::Div => "/",
            Operator::Mod => "%",
            Operator::Lt => "<",
        };
        let sym = Symbol {
            name: name.to_string(),
            sort: result,
            domain,
            kind: SymbolKind::Operator(operator),
            is_new: false,
        };
        Expr::App { func: sym, args }
    }

    /// Whether this expression is an atomic, argument-less application.
    pub fn as_atom(&self) -> Option<&Symbol> {
        match self {
            Expr::App { func, args } if args.is_empty() => Some(func),
            _ => None,
        }
    }
}

/// The sort an expression evaluates to. Assumes a well-sorted expression.
pub fn sort_of(e: &Expr) -> Sort {
    match e {
        Expr::App { func, .. } => func.sort().clone(),
        Expr::Bool(_) | Expr::And(_) | Expr::Or(_) | Expr::Not(_) | Expr::Eq(_, _) => Sort::Bool,
        Expr::Ite(_, t, _) => sort_of(t),
        Expr::Quant { .. } => Sort::Bool,
    }
}

/// Collects every uninterpreted symbol referenced anywhere in `e` (quantifier bodies included).
pub fn free_symbols(e: &Expr, out: &mut HashSet<Symbol>) {
    match e {
        Expr::App { func, args } => {
            if matches!(func.kind(), SymbolKind::Uninterpreted) {
                out.insert(func.clone());
            }
            for a in args {
                free_symbols(a, out);
            }
        }
        Expr::Bool(_) => {}
        Expr::And(xs) | Expr::Or(xs) => {
            for x in xs {
                free_symbols(x, out);
            }
        }
        Expr::Not(x) => free_symbols(x, out),
        Expr::Eq(a, b) => {
            free_symbols(a, out);
            free_symbols(b, out);
        }
        Expr::Ite(c, t, f) => {
            free_symbols(c, out);
            free_symbols(t, out);
            free_symbols(f, out);
        }
        Expr::Quant { body, .. } => free_symbols(body, out),
    }
}

/// Whether `e` references any uninterpreted symbol with `is_new() == want_new`.
pub fn contains_tagged(e: &Expr, want_new: bool) -> bool {
    let mut syms = HashSet::new();
    free_symbols(e, &mut syms);
    syms.iter().any(|s| s.is_new() == want_new)
}

/// `prev_expr(t)`: rewrite every next-state symbol reference `new(s)` to its current form `s`.
pub fn rename_new_to_current(e: &Expr) -> Expr {
    match e {
        Expr::App { func, args } => {
            let new_func = if matches!(func.kind(), SymbolKind::Uninterpreted) && func.is_new() {
                func.new_of()
            } else {
                func.clone()
            };
            Expr::App {
                func: new_func,
                args: args.iter().map(rename_new_to_current).collect(),
            }
        }
        Expr::Bool(b) => Expr::Bool(*b),
        Expr::And(xs) => Expr::And(xs.iter().map(rename_new_to_current).collect()),
        Expr::Or(xs) => Expr::Or(xs.iter().map(rename_new_to_current).collect()),
        Expr::Not(x) => Expr::Not(Box::new(rename_new_to_current(x))),
        Expr::Eq(a, b) => Expr::Eq(
            Box::new(rename_new_to_current(a)),
            Box::new(rename_new_to_current(b)),
        ),
        Expr::Ite(c, t, f) => Expr::Ite(
            Box::new(rename_new_to_current(c)),
            Box::new(rename_new_to_current(t)),
            Box::new(rename_new_to_current(f)),
        ),
        Expr::Quant { kind, vars, body } => Expr::Quant {
            kind: *kind,
            vars: vars.clone(),
            body: Box::new(rename_new_to_current(body)),
        },
    }
}

/// `new(e)`: rewrite every current-state occurrence of `sym` (and only `sym`) to `new(sym)`.
///
/// Used to re-run the abstractor's bookkeeping over the next-state form of a formula (C3 step 7).
pub fn rename_current_to_new(e: &Expr) -> Expr {
    match e {
        Expr::App { func, args } => {
            let new_func = if matches!(func.kind(), SymbolKind::Uninterpreted) && !func.is_new() {
                func.new()
            } else {
                func.clone()
            };
            Expr::App {
                func: new_func,
                args: args.iter().map(rename_current_to_new).collect(),
            }
        }
        Expr::Bool(b) => Expr::Bool(*b),
        Expr::And(xs) => Expr::And(xs.iter().map(rename_current_to_new).collect()),
        Expr::Or(xs) => Expr::Or(xs.iter().map(rename_current_to_new).collect()),
        Expr::Not(x) => Expr::Not(Box::new(rename_current_to_new(x))),
        Expr::Eq(a, b) => Expr::Eq(
            Box::new(rename_current_to_new(a)),
            Box::new(rename_current_to_new(b)),
        ),
        Expr::Ite(c, t, f) => Expr::Ite(
            Box::new(rename_current_to_new(c)),
            Box::new(rename_current_to_new(t)),
            Box::new(rename_current_to_new(f)),
        ),
        Expr::Quant { kind, vars, body } => Expr::Quant {
            kind: *kind,
            vars: vars.clone(),
            body: Box::new(rename_current_to_new(body)),
        },
    }
}

/// A transition relation: the compiled shape of one action or initializer.
///
/// Invariant: every `sym` on the left of a definition in `defs` is unique, `defs` may
/// reference other defined symbols, and the reference graph is acyclic.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TransitionRelation {
    /// The ordered set of current-state symbols.
    pub stvars: Vec<Symbol>,
    /// Definitions `sym ≡ expr`, in an order consistent with their dependencies.
    pub defs: Vec<(Symbol, Expr)>,
    /// Conjunctive set of constraint formulas.
    pub fmlas: Vec<Expr>,
    /// The distinguished error condition (unused by the core; carried for completeness).
    pub error: Expr,
}

impl TransitionRelation {
    /// An empty relation: no state, no definitions, no constraints, error never holds.
    pub fn empty() -> TransitionRelation {
        TransitionRelation {
            stvars: Vec::new(),
            defs: Vec::new(),
            fmlas: Vec::new(),
            error: Expr::Bool(false),
        }
    }

    /// Look up the defining expression for `sym`, if any.
    pub fn def_of(&self, sym: &Symbol) -> Option<&Expr> {
        self.defs.iter().find(|(s, _)| s == sym).map(|(_, e)| e)
    }
}

/// One labeled conjunct of the invariant to be proved.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LabeledConj {
    /// A human-readable label for the conjunct (used only for diagnostics).
    pub label: String,
    /// The conjunct formula.
    pub formula: Expr,
}

/// A single named action: its declared name and its already-evaluated transition relation.
///
/// Evaluating source code into this transition relation is the symbolic-execution
/// front end's job; the core only ever consumes the result.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Action {
    /// The action's name.
    pub name: String,
    /// Its transition relation.
    pub relation: TransitionRelation,
}

/// The module interface consumed by the driver (C4): actions, initializers and invariant.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Module {
    /// All actions, by name.
    pub actions: Vec<Action>,
    /// Names of the externally-invocable (public) actions among [`Module::actions`].
    pub public_actions: HashSet<String>,
    /// Named initializer actions, run once before any public action is invoked.
    pub initializers: Vec<Action>,
    /// Conjuncts of the invariant to be proved.
    pub labeled_conjs: Vec<LabeledConj>,
    /// Background theory axioms, conjoined into every compiled constraint set.
    pub background_theory: Vec<Expr>,
}

impl Module {
    /// The invariant to be proved: the conjunction of all labeled conjuncts.
    pub fn invariant(&self) -> Expr {
        Expr::And(self.labeled_conjs.iter().map(|c| c.formula.clone()).collect())
    }

    /// The public actions, looked up by name.
    pub fn public_action_relations(&self) -> Vec<&Action> {
        self.actions
            .iter()
            .filter(|a| self.public_actions.contains(&a.name))
            .collect()
    }
}
