//! Compiles a first-order transition-system module and its invariant into an AIGER
//! netlist checkable by a bounded or unbounded hardware model checker, and lifts the
//! checker's witness back into source vocabulary.
//!
//! The pipeline has four stages: propositional abstraction ([`abstractor`]) replaces
//! quantified and infinite-sorted subterms with fresh Boolean propositions, bit-blasting
//! ([`encoder`]) encodes the remaining finite-sorted state into bit-vectors of AIGER
//! literals, the netlist builder ([`netlist`]) assembles and folds those literals into
//! an AND-inverter graph, and the driver ([`driver`]) glues the three together into one
//! compiled system. [`witness`] decodes a counterexample trace back out.

pub mod abstractor;
pub mod checker;
pub mod driver;
pub mod encoder;
pub mod error;
pub mod ir;
pub mod netlist;
pub mod witness;

pub use driver::{compile, CompiledSystem};
pub use error::CompileError;
