//! Trace lifter (C5): parses the model checker's witness and reconstructs a
//! source-level state sequence using the encoder's state-decoding interface.

use crate::encoder::Encoder;
use crate::error::CompileError;
use crate::ir::Symbol;

/// How a [`TraceStep`] was reached.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepKind {
    /// The step produced by the initializer.
    Initial,
    /// A step produced by invoking an externally-visible action.
    ExternalAction,
}

/// One decoded state along a counterexample trace.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TraceStep {
    /// Whether this is the initial state or a subsequent external-action step.
    pub kind: StepKind,
    /// `symbol = value` equalities for every state variable whose value was not `x`.
    pub assignments: Vec<(String, i64)>,
}

/// A lifted counterexample: an ordered sequence of source-level states.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Trace {
    /// The decoded steps, in order.
    pub steps: Vec<TraceStep>,
}

/// Parse the model checker's witness text and, if it reports a counterexample, lift it
/// into a source-level [`Trace`] using `encoder` and the latch ordering in `stvars`.
///
/// The witness format is: line 1 is `1` if a counterexample is present (else `0`);
/// subsequent lines are four whitespace-separated columns `pre inp out post`, one
/// per step. The trailing two latches in `stvars` (`__init`, `__cnst`) are
/// bookkeeping and are never reported in the trace.
pub fn lift_witness(
    witness_text: &str,
    encoder: &Encoder,
    stvars: &[Symbol],
) -> Result<Option<Trace>, CompileError> {
    let mut lines = witness_text.lines();
    let header = lines.next().ok_or_else(|| CompileError::MalformedWitness {
        reason: "empty witness".to_string(),
    })?;
    match header.trim() {
        "0" => return Ok(None),
        "1" => {}
        other => {
            return Err(CompileError::MalformedWitness {
                reason: format!("expected header `0` or `1`, got `{other}`"),
            })
        }
    }

    if stvars.len() < 2 {
        return Err(CompileError::MalformedWitness {
            reason: "fewer than two latches: missing __init/__cnst bookkeeping".to_string(),
        });
    }
    let reported_syms = &stvars[..stvars.len() - 2];

    let mut steps = Vec::new();
    for (i, line) in lines.enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let cols: Vec<&str> = line.split_whitespace().collect();
        if cols.len() != 4 {
            return Err(CompileError::MalformedWitness {
                reason: format!("step {i}: expected 4 columns, got {}", cols.len()),
            });
        }
        let post = cols[3];
        let decoded = encoder.get_state(stvars, post)?;
        let assignments: Vec<(String, i64)> = decoded
            .into_iter()
            .filter(|(sym, _)| reported_syms.contains(sym))
            .filter_map(|(sym, value)| value.map(|v| (sym.name().to_string(), v)))
            .collect();
        let kind = if i == 0 {
            StepKind::Initial
        } else {
            StepKind::ExternalAction
        };
        steps.push(TraceStep { kind, assignments });
    }
    Ok(Some(Trace { steps }))
}
