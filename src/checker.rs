//! The external hardware model checker adapter interface (consumed).
//!
//! The core never spawns a process directly; it only asks an adapter for the argv to
//! run and later hands the adapter the tool's stdout to scrape a verdict from it. One
//! concrete adapter, targeting a PDR-based checker, is provided.

use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};

use log::{error, info};

use crate::error::CompileError;

/// Size of each incremental read from the child's stdout pipe.
const STDOUT_CHUNK_SIZE: usize = 256;

/// An external model-checker adapter: knows how to invoke the tool and how to read
/// its verdict back out of its stdout.
pub trait ModelChecker {
    /// The argv to run, given the AIGER input path and a path to write the witness to.
    fn command(&self, aig_path: &Path, out_path: &Path) -> Vec<String>;

    /// Scrape the tool's stdout for a verdict: `true` means the property was proved.
    fn scrape(&self, stdout_text: &str) -> bool;
}

/// Adapter for a PDR-based checker invoked as a single command-line tool, in the
/// style bundled with this crate by default.
///
/// Invoked as `<checker> -c "read_aiger <in>; pdr; write_aiger_cex <out>"`, scraping
/// the literal string `"Property proved"` from stdout.
pub struct PdrAdapter {
    /// Path (or name on `$PATH`) of the checker binary.
    pub checker: String,
}

impl PdrAdapter {
    /// An adapter for the checker named `checker` (defaults to `"abc"` if omitted by
    /// the caller).
    pub fn new(checker: impl Into<String>) -> PdrAdapter {
        PdrAdapter {
            checker: checker.into(),
        }
    }
}

impl Default for PdrAdapter {
    fn default() -> Self {
        PdrAdapter::new("abc")
    }
}

impl ModelChecker for PdrAdapter {
    fn command(&self, aig_path: &Path, out_path: &Path) -> Vec<String> {
        vec![
            self.checker.clone(),
            "-c".to_string(),
            format!(
                "read_aiger {}; pdr; write_aiger_cex {}",
                aig_path.display(),
                out_path.display()
            ),
        ]
    }

    fn scrape(&self, stdout_text: &str) -> bool {
        stdout_text.contains("Property proved")
    }
}

/// Run `checker` against `aig_path`, writing a witness to `out_path`, and report
/// whether the property was proved.
///
/// The child is spawned with a piped stdout, drained incrementally in fixed-size
/// chunks as it's produced (rather than buffered in one `wait_with_output`), then
/// its exit status is awaited; a non-zero exit is reported as
/// [`CompileError::ExternalToolFailure`].
pub fn run_model_checker(
    checker: &dyn ModelChecker,
    aig_path: &Path,
    out_path: &Path,
) -> Result<bool, CompileError> {
    let argv = checker.command(aig_path, out_path);
    info!("invoking external model checker: {}", argv.join(" "));
    let (program, args) = argv
        .split_first()
        .expect("a model checker adapter must produce a non-empty argv");
    let mut child = Command::new(program)
        .args(args)
        .stdout(Stdio::piped())
        .spawn()
        .map_err(|e| {
            error!("failed to spawn model checker `{program}`: {e}");
            CompileError::ExternalToolFailure {
                tool: program.to_string(),
                reason: e.to_string(),
            }
        })?;

    let mut stdout_bytes = Vec::new();
    if let Some(mut stdout) = child.stdout.take() {
        let mut chunk = [0u8; STDOUT_CHUNK_SIZE];
        loop {
            let n = stdout.read(&mut chunk).map_err(|e| CompileError::ExternalToolFailure {
                tool: program.to_string(),
                reason: e.to_string(),
            })?;
            if n == 0 {
                break;
            }
            stdout_bytes.extend_from_slice(&chunk[..n]);
        }
    }

    let status = child.wait().map_err(|e| CompileError::ExternalToolFailure {
        tool: program.to_string(),
        reason: e.to_string(),
    })?;
    if !status.success() {
        error!("model checker `{program}` exited with {status}");
        return Err(CompileError::ExternalToolFailure {
            tool: program.to_string(),
            reason: format!("exit status {status}"),
        });
    }
    let stdout_text = String::from_utf8_lossy(&stdout_bytes);
    Ok(checker.scrape(&stdout_text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdr_adapter_builds_expected_command() {
        let adapter = PdrAdapter::new("abc");
        let argv = adapter.command(Path::new("in.aag"), Path::new("out.wit"));
        assert_eq!(argv[0], "abc");
        assert!(argv[2].contains("read_aiger in.aag"));
        assert!(argv[2].contains("write_aiger_cex out.wit"));
    }

    #[test]
    fn scrape_looks_for_proved_marker() {
        let adapter = PdrAdapter::default();
        assert!(adapter.scrape("... Property proved after 3 frames\n"));
        assert!(!adapter.scrape("... counterexample found\n"));
    }
}
