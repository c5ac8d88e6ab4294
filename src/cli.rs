//! Command line interface

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use log::info;

use ivyaiger::checker::{run_model_checker, PdrAdapter};
use ivyaiger::driver::compile;
use ivyaiger::ir::Module;
use ivyaiger::witness::lift_witness;

/// Command line arguments
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Command line arguments
#[derive(Subcommand)]
pub enum Commands {
    /// Compile a module and invoke an external model checker on it
    ///
    /// Compiles the module's invariant to AIGER, runs the configured model checker
    /// against it, and reports whether the property was proved. On a counterexample,
    /// lifts the witness back into source vocabulary and prints it.
    #[clap()]
    Check(CheckArgs),

    /// Compile a module to AIGER without invoking a model checker
    ///
    /// Useful for inspecting the compiled netlist or feeding it to a checker by hand.
    #[clap()]
    Emit(EmitArgs),

    /// Lift a previously captured witness file back into source vocabulary
    #[clap()]
    Witness(WitnessArgs),
}

/// Command arguments shared by `check` and `emit`: how to load the module.
#[derive(Args)]
pub struct ModuleArgs {
    /// Serialized module to compile
    module: PathBuf,
}

/// Command arguments for `check`
#[derive(Args)]
pub struct CheckArgs {
    #[command(flatten)]
    module: ModuleArgs,

    /// Model checker binary to invoke (overrides `$PATH` lookup of `abc`)
    #[arg(long, default_value = "abc")]
    checker: String,
}

impl CheckArgs {
    pub fn run(&self) {
        let module = load_module(&self.module.module);
        let compiled = match compile(&module) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("failed to compile module: {e}");
                std::process::exit(1);
            }
        };
        let aig_path = write_temp_aiger(&compiled.serialize());
        let out_path = aig_path.with_extension("cex");
        let adapter = PdrAdapter::new(self.checker.clone());

        // Resolve the whole outcome before touching the scratch files, so both are
        // released on every exit path (proved, violated, or a tool failure) instead
        // of only on the success path.
        let failed = match run_model_checker(&adapter, &aig_path, &out_path) {
            Ok(true) => {
                println!("PASS");
                false
            }
            Ok(false) => {
                println!("FAIL");
                if let Ok(text) = std::fs::read_to_string(&out_path) {
                    match lift_witness(&text, &compiled.encoder, &compiled.stvars) {
                        Ok(Some(trace)) => {
                            for (i, step) in trace.steps.iter().enumerate() {
                                println!("step {i} ({:?}):", step.kind);
                                for (name, value) in &step.assignments {
                                    println!("  {name} = {value}");
                                }
                            }
                        }
                        Ok(None) => {}
                        Err(e) => eprintln!("could not lift witness: {e}"),
                    }
                }
                true
            }
            Err(e) => {
                eprintln!("model checker failed: {e}");
                true
            }
        };
        let _ = std::fs::remove_file(&aig_path);
        let _ = std::fs::remove_file(&out_path);
        if failed {
            std::process::exit(1);
        }
    }
}

/// Command arguments for `emit`
#[derive(Args)]
pub struct EmitArgs {
    #[command(flatten)]
    module: ModuleArgs,

    /// Output file for the compiled AIGER netlist
    #[arg(short = 'o', long)]
    output: PathBuf,
}

impl EmitArgs {
    pub fn run(&self) {
        let module = load_module(&self.module.module);
        let compiled = match compile(&module) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("failed to compile module: {e}");
                std::process::exit(1);
            }
        };
        if let Err(e) = std::fs::write(&self.output, compiled.serialize()) {
            eprintln!("failed to write {}: {e}", self.output.display());
            std::process::exit(1);
        }
        info!("wrote AIGER netlist to {}", self.output.display());
    }
}

/// Command arguments for `witness`
#[derive(Args)]
pub struct WitnessArgs {
    /// Module the witness was produced against
    module: PathBuf,

    /// Witness file captured from a model checker run
    witness: PathBuf,
}

impl WitnessArgs {
    pub fn run(&self) {
        let module = load_module(&self.module);
        let compiled = match compile(&module) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("failed to compile module: {e}");
                std::process::exit(1);
            }
        };
        let text = match std::fs::read_to_string(&self.witness) {
            Ok(t) => t,
            Err(e) => {
                eprintln!("failed to read {}: {e}", self.witness.display());
                std::process::exit(1);
            }
        };
        match lift_witness(&text, &compiled.encoder, &compiled.stvars) {
            Ok(Some(trace)) => {
                for (i, step) in trace.steps.iter().enumerate() {
                    println!("step {i} ({:?}):", step.kind);
                    for (name, value) in &step.assignments {
                        println!("  {name} = {value}");
                    }
                }
            }
            Ok(None) => println!("witness reports no counterexample"),
            Err(e) => {
                eprintln!("malformed witness: {e}");
                std::process::exit(1);
            }
        }
    }
}

fn load_module(path: &std::path::Path) -> Module {
    let text = std::fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("failed to read {}: {e}", path.display());
        std::process::exit(1);
    });
    serde_json::from_str(&text).unwrap_or_else(|e| {
        eprintln!("failed to parse module {}: {e}", path.display());
        std::process::exit(1);
    })
}

fn write_temp_aiger(text: &str) -> PathBuf {
    let dir = std::env::temp_dir();
    let path = dir.join(format!("ivyaiger-{}.aag", std::process::id()));
    std::fs::write(&path, text).unwrap_or_else(|e| {
        eprintln!("failed to write temporary AIGER file: {e}");
        std::process::exit(1);
    });
    path
}
