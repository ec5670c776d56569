//
// main.rs
// ct-organ-prep
//
// Binary entry point that hands off execution to the CLI layer.
//
// Thales Matheus Mendonça Santos - November 2025

use ct_organ_prep::cli;

fn main() -> anyhow::Result<()> {
    // Single-threaded and synchronous: cases are processed strictly in sequence.
    cli::run()
}
