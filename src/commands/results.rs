// src/commands/results.rs

//! Results command - print the ledger

use anyhow::{Context, Result};
use mpi_compat::{Ledger, SystemConfig};

/// Print recorded results, optionally only failures
pub fn cmd_results(config: &SystemConfig, failed_only: bool) -> Result<()> {
    let ledger = Ledger::load(&config.output_file)
        .with_context(|| format!("Failed to load results from {}", config.output_file.display()))?;

    if ledger.is_empty() {
        println!("No results recorded in {}", ledger.path().display());
        return Ok(());
    }

    println!("{:<16} {:<16} RESULT", "HOST", "CONTAINER");
    let mut passed = 0;
    for record in ledger.records() {
        if record.verdict.passed() {
            passed += 1;
            if failed_only {
                continue;
            }
        }
        println!(
            "{:<16} {:<16} {}",
            record.host_version, record.container_version, record.verdict
        );
    }

    println!();
    println!("{} of {} passed", passed, ledger.len());
    Ok(())
}
