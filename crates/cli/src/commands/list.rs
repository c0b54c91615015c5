// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `wl list`: show the discovery result

use crate::output;
use clap::Args;
use std::path::PathBuf;
use std::process::ExitCode;
use wl_workflow::{discover, DiscoveryLocations};

#[derive(Args)]
pub struct ListArgs {
    /// Show skipped files and their parse errors
    #[arg(long)]
    pub verbose: bool,
}

pub fn execute(args: ListArgs) -> ExitCode {
    let project_root = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let locations = DiscoveryLocations::standard(&project_root);
    let result = discover(&locations);

    if result.workflows.is_empty() && result.fragments.is_empty() {
        println!("No workflows discovered.");
        for location in &result.locations_scanned {
            println!("  scanned {}", location.display());
        }
        return output::success();
    }

    if !result.workflows.is_empty() {
        println!("Workflows:");
        for workflow in &result.workflows {
            let description = workflow.workflow.description.as_deref().unwrap_or("");
            println!(
                "  {:<24} {:<8} {description}",
                workflow.workflow.name, workflow.source
            );
            for shadowed in &workflow.overrides {
                println!("  {:<24} overrides {}", "", shadowed.display());
            }
        }
    }

    if !result.fragments.is_empty() {
        println!("Fragments:");
        for fragment in &result.fragments {
            let description = fragment.workflow.description.as_deref().unwrap_or("");
            println!(
                "  {:<24} {:<8} {description}",
                fragment.workflow.name, fragment.source
            );
        }
    }

    if !result.skipped.is_empty() {
        println!("Skipped {} file(s)", result.skipped.len());
        if args.verbose {
            for skipped in &result.skipped {
                println!(
                    "  {}: {} ({})",
                    skipped.file_path.display(),
                    skipped.error_message,
                    skipped.error_type
                );
            }
        }
    }

    println!(
        "Discovered {} workflow(s), {} fragment(s) in {}ms",
        result.workflows.len(),
        result.fragments.len(),
        result.discovery_time_ms
    );
    output::success()
}
