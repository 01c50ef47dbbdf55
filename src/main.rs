//! Riskscan: Risk Factor Analysis CLI
//!
//! Ranks the columns of a tabular dataset by how strongly and
//! significantly they relate to a user-chosen binary target condition.

mod cli;
mod pipeline;
mod report;
mod utils;

use std::time::Instant;

use anyhow::Result;
use clap::Parser;
use console::style;

use cli::Cli;
use pipeline::{analyze, load_dataset, Dataset};
use report::{display_ranking, display_similar_columns, export_analysis, ExportParams};
use utils::{
    create_spinner, finish_with_success, print_banner, print_completion, print_config,
    print_count, print_info, print_step_header, print_step_time, print_success,
};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Assemble the configuration up front so target mistakes fail fast
    let config = cli.analysis_config()?;

    print_banner(env!("CARGO_PKG_VERSION"));
    print_config(
        &cli.input,
        &config.target.describe(),
        config.min_bin_size,
        config.exclude_missing,
    );

    // Step 1: Load dataset
    print_step_header(1, "Load Dataset");

    let step_start = Instant::now();
    let spinner = create_spinner("Loading dataset...");
    let dataset: Dataset = load_dataset(&cli.input, cli.infer_schema_length)?;
    finish_with_success(&spinner, "Dataset loaded");

    println!("\n    {} Dataset Statistics:", style("✧").cyan());
    println!("      Rows: {}", dataset.height());
    println!("      Columns: {}", dataset.names().len());
    print_step_time(step_start.elapsed());

    if !dataset.names().iter().any(|n| n == &cli.target) {
        anyhow::bail!(
            "Target column '{}' not found in dataset. Available columns: {:?}",
            cli.target,
            dataset.names()
        );
    }

    // Step 2: Analyze
    print_step_header(2, "Analyze Columns");

    let step_start = Instant::now();
    println!();
    let analysis = analyze(&dataset, &config)?;
    print_success("Analysis complete");

    let dropped = dataset.names().len() - analysis.summaries.len();
    if dropped > 0 {
        print_count(
            "column(s) dropped (neither categorical nor continuous)",
            dropped,
            None,
        );
    }
    let significant = analysis
        .summaries
        .iter()
        .filter(|s| !s.significance.significant_buckets.is_empty())
        .count();
    print_count("column(s) with significant buckets", significant, None);
    println!(
        "      Baseline balanced error: {} (lr {}, {} epochs, corr. boundary {})",
        style(format!("{:.2}", analysis.regression.dashboard_performance)).yellow(),
        analysis.regression.learning_rate,
        analysis.regression.epochs,
        analysis.regression.correlation_boundary,
    );
    print_step_time(step_start.elapsed());

    // Step 3: Report
    print_step_header(3, "Ranked Columns");
    display_ranking(&analysis, cli.top);

    // Columns echoing the target itself are usually proxies worth knowing
    display_similar_columns(&analysis, &cli.target);

    if let Some(export_path) = &cli.export {
        let spinner = create_spinner("Writing analysis export...");
        export_analysis(
            &analysis,
            export_path,
            &ExportParams {
                input_file: &cli.input.display().to_string(),
                row_count: dataset.height(),
            },
        )?;
        finish_with_success(
            &spinner,
            &format!("Exported to {}", export_path.display()),
        );
    } else {
        print_info("Pass --export <path> to write the full analysis as JSON");
    }

    print_completion();

    Ok(())
}
