// src/main.rs
use anyhow::{Context, Result};
use clap::Parser;

use lst_calc::batch::process_batch;
use lst_calc::cli::{Cli, Commands};
use lst_calc::pipeline::{self, Report};
use lst_calc::processing::ParallelProcessor;
use lst_calc::utils::logger::init_logger;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    let processor = ParallelProcessor::new(cli.io_threads);

    let reports = match &cli.command {
        Commands::Batch { config } => process_batch(config, &processor)
            .with_context(|| format!("batch {} failed", config.display()))?,
        Commands::Lst { .. } | Commands::Fvc { .. } => {
            let request = cli
                .request()?
                .context("subcommand does not describe a single request")?;
            let report = pipeline::run(&processor, &request).with_context(|| {
                format!(
                    "processing {} over {} failed",
                    request.collection.display(),
                    request.boundary.display()
                )
            })?;
            vec![report]
        }
    };

    for report in &reports {
        print_summary(report);
    }
    Ok(())
}

fn print_summary(report: &Report) {
    println!(
        "Processing complete: {} scenes, bands {}",
        report.scenes,
        report.bands.join(", ")
    );
    if let Some((low, high)) = report.ndvi_range {
        println!("  NDVI range: {low:.4} .. {high:.4}");
    }
    println!("  table:   {}", report.csv_path.display());
    println!("  raster:  {}", report.raster_path.display());
    println!("  overlay: {}", report.overlay_path.display());
    println!("  legend:  {}", report.legend_path.display());
}
