//! geo_explorer command-line interface

use std::io::{self, Write};
use std::path::Path;

use clap::Parser;
use log::{info, LevelFilter};

use geo_explorer::cli::{ChartArgs, Cli, Commands, SourceArgs};
use geo_explorer::prelude::*;

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn main() {
    let args: Vec<String> = std::env::args().collect();

    // Find the first non-flag argument (potential subcommand)
    let first_positional = args.iter().skip(1).find(|a| !a.starts_with('-'));
    let subcommands = ["report", "genes", "metadata", "shell", "help"];
    let has_subcommand = first_positional.map_or(false, |a| subcommands.contains(&a.as_str()));

    if !has_subcommand {
        // No subcommand, handle top-level help/version manually
        if args.len() == 1 {
            print_no_args();
            return;
        }
        if args.iter().any(|a| a == "--help") {
            print_long_help();
            return;
        }
        if args.iter().any(|a| a == "-h") {
            print_short_help();
            return;
        }
        if args.iter().any(|a| a == "-V" || a == "--version") {
            println!("geo_explorer {}", VERSION);
            return;
        }
        print_no_args();
        return;
    }

    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();

    let result = match cli.command {
        Some(Commands::Report {
            accession,
            gene,
            output,
            source,
            charts,
        }) => cmd_report(&accession, gene.as_deref(), &output, &source, &charts),
        Some(Commands::Genes { accession, source }) => cmd_genes(&accession, &source),
        Some(Commands::Metadata { accession, source }) => cmd_metadata(&accession, &source),
        Some(Commands::Shell { source, charts }) => cmd_shell(&source, &charts),
        None => {
            print_no_args();
            return;
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

// ---------------------------------------------------------------------------
// Custom help output
// ---------------------------------------------------------------------------

fn print_no_args() {
    println!("geo_explorer v{}", VERSION);
    println!("Run `geo_explorer -h` for usage or `geo_explorer --help` for detailed information.");
}

fn print_short_help() {
    println!("geo_explorer v{}", VERSION);
    println!();
    println!("Usage: geo_explorer <COMMAND> [OPTIONS]");
    println!();
    println!("Commands:");
    println!("  report     Statistics, tests and charts for one gene");
    println!("  genes      List the gene columns of a dataset");
    println!("  metadata   Print the dataset metadata");
    println!("  shell      Interactive session");
    println!();
    println!("Run `geo_explorer <COMMAND> -h` for command-specific options.");
}

fn print_long_help() {
    println!("geo_explorer v{}", VERSION);
    println!("Group statistics and charts for GEO gene-expression datasets");
    println!();
    println!("Usage: geo_explorer <COMMAND> [OPTIONS]");
    println!();
    println!("Commands:");
    println!("  report     Statistics, tests and charts for one gene");
    println!("               - descriptive statistics per sample group");
    println!("               - two groups: Welch t, Mann-Whitney U, Levene, Shapiro-Wilk");
    println!("               - more groups: Kruskal-Wallis");
    println!("               - nine PNG charts bundled into charts.zip");
    println!("               - table.csv, summary.json and metadata.tsv");
    println!("  genes      List the gene columns of a dataset");
    println!("  metadata   Print the dataset metadata");
    println!("  shell      Interactive session with a dataset cache");
    println!();
    println!("Global Options:");
    println!("  -v, --verbose    Enable verbose output");
    println!("  -h               Print short help");
    println!("      --help       Print detailed help");
    println!("  -V, --version    Print version");
    println!();
    println!("Examples:");
    println!("  geo_explorer report GSE62945 --gene 1007_s_at -o geo_report");
    println!();
    println!("  geo_explorer report local --expression expr.tsv --annotations samples.csv \\");
    println!("    --label-field disease_state --no-charts");
    println!();
    println!("  geo_explorer shell --dest-dir soft_cache");
}

// ---------------------------------------------------------------------------
// Subcommand implementations
// ---------------------------------------------------------------------------

fn explorer(source: &SourceArgs, params: ExplorerParams) -> Explorer {
    match (&source.expression, &source.annotations) {
        (Some(expression), Some(annotations)) => {
            info!("Reading local files: {}, {}", expression.display(), annotations.display());
            Explorer::with_loader(Box::new(LocalLoader::new(expression, annotations)), params)
        }
        _ => Explorer::geo(params),
    }
}

fn cmd_report(
    accession: &str,
    gene: Option<&str>,
    output: &Path,
    source: &SourceArgs,
    charts: &ChartArgs,
) -> Result<()> {
    let mut params = source.params();
    charts.apply(&mut params);
    let mut explorer = explorer(source, params);

    let (dataset, report) = explorer.run(accession, gene)?;
    let summary = summarize_report(&dataset, &report);
    print!("{}", render_text(&summary));

    info!("Writing outputs to: {}", output.display());
    for path in write_outputs(output, &dataset, &report, &summary)? {
        println!("wrote {}", path.display());
    }
    Ok(())
}

fn cmd_genes(accession: &str, source: &SourceArgs) -> Result<()> {
    let mut explorer = explorer(source, source.params());
    let dataset = explorer.load(accession)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for gene in dataset.table().gene_ids() {
        writeln!(out, "{}", gene)?;
    }
    Ok(())
}

fn cmd_metadata(accession: &str, source: &SourceArgs) -> Result<()> {
    let mut explorer = explorer(source, source.params());
    let dataset = explorer.load(accession)?;
    write_metadata(io::stdout().lock(), &dataset.series)
}

fn cmd_shell(source: &SourceArgs, charts: &ChartArgs) -> Result<()> {
    let mut params = source.params();
    charts.apply(&mut params);
    let mut explorer = explorer(source, params);

    let failures = run_shell(&mut explorer, io::stdin().lock(), io::stdout(), true)?;
    if failures > 0 {
        info!("{} command(s) failed", failures);
    }
    Ok(())
}
