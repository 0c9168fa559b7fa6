//! Line-oriented interactive session
//!
//! Each input line is one request. A failed request prints its error and the
//! session carries on with the previously loaded dataset.

use std::io::{BufRead, Write};
use std::path::Path;
use std::sync::Arc;

use crate::error::{ExplorerError, Result};
use crate::io::{render_text, summarize_report, write_metadata, write_outputs};
use crate::loader::LoadedDataset;
use crate::session::{Explorer, GeneReport};

/// One parsed shell command
#[derive(Debug, Clone, PartialEq)]
pub enum ShellCommand {
    Load(String),
    Gene(String),
    Genes,
    Metadata,
    Export(String),
    Help,
    Quit,
}

impl ShellCommand {
    /// Parse a line; `None` for a blank line
    pub fn parse(line: &str) -> Option<Result<Self>> {
        let mut parts = line.split_whitespace();
        let verb = parts.next()?;
        let arg = parts.next().map(str::to_string);

        let missing = |what: &str| ExplorerError::InvalidInput {
            reason: format!("{} needs {}", verb, what),
        };
        let command = match (verb.to_ascii_lowercase().as_str(), arg) {
            ("load", Some(acc)) => Ok(ShellCommand::Load(acc)),
            ("load", None) => Err(missing("an accession")),
            ("gene", Some(g)) => Ok(ShellCommand::Gene(g)),
            ("gene", None) => Err(missing("a gene ID")),
            ("genes", _) => Ok(ShellCommand::Genes),
            ("metadata", _) => Ok(ShellCommand::Metadata),
            ("export", Some(dir)) => Ok(ShellCommand::Export(dir)),
            ("export", None) => Err(missing("a directory")),
            ("help", _) => Ok(ShellCommand::Help),
            ("quit", _) | ("exit", _) => Ok(ShellCommand::Quit),
            (other, _) => Err(ExplorerError::InvalidInput {
                reason: format!("unknown command '{}' (try help)", other),
            }),
        };
        Some(command)
    }
}

const HELP: &str = "\
load <ACCESSION>   fetch (or reuse) a dataset
gene <ID>          report on a gene of the loaded dataset
genes              list gene columns
metadata           print the dataset metadata
export <DIR>       write the outputs of the last report
quit               leave the shell";

/// State carried between shell lines
struct Session {
    dataset: Option<Arc<LoadedDataset>>,
    report: Option<GeneReport>,
}

impl Session {
    fn dataset(&self) -> Result<&Arc<LoadedDataset>> {
        self.dataset.as_ref().ok_or_else(|| ExplorerError::InvalidInput {
            reason: "no dataset loaded (use: load <ACCESSION>)".to_string(),
        })
    }
}

fn execute<W: Write>(
    explorer: &mut Explorer,
    session: &mut Session,
    command: ShellCommand,
    out: &mut W,
) -> Result<()> {
    match command {
        ShellCommand::Load(accession) => {
            let dataset = explorer.load(&accession)?;
            let table = dataset.table();
            writeln!(
                out,
                "{}: {} samples x {} genes, labels: {}",
                dataset.accession,
                table.n_samples(),
                table.n_genes(),
                table.distinct_labels().join(", ")
            )?;
            session.dataset = Some(dataset);
            session.report = None;
        }
        ShellCommand::Gene(gene) => {
            let dataset = Arc::clone(session.dataset()?);
            let report = explorer.report(&dataset, Some(&gene))?;
            write!(out, "{}", render_text(&summarize_report(&dataset, &report)))?;
            session.report = Some(report);
        }
        ShellCommand::Genes => {
            for gene in session.dataset()?.table().gene_ids() {
                writeln!(out, "{}", gene)?;
            }
        }
        ShellCommand::Metadata => {
            write_metadata(&mut *out, &session.dataset()?.series)?;
        }
        ShellCommand::Export(dir) => {
            let dataset = session.dataset()?;
            let report = session.report.as_ref().ok_or_else(|| ExplorerError::InvalidInput {
                reason: "no gene selected (use: gene <ID>)".to_string(),
            })?;
            let summary = summarize_report(dataset, report);
            for path in write_outputs(Path::new(&dir), dataset, report, &summary)? {
                writeln!(out, "wrote {}", path.display())?;
            }
        }
        ShellCommand::Help => writeln!(out, "{}", HELP)?,
        ShellCommand::Quit => {}
    }
    Ok(())
}

/// Run the shell until `quit` or end of input
///
/// Returns the number of commands that failed.
pub fn run_shell<R: BufRead, W: Write>(
    explorer: &mut Explorer,
    mut input: R,
    mut out: W,
    prompt: bool,
) -> Result<usize> {
    let mut session = Session {
        dataset: None,
        report: None,
    };
    let mut failures = 0;

    loop {
        if prompt {
            write!(out, "> ")?;
            out.flush()?;
        }
        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            break;
        }

        let command = match ShellCommand::parse(&line) {
            None => continue,
            Some(Ok(ShellCommand::Quit)) => break,
            Some(Ok(c)) => c,
            Some(Err(e)) => {
                failures += 1;
                writeln!(out, "Error: {}", e)?;
                continue;
            }
        };

        if let Err(e) = execute(explorer, &mut session, command, &mut out) {
            failures += 1;
            if e.is_fatal() {
                log::warn!("Request failed: {}", e);
            }
            writeln!(out, "Error: {}", e)?;
        }
    }
    Ok(failures)
}
