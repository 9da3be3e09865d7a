//! tablesieve - Find the real tables on parsed PDF pages
//!
//! Reads pages as JSON (glyphs, rects and lines with top-left coordinates)
//! and writes the accepted tables as JSON.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use tablesieve_core::table::{EdgeStrategy, Page, SplitTablePolicy, Table, TableFinder, TableSettings};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Edge merging strategy.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum StrategyArg {
    /// Cluster snapping and joining, no border suppression
    Lines,
    /// Merge, grid snap, then drop page borders and full-width rules
    Textbook,
}

impl From<StrategyArg> for EdgeStrategy {
    fn from(value: StrategyArg) -> Self {
        match value {
            StrategyArg::Lines => EdgeStrategy::Lines,
            StrategyArg::Textbook => EdgeStrategy::Textbook,
        }
    }
}

/// What to do with a table found right next to an accepted one.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum SplitPolicyArg {
    Keep,
    Reject,
    Merge,
}

impl From<SplitPolicyArg> for SplitTablePolicy {
    fn from(value: SplitPolicyArg) -> Self {
        match value {
            SplitPolicyArg::Keep => SplitTablePolicy::Keep,
            SplitPolicyArg::Reject => SplitTablePolicy::Reject,
            SplitPolicyArg::Merge => SplitTablePolicy::Merge,
        }
    }
}

/// Detect tables on parsed PDF pages.
#[derive(Parser, Debug)]
#[command(name = "tablesieve")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON files, each holding one page or an array of pages
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Use debug logging level
    #[arg(short = 'd', long, action = ArgAction::SetTrue)]
    debug: bool,

    /// Output file name ("-" for stdout)
    #[arg(short = 'o', long, default_value = "-")]
    outfile: String,

    /// Pretty-print the JSON output
    #[arg(long, action = ArgAction::SetTrue)]
    pretty: bool,

    // === Settings ===
    /// Edge merging strategy
    #[arg(long, value_enum)]
    strategy: Option<StrategyArg>,

    /// JSON file with table settings; unknown keys are rejected
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Snap tolerance for both orientations
    #[arg(long = "snap-tolerance")]
    snap_tolerance: Option<f64>,

    /// Cells lower than this fraction of the median cell height are dropped
    #[arg(long = "min-height-ratio")]
    min_height_ratio: Option<f64>,

    /// Points below the body font size that mark a cell as small text
    #[arg(long = "font-size-margin")]
    font_size_margin: Option<f64>,

    /// Largest tolerated fraction of empty cells
    #[arg(long = "max-empty-fraction")]
    max_empty_fraction: Option<f64>,

    /// Cell borders closer than this are treated as aligned
    #[arg(long = "alignment-tolerance")]
    alignment_tolerance: Option<f64>,

    /// Tables closer than this to an accepted table are split fragments
    #[arg(long = "min-table-distance")]
    min_table_distance: Option<f64>,

    /// Handling of split fragments
    #[arg(long = "split-policy", value_enum)]
    split_policy: Option<SplitPolicyArg>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PageInput {
    Many(Vec<Page>),
    One(Box<Page>),
}

#[derive(Serialize)]
struct PageOutput {
    page: usize,
    tables: Vec<Table>,
}

#[derive(Serialize)]
struct FileOutput {
    file: String,
    pages: Vec<PageOutput>,
}

fn init_logging(debug: bool) {
    let default = if debug { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(io::stderr)
        .init();
}

/// Build settings from the optional file, then apply command line
/// overrides on top.
fn build_settings(args: &Args) -> Result<TableSettings> {
    let mut settings = match &args.settings {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read settings {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("invalid settings in {}", path.display()))?
        }
        None => match args.strategy {
            Some(StrategyArg::Lines) => TableSettings::lines(),
            Some(StrategyArg::Textbook) | None => TableSettings::textbook(),
        },
    };

    if let Some(strategy) = args.strategy {
        settings.edges.strategy = strategy.into();
    }
    if let Some(tol) = args.snap_tolerance {
        settings = settings.with_snap_tolerance(tol);
    }
    if let Some(ratio) = args.min_height_ratio {
        settings.cells.min_height_ratio = ratio;
    }
    if let Some(margin) = args.font_size_margin {
        settings.tables.font_size_margin = margin;
    }
    if let Some(fraction) = args.max_empty_fraction {
        settings.tables.max_empty_fraction = fraction;
    }
    if let Some(tol) = args.alignment_tolerance {
        settings.tables.alignment_tolerance = tol;
    }
    if let Some(distance) = args.min_table_distance {
        settings.tables.min_table_distance = distance;
    }
    if let Some(policy) = args.split_policy {
        settings.tables.split_policy = policy.into();
    }
    Ok(settings)
}

fn load_pages(path: &Path) -> Result<Vec<Page>> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let input: PageInput = serde_json::from_reader(io::BufReader::new(file))
        .with_context(|| format!("invalid page JSON in {}", path.display()))?;
    Ok(match input {
        PageInput::Many(pages) => pages,
        PageInput::One(page) => vec![*page],
    })
}

fn process_file(finder: &TableFinder, path: &Path) -> Result<FileOutput> {
    let pages = load_pages(path)?;
    debug!(file = %path.display(), pages = pages.len(), "loaded pages");
    let results = finder.find_tables_in_pages(&pages);
    let found: usize = results.iter().map(Vec::len).sum();
    info!(file = %path.display(), tables = found, "detected tables");
    Ok(FileOutput {
        file: path.display().to_string(),
        pages: results
            .into_iter()
            .enumerate()
            .map(|(page, tables)| PageOutput { page, tables })
            .collect(),
    })
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.debug);

    let settings = build_settings(&args)?;
    let finder = TableFinder::new(settings).context("invalid table settings")?;

    let outputs = args
        .files
        .iter()
        .map(|path| process_file(&finder, path))
        .collect::<Result<Vec<_>>>()?;

    let mut output: Box<dyn Write> = if args.outfile == "-" {
        Box::new(BufWriter::new(io::stdout()))
    } else {
        let file = File::create(&args.outfile)
            .with_context(|| format!("failed to create output file {}", args.outfile))?;
        Box::new(BufWriter::new(file))
    };
    if args.pretty {
        serde_json::to_writer_pretty(&mut output, &outputs)?;
    } else {
        serde_json::to_writer(&mut output, &outputs)?;
    }
    writeln!(output)?;
    output.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_apply_on_top_of_strategy_defaults() {
        let args = Args::parse_from([
            "tablesieve",
            "--strategy",
            "lines",
            "--max-empty-fraction",
            "0.5",
            "--split-policy",
            "merge",
            "page.json",
        ]);
        let settings = build_settings(&args).unwrap();
        assert_eq!(settings.edges.strategy, EdgeStrategy::Lines);
        assert_eq!(settings.edges.snap_x_tolerance, 3.0);
        assert_eq!(settings.tables.max_empty_fraction, 0.5);
        assert_eq!(settings.tables.split_policy, SplitTablePolicy::Merge);
    }

    #[test]
    fn single_page_and_page_arrays_both_parse() {
        let one = r#"{"page_bbox": {"x0": 0, "top": 0, "x1": 600, "bottom": 800}}"#;
        let many = format!("[{one}, {one}]");
        assert!(matches!(
            serde_json::from_str::<PageInput>(one).unwrap(),
            PageInput::One(_)
        ));
        match serde_json::from_str::<PageInput>(&many).unwrap() {
            PageInput::Many(pages) => assert_eq!(pages.len(), 2),
            PageInput::One(_) => panic!("expected an array"),
        }
    }
}
