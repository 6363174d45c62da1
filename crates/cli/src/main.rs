//! CLI tool for building slide decks from JSON outlines and reading them back.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use deck_core::{parse_outline, LayoutTable};
use deck_pptx::{BuildReport, DeckBuilder, DeckInspector, DeckSummary, Template};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Build and inspect .pptx decks.
#[derive(Parser, Debug)]
#[command(name = "deck")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build a deck from an outline (plain or fenced JSON)
    Build {
        /// Outline file with a top-level "slides" array
        outline: PathBuf,

        /// Template .pptx file
        #[arg(short, long, default_value = "template.pptx")]
        template: PathBuf,

        /// Output .pptx file
        #[arg(short, long, default_value = "presentation.pptx")]
        output: PathBuf,

        /// JSON file mapping layout names to template layout indices
        #[arg(short, long)]
        layouts: Option<PathBuf>,
    },

    /// Print the placeholders and texts of each slide
    Inspect {
        /// Deck to read
        deck: PathBuf,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the layouts of a template
    Layouts {
        /// Template .pptx file
        template: PathBuf,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    if args.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    match args.command {
        Command::Build {
            outline,
            template,
            output,
            layouts,
        } => {
            let report = build(&outline, &template, &output, layouts.as_deref())?;
            eprint!("{}", format_report(&report));
            eprintln!("Written to: {}", output.display());
        }
        Command::Inspect { deck, json } => {
            let summary = inspect(&deck)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print!("{}", format_summary(&summary));
            }
        }
        Command::Layouts { template, json } => {
            let template = Template::open(&template)
                .with_context(|| format!("Failed to open template {}", template.display()))?;
            if json {
                println!("{}", serde_json::to_string_pretty(template.layouts())?);
            } else {
                print!("{}", format_layouts(&template, &LayoutTable::default()));
            }
        }
    }

    Ok(())
}

/// Read an outline and render it against a template.
fn build(
    outline_path: &Path,
    template_path: &Path,
    output: &Path,
    layouts: Option<&Path>,
) -> Result<BuildReport> {
    let raw = std::fs::read_to_string(outline_path)
        .with_context(|| format!("Failed to read {}", outline_path.display()))?;
    let outline = parse_outline(&raw)
        .with_context(|| format!("Failed to parse outline {}", outline_path.display()))?;
    log::debug!("Outline has {} slides", outline.slides.len());

    let table = match layouts {
        Some(path) => LayoutTable::load(path)
            .with_context(|| format!("Failed to load layout table {}", path.display()))?,
        None => LayoutTable::default(),
    };

    let template = Template::open(template_path)
        .with_context(|| format!("Failed to open template {}", template_path.display()))?;

    let mut report = DeckBuilder::new(&template, &table)
        .build_to_path(&outline.slides, output)
        .with_context(|| format!("Failed to build {}", output.display()))?;

    let mut warnings = outline.warnings;
    warnings.append(&mut report.warnings);
    report.warnings = warnings;
    Ok(report)
}

fn inspect(path: &Path) -> Result<DeckSummary> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    DeckInspector::new()
        .inspect(BufReader::new(file))
        .with_context(|| format!("Failed to read deck {}", path.display()))
}

fn format_report(report: &BuildReport) -> String {
    let mut out = String::new();
    for (i, slide) in report.slides.iter().enumerate() {
        out.push_str(&format!(
            "Slide {}: layout '{}' (index {}), {} placeholder(s) filled\n",
            i + 1,
            slide.layout_name,
            slide.layout_index,
            slide.filled
        ));
    }
    for warning in &report.warnings {
        out.push_str(&format!("warning: {}\n", warning));
    }
    out
}

fn format_summary(summary: &DeckSummary) -> String {
    let mut out = String::new();
    for slide in &summary.slides {
        out.push_str(&format!("Slide {} ({})\n", slide.number, slide.layout_part));
        for ph in &slide.placeholders {
            out.push_str(&format!(
                "  [{} {}] {}\n",
                ph.ph_type,
                ph.idx,
                ph.text.replace('\n', " / ")
            ));
        }
    }
    out
}

/// One line per layout: index, name, placeholders and the table names
/// that map to it.
fn format_layouts(template: &Template, table: &LayoutTable) -> String {
    let entries = table.entries();
    let mut out = String::new();
    for layout in template.layouts() {
        let placeholders: Vec<String> = layout
            .placeholders
            .iter()
            .map(|ph| format!("{}:{}", ph.idx, ph.ph_type))
            .collect();
        let names: Vec<&str> = entries
            .iter()
            .filter(|(_, index)| *index == layout.index)
            .map(|(name, _)| *name)
            .collect();
        out.push_str(&format!(
            "{:>3}  {:<24} {:<40} {}\n",
            layout.index,
            layout.name,
            placeholders.join(" "),
            names.join(", ")
        ));
    }
    out
}
