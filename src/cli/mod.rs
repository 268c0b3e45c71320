//! Diagnosis CLI Module
//!
//! Command-line interface for running the ensemble pipeline and inspecting
//! datasets.

use clap::{Args, Parser, Subcommand};
use colored::*;
use polars::prelude::*;
use std::collections::BTreeMap;
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::error::DiagnosisError;
use crate::inference::{
    parse_feature_value, FeatureSource, PromptFeatureSource, TerminalFeatureSource,
};
use crate::pipeline::{DiagnosisPipeline, FittedPipeline, PipelineConfig};
use crate::preprocessing::PreprocessingConfig;
use crate::utils::DataLoader;

// ─── Styling helpers ───────────────────────────────────────────────────────────

const W: usize = 58; // box inner width

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn line_box_top()    { println!("  {}", dim("┌─────────────────────────────────────────────────────────┐")); }
fn line_box_bottom() { println!("  {}", dim("└─────────────────────────────────────────────────────────┘")); }
fn line_box_sep()    { println!("  {}", dim("├─────────────────────────────────────────────────────────┤")); }

fn line_box(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let pad = W.saturating_sub(visible_len);
    println!("  {}  {}{} {}", dim("│"), content, " ".repeat(pad), dim("│"));
}

fn line_box_center(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let total_pad = W.saturating_sub(visible_len);
    let left = total_pad / 2;
    let right = total_pad - left;
    println!("  {}  {}{}{} {}", dim("│"), " ".repeat(left), content, " ".repeat(right), dim("│"));
}

fn line_box_empty() { line_box(""); }

fn strip_ansi(s: &str) -> String {
    let mut out = String::new();
    let mut in_escape = false;
    for c in s.chars() {
        if c == '\x1b' { in_escape = true; continue; }
        if in_escape { if c == 'm' { in_escape = false; } continue; }
        out.push(c);
    }
    out
}

fn kv(key: &str, val: &str) -> String {
    format!("{} {}", muted(key), val.white())
}

fn step_ok(msg: &str) {
    println!("  {} {}", ok("✓"), msg);
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
    let _ = io::stdout().flush();
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

/// Print a multi-line block with the section indent
fn indented(block: &str) {
    for line in block.lines() {
        println!("  {}", line);
    }
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "diagnosis")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Soft-voting ensemble for malignant/benign tumor diagnosis")]
#[command(long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Arguments for the default `run` command
    #[command(flatten)]
    pub run: RunArgs,
}

impl Cli {
    /// The selected command; no subcommand means `run`
    pub fn into_command(self) -> Commands {
        self.command.unwrap_or(Commands::Run(self.run))
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Train the ensemble, report its scores and diagnose one sample
    Run(RunArgs),

    /// Show data information
    Info {
        /// Input data file
        #[arg(short, long, default_value = "breast-cancer.csv")]
        data: PathBuf,

        /// Target column name
        #[arg(short, long, default_value = "diagnosis")]
        target: String,
    },
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Input data file (CSV, or TSV by extension)
    #[arg(short, long, default_value = "breast-cancer.csv")]
    pub data: PathBuf,

    /// Identifier column to drop; pass an empty string to keep every column
    #[arg(long, default_value = "id")]
    pub id_column: String,

    /// Target column name
    #[arg(short, long, default_value = "diagnosis")]
    pub target: String,

    /// Target label encoded as malignant (default: alphabetical order)
    #[arg(long)]
    pub positive_label: Option<String>,

    /// Fraction of rows held out for testing
    #[arg(long, default_value_t = 0.2)]
    pub test_size: f64,

    /// Seed for the split and every model
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Train the five models concurrently
    #[arg(long)]
    pub parallel: bool,

    /// Write the evaluation report as JSON
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Comma-separated feature values to diagnose instead of prompting
    #[arg(long)]
    pub features: Option<String>,

    /// Stop after the evaluation
    #[arg(long)]
    pub no_predict: bool,

    /// Attempts allowed per prompted feature
    #[arg(long, default_value_t = 3)]
    pub retries: usize,
}

impl RunArgs {
    /// Pipeline configuration for these arguments
    pub fn pipeline_config(&self) -> PipelineConfig {
        let id_column = Some(self.id_column.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        let mut preprocessing = PreprocessingConfig::new()
            .with_id_column(id_column)
            .with_target_column(self.target.clone())
            .with_test_size(self.test_size);
        if let Some(label) = &self.positive_label {
            preprocessing = preprocessing.with_positive_label(label.clone());
        }

        PipelineConfig::new()
            .with_preprocessing(preprocessing)
            .with_random_seed(self.seed)
            .with_parallel(self.parallel)
    }
}

/// Parse `--features`, naming the first offending position
pub fn parse_feature_list(raw: &str, feature_names: &[String]) -> crate::error::Result<Vec<f64>> {
    raw.split(',')
        .enumerate()
        .map(|(i, item)| {
            parse_feature_value(item).ok_or_else(|| DiagnosisError::ParseError {
                feature: feature_names
                    .get(i)
                    .cloned()
                    .unwrap_or_else(|| format!("#{}", i + 1)),
                input: item.trim().to_string(),
            })
        })
        .collect()
}

// ─── Commands ──────────────────────────────────────────────────────────────────

fn print_banner(args: &RunArgs) {
    println!();
    line_box_top();
    line_box_empty();
    line_box_center(&format!("{}", "Tumor Diagnosis Ensemble".white().bold()));
    line_box_center(&format!("{}", dim(&format!("v{}", env!("CARGO_PKG_VERSION")))));
    line_box_empty();
    line_box_sep();
    line_box_empty();
    line_box(&kv("Data     ", &args.data.display().to_string()));
    line_box(&kv("Target   ", &args.target));
    line_box(&kv("Test size", &format!("{:.2}", args.test_size)));
    line_box(&kv("Seed     ", &args.seed.to_string()));
    line_box_empty();
    line_box_bottom();
}

pub fn cmd_run(args: &RunArgs) -> anyhow::Result<()> {
    print_banner(args);
    section("Dataset");

    step_run("Loading data");
    let start = Instant::now();
    let df = DataLoader::new().load_csv(&args.data)?;
    step_done(&format!("{} rows × {} cols in {:?}", df.height(), df.width(), start.elapsed()));
    println!();
    println!("{}", df.head(Some(5)));

    section("Train");
    step_run(if args.parallel { "Training 5 models in parallel" } else { "Training 5 models" });
    let start = Instant::now();
    let fitted = DiagnosisPipeline::new(args.pipeline_config()).fit(&df)?;
    step_done(&format!("{:?}", start.elapsed()));

    let split = &fitted.prepared().split;
    step_ok(&format!(
        "{} train / {} test, {} features",
        split.n_train(),
        split.n_test(),
        fitted.feature_names().len()
    ));

    let report = fitted.evaluate()?;

    section("Model Performance");
    indented(&report.summary_table());

    section("Accuracy & ROC-AUC");
    indented(&report.bar_chart(40));

    section("Classification Report (Ensemble)");
    indented(&report.classification_report.to_string());

    println!();
    print!("{}", report.performance_summary());

    if let Some(path) = &args.report {
        report.write_json(path)?;
        println!();
        step_ok(&format!("Report written → {}", path.display()));
    }

    if args.no_predict {
        println!();
        return Ok(());
    }

    section("Predict");
    predict(&fitted, args)?;
    Ok(())
}

fn predict(fitted: &FittedPipeline, args: &RunArgs) -> anyhow::Result<()> {
    let names = fitted.feature_names();

    let diagnosis = match &args.features {
        Some(raw) => {
            let mut values = parse_feature_list(raw, names)?;
            fitted.predict_from(&mut values)?
        }
        None => {
            println!("  {}", muted(&format!("Enter values for {} features", names.len())));
            println!();
            let mut source: Box<dyn FeatureSource> = if io::stdin().is_terminal() {
                Box::new(TerminalFeatureSource::new().with_max_attempts(args.retries))
            } else {
                Box::new(
                    PromptFeatureSource::new(io::stdin().lock(), io::stdout())
                        .with_max_attempts(args.retries),
                )
            };
            fitted.predict_from(source.as_mut())?
        }
    };

    println!();
    let verdict = diagnosis.to_string();
    if diagnosis.is_malignant() {
        print!("{}", verdict.truecolor(255, 110, 110));
    } else {
        print!("{}", verdict.truecolor(100, 210, 120));
    }
    println!();
    Ok(())
}

pub fn cmd_info(data_path: &Path, target: &str) -> anyhow::Result<()> {
    section("Data Info");

    let df = DataLoader::new().load_csv(data_path)?;

    println!("  {:<12} {}", muted("File"), data_path.display());
    println!("  {:<12} {}", muted("Rows"), df.height());
    println!("  {:<12} {}", muted("Columns"), df.width());
    println!("  {:<12} {:.2} MB", muted("Memory"), df.estimated_size() as f64 / 1024.0 / 1024.0);
    println!();

    println!("  {:<24} {:<12} {:>6} {:>8}", muted("Column"), muted("Type"), muted("Nulls"), muted("Unique"));
    println!("  {}", dim(&"─".repeat(54)));

    for col in df.get_columns() {
        println!(
            "  {:<24} {:<12} {:>6} {:>8}",
            col.name().as_str(),
            format!("{:?}", col.dtype()).truecolor(140, 140, 140),
            col.null_count(),
            col.n_unique().unwrap_or(0)
        );
    }

    section("Class Balance");
    match df.column(target) {
        Ok(column) => {
            let labels = column.cast(&DataType::String)?;
            let mut counts: BTreeMap<String, usize> = BTreeMap::new();
            for label in labels.str()?.into_iter() {
                let key = label.map(|s| s.trim().to_string()).unwrap_or_else(|| "<null>".to_string());
                *counts.entry(key).or_insert(0) += 1;
            }
            let total = df.height().max(1) as f64;
            for (label, count) in &counts {
                println!(
                    "  {:<24} {:>6} {}",
                    label,
                    count,
                    dim(&format!("{:.1}%", *count as f64 / total * 100.0))
                );
            }
        }
        Err(_) => println!("  {}", format!("target column '{}' not found", target).yellow()),
    }

    println!();
    Ok(())
}
