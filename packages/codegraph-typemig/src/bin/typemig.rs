//! Type Migration CLI
//!
//! # Usage
//!
//! ```bash
//! # Preview: ordered changes and failures
//! typemig --program prog.json --element Billing.total --type long
//!
//! # Apply with a configuration file and print the rewritten sources
//! typemig --program prog.json --element Billing.total --type long --config migration.yaml --apply
//! ```
//!
//! Logging goes to stderr; `RUST_LOG=debug` shows every root.

use clap::Parser;
use codegraph_typemig::features::type_migration::domain::UsageKind;
use codegraph_typemig::features::type_migration::infrastructure::NeverCancel;
use codegraph_typemig::features::type_migration::ports::RenamePrompt;
use codegraph_typemig::{MigrationConfig, MigrationPreview, Program, TypeMigrationProcessor, ValidatedConfig};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "typemig")]
#[command(about = "Change the type of a declaration and follow it through the program", long_about = None)]
struct Cli {
    /// Program snapshot (JSON)
    #[arg(short, long)]
    program: PathBuf,

    /// Declaration to migrate (`Class.member`, `Class.method.param`)
    #[arg(short, long)]
    element: String,

    /// New type, in source syntax (`List<String>`)
    #[arg(short = 't', long = "type")]
    ty: String,

    /// Migration configuration (YAML v1)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Apply the edits and print the rewritten sources
    #[arg(long)]
    apply: bool,

    /// Print the preview as JSON
    #[arg(long)]
    json: bool,
}

/// Asks on the terminal whether to rename a getter.
struct TerminalPrompt;

impl RenamePrompt for TerminalPrompt {
    fn confirm_rename(&mut self, current: &str, suggested: &str) -> bool {
        eprint!("Rename {current} to {suggested}? [y/N] ");
        let _ = std::io::stderr().flush();
        let mut answer = String::new();
        if std::io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim(), "y" | "Y" | "yes")
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let program = Program::from_json(&std::fs::read_to_string(&cli.program)?)?;
    let config = match &cli.config {
        Some(path) => MigrationConfig::from_yaml(&path.to_string_lossy())?,
        None => ValidatedConfig::default(),
    };

    let processor = TypeMigrationProcessor::new(&program, config)?;
    let seed = processor.seed(&cli.element, &cli.ty)?;

    if !cli.apply {
        let preview = processor.preview(&[seed], &NeverCancel)?;
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&preview)?);
        } else {
            print_preview(&program, &preview);
        }
        return Ok(());
    }

    let outcome = processor.apply(&[seed], &NeverCancel, &mut TerminalPrompt)?;
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }
    print_preview(&program, &outcome.preview);
    for failure in &outcome.edit_failures {
        println!("  ! {}", failure.message);
    }
    for (file, text) in &outcome.sources {
        if program.source(file) == Some(text.as_str()) {
            continue;
        }
        println!("--- {file}");
        print!("{text}");
    }
    Ok(())
}

fn print_preview(program: &Program, preview: &MigrationPreview) {
    println!("Changes ({}):", preview.usages.len());
    for usage in &preview.usages {
        let what = match &usage.kind {
            UsageKind::Declaration { ty, rename: Some(name) } => format!("{ty}, rename to {name}"),
            UsageKind::Declaration { ty, rename: None } => ty.to_string(),
            UsageKind::Conversion(descriptor) => descriptor.to_string(),
            UsageKind::NewExpression { ty } => format!("new {ty}"),
            UsageKind::EliminatedLocal => "removed".to_string(),
        };
        println!("  {} -> {what}", program.describe(usage.element));
    }
    if preview.has_failures() {
        println!("Failures ({}):", preview.failures.len());
        for failure in &preview.failures {
            println!("  ! {}", failure.message);
        }
    }
    let stats = &preview.stats;
    println!(
        "roots accepted={} rejected={} dequeued={} statements={}",
        stats.roots_accepted, stats.roots_rejected, stats.dequeued, stats.statements_visited
    );
}
