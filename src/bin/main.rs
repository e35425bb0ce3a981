//! Strata CLI - Build generalization hierarchies from saved specifications
//!
//! Usage:
//!   strata build <spec.ahs> <values.txt> [--separator ';'] [--attribute-type <type>]
//!   strata validate <spec.ahs> [values.txt]
//!   strata layout <spec.ahs> [--values <values.txt>]
//!   strata init <kind> --attribute-type <type> [--output <spec.ahs>]
//!
//! Examples:
//!   strata build age.ahs ages.txt --attribute-type integer
//!   strata layout age.ahs --threshold 50
//!   strata init interval --attribute-type integer --output age.ahs

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use strata::config::Settings;
use strata::logging::init_tracing;
use strata::spec::{HierarchySpec, SpecKind};
use strata::types::DataTypeSpec;
use tracing::info;

#[derive(Parser)]
#[command(name = "strata")]
#[command(about = "Strata - Generalization hierarchies for data de-identification")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a hierarchy and print it
    Build {
        /// Path to the .ahs specification
        spec: PathBuf,

        /// File with one raw value per line
        values: PathBuf,

        /// Column separator of the output
        #[arg(short, long, default_value_t = ';')]
        separator: char,

        /// Data type of the attribute, e.g. integer, decimal:2, date:%Y-%m-%d
        #[arg(short, long)]
        attribute_type: Option<String>,

        /// Output format
        #[arg(short, long, default_value = "csv")]
        output: OutputFormat,
    },

    /// Validate a specification, optionally against values
    Validate {
        /// Path to the .ahs specification
        spec: PathBuf,

        /// File with one raw value per line
        values: Option<PathBuf>,

        /// Data type of the attribute
        #[arg(short, long)]
        attribute_type: Option<String>,
    },

    /// Compute the editor layout of a grouping specification
    Layout {
        /// Path to the .ahs specification
        spec: PathBuf,

        /// File with one raw value per line (required for order specifications)
        #[arg(short, long)]
        values: Option<PathBuf>,

        /// Override the configured pretty threshold
        #[arg(short, long)]
        threshold: Option<usize>,

        /// Data type of the attribute
        #[arg(short, long)]
        attribute_type: Option<String>,
    },

    /// Write a starter specification
    Init {
        /// Builder kind
        kind: KindArg,

        /// Data type of the attribute
        #[arg(short, long)]
        attribute_type: String,

        /// Output path (prints to stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Interval,
    Order,
    Redaction,
    Date,
}

impl From<KindArg> for SpecKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Interval => SpecKind::Interval,
            KindArg::Order => SpecKind::Order,
            KindArg::Redaction => SpecKind::Redaction,
            KindArg::Date => SpecKind::Date,
        }
    }
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Separated text, one row per value
    Csv,
    /// JSON array of rows
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match Settings::load() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    init_tracing(&settings.logging);

    match cli.command {
        Commands::Build {
            spec,
            values,
            separator,
            attribute_type,
            output,
        } => cmd_build(spec, values, separator, attribute_type, output),
        Commands::Validate {
            spec,
            values,
            attribute_type,
        } => cmd_validate(spec, values, attribute_type),
        Commands::Layout {
            spec,
            values,
            threshold,
            attribute_type,
        } => cmd_layout(&settings, spec, values, threshold, attribute_type),
        Commands::Init {
            kind,
            attribute_type,
            output,
        } => cmd_init(&settings, kind, attribute_type, output),
    }
}

/// One raw value per line. Empty lines are empty-string values.
fn read_values(path: &Path) -> io::Result<Vec<String>> {
    let content = fs::read_to_string(path)?;
    Ok(content
        .lines()
        .map(|line| line.trim_end_matches('\r').to_string())
        .collect())
}

fn load_spec(path: &Path, attribute_type: Option<&str>) -> Result<HierarchySpec, String> {
    let result = match attribute_type {
        Some(raw) => {
            let attribute = DataTypeSpec::from_str(raw)
                .ok_or_else(|| format!("Unknown attribute type '{}'", raw))?;
            HierarchySpec::load_for(path, &attribute)
        }
        None => HierarchySpec::load(path),
    };
    result.map_err(|e| format!("Error loading '{}': {}", path.display(), e))
}

fn cmd_build(
    spec_path: PathBuf,
    values_path: PathBuf,
    separator: char,
    attribute_type: Option<String>,
    output: OutputFormat,
) -> ExitCode {
    let spec = match load_spec(&spec_path, attribute_type.as_deref()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let values = match read_values(&values_path) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("Error reading file '{}': {}", values_path.display(), e);
            return ExitCode::FAILURE;
        }
    };

    match spec.build(&values) {
        Ok(hierarchy) => {
            info!(rows = hierarchy.len(), depth = hierarchy.depth(), "built hierarchy");
            match output {
                OutputFormat::Csv => println!("{}", hierarchy.to_csv(separator)),
                OutputFormat::Json => match serde_json::to_string_pretty(hierarchy.rows()) {
                    Ok(json) => println!("{}", json),
                    Err(e) => {
                        eprintln!("Serialization error: {}", e);
                        return ExitCode::FAILURE;
                    }
                },
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Build error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn cmd_validate(
    spec_path: PathBuf,
    values_path: Option<PathBuf>,
    attribute_type: Option<String>,
) -> ExitCode {
    let spec = match load_spec(&spec_path, attribute_type.as_deref()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = spec.validate() {
        eprintln!("Validation error: {}", e);
        return ExitCode::FAILURE;
    }

    if let Some(path) = values_path {
        let values = match read_values(&path) {
            Ok(v) => v,
            Err(e) => {
                eprintln!("Error reading file '{}': {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        };
        let hierarchy = match spec.build(&values) {
            Ok(h) => h,
            Err(e) => {
                eprintln!("Validation error: {}", e);
                return ExitCode::FAILURE;
            }
        };
        if let Err(e) = hierarchy.check_consistency() {
            eprintln!("Inconsistent hierarchy: {}", e);
            return ExitCode::FAILURE;
        }
    }

    println!("OK: {} is valid", spec_path.display());
    ExitCode::SUCCESS
}

fn cmd_layout(
    settings: &Settings,
    spec_path: PathBuf,
    values_path: Option<PathBuf>,
    threshold: Option<usize>,
    attribute_type: Option<String>,
) -> ExitCode {
    let spec = match load_spec(&spec_path, attribute_type.as_deref()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let values = match values_path.as_deref().map(read_values).transpose() {
        Ok(v) => v.unwrap_or_default(),
        Err(e) => {
            eprintln!("Error reading values: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut layout_settings = settings.layout.clone();
    if let Some(threshold) = threshold {
        layout_settings.pretty_threshold = threshold;
    }

    match spec.layout(&layout_settings.engine(), &values) {
        Ok(Some(layout)) => match serde_json::to_string_pretty(&layout) {
            Ok(json) => {
                println!("{}", json);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Serialization error: {}", e);
                ExitCode::FAILURE
            }
        },
        Ok(None) => {
            eprintln!("{} specifications have no grouping layout", spec.kind());
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("Layout error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn cmd_init(
    settings: &Settings,
    kind: KindArg,
    attribute_type: String,
    output: Option<PathBuf>,
) -> ExitCode {
    let Some(attribute) = DataTypeSpec::from_str(&attribute_type) else {
        eprintln!("Unknown attribute type '{}'", attribute_type);
        return ExitCode::FAILURE;
    };

    let mut spec = match HierarchySpec::template(kind.into(), &attribute) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    match &mut spec {
        HierarchySpec::Redaction(redaction) => {
            redaction.padding_char = settings.redaction.padding_char;
            redaction.redaction_char = settings.redaction.redaction_char;
        }
        HierarchySpec::Date(date) => date.time_zone = settings.date.time_zone.clone(),
        _ => {}
    }

    match output {
        Some(path) => match spec.save(&path) {
            Ok(()) => {
                println!("Created {} specification: {}", spec.kind(), path.display());
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Error writing '{}': {}", path.display(), e);
                ExitCode::FAILURE
            }
        },
        None => match spec.to_json() {
            Ok(json) => {
                println!("{}", json);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Serialization error: {}", e);
                ExitCode::FAILURE
            }
        },
    }
}
