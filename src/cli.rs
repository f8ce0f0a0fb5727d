//! Command-line entry points.
//!
//! Every command works on an annotation document: the JSON form of an
//! [`AnnotationStore`]. Commands that modify the document write it back in
//! place unless `--output` or `--dry-run` is given.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use labelkit_geometry::{
    apply_content_transform, is_legacy_record, run_offset_migration, validate_offset_format,
    AnnotationStore, ContentTransform, ContentTransformReport, FlipDirection, GeometryContext,
    MigrationReport, Offset,
};
use labelkit_settings::Config;

#[derive(Parser, Debug)]
#[command(
    name = "labelkit",
    version,
    about = "Maintain measurement label offsets in annotation documents"
)]
pub struct Cli {
    /// Config file (.json or .toml). Defaults to the platform config directory
    #[arg(short = 'c', long = "config", global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Upgrade legacy pixel offsets to normalized offsets
    #[command(alias = "m")]
    Migrate(DocumentArgs),

    /// Rotate one image's content by a multiple of 90 degrees
    Rotate {
        #[command(flatten)]
        document: DocumentArgs,

        /// Image label
        #[arg(long)]
        image: String,

        /// Clockwise degrees; must be a multiple of 90
        #[arg(long, allow_hyphen_values = true)]
        degrees: f64,
    },

    /// Mirror one image's content
    Flip {
        #[command(flatten)]
        document: DocumentArgs,

        /// Image label
        #[arg(long)]
        image: String,

        /// horizontal (h) or vertical (v)
        #[arg(long)]
        direction: FlipDirection,
    },

    /// Report legacy and malformed offsets without modifying anything
    Check {
        /// Annotation document (.json)
        document: PathBuf,
    },
}

#[derive(Args, Debug, Clone)]
pub struct DocumentArgs {
    /// Annotation document (.json)
    pub document: PathBuf,

    /// Write the result here instead of overwriting the document
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Run without writing anything
    #[arg(long)]
    pub dry_run: bool,
}

pub fn run(cli: Cli) -> Result<ExitCode> {
    let config =
        Config::load_or_default(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Commands::Migrate(args) => {
            migrate_document(config, &args)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Rotate {
            document,
            image,
            degrees,
        } => {
            transform_document(config, &document, &image, ContentTransform::Rotate(degrees))?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Flip {
            document,
            image,
            direction,
        } => {
            transform_document(config, &document, &image, ContentTransform::Flip(direction))?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Check { document } => {
            let check = check_document(&document)?;
            print!("{}", check);
            Ok(if check.is_clean() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
    }
}

fn load_document(path: &Path) -> Result<AnnotationStore> {
    AnnotationStore::load(path).with_context(|| format!("Failed to load {}", path.display()))
}

fn write_document(store: &AnnotationStore, args: &DocumentArgs) -> Result<()> {
    if args.dry_run {
        tracing::info!("Dry run, {} left unchanged", args.document.display());
        return Ok(());
    }
    let target = args.output.as_deref().unwrap_or(&args.document);
    store
        .save(target)
        .with_context(|| format!("Failed to write {}", target.display()))?;
    tracing::info!("Wrote {}", target.display());
    Ok(())
}

/// Loads a document, normalizes its legacy offsets and writes it back.
pub fn migrate_document(config: Config, args: &DocumentArgs) -> Result<MigrationReport> {
    let mut store = load_document(&args.document)?;
    let mut ctx = GeometryContext::new(config);

    let report = run_offset_migration(&mut ctx, &mut store);
    if !report.skipped_images.is_empty() {
        tracing::warn!(
            "Images with unknown dimensions were not migrated: {}",
            report.skipped_images.join(", ")
        );
    }
    if report.is_noop() {
        tracing::info!("Nothing to migrate in {}", args.document.display());
        return Ok(report);
    }

    write_document(&store, args)?;
    Ok(report)
}

/// Applies a rotate or flip to one image of a document and writes it back.
pub fn transform_document(
    config: Config,
    args: &DocumentArgs,
    image: &str,
    transform: ContentTransform,
) -> Result<ContentTransformReport> {
    let mut store = load_document(&args.document)?;
    let mut ctx = GeometryContext::new(config);

    let report = apply_content_transform(&mut ctx, &mut store, image, transform)?;
    if !report.applied {
        bail!("{} was not applied to {}", transform, image);
    }
    tracing::info!(
        "Applied {} to {}: {} point(s), {} offset(s)",
        transform,
        image,
        report.points,
        report.offsets
    );

    write_document(&store, args)?;
    Ok(report)
}

/// An offset record that is not a valid normalized offset.
#[derive(Debug, Clone, PartialEq)]
pub struct OffsetFinding {
    pub image: String,
    pub label: String,
    /// `None` for a well-formed legacy offset
    pub problem: Option<String>,
}

/// Result of scanning a document's offsets.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DocumentCheck {
    pub images: usize,
    pub normalized: usize,
    pub findings: Vec<OffsetFinding>,
}

impl DocumentCheck {
    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }

    pub fn legacy(&self) -> usize {
        self.findings.iter().filter(|f| f.problem.is_none()).count()
    }

    pub fn malformed(&self) -> usize {
        self.findings.len() - self.legacy()
    }
}

impl fmt::Display for DocumentCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for finding in &self.findings {
            match &finding.problem {
                None => writeln!(f, "{}/{}: legacy pixel offset", finding.image, finding.label)?,
                Some(problem) => writeln!(f, "{}/{}: {}", finding.image, finding.label, problem)?,
            }
        }
        writeln!(
            f,
            "{} image(s), {} normalized, {} legacy, {} malformed",
            self.images,
            self.normalized,
            self.legacy(),
            self.malformed()
        )
    }
}

/// Scans a document's offsets without going through the typed store, so a
/// single malformed record does not hide the others.
pub fn check_document(path: &Path) -> Result<DocumentCheck> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let root: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("{} is not valid JSON", path.display()))?;

    let mut check = DocumentCheck::default();
    let Some(images) = root.get("images").and_then(|v| v.as_object()) else {
        return Ok(check);
    };

    for (image, record) in images {
        check.images += 1;
        let Some(offsets) = record.get("labelOffsets").and_then(|v| v.as_object()) else {
            continue;
        };
        for (label, raw) in offsets {
            let problem = if is_legacy_record(raw) {
                None
            } else {
                match serde_json::from_value::<Offset>(raw.clone()) {
                    Ok(offset) if validate_offset_format(&offset) => {
                        check.normalized += 1;
                        continue;
                    }
                    Ok(_) => Some("normalized offset with unusable values".to_string()),
                    Err(e) => Some(e.to_string()),
                }
            };
            check.findings.push(OffsetFinding {
                image: image.clone(),
                label: label.clone(),
                problem,
            });
        }
    }

    tracing::debug!("Checked {}: {} finding(s)", path.display(), check.findings.len());
    Ok(check)
}
