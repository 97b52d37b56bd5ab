//! # Printquote CLI
//!
//! Command-line interface for print cost and time estimation.
//!
//! ## Commands
//! - `analyze` - Volume, dimensions and overhangs of a mesh
//! - `estimate` - Full quote for a mesh and a job description
//! - `materials` - List the material table
//! - `check-settings` - Validate a settings file
//!
//! Meshes are read as JSON: `{ "positions": [x, y, z, ...], "indices": [...] }`
//! with `indices` optional. Results are written to stdout as JSON.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use printquote_core::mesh::summarize_overhangs;
use printquote_core::{
    AdvisoryReport, Estimator, GeometryAnalysis, Orientation, OverhangConfig, OverhangSummary,
    QuoteRequest, SettingsTable, TriangleMesh, analyze_geometry,
};

/// Printquote CLI
#[derive(Parser)]
#[command(name = "printquote")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Settings file (JSON); built-in defaults when omitted
    #[arg(short, long, global = true)]
    pub settings: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Measure a mesh
    Analyze {
        /// Mesh file
        #[arg(short, long)]
        mesh: PathBuf,

        /// XYZ rotation in degrees
        #[arg(
            short,
            long,
            num_args = 3,
            value_names = ["X", "Y", "Z"],
            allow_negative_numbers = true
        )]
        rotate: Option<Vec<f64>>,

        /// Overhang threshold in degrees from up
        #[arg(long, default_value_t = printquote_core::mesh::DEFAULT_OVERHANG_THRESHOLD_DEG)]
        overhang_threshold: f64,
    },

    /// Quote a mesh
    Estimate {
        /// Mesh file
        #[arg(short, long)]
        mesh: PathBuf,

        /// Job file (material, process parameters, quantity)
        #[arg(short, long)]
        job: PathBuf,

        /// Advisory classifier report supplying support and orientation
        #[arg(short, long)]
        advisory: Option<PathBuf>,
    },

    /// List available materials
    Materials,

    /// Validate a settings file
    CheckSettings {
        /// Settings file to check
        path: PathBuf,
    },
}

/// Mesh buffer as written by a mesh loader
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshBuffer {
    pub positions: Vec<f32>,
    #[serde(default)]
    pub indices: Option<Vec<u32>>,
}

impl MeshBuffer {
    pub fn into_mesh(self) -> Result<TriangleMesh> {
        Ok(TriangleMesh::from_buffers(&self.positions, self.indices.as_deref())?)
    }
}

/// Output of `analyze`
#[derive(Debug, Serialize)]
pub struct AnalyzeReport {
    pub geometry: GeometryAnalysis,
    pub overhangs: OverhangSummary,
    pub degenerate: bool,
}

/// Parse a mesh JSON document
pub fn parse_mesh(json: &str) -> Result<TriangleMesh> {
    let buffer: MeshBuffer = serde_json::from_str(json).context("Failed to parse mesh buffer")?;
    buffer.into_mesh()
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn load_settings(path: Option<&Path>) -> Result<SettingsTable> {
    match path {
        Some(path) => {
            log::debug!("Loading settings from {}", path.display());
            SettingsTable::from_json_str(&read(path)?)
                .with_context(|| format!("Invalid settings in {}", path.display()))
        }
        None => Ok(SettingsTable::default()),
    }
}

/// Measure a mesh without pricing it
pub fn analyze(
    mesh: &TriangleMesh,
    orientation: &Orientation,
    config: &OverhangConfig,
) -> AnalyzeReport {
    let geometry = analyze_geometry(mesh, orientation);
    AnalyzeReport {
        geometry,
        overhangs: summarize_overhangs(mesh, orientation, config),
        degenerate: geometry.is_degenerate(),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Execute the CLI command
pub fn execute(cli: Cli) -> Result<()> {
    if cli.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }

    match cli.command {
        Commands::Analyze {
            mesh,
            rotate,
            overhang_threshold,
        } => {
            log::info!("Analyzing {}...", mesh.display());
            let triangles = parse_mesh(&read(&mesh)?)?;
            let orientation = match rotate.as_deref() {
                Some(&[x, y, z]) => Orientation::from_euler_degrees(x, y, z),
                _ => Orientation::IDENTITY,
            };
            let config = OverhangConfig {
                threshold_deg: overhang_threshold,
                ..OverhangConfig::default()
            };

            let report = analyze(&triangles, &orientation, &config);
            if report.degenerate {
                log::warn!("Mesh encloses no volume; it cannot be quoted");
            }
            print_json(&report)?;
        }

        Commands::Estimate { mesh, job, advisory } => {
            let estimator = Estimator::new(load_settings(cli.settings.as_deref())?)?;
            let triangles = parse_mesh(&read(&mesh)?)?;

            let mut request: QuoteRequest = serde_json::from_str(&read(&job)?)
                .with_context(|| format!("Invalid job in {}", job.display()))?;
            if let Some(advisory) = advisory {
                let report = AdvisoryReport::from_json_str(&read(&advisory)?)
                    .with_context(|| format!("Invalid advisory report in {}", advisory.display()))?;
                if !report.printable {
                    log::warn!(
                        "Classifier flagged the model as not printable: {:?}",
                        report.issues
                    );
                }
                request = request.with_advisory(&report);
            }

            log::info!(
                "Estimating {} x {} in {}...",
                request.quantity,
                mesh.display(),
                request.material
            );
            let estimate = estimator.estimate(&triangles, &request)?;
            print_json(&estimate)?;
        }

        Commands::Materials => {
            let settings = load_settings(cli.settings.as_deref())?;
            print_json(&settings.materials)?;
        }

        Commands::CheckSettings { path } => {
            let settings = load_settings(Some(path.as_path()))?;
            log::info!(
                "{} is valid: {} materials, {} pricing tiers",
                path.display(),
                settings.materials.len(),
                settings.pricing.tiers.tiers().len()
            );
        }
    }

    Ok(())
}
