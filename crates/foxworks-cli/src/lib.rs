//! # FoxWorks CLI
//!
//! Command-line driver for the FoxWorks editor core.
//!
//! ## Commands
//! - `preview` - Build a sample vessel and report its LOD meshes
//! - `config` - Print the effective configuration

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use foxworks_core::{ObjectId, ObjectType, RevolvedBodyEvaluator};
use foxworks_editor::{EditorConfig, VesselView, ViewStats};
use glam::Vec3;

/// FoxWorks vessel editor CLI
#[derive(Parser)]
#[command(name = "foxworks")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Build a sample vessel and log triangle counts per LOD
    Preview {
        /// Number of LOD levels, overriding the config
        #[arg(short, long)]
        levels: Option<usize>,

        /// JSON config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Give up waiting for LODs after this many milliseconds
        #[arg(short, long, default_value = "30000")]
        timeout_ms: u64,
    },

    /// Print the effective configuration as JSON
    Config {
        /// JSON config file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

/// Execute the CLI command
pub fn execute(cli: Cli) -> Result<()> {
    if cli.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }

    match cli.command {
        Commands::Preview {
            levels,
            config,
            timeout_ms,
        } => {
            let mut config = load_config(config)?;
            if let Some(levels) = levels {
                config.renderer.lod_levels = levels;
            }
            let stats = run_preview(config, Duration::from_millis(timeout_ms))?;
            log::info!(
                "Preview complete: {} objects, {} instances, {} triangles",
                stats.objects,
                stats.instances,
                stats.triangles
            );
        }

        Commands::Config { config } => {
            let config = load_config(config)?;
            println!("{}", config.to_json()?);
        }
    }

    Ok(())
}

/// Load the config file, or the defaults when none is given
pub fn load_config(path: Option<PathBuf>) -> Result<EditorConfig> {
    match path {
        Some(path) => EditorConfig::load(&path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(EditorConfig::default()),
    }
}

/// Add a hull with an oxidizer tank, a fuel tank and an engine
pub fn build_sample_vessel(view: &mut VesselView) -> Result<Vec<ObjectId>> {
    let hull = view.add_object(None, "Hull", ObjectType::Vessel)?;
    view.set_parameter(hull, "length", 12.0)?;
    view.set_parameter(hull, "radius", 2.0)?;

    let lox = view.add_object(Some(hull), "LOX Tank", ObjectType::FuelTank)?;
    view.set_parameter(lox, "is_oxidizer", true)?;
    view.set_parameter(lox, "length", 4.0)?;
    view.set_parameter(lox, "radius", 1.8)?;
    view.set_position(lox, Vec3::new(6.0, 0.0, 0.0))?;

    let fuel = view.add_object(Some(hull), "Fuel Tank", ObjectType::FuelTank)?;
    view.set_parameter(fuel, "length", 3.0)?;
    view.set_parameter(fuel, "radius", 1.8)?;
    view.set_position(fuel, Vec3::new(2.5, 0.0, 0.0))?;

    let engine = view.add_object(Some(hull), "Engine", ObjectType::Engine)?;
    view.set_parameter(engine, "length", 2.0)?;
    view.set_parameter(engine, "radius1", 0.6)?;
    view.set_parameter(engine, "radius2", 1.4)?;
    view.set_position(engine, Vec3::new(-2.0, 0.0, 0.0))?;

    Ok(vec![hull, lox, fuel, engine])
}

/// Build the sample vessel, wait for every LOD set and log the results
pub fn run_preview(config: EditorConfig, timeout: Duration) -> Result<ViewStats> {
    let mut view = VesselView::new(config, Arc::new(RevolvedBodyEvaluator::new()))?;
    let objects = build_sample_vessel(&mut view)?;
    view.wait_until_idle(timeout)
        .context("Waiting for LOD generation")?;

    for id in objects {
        let object = view.tree().get(id)?;
        let triangles = view.lod_triangles(id).unwrap_or_default();
        log::info!(
            "{} ({}): triangles per LOD {:?}",
            object.name(),
            object.object_type(),
            triangles
        );
    }
    Ok(view.stats())
}
