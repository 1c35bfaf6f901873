//! # Texpack CLI
//!
//! Command-line interface for the texture-array allocator.
//!
//! ## Commands
//! - `simulate` - Run a deterministic apply/free workload and report usage
//! - `families` - List material families and their channel order
//! - `config` - Print the effective allocator configuration

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use ahash::AHashMap;
use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde::Serialize;
use texpack_core::{AllocatorConfig, ChannelId, TextureInfo};
use texpack_renderer::{
    ContainerRegistry, ContainerStats, CpuBackend, CpuTexture, Material, MaterialFamily,
};

/// Texture array allocator CLI
#[derive(Parser)]
#[command(name = "texpack")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Allocator configuration file (JSON)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Run an apply/free workload on the CPU backend
    Simulate {
        /// Shader selecting the material family
        #[arg(short, long, default_value = "DCL/Scene")]
        shader: String,

        /// Number of materials to apply
        #[arg(short = 'n', long, default_value = "200")]
        items: usize,

        /// Release the oldest material after every N applies (0 keeps all)
        #[arg(short, long, default_value = "3")]
        free_every: usize,

        /// Texture sizes cycled through, as `N` or `WxH`
        #[arg(long, value_delimiter = ',', default_value = "256,512,256x128")]
        sizes: Vec<String>,
    },

    /// List material families and their channels
    Families,

    /// Print the effective allocator configuration
    Config,
}

/// Outcome of a simulation run
#[derive(Debug, Serialize)]
pub struct SimulationReport {
    pub family: MaterialFamily,
    pub applied: usize,
    pub released: usize,
    pub held: usize,
    pub copies: usize,
    pub bytes_copied: usize,
    pub arrays_created: usize,
    pub container: ContainerStats,
}

/// Execute the CLI command
pub fn execute(cli: Cli) -> Result<()> {
    if cli.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Simulate {
            shader,
            items,
            free_every,
            sizes,
        } => {
            let sizes = sizes.iter().map(|s| parse_size(s)).collect::<Result<Vec<_>>>()?;
            log::info!("Simulating {} materials for '{}'...", items, shader);

            let report = run_simulation(config, &shader, items, free_every, &sizes)?;
            log::info!(
                "Applied {}, released {}, {} pages in use",
                report.applied,
                report.released,
                report.container.page_count()
            );
            println!("{}", serde_json::to_string_pretty(&report)?);
        }

        Commands::Families => {
            for family in MaterialFamily::ALL {
                log::info!("{} ({}):", family, family.shader_name());
                for (index, channel) in family.channels().iter().enumerate() {
                    log::info!(
                        "  [{}] {} -> {} / {} ({:?}{})",
                        index,
                        channel.source,
                        channel.handler.properties.array.name(),
                        channel.handler.properties.index.name(),
                        channel.handler.format,
                        if channel.handler.default_color.is_some() { ", default" } else { "" }
                    );
                }
            }
        }

        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

/// Load and validate the allocator configuration
pub fn load_config(path: Option<&Path>) -> Result<AllocatorConfig> {
    let config = match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?
        }
        None => AllocatorConfig::default(),
    };

    config.validate()?;
    Ok(config)
}

/// Parse `N` or `WxH`
pub fn parse_size(text: &str) -> Result<(u32, u32)> {
    let text = text.trim();
    let (width, height) = match text.split_once(['x', 'X']) {
        Some((w, h)) => (w.parse::<u32>(), h.parse::<u32>()),
        None => (text.parse::<u32>(), text.parse::<u32>()),
    };

    match (width, height) {
        (Ok(w), Ok(h)) if w > 0 && h > 0 => Ok((w, h)),
        _ => bail!("invalid texture size '{}'", text),
    }
}

/// Apply `items` materials, releasing the oldest one every `free_every` applies
pub fn run_simulation(
    config: AllocatorConfig,
    shader: &str,
    items: usize,
    free_every: usize,
    sizes: &[(u32, u32)],
) -> Result<SimulationReport> {
    if sizes.is_empty() {
        bail!("at least one texture size is required");
    }

    let mut backend = CpuBackend::new();
    let mut registry = ContainerRegistry::new(config)?;
    let shared = registry.get_cached(&mut backend, shader)?;
    let mut container = shared.lock();
    let family = container.family();

    let mut held = VecDeque::new();
    let mut released = 0;

    for item in 0..items {
        let (width, height) = sizes[item % sizes.len()];

        // Every fourth channel slot is left out so defaults get exercised
        let mut sources: AHashMap<ChannelId, CpuTexture> = AHashMap::new();
        for (index, channel) in family.channels().iter().enumerate() {
            if (item + index) % 4 == 3 {
                continue;
            }
            let info = TextureInfo::new(width, height, channel.handler.format);
            sources.insert(channel.source, CpuTexture::solid(info, [item as u8; 4]));
        }

        let mut material = Material::new(format!("material_{}", item), shader);
        held.push_back(container.apply_from(&mut backend, &sources, &mut material));

        if free_every > 0 && item % free_every == free_every - 1 {
            if let Some(slots) = held.pop_front() {
                container.release_and_free(slots)?;
                released += 1;
            }
        }
    }

    Ok(SimulationReport {
        family,
        applied: items,
        released,
        held: held.len(),
        copies: backend.copies(),
        bytes_copied: backend.bytes_copied(),
        arrays_created: backend.arrays_created(),
        container: container.stats(),
    })
}
