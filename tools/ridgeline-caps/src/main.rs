//! Ridgeline caps - adapter capability and effect selection report
//!
//! # Commands
//!
//! - `ridgeline-caps adapters` - Show the adapters wgpu offers and how each classifies
//! - `ridgeline-caps negotiate` - Run effect negotiation and print the chosen variants
//! - `ridgeline-caps chipsets` - List chipset names accepted by `--chipset` and `render.toml`
//! - `ridgeline-caps config` - Print the effective render settings
//!
//! # Usage
//!
//! ```bash
//! # What would this machine draw terrain with?
//! ridgeline-caps negotiate
//!
//! # What would a two-stage card without pixel shaders get?
//! ridgeline-caps negotiate --textures 2 --pixel-shader 0.0
//!
//! # Force a chipset family the way render.toml does
//! ridgeline-caps negotiate --chipset GF3
//! ```

mod headless;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use ridgeline_core::config::{self, RenderConfig};
use ridgeline_core::{
    CapabilityProbe, ChipsetId, EffectId, FilterId, FilterManager, ShaderManager, caps_from_wgpu,
    classify_chipset,
};
use ridgeline_shared::{AdapterIdentity, DeviceCaps, ShaderVersion};

use headless::{HeadlessDevice, NamedTextures};

/// Ridgeline caps - adapter capability and effect selection report
#[derive(Parser)]
#[command(name = "ridgeline-caps")]
#[command(about = "Inspect adapter capabilities and the effect variants Ridgeline would select")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the adapters wgpu offers and how each classifies
    Adapters,

    /// Run effect negotiation and print the chosen variants
    Negotiate(NegotiateArgs),

    /// List chipset names accepted by --chipset and render.toml
    Chipsets,

    /// Print the effective render settings
    Config,
}

#[derive(Clone, Copy, ValueEnum)]
enum Power {
    High,
    Low,
}

impl From<Power> for wgpu::PowerPreference {
    fn from(power: Power) -> Self {
        match power {
            Power::High => wgpu::PowerPreference::HighPerformance,
            Power::Low => wgpu::PowerPreference::LowPower,
        }
    }
}

#[derive(clap::Args)]
struct NegotiateArgs {
    /// Adapter to probe when no synthetic caps are given
    #[arg(long, value_enum, default_value = "high")]
    power: Power,

    /// Skip adapter classification and use this chipset
    #[arg(long)]
    chipset: Option<ChipsetId>,

    /// Synthetic adapter: simultaneous texture stages
    #[arg(long, requires = "pixel_shader")]
    textures: Option<u32>,

    /// Synthetic adapter: pixel shader version, e.g. 1.4
    #[arg(long, value_parser = parse_shader_version, requires = "textures")]
    pixel_shader: Option<ShaderVersion>,

    /// Synthetic adapter: PCI vendor id (hex)
    #[arg(long, value_parser = parse_hex, default_value = "0")]
    vendor: u32,

    /// Synthetic adapter: PCI device id (hex)
    #[arg(long, value_parser = parse_hex, default_value = "0")]
    device: u32,

    /// Pretend render-to-texture allocation fails
    #[arg(long)]
    no_render_to_texture: bool,
}

fn parse_shader_version(text: &str) -> Result<ShaderVersion, String> {
    let (major, minor) = text.split_once('.').unwrap_or((text, "0"));
    let major = major.parse::<u8>().map_err(|e| format!("bad major version: {e}"))?;
    let minor = minor.parse::<u8>().map_err(|e| format!("bad minor version: {e}"))?;
    Ok(ShaderVersion::new(major, minor))
}

fn parse_hex(text: &str) -> Result<u32, String> {
    let digits = text.trim_start_matches("0x").trim_start_matches("0X");
    u32::from_str_radix(digits, 16).map_err(|e| e.to_string())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Adapters => adapters(),
        Commands::Negotiate(args) => negotiate(args),
        Commands::Chipsets => {
            for chipset in ChipsetId::ALL {
                println!("{:<6} {chipset:?}", chipset.short_name());
            }
            Ok(())
        }
        Commands::Config => print_config(),
    }
}

fn request_adapter(power: Power) -> Result<(AdapterIdentity, DeviceCaps)> {
    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
    let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: power.into(),
        force_fallback_adapter: false,
        compatible_surface: None,
    }))
    .context("No graphics adapter available")?;
    Ok(caps_from_wgpu(
        &adapter.get_info(),
        &adapter.limits(),
        &adapter.get_downlevel_capabilities(),
    ))
}

fn adapters() -> Result<()> {
    let mut found = 0;
    for power in [Power::High, Power::Low] {
        let Ok((identity, caps)) = request_adapter(power) else {
            continue;
        };
        found += 1;
        println!(
            "{:<40} {:04x}:{:04x}  ps {}  {:>3} textures  -> {}",
            identity.name,
            identity.vendor_id,
            identity.device_id,
            caps.pixel_shader,
            caps.max_simultaneous_textures,
            classify_chipset(&identity, &caps)
        );
    }
    if found == 0 {
        bail!("No graphics adapter available");
    }
    Ok(())
}

fn negotiate(args: NegotiateArgs) -> Result<()> {
    let (identity, caps) = match (args.textures, args.pixel_shader) {
        (Some(textures), Some(pixel_shader)) => (
            AdapterIdentity {
                vendor_id: args.vendor,
                device_id: args.device,
                name: "synthetic".to_string(),
                driver_version: 0,
            },
            DeviceCaps {
                max_simultaneous_textures: textures,
                pixel_shader,
                vertex_shader: pixel_shader,
            },
        ),
        _ => request_adapter(args.power)?,
    };

    let mut render_config = config::load();
    if args.chipset.is_some() {
        render_config.device.chipset_override = args.chipset;
    }

    let mut device = HeadlessDevice::new(identity, caps, !args.no_render_to_texture);
    let mut textures = NamedTextures::default();
    let mut probe = CapabilityProbe::new(render_config.device.chipset_override);
    let mut shaders = ShaderManager::new();
    shaders.init(&mut device, &mut textures, &mut probe, &render_config);
    let mut filters = FilterManager::new();
    filters.init(&mut device, &mut textures, &shaders);

    let report = shaders.capabilities();
    println!(
        "chipset {} ({})  ps {}  {} textures  render-to-texture {}",
        report.chipset,
        report.chipset.short_name(),
        report.pixel_shader,
        report.max_simultaneous_textures,
        if report.render_to_texture { "yes" } else { "no" }
    );
    println!();
    println!("{:<28} {:<24} passes", "effect", "variant");
    for effect in EffectId::ALL {
        println!(
            "{:<28} {:<24} {}",
            effect.name(),
            shaders.selected_variant(effect).unwrap_or("-"),
            shaders.shader_passes(effect)
        );
    }
    println!();
    println!("{:<28} variant", "filter");
    for filter in FilterId::ALL {
        println!(
            "{:<28} {}",
            filter.name(),
            filters.selected_variant(filter).unwrap_or("-")
        );
    }
    tracing::debug!("{} pixel shaders assembled", device.shaders_created());

    filters.shutdown(&mut device, &mut textures);
    shaders.shutdown(&mut device, &mut textures, &mut probe);
    Ok(())
}

fn print_config() -> Result<()> {
    let render_config: RenderConfig = config::load();
    for warning in render_config.validate() {
        tracing::warn!("{warning}");
    }
    match config::config_dir() {
        Some(dir) => println!("# {}", dir.join("render.toml").display()),
        None => println!("# no config directory, showing defaults"),
    }
    print!("{}", toml::to_string_pretty(&render_config)?);
    Ok(())
}
