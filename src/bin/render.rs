use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;
use tracing_tree::HierarchicalLayer;

use spectral_pt::imageio::write_image;
use spectral_pt::renderer::render_description;
use spectral_pt::scenes::SceneDescription;
use spectral_pt::settings::{FilterKind, IntegratorKind, RenderSettings, SamplerKind};

/// Renders one of the built-in scenes to a PNG or EXR image.
#[derive(Parser, Debug)]
#[command(version)]
struct Args {
    /// Built-in scene to render (cornell, furnace)
    #[arg(long, default_value = "cornell")]
    scene: String,

    /// Output image, format chosen by extension (.png or .exr)
    #[arg(short, long, default_value = "render.png")]
    output: PathBuf,

    #[arg(short, long, default_value_t = 400)]
    width: u32,

    #[arg(long, default_value_t = 400)]
    height: u32,

    /// Samples per pixel
    #[arg(short, long, default_value_t = 16)]
    spp: u32,

    #[arg(long, default_value_t = 0)]
    seed: u64,

    #[arg(short, long, value_enum, default_value_t = IntegratorKind::Path)]
    integrator: IntegratorKind,

    /// Maximum number of bounces for the path integrator
    #[arg(long, default_value_t = 5)]
    max_depth: u32,

    /// Widen near-specular lobes after the first non-specular bounce
    #[arg(long)]
    regularize: bool,

    #[arg(long, value_enum, default_value_t = SamplerKind::Independent)]
    sampler: SamplerKind,

    #[arg(long, value_enum, default_value_t = FilterKind::Gaussian)]
    filter: FilterKind,

    /// Output color space (srgb, rec2020)
    #[arg(long, default_value = "srgb")]
    color_space: String,

    /// Render thread count; defaults to one per core
    #[arg(short, long)]
    threads: Option<usize>,

    /// Show a progress bar
    #[arg(long)]
    progress: bool,
}

impl Args {
    fn settings(&self) -> RenderSettings {
        let defaults = RenderSettings::default();
        // the box filter only makes sense over a single pixel
        let filter_radius = match self.filter {
            FilterKind::Box => 0.5,
            FilterKind::Gaussian => defaults.filter_radius,
        };
        RenderSettings {
            width: self.width,
            height: self.height,
            spp: self.spp,
            seed: self.seed,
            integrator: self.integrator,
            max_depth: self.max_depth,
            regularize: self.regularize,
            sampler: self.sampler,
            filter: self.filter,
            filter_radius,
            color_space: self.color_space.clone(),
            threads: self.threads,
            progress: self.progress,
            ..defaults
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(HierarchicalLayer::new(2).with_targets(true))
        .init();
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();
    let settings = args.settings();

    let desc = SceneDescription::by_name(&args.scene)?;
    info!(scene = %args.scene, integrator = ?settings.integrator, spp = settings.spp, "rendering");
    let film = render_description(&desc, &settings)?;

    write_image(&args.output, &film.to_rgb_image())?;
    Ok(())
}
