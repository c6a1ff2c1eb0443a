//! Vista - a headless glTF explorer
//!
//! Loads a GLB file, reports what the document contains, flattens a scene
//! and resolves the pipeline every draw would bind.

mod settings;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use glam::Vec3;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use vista_assets::{flatten_default_scene, flatten_scene, AssetServer, RgbaImageDecoder};
use vista_render::{
    build_batches, material_records, MaterialRecord, PipelineCache, RecordingBackend, RenderPass,
    ShaderSource,
};

use settings::Settings;

#[derive(Parser)]
#[command(name = "vista")]
#[command(about = "Inspect a binary glTF file and the pipelines it needs")]
struct Cli {
    /// GLB file to load
    input: PathBuf,

    /// Scene to flatten (defaults to the document's default scene)
    #[arg(short, long)]
    scene: Option<usize>,

    /// Decode embedded images
    #[arg(long)]
    images: bool,

    /// Camera position used to sort draws, as x,y,z
    #[arg(
        long,
        value_delimiter = ',',
        num_args = 3,
        allow_negative_numbers = true,
        default_values_t = [0.0, 0.0, 5.0]
    )]
    camera: Vec<f32>,

    /// Write the effective settings to the config file and exit
    #[arg(long)]
    save_settings: bool,
}

fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    let cli = Cli::parse();
    let settings = Settings::load();

    if cli.save_settings {
        return settings.save();
    }

    info!("Starting Vista explorer...");

    let base = std::env::current_dir().context("Failed to read current directory")?;
    let mut server = AssetServer::new(base, settings.loading.to_config());
    let handle = server
        .load_gltf(&cli.input)
        .with_context(|| format!("Failed to load {}", cli.input.display()))?;
    let gltf = server
        .get(handle)
        .context("Loaded document is missing from the asset server")?;

    info!(
        "Asset version {} ({})",
        gltf.asset.version,
        gltf.asset.generator.as_deref().unwrap_or("unknown generator")
    );
    if !gltf.extensions_used.is_empty() {
        info!("Extensions used: {}", gltf.extensions_used.join(", "));
    }
    info!(
        "{} scenes, {} nodes, {} meshes, {} materials, {} images, {} accessors, {} bytes of binary data",
        gltf.scenes.len(),
        gltf.nodes.len(),
        gltf.meshes.len(),
        gltf.materials.len(),
        gltf.images.len(),
        gltf.accessors.len(),
        gltf.blob.len()
    );

    if cli.images {
        let textures = server
            .decode_textures(handle, &RgbaImageDecoder)
            .context("Loaded document is missing from the asset server")?;
        let decoded = textures.iter().filter(|t| t.is_ok()).count();
        info!("Decoded {} of {} images", decoded, textures.len());
    }

    let flat = match cli.scene {
        Some(scene) => flatten_scene(gltf, scene),
        None => flatten_default_scene(gltf),
    }
    .context("Failed to flatten scene")?;

    match flat.scene {
        Some(scene) => info!("Scene {}: {} draws", scene, flat.draws.len()),
        None => warn!("Document has no scenes, nothing to draw"),
    }

    let materials = material_records(gltf);
    let fallback = MaterialRecord::fallback(gltf);
    let cache = PipelineCache::new(RecordingBackend::new(), ShaderSource::default());
    let targets = settings.targets.to_targets();
    let camera = match cli.camera.as_slice() {
        &[x, y, z] => Vec3::new(x, y, z),
        _ => Vec3::new(0.0, 0.0, 5.0),
    };

    let batches = build_batches(&flat, &materials, &fallback, &cache, &targets, camera)
        .context("Failed to resolve pipelines")?;

    for pass in RenderPass::ALL {
        info!("{:?} pass: {} batches", pass, batches.pass(pass).len());
    }
    let stats = cache.stats();
    info!(
        "{} shader programs and {} pipelines cover {} draws",
        stats.shader_programs,
        stats.pipelines,
        flat.draws.len()
    );

    Ok(())
}
