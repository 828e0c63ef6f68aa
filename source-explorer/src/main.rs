use std::{path::Path, process::ExitCode, time::Instant};

use common::{
    scene::{
        BrushEntityRequest, LightRequest, MaterialRequest, MeshRequest, PlaceholderRequest,
        SceneSink,
    },
    vfile::{AssetSource, VFileSystem},
};
use source::prelude::*;
use thiserror::Error;

const CONFIG_PATH: &str = "conf.ini";

#[derive(Debug, Error)]
enum ExplorerError {
    #[error(transparent)]
    Config(#[from] source::game_data::ConfigError),
    #[error(transparent)]
    Bsp(#[from] BspError),
}

/// Logs every request instead of building a scene.
#[derive(Default)]
struct LogSink {
    triangles: usize,
    vertices: usize,
}

impl SceneSink for LogSink {
    fn create_mesh(&mut self, mesh: MeshRequest) {
        self.vertices += mesh.positions.len();
        self.triangles += mesh.faces.iter().map(|f| f.len().saturating_sub(2)).sum::<usize>();
        log::debug!(
            "mesh {} ({:?}): {} vertices, {} faces, {} materials",
            mesh.name,
            mesh.collection,
            mesh.positions.len(),
            mesh.faces.len(),
            mesh.materials.len()
        );
    }

    fn create_light(&mut self, light: LightRequest) {
        log::debug!(
            "{:?} light {} at {} ({:.2} W)",
            light.kind,
            light.name,
            light.location,
            light.watts
        );
    }

    fn instantiate_brush(&mut self, brush: BrushEntityRequest) {
        log::debug!("brush {} using {} at {}", brush.name, brush.mesh, brush.location);
    }

    fn create_placeholder(&mut self, placeholder: PlaceholderRequest) {
        log::debug!("placeholder {} at {}", placeholder.name, placeholder.location);
    }

    fn create_material(&mut self, material: MaterialRequest) {
        let loaded = material.textures.iter().filter(|t| t.image.is_some()).count();
        log::debug!(
            "material {} ({}), {}/{} textures",
            material.name,
            material.shader,
            loaded,
            material.textures.len()
        );
    }
}

fn load_config() -> Result<Config, ExplorerError> {
    if !Path::new(CONFIG_PATH).exists() {
        log::info!("No {CONFIG_PATH}, using defaults");
        return Ok(Config::default());
    }
    Ok(Config::load(CONFIG_PATH)?)
}

fn import_map(path: &Path, config: &Config, assets: &dyn AssetSource) -> Result<(), ExplorerError> {
    let now = Instant::now();
    let mut sink = LogSink::default();

    let mut import = BspImport::open(path, config.import.clone())?;
    // VTF decoding is not linked into the explorer
    let report = import.import_all(&mut sink, assets, None)?;

    println!(
        "{}: v{}, {} meshes ({} vertices, {} triangles), {} lights, {} brush entities, \
         {} placeholders, {} materials ({} failed), {} faces and {} entities skipped, \
         {} lumps failed, {:?}",
        path.display(),
        import.file().version(),
        report.meshes,
        sink.vertices,
        sink.triangles,
        report.lights,
        report.brush_entities,
        report.placeholders,
        report.materials,
        report.failed_materials,
        report.skipped_faces,
        report.skipped_entities,
        report.lump_failures,
        now.elapsed()
    );
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();

    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            log::error!("{CONFIG_PATH}: {e}");
            return ExitCode::FAILURE;
        }
    };

    let maps: Vec<String> = std::env::args().skip(1).collect();
    if maps.is_empty() {
        eprintln!("usage: source-explorer <map.bsp>...");
        return ExitCode::FAILURE;
    }

    let empty = VFileSystem::default();
    let assets: &dyn AssetSource = match &config.game {
        Some(game) => game,
        None => &empty,
    };

    let mut failed = false;
    for map in &maps {
        if let Err(e) = import_map(Path::new(map), &config, assets) {
            log::error!("{map}: {e}");
            failed = true;
        }
    }

    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
