//! One map load, from file to scene requests.

use std::path::Path;

use ahash::AHashSet;
use common::{
    scene::{
        BrushEntityRequest, EntityData, MaterialRequest, PlaceholderRequest, SceneSink,
        TextureBinding,
    },
    texture::{load_texture, TextureDecoder},
    vfile::AssetSource,
};
use glam::Vec3;
use thiserror::Error;

use crate::{
    bsp::{entities::Entity, BspError, BspFile, BspResult},
    game_data::{material_path, texture_path, ImportSettings},
    light::{parse_vector, resolve_light, LightPowerPolicy, PhotometricPolicy},
    material::fix_material_name,
    meshes::build_model,
    vmt::{VMTError, VMT},
};

/// Entity classes whose `model` key names a brush model (`*N`).
pub const BRUSH_CLASSES: [&str; 5] = [
    "func_brush",
    "func_rotating",
    "func_door",
    "trigger_multiple",
    "func_respawnroomvisualizer",
];

/// Name of entities with neither `targetname` nor `hammerid`.
pub const UNNAMED_ENTITY: &str = "SOURCE_WTF?";

#[derive(Debug, Error)]
pub enum MaterialError {
    #[error("material file {0} not found")]
    NotFound(String),
    #[error(transparent)]
    Vmt(#[from] VMTError),
}

#[derive(Debug, Error)]
enum EntityError {
    #[error("missing {0} key")]
    MissingKey(&'static str),
    #[error("bad {key} value {value:?}")]
    BadValue { key: &'static str, value: String },
    #[error(transparent)]
    Light(#[from] crate::light::LightError),
    #[error(transparent)]
    Bsp(#[from] BspError),
}

/// What one import produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub meshes: usize,
    pub lights: usize,
    pub brush_entities: usize,
    pub placeholders: usize,
    pub materials: usize,
    pub skipped_faces: usize,
    pub skipped_entities: usize,
    pub failed_materials: usize,
    pub lump_failures: usize,
}

/// Context for importing one map. Owns the decoded file and everything the import
/// needs, so nothing is shared between loads.
pub struct BspImport {
    file: BspFile,
    settings: ImportSettings,
    stem: String,
    policy: Box<dyn LightPowerPolicy>,
    report: ImportReport,
}

impl BspImport {
    pub fn open(path: impl AsRef<Path>, settings: ImportSettings) -> BspResult<Self> {
        let path = path.as_ref();
        let file = BspFile::open(path, settings.max_file_size, settings.parallel)?;
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self::new(file, stem, settings))
    }

    pub fn new(file: BspFile, stem: impl Into<String>, settings: ImportSettings) -> Self {
        let report = ImportReport {
            lump_failures: file.lumps().failures.len(),
            ..Default::default()
        };
        Self {
            file,
            settings,
            stem: stem.into(),
            policy: Box::new(PhotometricPolicy::default()),
            report,
        }
    }

    pub fn with_policy(mut self, policy: impl LightPowerPolicy + 'static) -> Self {
        self.policy = Box::new(policy);
        self
    }

    pub fn file(&self) -> &BspFile {
        &self.file
    }

    pub fn settings(&self) -> &ImportSettings {
        &self.settings
    }

    pub fn report(&self) -> &ImportReport {
        &self.report
    }

    /// The world, brush model 0, as `world_geometry`.
    pub fn load_map_mesh(&mut self, sink: &mut dyn SceneSink) -> BspResult<()> {
        let lumps = self.file.lumps();
        if lumps.models().is_empty() || lumps.faces().is_empty() || lumps.vertices().is_empty() {
            log::warn!("{}: no world geometry", self.stem);
            return Ok(());
        }
        self.load_bmodel(0, "world_geometry", None, sink)?;
        Ok(())
    }

    /// Build brush model `index` and send it to the scene. Returns the mesh's name.
    pub fn load_bmodel(
        &mut self,
        index: usize,
        name: &str,
        collection: Option<String>,
        sink: &mut dyn SceneSink,
    ) -> BspResult<String> {
        let mesh_name = format!("{}_{name}", self.stem);
        log::info!("Loading {mesh_name:?}");

        let geometry = build_model(self.file.lumps(), index, self.settings.scale)?;
        self.report.skipped_faces += geometry.skipped_faces;
        self.report.meshes += 1;

        sink.create_mesh(geometry.into_request(mesh_name.clone(), collection, self.settings.scale));
        Ok(mesh_name)
    }

    /// Lights, brush entities and sprites.
    ///
    /// A malformed entity lump fails before anything is emitted. A single bad entity is
    /// logged and skipped.
    pub fn load_entities(&mut self, sink: &mut dyn SceneSink) -> BspResult<()> {
        let Some(entities) = self.file.lumps().entities() else {
            return Ok(());
        };
        let entities = entities.parse_all()?;

        for entity in &entities {
            let Some(classname) = entity.classname() else {
                continue;
            };
            if let Err(e) = self.load_entity(entity, classname, sink) {
                log::warn!(
                    "Skipping {classname} entity at byte {}: {e}",
                    entity.offset
                );
                self.report.skipped_entities += 1;
            }
        }
        Ok(())
    }

    fn load_entity(
        &mut self,
        entity: &Entity,
        classname: &str,
        sink: &mut dyn SceneSink,
    ) -> Result<(), EntityError> {
        let hammer_id = entity.get("hammerid").unwrap_or(UNNAMED_ENTITY);
        let target_name = entity.get("targetname");
        let name = target_name.unwrap_or(hammer_id);
        let collection = Some(classname.to_owned());

        match classname {
            "env_sprite" => {
                let material = entity.get("model").ok_or(EntityError::MissingKey("model"))?;
                let scale = match entity.get("scale") {
                    Some(value) => value.trim().parse().map_err(|_| EntityError::BadValue {
                        key: "scale",
                        value: value.to_owned(),
                    })?,
                    None => 1.0,
                };
                let origin = entity_origin(entity)?;

                sink.create_placeholder(PlaceholderRequest {
                    name: format!("Sprite_{hammer_id}_{}", target_name.unwrap_or(material)),
                    collection,
                    location: origin * self.settings.scale,
                    rotation: Vec3::ZERO,
                    scale: Vec3::splat(scale) * self.settings.scale,
                    entity: entity_data(entity),
                });
                self.report.placeholders += 1;
            }
            class if BRUSH_CLASSES.contains(&class) => {
                let model = entity.get("model").ok_or(EntityError::MissingKey("model"))?;
                let index = model
                    .strip_prefix('*')
                    .and_then(|index| index.parse::<usize>().ok())
                    .ok_or_else(|| EntityError::BadValue {
                        key: "model",
                        value: model.to_owned(),
                    })?;
                // brush entities compiled without an origin sit at the world origin
                let origin = match entity.get("origin") {
                    Some(_) => entity_origin(entity)?,
                    None => Vec3::ZERO,
                };

                let mesh = self.load_bmodel(index, name, collection.clone(), sink)?;
                sink.instantiate_brush(BrushEntityRequest {
                    name: name.to_owned(),
                    collection,
                    mesh,
                    location: origin * self.settings.scale,
                    entity: entity_data(entity),
                });
                self.report.brush_entities += 1;
            }
            "light" | "light_spot" => {
                let prefix = if classname == "light" { "POINT" } else { "SPOT" };
                let light = resolve_light(
                    entity,
                    format!("{prefix}_{name}"),
                    self.settings.scale,
                    self.policy.as_ref(),
                )?;
                sink.create_light(light);
                self.report.lights += 1;
            }
            _ => (),
        }
        Ok(())
    }

    /// Find, parse and send every material the map's textures name. A material that fails
    /// is logged and does not stop the rest. Textures are decoded when `decoder` is given.
    pub fn load_materials(
        &mut self,
        sink: &mut dyn SceneSink,
        assets: &dyn AssetSource,
        decoder: Option<&dyn TextureDecoder>,
    ) {
        let lumps = self.file.lumps();
        let mut seen = AHashSet::new();
        let names: Vec<String> = lumps
            .tex_data()
            .iter()
            .map(|data| fix_material_name(Some(lumps.strings().get(data.name_string_table_id))))
            .filter(|name| seen.insert(name.clone()))
            .collect();

        for name in names {
            log::info!("Loading {name} material");
            match load_material(&name, assets, decoder) {
                Ok(material) => {
                    sink.create_material(material);
                    self.report.materials += 1;
                }
                Err(e) => {
                    log::warn!("Failed to import material {name:?}: {e}");
                    self.report.failed_materials += 1;
                }
            }
        }
    }

    /// World geometry, entities, then materials when the settings ask for them.
    pub fn import_all(
        &mut self,
        sink: &mut dyn SceneSink,
        assets: &dyn AssetSource,
        decoder: Option<&dyn TextureDecoder>,
    ) -> BspResult<ImportReport> {
        self.load_map_mesh(sink)?;
        if let Err(e) = self.load_entities(sink) {
            log::warn!("{}: entities not loaded: {e}", self.stem);
        }
        if self.settings.materials {
            self.load_materials(sink, assets, decoder);
        }
        Ok(self.report.clone())
    }
}

fn entity_origin(entity: &Entity) -> Result<Vec3, EntityError> {
    let value = entity.get("origin").ok_or(EntityError::MissingKey("origin"))?;
    match parse_vector("origin", value)?[..] {
        [x, y, z, ..] => Ok(Vec3::new(x, y, z)),
        _ => Err(EntityError::BadValue {
            key: "origin",
            value: value.to_owned(),
        }),
    }
}

fn entity_data(entity: &Entity) -> EntityData {
    entity.to_pairs()
}

/// Resolve one material: its VMT, then every texture it names.
pub fn load_material(
    name: &str,
    assets: &dyn AssetSource,
    decoder: Option<&dyn TextureDecoder>,
) -> Result<MaterialRequest, MaterialError> {
    let path = material_path(name);
    let bytes = assets
        .read_asset(&path)
        .ok_or_else(|| MaterialError::NotFound(path.clone()))?;
    let vmt = VMT::from_bytes(&bytes)?;

    let textures = vmt
        .textures()
        .into_iter()
        .map(|(parameter, texture)| {
            let path = texture_path(&texture);
            let image = match (assets.read_asset(&path), decoder) {
                (Some(bytes), Some(decoder)) => match load_texture(decoder, &bytes, false) {
                    Ok(image) => Some(image),
                    Err(e) => {
                        log::warn!("{name}: failed to decode {path}: {e}");
                        None
                    }
                },
                (None, _) => {
                    log::warn!("{name}: texture {path} not found");
                    None
                }
                (Some(_), None) => None,
            };
            TextureBinding {
                parameter: parameter.to_owned(),
                path,
                image,
            }
        })
        .collect();

    Ok(MaterialRequest {
        name: name.to_owned(),
        shader: vmt.shader,
        textures,
    })
}
