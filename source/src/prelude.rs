pub use crate::bsp::{
    consts::LumpType,
    edges::{BSPEdge, BSPSurfEdge},
    entities::{Entities, Entity},
    face::BSPFace,
    header::{BSPHeader, LumpDirectory},
    model::BSPModel,
    textures::{BSPTexData, BSPTexDataStringTable, BSPTexInfo, StringTable},
    worldlight::BSPWorldLight,
    BspError, BspFile, BspResult, Lumps,
};
pub use crate::game_data::{Config, GameData, ImportSettings};
pub use crate::import::{BspImport, ImportReport};
pub use crate::light::{LightPowerPolicy, PhotometricPolicy};
pub use crate::meshes::{build_model, ModelGeometry};
pub use crate::vmt::VMT;
