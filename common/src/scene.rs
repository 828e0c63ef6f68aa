//! Requests handed to the host scene graph.
//!
//! The decoder never touches the host application directly. Every object it wants
//! created is described by one of the plain-data requests below and passed to a
//! [`SceneSink`], which the host implements.

use glam::{Vec2, Vec3};

use crate::texture::DecodedImage;

/// Key/value pairs carried through from an entity block, in file order.
pub type EntityData = Vec<(String, String)>;

/// One mesh object, built from a single brush model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshRequest {
    pub name: String,
    /// Collection to link the object into, `None` for the map's root collection
    pub collection: Option<String>,
    pub location: Vec3,
    pub positions: Vec<Vec3>,
    /// Vertex index loops, one per polygon
    pub faces: Vec<Vec<u32>>,
    /// One UV per loop entry, parallel to `faces`
    pub uvs: Vec<Vec<Vec2>>,
    /// Index into `materials` for every polygon
    pub material_indices: Vec<u32>,
    pub materials: Vec<String>,
    /// Raw surface flag bits of every polygon
    pub surface_flags: Vec<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightKind {
    Point,
    Spot,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LightRequest {
    pub name: String,
    pub collection: Option<String>,
    pub kind: LightKind,
    pub location: Vec3,
    /// XYZ euler rotation in radians. Zero for point lights.
    pub rotation: Vec3,
    pub watts: f32,
    /// Linear RGB, brightest channel normalised to 1
    pub color: Vec3,
    /// Outer cone angle in degrees, spot lights only
    pub cone: f32,
    pub inner_cone: f32,
}

/// Place an already created brush model mesh at an entity's position.
#[derive(Debug, Clone, PartialEq)]
pub struct BrushEntityRequest {
    pub name: String,
    pub collection: Option<String>,
    /// Name of the mesh previously sent through [`SceneSink::create_mesh`]
    pub mesh: String,
    pub location: Vec3,
    pub entity: EntityData,
}

/// An empty object standing in for something the decoder cannot build itself (sprites).
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceholderRequest {
    pub name: String,
    pub collection: Option<String>,
    pub location: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
    pub entity: EntityData,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextureBinding {
    /// Material parameter the texture was bound to, e.g. `$basetexture`
    pub parameter: String,
    pub path: String,
    /// Decoded pixels, when a decoder was available and the file was found
    pub image: Option<DecodedImage>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MaterialRequest {
    pub name: String,
    pub shader: String,
    pub textures: Vec<TextureBinding>,
}

pub trait SceneSink {
    fn create_mesh(&mut self, mesh: MeshRequest);
    fn create_light(&mut self, light: LightRequest);
    fn instantiate_brush(&mut self, brush: BrushEntityRequest);
    fn create_placeholder(&mut self, placeholder: PlaceholderRequest);
    fn create_material(&mut self, material: MaterialRequest);
}

/// Sink that keeps every request it receives.
#[derive(Debug, Default)]
pub struct SceneRecorder {
    pub meshes: Vec<MeshRequest>,
    pub lights: Vec<LightRequest>,
    pub brushes: Vec<BrushEntityRequest>,
    pub placeholders: Vec<PlaceholderRequest>,
    pub materials: Vec<MaterialRequest>,
}

impl SceneRecorder {
    pub fn mesh(&self, name: &str) -> Option<&MeshRequest> {
        self.meshes.iter().find(|m| m.name == name)
    }
}

impl SceneSink for SceneRecorder {
    fn create_mesh(&mut self, mesh: MeshRequest) {
        self.meshes.push(mesh);
    }
    fn create_light(&mut self, light: LightRequest) {
        self.lights.push(light);
    }
    fn instantiate_brush(&mut self, brush: BrushEntityRequest) {
        self.brushes.push(brush);
    }
    fn create_placeholder(&mut self, placeholder: PlaceholderRequest) {
        self.placeholders.push(placeholder);
    }
    fn create_material(&mut self, material: MaterialRequest) {
        self.materials.push(material);
    }
}
