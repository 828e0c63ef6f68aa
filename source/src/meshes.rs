use ahash::AHashMap;
use common::scene::MeshRequest;
use flagset::FlagSet;
use glam::{vec2, Vec2, Vec3};

use crate::{
    bsp::{
        lookup,
        textures::{BSPTexInfo, SurfaceFlags},
        BspError, BspResult, Lumps,
    },
    material::MaterialSlots,
};

/// Polygons of one brush model, ready to hand to the scene.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ModelGeometry {
    /// Model origin, in world units
    pub origin: Vec3,
    /// Scaled, deduplicated vertex positions
    pub positions: Vec<Vec3>,
    /// Vertex index loop of every face
    pub faces: Vec<Vec<u32>>,
    /// UVs parallel to `faces`
    pub uvs: Vec<Vec<Vec2>>,
    pub material_indices: Vec<u32>,
    pub materials: Vec<String>,
    pub surface_flags: Vec<FlagSet<SurfaceFlags>>,
    /// Faces dropped for bad indices or fewer than three distinct vertices
    pub skipped_faces: usize,
}

impl ModelGeometry {
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    pub fn into_request(self, name: String, collection: Option<String>, scale: f32) -> MeshRequest {
        MeshRequest {
            name,
            collection,
            location: self.origin * scale,
            positions: self.positions,
            faces: self.faces,
            uvs: self.uvs,
            material_indices: self.material_indices,
            materials: self.materials,
            surface_flags: self.surface_flags.into_iter().map(FlagSet::bits).collect(),
        }
    }
}

/// Bit pattern used to compare positions. `-0.0` and `0.0` compare equal, NaN never does.
fn position_key(p: Vec3) -> Option<[u32; 3]> {
    if p.is_nan() {
        return None;
    }
    // adding 0.0 turns -0.0 into 0.0
    Some((p + Vec3::ZERO).to_array().map(f32::to_bits))
}

/// Accumulates faces, sharing vertices whose scaled positions are exactly equal.
/// The first face to use a position decides its slot.
pub struct MeshBuilder {
    scale: f32,
    slots: AHashMap<[u32; 3], u32>,
    geometry: ModelGeometry,
}

impl MeshBuilder {
    pub fn new(scale: f32) -> Self {
        Self {
            scale,
            slots: AHashMap::new(),
            geometry: ModelGeometry::default(),
        }
    }

    fn distinct_vertices(&self, raw: &[Vec3]) -> usize {
        let mut seen: Vec<[u32; 3]> = Vec::with_capacity(raw.len());
        let mut nans = 0;
        for &p in raw {
            match position_key(p * self.scale) {
                Some(key) if !seen.contains(&key) => seen.push(key),
                Some(_) => (),
                None => nans += 1,
            }
        }
        seen.len() + nans
    }

    fn vertex(&mut self, raw: Vec3) -> u32 {
        let position = raw * self.scale;
        let key = position_key(position);
        if let Some(&slot) = key.as_ref().and_then(|k| self.slots.get(k)) {
            return slot;
        }
        let slot = self.geometry.positions.len() as u32;
        self.geometry.positions.push(position);
        if let Some(key) = key {
            self.slots.insert(key, slot);
        }
        slot
    }

    /// Add one polygon given by its raw vertex positions. Returns `false`, and inserts nothing,
    /// when the polygon has fewer than three distinct vertices.
    pub fn add_face(
        &mut self,
        raw: &[Vec3],
        uvs: Vec<Vec2>,
        material: u32,
        flags: FlagSet<SurfaceFlags>,
    ) -> bool {
        if self.distinct_vertices(raw) < 3 {
            return false;
        }
        let face = raw.iter().map(|&p| self.vertex(p)).collect();

        self.geometry.faces.push(face);
        self.geometry.uvs.push(uvs);
        self.geometry.material_indices.push(material);
        self.geometry.surface_flags.push(flags);
        true
    }

    pub fn face_count(&self) -> usize {
        self.geometry.faces.len()
    }

    pub fn finish(self) -> ModelGeometry {
        self.geometry
    }
}

/// Texture coordinate of a raw vertex, normalised by the texture size and flipped vertically.
pub fn face_uv(info: &BSPTexInfo, width: i32, height: i32, raw: Vec3) -> Vec2 {
    let width = if width > 0 { width as f32 } else { 1.0 };
    let height = if height > 0 { height as f32 } else { 1.0 };
    let (u, v) = info.texel(raw);
    vec2(u / width, 1.0 - v / height)
}

struct FaceData {
    raw: Vec<Vec3>,
    uvs: Vec<Vec2>,
    /// `None` for faces without texture information
    name_id: Option<i32>,
    flags: FlagSet<SurfaceFlags>,
}

fn read_face(lumps: &Lumps, face_index: usize) -> BspResult<FaceData> {
    let face = lookup(lumps.faces(), face_index as i64, "face")?;
    let vertices = lumps.vertices();

    let raw = face
        .get_verts(lumps.edges(), lumps.surf_edges())?
        .into_iter()
        .map(|i| lookup(vertices, i as i64, "vertex").copied())
        .collect::<BspResult<Vec<Vec3>>>()?;

    let tex_info = face.tex_info;
    if tex_info < 0 {
        return Ok(FaceData {
            uvs: vec![Vec2::ZERO; raw.len()],
            raw,
            name_id: None,
            flags: FlagSet::default(),
        });
    }

    let info = lookup(lumps.tex_info(), tex_info as i64, "tex-info")?;
    let data = lookup(lumps.tex_data(), info.tex_data as i64, "tex-data")?;
    let (width, height) = (data.width, data.height);

    Ok(FaceData {
        uvs: raw.iter().map(|&p| face_uv(info, width, height, p)).collect(),
        raw,
        name_id: Some(data.name_string_table_id),
        flags: info.flags(),
    })
}

/// Rebuild brush model `model_index` as polygons.
///
/// Faces with bad indices or fewer than three distinct vertices are logged, counted in
/// [`ModelGeometry::skipped_faces`], and left out. A map without models, faces or vertices
/// gives empty geometry.
pub fn build_model(lumps: &Lumps, model_index: usize, scale: f32) -> BspResult<ModelGeometry> {
    let models = lumps.models();
    if models.is_empty() {
        return Ok(ModelGeometry::default());
    }
    let model = models.get(model_index).ok_or(BspError::ModelOutOfRange {
        index: model_index,
        len: models.len(),
    })?;

    let mut builder = MeshBuilder::new(scale);
    builder.geometry.origin = model.origin();
    if lumps.faces().is_empty() || lumps.vertices().is_empty() {
        return Ok(builder.finish());
    }

    let mut slots = MaterialSlots::new();
    let mut skipped = 0;

    // faces past the end of the face lump are skipped as a block
    let range = model.face_range()?;
    let faces_len = lumps.faces().len();
    let end = range.end.min(faces_len);
    let past_end = range.end - end.max(range.start);
    if past_end > 0 {
        log::warn!("Model {model_index}: {past_end} faces past the end of the face lump ({faces_len})");
        skipped += past_end;
    }

    for face_index in range.start..end {
        let face = match read_face(lumps, face_index) {
            Ok(face) => face,
            Err(e) => {
                log::warn!("Skipping face {face_index} of model {model_index}: {e}");
                skipped += 1;
                continue;
            }
        };

        if builder.distinct_vertices(&face.raw) < 3 {
            log::debug!("Skipping degenerate face {face_index} of model {model_index}");
            skipped += 1;
            continue;
        }
        let material = slots.slot(lumps.strings(), face.name_id);
        builder.add_face(&face.raw, face.uvs, material, face.flags);
    }

    log::info!(
        "Model {model_index}: {} faces, {} vertices, {} materials ({skipped} faces skipped)",
        builder.face_count(),
        builder.geometry.positions.len(),
        slots.len()
    );

    let mut geometry = builder.finish();
    geometry.materials = slots.into_names();
    geometry.skipped_faces = skipped;
    Ok(geometry)
}
