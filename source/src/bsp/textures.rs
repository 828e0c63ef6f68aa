use flagset::{flags, FlagSet};
use glam::{Vec3, Vec4};

use crate::binaries::ByteReader;

use super::consts::{
    LumpType, MAX_MAP_TEXDATA, MAX_MAP_TEXDATA_STRING_DATA, MAX_MAP_TEXDATA_STRING_TABLE,
    MAX_MAP_TEXINFO, NO_NAME, TEXTURE_NAME_LENGTH,
};
use super::Lump;

// Texinfo
//
// The texinfo lump (Lump 6) contains an array of texinfo_t structures. Each texinfo is 72 bytes long.
//
// The first array of floats is in essence two vectors that represent how the texture is orientated and scaled when
// rendered on the world geometry. The two vectors, s and t, are the mapping of the left-to-right and down-to-up
// directions in the texture pixel coordinate space, onto the world. Each vector has an x, y, and z component, plus an
// offset which is the "shift" of the texture in that direction relative to the world.
//
// u = tv0,0 * x + tv0,1 * y + tv0,2 * z + tv0,3
// v = tv1,0 * x + tv1,1 * y + tv1,2 * z + tv1,3
//
// After calculating (u, v), divide u and v by the width and height of the texture respectively.

flags! {
    pub enum SurfaceFlags: i32 {
        Light = 0x1,        // value will hold the light strength
        Sky2D = 0x2,        // don't draw, indicates we should skylight + draw 2d sky but not draw the 3D skybox
        Sky = 0x4,          // don't draw, but add to skybox
        Warp = 0x8,         // turbulent water warp
        Trans = 0x10,       // texture is translucent
        NoPortal = 0x20,    // the surface can not have a portal placed on it
        Trigger = 0x40,
        NoDraw = 0x80,      // don't bother referencing the texture
        Hint = 0x100,       // make a primary bsp splitter
        Skip = 0x200,       // completely ignore, allowing non-closed brushes
        NoLight = 0x400,    // Don't calculate light
        BumpLight = 0x800,  // calculate three lightmaps for the surface for bumpmapping
        NoShadows = 0x1000,
        NoDecals = 0x2000,
        NoChop = 0x4000,    // Don't subdivide patches on this surface
        Hitbox = 0x8000,    // surface is part of a hitbox
    }
}

#[repr(C, packed)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct BSPTexInfo {
    /// [s/t][xyz offset]
    pub tex_s: Vec4,
    /// [s/t][xyz offset]
    pub tex_t: Vec4,
    pub lightmap_s: Vec4, // [s/t][xyz offset] - length is in units of texels/area
    pub lightmap_t: Vec4, // [s/t][xyz offset] - length is in units of texels/area
    pub flags: i32,       // miptex flags overrides
    pub tex_data: i32,    // Pointer to texture name, size, etc.
}

impl BSPTexInfo {
    pub fn new(tex_s: Vec4, tex_t: Vec4, tex_data: i32) -> Self {
        Self {
            tex_s,
            tex_t,
            lightmap_s: Vec4::ZERO,
            lightmap_t: Vec4::ZERO,
            flags: 0,
            tex_data,
        }
    }

    pub fn flags(&self) -> FlagSet<SurfaceFlags> {
        FlagSet::new_truncated(self.flags)
    }

    /// Texel coordinates of a world space point, before dividing by the texture size.
    pub fn texel(&self, point: Vec3) -> (f32, f32) {
        let (s, t) = (self.tex_s, self.tex_t);
        (
            point.dot(s.truncate()) + s.w,
            point.dot(t.truncate()) + t.w,
        )
    }
}

impl Lump for BSPTexInfo {
    fn max() -> usize {
        MAX_MAP_TEXINFO
    }
    fn lump_type() -> LumpType {
        LumpType::TexInfo
    }
}

///Texdata
///
///The index of a Texinfo (referenced from a face or brushside) may be given as -1; this indicates that no texture information is associated with this face. This occurs on compiling brush faces given the SKIP, CLIP, or INVISIBLE type textures in the editor.
///
/// The reflectivity vector corresponds to the RGB components of the reflectivity of the texture, as derived from the material's .vtf file.
/// The nameStringTableID is an index into the TexdataStringTable array (below). The other members relate to the texture's source image.
#[repr(C, packed)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct BSPTexData {
    pub reflectivity: Vec3,        // RGB reflectivity
    pub name_string_table_id: i32, // index into TexdataStringTable
    pub width: i32,
    pub height: i32, // source image
    pub view_width: i32,
    pub view_height: i32,
}

impl BSPTexData {
    pub fn new(name_string_table_id: i32, width: i32, height: i32) -> Self {
        Self {
            reflectivity: Vec3::ONE,
            name_string_table_id,
            width,
            height,
            view_width: width,
            view_height: height,
        }
    }
}

impl Lump for BSPTexData {
    fn max() -> usize {
        MAX_MAP_TEXDATA
    }
    fn lump_type() -> LumpType {
        LumpType::TexData
    }
}

/// The TexdataStringTable (Lump 44) is an array of integers which are offsets into the TexdataStringData (lump 43).
/// The TexdataStringData lump consists of concatenated null-terminated strings giving the texture name.
#[repr(C, packed)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct BSPTexDataStringTable {
    pub index: i32,
}

impl Lump for BSPTexDataStringTable {
    fn max() -> usize {
        MAX_MAP_TEXDATA_STRING_TABLE
    }
    fn lump_type() -> LumpType {
        LumpType::TexDataStringTable
    }
}

/// Texture names resolved from the string table and string data lumps.
#[derive(Debug, Clone, Default)]
pub struct StringTable {
    strings: Vec<Option<String>>,
}

impl StringTable {
    pub fn new(table: &[BSPTexDataStringTable], data: &[u8]) -> Self {
        if data.len() > MAX_MAP_TEXDATA_STRING_DATA {
            log::warn!(
                "texture string data is {} bytes, over the engine limit of {MAX_MAP_TEXDATA_STRING_DATA}",
                data.len()
            );
        }
        let reader = ByteReader::new(data);

        let strings = table
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                let offset = entry.index;
                let string = usize::try_from(offset)
                    .ok()
                    .and_then(|offset| reader.with_pos(offset).read_cstring().ok());
                match &string {
                    None => log::warn!("string table entry {i} points outside string data ({offset})"),
                    Some(s) if s.len() > TEXTURE_NAME_LENGTH => {
                        log::debug!("texture name {s:?} is longer than {TEXTURE_NAME_LENGTH}")
                    }
                    _ => (),
                }
                string
            })
            .collect();

        Self { strings }
    }

    pub fn from_strings<S: Into<String>>(strings: impl IntoIterator<Item = S>) -> Self {
        Self {
            strings: strings.into_iter().map(|s| Some(s.into())).collect(),
        }
    }

    /// The string at `index`, or `None` when the index or its offset is invalid.
    pub fn try_get(&self, index: i32) -> Option<&str> {
        let index = usize::try_from(index).ok()?;
        self.strings.get(index)?.as_deref()
    }

    /// The string at `index`. Missing and empty strings come back as [`NO_NAME`].
    pub fn get(&self, index: i32) -> &str {
        match self.try_get(index) {
            Some(s) if !s.is_empty() => s,
            _ => NO_NAME,
        }
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}
