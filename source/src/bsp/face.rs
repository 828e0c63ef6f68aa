use glam::IVec2;

use super::{
    consts::{LumpType, MAX_MAP_FACES},
    decode_records,
    edges::{BSPEdge, BSPSurfEdge},
    error::lookup,
    BspError, BspResult, Lump,
};

///The face array is limited to 65536 (MAX_MAP_FACES) entries.
///
///The original face lump (Lump 27) has the same structure as the face lump, but contains the array of faces before the BSP splitting process is done. These faces are therefore closer to the original brush faces present in the precompile map than the face array, and there are less of them. The origFace entry for all original faces is zero. The maximum size of the original face array is also 65536 entries.
///
///Both the face and original face arrays are culled; that is, many faces present before compilation of the map (primarily those that face towards the "void" outside the map) are removed from the array.
#[repr(C, packed)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct BSPFace {
    ///The first member plane_num is the plane number, i.e., the index into the plane array that corresponds to
    /// the plane that is aligned with this face in the world.
    pub plane_num: u16,
    /// faces opposite to the node's plane direction
    pub side: i8,
    // 1 of on node, 0 if in leaf
    pub on_node: i8,
    /// Firstedge is an index into the Surfedge array; this and the following numedges entries in the surfedge array define the edges of the face.
    /// As mentioned above, whether the value in the surfedge array is positive or negative indicates whether the corresponding pair of vertices listed
    /// in the Edge array should be traced from the first vertex to the second, or vice versa.
    ///
    /// The vertices which make up the face are thus referenced in clockwise order; when looking towards the face,
    /// each edge is traced in a clockwise direction.
    pub first_edge: i32,
    /// number of surfedges
    pub num_edges: i16,
    ///Texinfo is an index into the Texinfo array (see below), and represents the texture to be drawn on the face.
    /// -1 when the face has no texture.
    pub tex_info: i16,
    /// Dispinfo is an index into the Dispinfo array is the face is a displacement surface (in which case, the face defines the boundaries of the surface); otherwise, it is -1.
    pub disp_info: i16,
    pub surface_fog_volume_id: i16,
    /// switchable lighting info
    pub styles: [i8; 4],
    /// offset into lightmap lump
    pub light_ofs: i32,
    /// face area in units^2
    pub area: f32,
    pub lightmap_texture_mins_in_luxels: IVec2,
    pub lightmap_texture_size_in_luxels: IVec2,
    ///OrigFace is the index of the original face which was split to produce this face.
    pub orig_face: i32,
    pub num_prims: u16,
    pub first_prim_id: u16,
    /// lightmap smoothing group
    pub smoothing_groups: u32,
}

impl BSPFace {
    /// A textured face with every other field zeroed.
    pub fn new(first_edge: i32, num_edges: i16, tex_info: i16) -> Self {
        Self {
            first_edge,
            num_edges,
            tex_info,
            disp_info: -1,
            light_ofs: -1,
            ..<Self as bytemuck::Zeroable>::zeroed()
        }
    }

    /// Raw vertex indices of the face's loop, in surf-edge order.
    pub fn get_verts(&self, edges: &[BSPEdge], surfedges: &[BSPSurfEdge]) -> BspResult<Vec<usize>> {
        let first_edge = self.first_edge as i64;
        let num_edges = self.num_edges.max(0) as i64;

        (first_edge..first_edge + num_edges)
            .map(|i| {
                let surf_edge = lookup(surfedges, i, "surf-edge")?;
                Ok(surf_edge.first_vertex(edges)? as usize)
            })
            .collect()
    }

    /// Faces have used the same 56 byte layout for every known lump version.
    pub fn decode_versioned(lump: LumpType, version: i32, bytes: &[u8]) -> BspResult<Box<[Self]>> {
        match version {
            0 | 1 => decode_records(lump, bytes, Self::max()),
            _ => Err(BspError::UnsupportedLumpVersion { lump, version }),
        }
    }
}

impl Lump for BSPFace {
    fn max() -> usize {
        MAX_MAP_FACES
    }
    fn lump_type() -> LumpType {
        LumpType::Faces
    }
}
