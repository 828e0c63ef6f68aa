use super::consts::{LumpType, MAX_MAP_EDGES, MAX_MAP_SURFEDGES};
use super::{error::lookup, BspResult, Lump};

///Edge
///
///The edge lump (Lump 12) is an array of dedge_t structures:
///Each edge is simply a pair of vertex indices (which index into the vertex lump array). The edge is defined as the straight line between the two vertices. Usually, the edge array is referenced through the Surfedge array (see below).
///
///As for vertices, edges can be shared between adjacent faces. There is a limit of 256000 edges in a map (`MAX_MAP_EDGES`).
#[repr(C, packed)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct BSPEdge {
    pub v0: u16, // vertex indices
    pub v1: u16, // vertex indices
}

impl BSPEdge {
    pub fn new(v0: u16, v1: u16) -> Self {
        Self { v0, v1 }
    }
}

impl Lump for BSPEdge {
    fn max() -> usize {
        MAX_MAP_EDGES
    }
    fn lump_type() -> LumpType {
        LumpType::Edges
    }
}

///Surfedge
///
///The Surfedge lump (Lump 13), presumable short for surface edge, is an array of (signed) integers. Surfedges are used to reference the edge array, in a somewhat complex way.
///The value in the surfedge array can be positive or negative. The absolute value of this number is an index into the edge array:
/// if positive, it means the edge is defined from the first to the second vertex; if negative, from the second to the first vertex.
///
///By this method, the Surfedge array allows edges to be referenced for a particular direction. (See the face lump entry below for more on why this is done).
///
///There is a limit of 512000 (MAX_MAP_SURFEDGES) surfedges per map. Note that the number of surfedges is not necessarily the same as the number of edges in the map.
#[repr(C, packed)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct BSPSurfEdge {
    pub index: i32,
}

impl Lump for BSPSurfEdge {
    fn max() -> usize {
        MAX_MAP_SURFEDGES
    }
    fn lump_type() -> LumpType {
        LumpType::SurfEdges
    }
}

impl BSPSurfEdge {
    pub fn new(index: i32) -> Self {
        Self { index }
    }

    /// The referenced edge's vertices in winding order.
    /// Zero and positive values walk `v0 -> v1`, negative values walk `v1 -> v0`.
    pub fn get_edge(&self, edges: &[BSPEdge]) -> BspResult<(u16, u16)> {
        let index = self.index;
        let edge = *lookup(edges, index.unsigned_abs() as i64, "edge")?;
        if index >= 0 {
            Ok((edge.v0, edge.v1))
        } else {
            Ok((edge.v1, edge.v0))
        }
    }

    /// Vertex this surf-edge starts at.
    pub fn first_vertex(&self, edges: &[BSPEdge]) -> BspResult<u16> {
        Ok(self.get_edge(edges)?.0)
    }
}
