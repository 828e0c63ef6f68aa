use glam::Vec3;

use super::{
    consts::{LumpType, MAX_MAP_VERTS},
    Lump,
};

impl Lump for Vec3 {
    fn max() -> usize {
        MAX_MAP_VERTS
    }

    fn lump_type() -> LumpType {
        LumpType::Vertexes
    }
}
