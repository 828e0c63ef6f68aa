use std::ops::Range;

use glam::Vec3;

use super::{
    consts::{LumpType, MAX_MAP_MODELS},
    BspError, BspResult, Lump,
};

/// A brush model: a group of faces with its own origin.
/// Model 0 is the world, the rest are attached to brush entities through their `*N` model key.
#[repr(C, packed)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct BSPModel {
    mins: Vec3,
    maxs: Vec3,
    origin: Vec3,
    headnode: i32,
    firstface: i32,
    numfaces: i32,
}

impl BSPModel {
    pub fn new(origin: Vec3, first_face: i32, num_faces: i32) -> Self {
        Self {
            mins: Vec3::ZERO,
            maxs: Vec3::ZERO,
            origin,
            headnode: 0,
            firstface: first_face,
            numfaces: num_faces,
        }
    }

    pub fn maxs(&self) -> Vec3 {
        self.maxs
    }

    pub fn mins(&self) -> Vec3 {
        self.mins
    }

    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    pub fn first_face(&self) -> i32 {
        self.firstface
    }

    pub fn num_faces(&self) -> i32 {
        self.numfaces
    }

    /// Indices into the face lump owned by this model.
    pub fn face_range(&self) -> BspResult<Range<usize>> {
        let (first, count) = (self.firstface, self.numfaces);
        if first < 0 || count < 0 {
            return Err(BspError::IndexOutOfRange {
                what: "face",
                index: first.min(count) as i64,
                len: 0,
            });
        }
        Ok(first as usize..first as usize + count as usize)
    }
}

impl Lump for BSPModel {
    fn max() -> usize {
        MAX_MAP_MODELS
    }

    fn lump_type() -> LumpType {
        LumpType::Models
    }
}
