use std::mem;

use glam::Vec3;
use num_traits::FromPrimitive;

use crate::binaries::{BinaryData, ByteReader};

use super::{
    consts::LumpType,
    edges::{BSPEdge, BSPSurfEdge},
    entities::Entities,
    face::BSPFace,
    model::BSPModel,
    textures::{BSPTexData, BSPTexDataStringTable, BSPTexInfo},
    worldlight::BSPWorldLight,
    BspError, BspResult,
};

/// A record type stored as a flat array in one lump.
pub trait Lump
where
    Self: Sized,
{
    /// Engine limit on the record count
    fn max() -> usize;
    fn lump_type() -> LumpType;
}

// https://developer.valvesoftware.com/wiki/BSP_(Source)
#[repr(C, packed)]
#[derive(Debug, Default, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct BSPLump {
    pub file_ofs: i32,    // offset into file (bytes)
    pub file_len: i32,    // length of lump (bytes)
    pub version: i32,     // lump format version
    pub four_cc: [u8; 4], // lump ident code
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum LumpKind {
    Known(LumpType),
    /// A directory slot with no [`LumpType`] variant, kept as raw bytes
    Unknown(usize),
}

/// One validated row of the lump directory.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct LumpEntry {
    pub kind: LumpKind,
    pub index: usize,
    pub offset: i64,
    pub length: i64,
    pub version: i32,
    pub four_cc: [u8; 4],
    in_bounds: bool,
}

impl LumpEntry {
    pub fn new(index: usize, lump: &BSPLump, file_len: usize) -> Self {
        let kind = match LumpType::from_usize(index) {
            Some(ty) => LumpKind::Known(ty),
            None => LumpKind::Unknown(index),
        };
        let offset = lump.file_ofs as i64;
        let length = lump.file_len as i64;
        let in_bounds = offset >= 0 && length >= 0 && offset + length <= file_len as i64;
        Self {
            kind,
            index,
            offset,
            length,
            version: lump.version,
            four_cc: lump.four_cc,
            in_bounds,
        }
    }

    /// Zero length entries are how the directory says "not present".
    pub fn is_present(&self) -> bool {
        self.length > 0
    }

    pub fn in_bounds(&self) -> bool {
        self.in_bounds
    }

    pub fn lump_type(&self) -> Option<LumpType> {
        match self.kind {
            LumpKind::Known(ty) => Some(ty),
            LumpKind::Unknown(_) => None,
        }
    }

    /// The entry's byte range within `file`.
    pub fn bytes<'a>(&self, file: &'a [u8]) -> BspResult<&'a [u8]> {
        let truncated = || BspError::TruncatedFile {
            lump: Some(self.kind),
            from: self.offset.max(0) as usize,
            to: (self.offset + self.length).max(0) as usize,
            size: file.len(),
        };
        if !self.in_bounds {
            return Err(truncated());
        }
        file.get(self.offset as usize..(self.offset + self.length) as usize)
            .ok_or_else(truncated)
    }

    /// Decode the entry as a flat array of `T`, using `T`'s own size as the record size.
    pub fn decode<T: Lump + BinaryData>(&self, file: &[u8]) -> BspResult<Box<[T]>> {
        decode_records(T::lump_type(), self.bytes(file)?, T::max())
    }
}

/// Split `bytes` into records of `T`. Fails if the length is not a whole number of records.
pub fn decode_records<T: BinaryData>(
    lump: LumpType,
    bytes: &[u8],
    max: usize,
) -> BspResult<Box<[T]>> {
    let record_size = mem::size_of::<T>();

    if bytes.len() % record_size != 0 {
        return Err(BspError::LumpSizeMismatch {
            lump,
            length: bytes.len(),
            record_size,
        });
    }

    let len = bytes.len() / record_size;
    if len > max {
        log::warn!("{lump:?} lump holds {len} records, over the engine limit of {max}");
    }

    ByteReader::new(bytes).read_array(len)
}

/// Decoded contents of one lump.
pub enum LumpData {
    Entities(Entities),
    Vertexes(Box<[Vec3]>),
    Edges(Box<[BSPEdge]>),
    SurfEdges(Box<[BSPSurfEdge]>),
    Faces(Box<[BSPFace]>),
    Models(Box<[BSPModel]>),
    TexInfo(Box<[BSPTexInfo]>),
    TexData(Box<[BSPTexData]>),
    TexDataStringTable(Box<[BSPTexDataStringTable]>),
    TexDataStringData(Box<[u8]>),
    WorldLights(Box<[BSPWorldLight]>),
    /// Lumps without a decoder
    Raw(Box<[u8]>),
}

impl LumpData {
    pub fn decode(entry: &LumpEntry, file: &[u8]) -> BspResult<Self> {
        let bytes = entry.bytes(file)?;

        let LumpKind::Known(ty) = entry.kind else {
            return Ok(Self::Raw(bytes.into()));
        };

        log::debug!(
            "decoding {ty:?} lump v{} ({} bytes at {})",
            entry.version,
            entry.length,
            entry.offset
        );

        Ok(match ty {
            LumpType::Entities => Self::Entities(Entities::new(bytes)),
            LumpType::Vertexes => Self::Vertexes(entry.decode(file)?),
            LumpType::Edges => Self::Edges(entry.decode(file)?),
            LumpType::SurfEdges => Self::SurfEdges(entry.decode(file)?),
            LumpType::Faces | LumpType::FacesHdr | LumpType::OriginalFaces => {
                Self::Faces(BSPFace::decode_versioned(ty, entry.version, bytes)?)
            }
            LumpType::Models => Self::Models(entry.decode(file)?),
            LumpType::TexInfo => Self::TexInfo(entry.decode(file)?),
            LumpType::TexData => Self::TexData(entry.decode(file)?),
            LumpType::TexDataStringTable => Self::TexDataStringTable(entry.decode(file)?),
            LumpType::TexDataStringData => Self::TexDataStringData(bytes.into()),
            LumpType::WorldLights | LumpType::WorldLightsHdr => {
                Self::WorldLights(BSPWorldLight::decode_versioned(ty, entry.version, bytes)?)
            }
            _ => Self::Raw(bytes.into()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(index: usize, ofs: i32, len: i32, file_len: usize) -> LumpEntry {
        LumpEntry::new(
            index,
            &BSPLump {
                file_ofs: ofs,
                file_len: len,
                version: 0,
                four_cc: [0; 4],
            },
            file_len,
        )
    }

    #[test]
    fn entry_bounds() {
        let file = [0u8; 32];

        let inside = entry(3, 8, 24, file.len());
        assert_eq!(inside.kind, LumpKind::Known(LumpType::Vertexes));
        assert_eq!(inside.bytes(&file).unwrap().len(), 24);

        let over = entry(3, 16, 24, file.len());
        assert!(!over.in_bounds());
        assert!(matches!(
            over.bytes(&file),
            Err(BspError::TruncatedFile { from: 16, to: 40, size: 32, .. })
        ));

        let negative = entry(3, -4, 8, file.len());
        assert!(negative.bytes(&file).is_err());

        assert!(!entry(3, 0, 0, file.len()).is_present());
        assert_eq!(entry(22, 0, 0, file.len()).kind, LumpKind::Unknown(22));
    }

    #[test]
    fn size_mismatch_names_the_lump() {
        let file = [0u8; 14];
        let edges = entry(12, 0, 14, file.len());

        match edges.decode::<BSPEdge>(&file) {
            Err(BspError::LumpSizeMismatch {
                lump,
                length,
                record_size,
            }) => {
                assert_eq!(lump, LumpType::Edges);
                assert_eq!(length, 14);
                assert_eq!(record_size, 4);
            }
            _ => panic!("expected a size mismatch"),
        }

        let edges = entry(12, 2, 12, file.len());
        assert_eq!(edges.decode::<BSPEdge>(&file).unwrap().len(), 3);
    }

    #[test]
    fn unknown_lumps_stay_raw() {
        let file = [1u8, 2, 3, 4];
        let unknown = entry(23, 0, 4, file.len());
        assert!(matches!(LumpData::decode(&unknown, &file), Ok(LumpData::Raw(b)) if &*b == &file));
    }
}
