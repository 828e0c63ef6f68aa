pub mod consts;
pub mod edges;
pub mod entities;
mod error;
pub mod face;
pub mod header;
pub mod lump;
pub mod model;
pub mod textures;
pub mod vert;
pub mod worldlight;

#[cfg(test)]
pub(crate) mod test_builder;

use std::{fs, path::Path};

use ahash::AHashMap;
use glam::Vec3;
use rayon::prelude::*;

use crate::binaries::BinaryData;

pub use consts::LumpType;
pub use error::{BspError, BspResult};
pub use lump::{decode_records, Lump, LumpData, LumpEntry, LumpKind};

pub(crate) use error::lookup;

use self::{
    edges::{BSPEdge, BSPSurfEdge},
    entities::Entities,
    face::BSPFace,
    header::LumpDirectory,
    model::BSPModel,
    textures::{BSPTexData, BSPTexDataStringTable, BSPTexInfo, StringTable},
    worldlight::BSPWorldLight,
};

// https://developer.valvesoftware.com/wiki/BSP_(Source)
//
// The BSP file holds the geometry of every brush polygon in the level, references to the names and
// orientation of the textures drawn on them, and the location and properties of every entity. The
// header's directory gives the offset and length of each of its 64 lumps.
//
// Only little endian (PC) files are read. Console maps (`PSBV`) are rejected.

/// Lumps decoded up front by [`Lumps::decode`]. Everything else stays in the file until asked for.
const DECODED: [LumpType; 13] = [
    LumpType::Entities,
    LumpType::Vertexes,
    LumpType::Edges,
    LumpType::SurfEdges,
    LumpType::Faces,
    LumpType::FacesHdr,
    LumpType::Models,
    LumpType::TexInfo,
    LumpType::TexData,
    LumpType::TexDataStringTable,
    LumpType::TexDataStringData,
    LumpType::WorldLights,
    LumpType::WorldLightsHdr,
];

/// A loaded map: the file's bytes, its lump directory, and the lumps decoded from them.
pub struct BspFile {
    bytes: Box<[u8]>,
    directory: LumpDirectory,
    lumps: Lumps,
}

impl BspFile {
    /// Read a map from disk, refusing files larger than `max_file_size` before reading them.
    pub fn open(path: impl AsRef<Path>, max_file_size: u64, parallel: bool) -> BspResult<Self> {
        let path = path.as_ref();
        let size = fs::metadata(path)?.len();
        if size > max_file_size {
            return Err(BspError::FileTooLarge {
                size,
                limit: max_file_size,
            });
        }

        log::info!("Loading {} ({size} bytes)", path.display());
        Self::parse(fs::read(path)?, parallel)
    }

    pub fn parse(bytes: impl Into<Box<[u8]>>, parallel: bool) -> BspResult<Self> {
        let bytes = bytes.into();
        let directory = LumpDirectory::parse(&bytes)?;
        let lumps = Lumps::decode(&directory, &bytes, parallel);

        Ok(Self {
            bytes,
            directory,
            lumps,
        })
    }

    pub fn directory(&self) -> &LumpDirectory {
        &self.directory
    }

    pub fn lumps(&self) -> &Lumps {
        &self.lumps
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn version(&self) -> i32 {
        self.directory.version()
    }

    /// Decode a lump on demand. A lump the map does not carry decodes as empty.
    pub fn get_lump<T: Lump + BinaryData>(&self) -> BspResult<Box<[T]>> {
        match self.directory.get(T::lump_type()) {
            Some(entry) => entry.decode(&self.bytes),
            None => Ok(Box::new([])),
        }
    }
}

/// The decoded lumps of one file, with the failures met decoding them.
#[derive(Default)]
pub struct Lumps {
    data: AHashMap<LumpType, LumpData>,
    strings: StringTable,
    pub failures: Vec<(LumpType, BspError)>,
}

impl Lumps {
    /// Decode every present lump in [`DECODED`]. A lump that fails to decode is logged,
    /// recorded in `failures`, and treated as absent.
    pub fn decode(directory: &LumpDirectory, bytes: &[u8], parallel: bool) -> Self {
        let present: Vec<(LumpType, &LumpEntry)> = DECODED
            .iter()
            .filter_map(|&ty| Some((ty, directory.get(ty)?)))
            .collect();

        let decode = |&(ty, entry): &(LumpType, &LumpEntry)| (ty, LumpData::decode(entry, bytes));

        let decoded: Vec<(LumpType, BspResult<LumpData>)> = if parallel {
            present.par_iter().map(decode).collect()
        } else {
            present.iter().map(decode).collect()
        };

        let mut lumps = Self::default();
        for (ty, result) in decoded {
            match result {
                Ok(data) => {
                    lumps.data.insert(ty, data);
                }
                Err(e) => {
                    log::warn!("Skipping {ty:?} lump: {e}");
                    lumps.failures.push((ty, e));
                }
            }
        }

        let table: &[BSPTexDataStringTable] = match lumps.data.get(&LumpType::TexDataStringTable) {
            Some(LumpData::TexDataStringTable(table)) => &table[..],
            _ => &[],
        };
        let data: &[u8] = match lumps.data.get(&LumpType::TexDataStringData) {
            Some(LumpData::TexDataStringData(data)) => &data[..],
            _ => &[],
        };
        lumps.strings = StringTable::new(table, data);

        lumps
    }

    pub fn get(&self, lump: LumpType) -> Option<&LumpData> {
        self.data.get(&lump)
    }

    pub fn vertices(&self) -> &[Vec3] {
        match self.get(LumpType::Vertexes) {
            Some(LumpData::Vertexes(v)) => v,
            _ => &[],
        }
    }

    pub fn edges(&self) -> &[BSPEdge] {
        match self.get(LumpType::Edges) {
            Some(LumpData::Edges(v)) => v,
            _ => &[],
        }
    }

    pub fn surf_edges(&self) -> &[BSPSurfEdge] {
        match self.get(LumpType::SurfEdges) {
            Some(LumpData::SurfEdges(v)) => v,
            _ => &[],
        }
    }

    /// LDR faces, or the HDR set when the map only carries that.
    pub fn faces(&self) -> &[BSPFace] {
        match (self.get(LumpType::Faces), self.get(LumpType::FacesHdr)) {
            (Some(LumpData::Faces(v)), _) | (None, Some(LumpData::Faces(v))) => v,
            _ => &[],
        }
    }

    pub fn models(&self) -> &[BSPModel] {
        match self.get(LumpType::Models) {
            Some(LumpData::Models(v)) => v,
            _ => &[],
        }
    }

    pub fn tex_info(&self) -> &[BSPTexInfo] {
        match self.get(LumpType::TexInfo) {
            Some(LumpData::TexInfo(v)) => v,
            _ => &[],
        }
    }

    pub fn tex_data(&self) -> &[BSPTexData] {
        match self.get(LumpType::TexData) {
            Some(LumpData::TexData(v)) => v,
            _ => &[],
        }
    }

    pub fn strings(&self) -> &StringTable {
        &self.strings
    }

    pub fn entities(&self) -> Option<&Entities> {
        match self.get(LumpType::Entities) {
            Some(LumpData::Entities(e)) => Some(e),
            _ => None,
        }
    }

    /// LDR world lights, falling back to the HDR set. Empty when the map has neither.
    pub fn world_lights(&self) -> &[BSPWorldLight] {
        match (self.get(LumpType::WorldLights), self.get(LumpType::WorldLightsHdr)) {
            (Some(LumpData::WorldLights(v)), _) | (None, Some(LumpData::WorldLights(v))) => v,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod bsp_tests {
    use glam::vec3;

    use super::{test_builder::BspBuilder, *};

    fn triangle() -> BspBuilder {
        BspBuilder::new()
            .lump(
                LumpType::Vertexes,
                &[vec3(0.0, 0.0, 0.0), vec3(64.0, 0.0, 0.0), vec3(0.0, 64.0, 0.0)],
            )
            .lump(
                LumpType::Edges,
                &[BSPEdge::new(0, 1), BSPEdge::new(1, 2), BSPEdge::new(2, 0)],
            )
            .lump(
                LumpType::SurfEdges,
                &[BSPSurfEdge::new(0), BSPSurfEdge::new(1), BSPSurfEdge::new(2)],
            )
            .lump(LumpType::Faces, &[BSPFace::new(0, 3, -1)])
            .lump(LumpType::Models, &[BSPModel::new(Vec3::ZERO, 0, 1)])
    }

    #[test]
    fn decodes_present_lumps() {
        for parallel in [true, false] {
            let file = BspFile::parse(triangle().build(), parallel).unwrap();
            let lumps = file.lumps();

            assert_eq!(file.version(), 20);
            assert_eq!(lumps.vertices().len(), 3);
            assert_eq!(lumps.edges().len(), 3);
            assert_eq!(lumps.surf_edges().len(), 3);
            assert_eq!(lumps.faces().len(), 1);
            assert_eq!(lumps.models().len(), 1);
            assert!(lumps.failures.is_empty());

            // absent lumps are empty, not errors
            assert!(lumps.tex_info().is_empty());
            assert!(lumps.world_lights().is_empty());
            assert!(lumps.entities().is_none());
            assert!(lumps.strings().is_empty());
        }
    }

    #[test]
    fn failed_lump_is_recorded_and_absent() {
        let bytes = triangle().raw(LumpType::Edges, 0, vec![0; 14]).build();
        let file = BspFile::parse(bytes, true).unwrap();
        let lumps = file.lumps();

        assert!(lumps.edges().is_empty());
        assert_eq!(lumps.vertices().len(), 3);
        assert!(matches!(
            &lumps.failures[..],
            [(
                LumpType::Edges,
                BspError::LumpSizeMismatch {
                    length: 14,
                    record_size: 4,
                    ..
                }
            )]
        ));
    }

    #[test]
    fn hdr_fallbacks() {
        let light = BSPWorldLight {
            origin: vec3(1.0, 2.0, 3.0),
            ..<BSPWorldLight as bytemuck::Zeroable>::zeroed()
        };
        let bytes = triangle()
            .raw(LumpType::Faces, 0, vec![])
            .lump(LumpType::FacesHdr, &[BSPFace::new(0, 3, -1), BSPFace::new(0, 3, -1)])
            .lump_versioned(LumpType::WorldLightsHdr, 1, &[light])
            .build();
        let file = BspFile::parse(bytes, false).unwrap();

        assert_eq!(file.lumps().faces().len(), 2);
        assert_eq!(file.lumps().world_lights().len(), 1);
        assert_eq!(file.lumps().world_lights()[0].position(), vec3(1.0, 2.0, 3.0));
    }

    #[test]
    fn string_table_from_lumps() {
        let bytes = triangle().strings(&["brick/brick01", ""]).build();
        let file = BspFile::parse(bytes, true).unwrap();
        let strings = file.lumps().strings();

        assert_eq!(strings.get(0), "brick/brick01");
        assert_eq!(strings.get(1), consts::NO_NAME);
    }

    #[test]
    fn get_lump_on_demand() {
        let file = BspFile::parse(triangle().build(), true).unwrap();
        assert_eq!(file.get_lump::<BSPEdge>().unwrap().len(), 3);
        assert!(file.get_lump::<BSPTexInfo>().unwrap().is_empty());
    }

    #[test]
    fn open_enforces_size_limit() {
        let path = std::env::temp_dir().join(format!("bsp_open_{}.bsp", std::process::id()));
        fs::write(&path, triangle().build()).unwrap();

        assert!(matches!(
            BspFile::open(&path, 100, true),
            Err(BspError::FileTooLarge { limit: 100, .. })
        ));
        assert!(BspFile::open(&path, 1 << 20, true).is_ok());

        fs::remove_file(&path).unwrap();
        assert!(matches!(
            BspFile::open(&path, 1 << 20, true),
            Err(BspError::Io(_))
        ));
    }
}
