use std::{fmt, mem};

use crate::binaries::ByteReader;

use super::{
    consts::{
        LumpType, BSP_IDENT, BSP_IDENT_BIG_ENDIAN, HEADER_LUMPS, MAX_BSP_VERSION, MIN_BSP_VERSION,
    },
    lump::{BSPLump, LumpEntry, LumpKind},
    BspError, BspResult,
};

#[repr(C, packed)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct BSPHeader {
    pub ident: [u8; 4],                // BSP file identifier
    pub version: i32,                  // BSP file version
    pub lumps: [BSPLump; HEADER_LUMPS], // lump directory array
    pub map_revision: i32,             // the map's revision (iteration, version) number
}

impl Default for BSPHeader {
    fn default() -> Self {
        Self {
            ident: BSP_IDENT,
            version: MIN_BSP_VERSION,
            lumps: [BSPLump::default(); HEADER_LUMPS],
            map_revision: 0,
        }
    }
}

impl fmt::Debug for BSPHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let version = self.version;
        let map_revision = self.map_revision;
        f.debug_struct("BSPHeader")
            .field("ident", &String::from_utf8_lossy(&self.ident))
            .field("version", &version)
            .field("map_revision", &map_revision)
            .finish()
    }
}

impl BSPHeader {
    pub const SIZE: usize = mem::size_of::<Self>();

    /// Read the header and check the magic number and version.
    pub fn read(file: &[u8]) -> BspResult<Self> {
        let header: BSPHeader = ByteReader::new(file).read()?;

        // This way around means little endian, PSBV is big endian
        match header.ident {
            BSP_IDENT => (),
            BSP_IDENT_BIG_ENDIAN => {
                return Err(BspError::CorruptHeader(
                    "big endian (console) maps are not supported".to_owned(),
                ))
            }
            ident => {
                return Err(BspError::CorruptHeader(format!(
                    "bad magic {:?}",
                    String::from_utf8_lossy(&ident)
                )))
            }
        }

        let version = header.version;
        if !(MIN_BSP_VERSION..=MAX_BSP_VERSION).contains(&version) {
            return Err(BspError::CorruptHeader(format!(
                "version {version} outside {MIN_BSP_VERSION}..={MAX_BSP_VERSION}"
            )));
        }

        Ok(header)
    }
}

/// Every row of the header's lump table, checked against the file size.
#[derive(Clone, Debug)]
pub struct LumpDirectory {
    version: i32,
    map_revision: i32,
    entries: Vec<LumpEntry>,
}

impl LumpDirectory {
    /// Parse the directory. Entries that overrun the file are kept, and fail
    /// when their bytes are read.
    pub fn parse(file: &[u8]) -> BspResult<Self> {
        let header = BSPHeader::read(file)?;
        let lumps = header.lumps;

        let entries: Vec<LumpEntry> = lumps
            .iter()
            .enumerate()
            .map(|(index, lump)| LumpEntry::new(index, lump, file.len()))
            .collect();

        for entry in entries.iter().filter(|e| e.is_present() && !e.in_bounds()) {
            log::warn!(
                "{:?} lump ({}..{}) overruns the {} byte file",
                entry.kind,
                entry.offset,
                entry.offset + entry.length,
                file.len()
            );
        }

        log::debug!("{header:?}");

        Ok(Self {
            version: header.version,
            map_revision: header.map_revision,
            entries,
        })
    }

    /// Strict check: fails on the first present entry that overruns the file.
    pub fn validate(&self, file_len: usize) -> BspResult<()> {
        match self
            .entries
            .iter()
            .find(|e| e.is_present() && !e.in_bounds())
        {
            Some(entry) => Err(BspError::TruncatedFile {
                lump: Some(entry.kind),
                from: entry.offset.max(0) as usize,
                to: (entry.offset + entry.length).max(0) as usize,
                size: file_len,
            }),
            None => Ok(()),
        }
    }

    pub fn version(&self) -> i32 {
        self.version
    }

    pub fn map_revision(&self) -> i32 {
        self.map_revision
    }

    /// The entry for `lump`, or `None` when the map does not carry it.
    pub fn get(&self, lump: LumpType) -> Option<&LumpEntry> {
        self.entries
            .get(lump as usize)
            .filter(|entry| entry.is_present())
    }

    pub fn entries(&self) -> &[LumpEntry] {
        &self.entries
    }

    /// Present entries without a [`LumpType`].
    pub fn unknown(&self) -> impl Iterator<Item = &LumpEntry> {
        self.entries
            .iter()
            .filter(|e| e.is_present() && matches!(e.kind, LumpKind::Unknown(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_bytes(ident: [u8; 4], version: i32) -> Vec<u8> {
        let header = BSPHeader {
            ident,
            version,
            ..Default::default()
        };
        bytemuck::bytes_of(&header).to_vec()
    }

    #[test]
    fn header_is_1036_bytes() {
        assert_eq!(BSPHeader::SIZE, 1036);
    }

    #[test]
    fn rejects_bad_headers() {
        for (ident, version) in [(*b"IBSP", 20), (BSP_IDENT_BIG_ENDIAN, 20), (BSP_IDENT, 16), (BSP_IDENT, 30)] {
            assert!(
                matches!(
                    LumpDirectory::parse(&header_bytes(ident, version)),
                    Err(BspError::CorruptHeader(_))
                ),
                "{ident:?} v{version}"
            );
        }

        let short = &header_bytes(BSP_IDENT, 20)[..100];
        assert!(matches!(
            LumpDirectory::parse(short),
            Err(BspError::TruncatedFile { size: 100, .. })
        ));
    }

    #[test]
    fn overrunning_entries_are_kept() {
        let mut header = BSPHeader {
            version: 20,
            ..Default::default()
        };
        header.lumps[LumpType::Vertexes as usize] = BSPLump {
            file_ofs: BSPHeader::SIZE as i32,
            file_len: 12,
            ..Default::default()
        };
        header.lumps[LumpType::Edges as usize] = BSPLump {
            file_ofs: BSPHeader::SIZE as i32,
            file_len: 4000,
            ..Default::default()
        };
        header.lumps[23] = BSPLump {
            file_ofs: BSPHeader::SIZE as i32,
            file_len: 4,
            ..Default::default()
        };
        let mut file = bytemuck::bytes_of(&header).to_vec();
        file.extend([0; 12]);

        let directory = LumpDirectory::parse(&file).unwrap();
        assert_eq!(directory.version(), 20);
        assert!(directory.get(LumpType::Vertexes).unwrap().bytes(&file).is_ok());
        assert!(matches!(
            directory.get(LumpType::Edges).unwrap().bytes(&file),
            Err(BspError::TruncatedFile {
                lump: Some(LumpKind::Known(LumpType::Edges)),
                ..
            })
        ));
        assert!(directory.get(LumpType::Faces).is_none());
        assert_eq!(directory.unknown().count(), 1);

        assert!(matches!(
            directory.validate(file.len()),
            Err(BspError::TruncatedFile { to: 5036, .. })
        ));
    }
}
