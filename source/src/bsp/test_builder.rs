//! Assembles small maps in memory for tests.

use super::{
    consts::{LumpType, BSP_IDENT, HEADER_LUMPS},
    header::BSPHeader,
    lump::BSPLump,
    textures::BSPTexDataStringTable,
};

pub struct BspBuilder {
    version: i32,
    lumps: Vec<Option<(i32, Vec<u8>)>>,
}

impl Default for BspBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BspBuilder {
    pub fn new() -> Self {
        Self {
            version: 20,
            lumps: vec![None; HEADER_LUMPS],
        }
    }

    pub fn version(mut self, version: i32) -> Self {
        self.version = version;
        self
    }

    /// Set a lump's bytes, replacing anything set before.
    pub fn raw(mut self, lump: LumpType, version: i32, bytes: Vec<u8>) -> Self {
        self.lumps[lump as usize] = Some((version, bytes));
        self
    }

    pub fn lump<T: bytemuck::Pod>(self, lump: LumpType, records: &[T]) -> Self {
        self.lump_versioned(lump, 0, records)
    }

    pub fn lump_versioned<T: bytemuck::Pod>(self, lump: LumpType, version: i32, records: &[T]) -> Self {
        self.raw(lump, version, bytemuck::cast_slice(records).to_vec())
    }

    pub fn entities(self, text: &str) -> Self {
        let mut bytes = text.as_bytes().to_vec();
        bytes.push(0);
        self.raw(LumpType::Entities, 0, bytes)
    }

    /// Texture names, in string table order.
    pub fn strings(self, names: &[&str]) -> Self {
        let mut data = Vec::new();
        let mut table = Vec::new();
        for name in names {
            table.push(BSPTexDataStringTable {
                index: data.len() as i32,
            });
            data.extend_from_slice(name.as_bytes());
            data.push(0);
        }
        self.raw(LumpType::TexDataStringData, 0, data)
            .lump(LumpType::TexDataStringTable, &table)
    }

    pub fn build(&self) -> Vec<u8> {
        let mut header = BSPHeader {
            ident: BSP_IDENT,
            version: self.version,
            ..Default::default()
        };
        let mut body = Vec::new();

        for (i, lump) in self.lumps.iter().enumerate() {
            let Some((version, bytes)) = lump else {
                continue;
            };
            header.lumps[i] = BSPLump {
                file_ofs: (BSPHeader::SIZE + body.len()) as i32,
                file_len: bytes.len() as i32,
                version: *version,
                four_cc: [0; 4],
            };
            body.extend_from_slice(bytes);
            // lumps start on 4 byte boundaries
            while body.len() % 4 != 0 {
                body.push(0);
            }
        }

        let mut file = bytemuck::bytes_of(&header).to_vec();
        file.extend(body);
        file
    }
}
