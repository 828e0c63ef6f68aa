use std::{
    collections::HashMap,
    io::{BufReader, Cursor},
    path::Path,
    sync::Arc,
};

/// Anything that can hand out game asset bytes by their relative path,
/// e.g. `materials/brick/brick01.vmt`.
pub trait AssetSource {
    fn read_asset(&self, path: &str) -> Option<Vec<u8>>;
}

#[derive(Default, Clone)]
pub struct VFile {
    pub data: Vec<u8>,
}

/// In-memory file system. Paths are matched case-insensitively with either slash.
#[derive(Default, Clone)]
pub struct VFileSystem {
    pub files: Arc<HashMap<String, VFile>>,
}

pub fn normalize_path(path: &str) -> String {
    path.replace('\\', "/").to_ascii_lowercase()
}

impl VFileSystem {
    pub fn from_files<P: AsRef<str>>(files: impl IntoIterator<Item = (P, Vec<u8>)>) -> Self {
        Self {
            files: Arc::new(
                files
                    .into_iter()
                    .map(|(path, data)| (normalize_path(path.as_ref()), VFile { data }))
                    .collect(),
            ),
        }
    }

    pub fn get(&self, path: &Path) -> Option<BufReader<Cursor<&[u8]>>> {
        self.get_str(&path.to_string_lossy())
    }

    pub fn get_str(&self, path: &str) -> Option<BufReader<Cursor<&[u8]>>> {
        match self.files.get(&normalize_path(path)) {
            Some(file) => {
                let c = Cursor::new(&file.data[..]);

                Some(BufReader::new(c))
            }
            None => {
                log::debug!("{:?} file not found", path);
                None
            }
        }
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl AssetSource for VFileSystem {
    fn read_asset(&self, path: &str) -> Option<Vec<u8>> {
        self.files
            .get(&normalize_path(path))
            .map(|file| file.data.clone())
    }
}
