use std::{
    fs,
    path::{Path, PathBuf},
    time::Instant,
};

use ini::Ini;
use thiserror::Error;

pub use common::vfile::AssetSource;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Ini(#[from] ini::Error),
    #[error("bad [{section}] {key} value {value:?}")]
    BadValue {
        section: &'static str,
        key: &'static str,
        value: String,
    },
}

/// How maps are imported, from the `[import]` section of `conf.ini`.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportSettings {
    /// World units to scene units
    pub scale: f32,
    /// Files larger than this are refused before they are read
    pub max_file_size: u64,
    /// Decode lumps on the rayon pool
    pub parallel: bool,
    pub materials: bool,
}

impl ImportSettings {
    pub const DEFAULT_SCALE: f32 = 0.0133;
    pub const DEFAULT_MAX_FILE_SIZE: u64 = 512 * 1024 * 1024;

    pub fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let mut settings = Self::default();
        let Some(import) = ini.section(Some("import")) else {
            return Ok(settings);
        };

        if let Some(value) = import.get("scale") {
            settings.scale = parse_value("scale", value)?;
        }
        if let Some(value) = import.get("max_file_size") {
            settings.max_file_size = parse_value("max_file_size", value)?;
        }
        if let Some(value) = import.get("parallel") {
            settings.parallel = parse_bool("parallel", value)?;
        }
        if let Some(value) = import.get("materials") {
            settings.materials = parse_bool("materials", value)?;
        }
        Ok(settings)
    }
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            scale: Self::DEFAULT_SCALE,
            max_file_size: Self::DEFAULT_MAX_FILE_SIZE,
            parallel: true,
            materials: true,
        }
    }
}

fn parse_value<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::BadValue {
        section: "import",
        key,
        value: value.to_owned(),
    })
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(ConfigError::BadValue {
            section: "import",
            key,
            value: value.to_owned(),
        }),
    }
}

/// A game install: a root directory and the content directories searched under it, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct GameData {
    root: PathBuf,
    search: Vec<PathBuf>,
}

impl GameData {
    pub fn new(root: impl Into<PathBuf>, search: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self {
            root: root.into(),
            search: search.into_iter().map(Into::into).collect(),
        }
    }

    /// The `[game]` section, or `None` when there is none.
    pub fn from_ini(ini: &Ini) -> Option<Self> {
        let game = ini.section(Some("game"))?;
        let root = game.get("root")?;

        let mut search: Vec<&str> = game.get_all("search").collect();
        if search.is_empty() {
            search.push(".");
        }
        log::info!("Game root {root}, searching {search:?}");

        Some(Self::new(root, search))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn search_paths(&self) -> impl Iterator<Item = PathBuf> + '_ {
        self.search.iter().map(|dir| self.root.join(dir))
    }

    /// First existing file for `relative` under the search paths. Tries the lower-cased path
    /// too, as game content is not always cased consistently.
    pub fn find(&self, relative: &str) -> Option<PathBuf> {
        let relative = relative.replace('\\', "/");
        let lower = relative.to_ascii_lowercase();
        self.search_paths().find_map(|dir| {
            [&relative, &lower]
                .into_iter()
                .map(|rel| dir.join(rel))
                .find(|path| path.is_file())
        })
    }
}

impl AssetSource for GameData {
    fn read_asset(&self, path: &str) -> Option<Vec<u8>> {
        let file = self.find(path)?;
        match fs::read(&file) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                log::warn!("Failed to read {}: {e}", file.display());
                None
            }
        }
    }
}

/// Relative path of a material file.
pub fn material_path(name: &str) -> String {
    format!("materials/{}.vmt", name.replace('\\', "/"))
}

/// Relative path of a texture file.
pub fn texture_path(name: &str) -> String {
    format!("materials/{}.vtf", name.replace('\\', "/"))
}

/// Everything `conf.ini` configures.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub import: ImportSettings,
    pub game: Option<GameData>,
}

impl Config {
    pub fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        Ok(Self {
            import: ImportSettings::from_ini(ini)?,
            game: GameData::from_ini(ini),
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let now = Instant::now();
        let ini = Ini::load_from_file(path.as_ref())?;
        let config = Self::from_ini(&ini)?;
        log::debug!("Loaded {} in {:?}", path.as_ref().display(), now.elapsed());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_sections() {
        let ini = Ini::load_from_str("").unwrap();
        let config = Config::from_ini(&ini).unwrap();
        assert_eq!(config.import, ImportSettings::default());
        assert_eq!(config.import.scale, 0.0133);
        assert_eq!(config.import.max_file_size, 536870912);
        assert!(config.game.is_none());
    }

    #[test]
    fn reads_sections() {
        let ini = Ini::load_from_str(
            "[import]\nscale = 0.025\nparallel = false\nmaterials = no\n\
             [game]\nroot = /games/hl2\nsearch = hl2\nsearch = platform\n",
        )
        .unwrap();
        let config = Config::from_ini(&ini).unwrap();

        assert_eq!(config.import.scale, 0.025);
        assert!(!config.import.parallel);
        assert!(!config.import.materials);
        assert_eq!(config.import.max_file_size, ImportSettings::DEFAULT_MAX_FILE_SIZE);

        let game = config.game.unwrap();
        assert_eq!(
            game.search_paths().collect::<Vec<_>>(),
            vec![PathBuf::from("/games/hl2/hl2"), PathBuf::from("/games/hl2/platform")]
        );
    }

    #[test]
    fn bad_values() {
        let ini = Ini::load_from_str("[import]\nscale = big\n").unwrap();
        assert!(matches!(
            ImportSettings::from_ini(&ini),
            Err(ConfigError::BadValue { key: "scale", .. })
        ));
        let ini = Ini::load_from_str("[import]\nparallel = maybe\n").unwrap();
        assert!(ImportSettings::from_ini(&ini).is_err());
    }

    #[test]
    fn finds_assets_in_search_order() {
        let root = std::env::temp_dir().join(format!("game_data_{}", std::process::id()));
        for (dir, contents) in [("mod", "mod"), ("base", "base")] {
            let materials = root.join(dir).join("materials/brick");
            fs::create_dir_all(&materials).unwrap();
            fs::write(materials.join("brick01.vmt"), contents).unwrap();
        }
        fs::write(root.join("base/materials/brick/only_base.vmt"), "base").unwrap();

        let game = GameData::new(&root, ["mod", "base"]);
        assert_eq!(game.read_asset(&material_path("brick/brick01")), Some(b"mod".to_vec()));
        assert_eq!(game.read_asset(&material_path("Brick\\Only_Base")), Some(b"base".to_vec()));
        assert_eq!(game.read_asset(&material_path("brick/missing")), None);

        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn asset_paths() {
        assert_eq!(material_path("brick\\brick01"), "materials/brick/brick01.vmt");
        assert_eq!(texture_path("dev/white"), "materials/dev/white.vtf");
    }
}
