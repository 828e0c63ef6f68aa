pub mod binaries;
pub mod bsp;
pub mod game_data;
pub mod import;
pub mod light;
pub mod material;
pub mod meshes;
pub mod prelude;
pub mod vmt;
