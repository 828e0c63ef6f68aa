pub mod prelude;
pub mod scene;
pub mod texture;
pub mod vfile;
