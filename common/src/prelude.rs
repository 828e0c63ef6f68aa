pub use crate::scene::{
    BrushEntityRequest, EntityData, LightKind, LightRequest, MaterialRequest, MeshRequest,
    PlaceholderRequest, SceneRecorder, SceneSink, TextureBinding,
};
pub use crate::texture::{load_texture, DecodedImage, RawImage, RawPixels, TextureDecoder, TextureError};
pub use crate::vfile::{AssetSource, VFile, VFileSystem};
