pub const PROJECT_NAME: &str = "Face Finder";

pub const BLAZEFACE_MODEL_NAME: &str = "blazeface_short_range.onnx";

pub const EMBEDDING_MODEL_NAME: &str = "w600k_r50.onnx";
pub const EMBEDDING_MODEL_URL: &str =
    "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/w600k_r50.onnx";

/// Default data directory, relative to the working directory.
pub const DEFAULT_DATA_DIR: &str = "data";
pub const FACES_DIR_NAME: &str = "faces";
pub const VIDEO_DIR_NAME: &str = "video";
pub const OUT_DIR_NAME: &str = "out";
pub const NAME_INDEX_FILE_NAME: &str = "names.json";
pub const DEFAULT_SETTINGS_FILE: &str = "settings.json";

/// Extension of per-encoding files inside an identity directory.
pub const ENCODING_FILE_EXT: &str = "bin";
pub const SNAPSHOT_FILE_EXT: &str = "png";

pub const DETECTION_COLOR: [u8; 3] = [0, 255, 0];
pub const DETECTION_RECT_THICKNESS: u32 = 2;
pub const DETECTION_LABEL_SCALE: u32 = 2;
/// Pixels between a face box and its label.
pub const DETECTION_LABEL_GAP: i32 = 4;
