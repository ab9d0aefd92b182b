use std::path::{Path, PathBuf};

use crate::shared::constants::{
    FACES_DIR_NAME, NAME_INDEX_FILE_NAME, OUT_DIR_NAME, VIDEO_DIR_NAME,
};

/// On-disk locations rooted at a single data directory.
///
/// ```text
/// <root>/names.json          name index
/// <root>/faces/<identity>/   numbered encoding files
/// <root>/video/              input videos
/// <root>/out/                detection snapshots
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataLayout {
    root: PathBuf,
}

impl DataLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn faces_dir(&self) -> PathBuf {
        self.root.join(FACES_DIR_NAME)
    }

    pub fn name_index_file(&self) -> PathBuf {
        self.root.join(NAME_INDEX_FILE_NAME)
    }

    pub fn video_dir(&self) -> PathBuf {
        self.root.join(VIDEO_DIR_NAME)
    }

    pub fn out_dir(&self) -> PathBuf {
        self.root.join(OUT_DIR_NAME)
    }

    /// Resolves a video name from settings against the video directory.
    /// Absolute paths are returned unchanged.
    pub fn video_path(&self, video_name: &str) -> PathBuf {
        let path = Path::new(video_name);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.video_dir().join(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_are_rooted() {
        let layout = DataLayout::new("/srv/data");
        assert_eq!(layout.faces_dir(), PathBuf::from("/srv/data/faces"));
        assert_eq!(layout.name_index_file(), PathBuf::from("/srv/data/names.json"));
        assert_eq!(layout.out_dir(), PathBuf::from("/srv/data/out"));
    }

    #[test]
    fn test_video_path_relative_and_absolute() {
        let layout = DataLayout::new("data");
        assert_eq!(layout.video_path("a.mp4"), PathBuf::from("data/video/a.mp4"));
        assert_eq!(layout.video_path("/tmp/b.mp4"), PathBuf::from("/tmp/b.mp4"));
    }
}
