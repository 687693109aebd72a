use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};

pub fn is_image_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| {
        let ext = ext.to_string_lossy().to_lowercase();
        matches!(
            ext.as_str(),
            "jpg" | "jpeg" | "png" | "bmp" | "gif" | "webp" | "tiff" | "tif"
        )
    })
}

/// Image files of `dir`, sorted by file name so replay order is stable.
///
/// I/O errors keep their kind so callers can tell a denied directory from a
/// missing one.
pub fn collect_images_from_dir(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(AppError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("not a directory: {:?}", dir),
        )));
    }

    let mut image_paths = vec![];
    for entry in std::fs::read_dir(dir)? {
        if let Ok(entry) = entry {
            let path = entry.path();
            if path.is_file() && is_image_file(&path) {
                image_paths.push(path);
            }
        }
    }
    image_paths.sort();
    Ok(image_paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_is_image_file() {
        assert!(is_image_file(Path::new("a/b/frame.JPG")));
        assert!(is_image_file(Path::new("frame.webp")));
        assert!(!is_image_file(Path::new("notes.txt")));
        assert!(!is_image_file(Path::new("no_extension")));
    }

    #[test]
    fn test_collect_images_sorted_and_filtered() {
        let temp_dir = TempDir::new().unwrap();
        for name in ["b.png", "a.jpg", "c.txt"] {
            std::fs::write(temp_dir.path().join(name), b"x").unwrap();
        }
        let paths = collect_images_from_dir(temp_dir.path()).unwrap();
        let names: Vec<_> = paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.jpg", "b.png"]);
    }

    #[test]
    fn test_collect_images_missing_dir() {
        let err = collect_images_from_dir(Path::new("/nonexistent/frames")).unwrap_err();
        match err {
            AppError::Io(e) => assert_eq!(e.kind(), std::io::ErrorKind::NotFound),
            other => panic!("unexpected error: {other}"),
        }
    }
}
