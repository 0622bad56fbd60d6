//! On-disk artifacts and their lifecycle.
//!
//! A download is written to `<destination>.part` and renamed into place only
//! after the last byte is synced, so an existing interim artifact always means
//! a complete (still encrypted) download. The pipeline decides resume purely
//! from which of [`ArtifactPaths`] exist.

mod builder;
mod naming;
mod writer;

use std::path::{Path, PathBuf};

pub use builder::StorageWriterBuilder;
pub use naming::{final_file_name, numbered_file_name, sanitize_file_name};
pub use writer::StorageWriter;

/// Temporary file suffix used before atomic rename.
pub const TEMP_SUFFIX: &str = ".part";

/// Interim artifacts are the encrypted MP4 container as served by the CDN.
pub const INTERIM_EXTENSION: &str = "mp4";

/// Path for the temp file: appends `.part` to the final path (e.g. `abc.mp4` → `abc.mp4.part`).
pub fn temp_path(final_path: &Path) -> PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(TEMP_SUFFIX);
    PathBuf::from(o)
}

/// Where one track's interim and final artifacts live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    /// `<work_dir>/<file_id>.mp4`
    pub interim: PathBuf,
    /// `<output_dir>/<artist line> - <title>.m4a`
    pub final_path: PathBuf,
}

impl ArtifactPaths {
    pub fn new(work_dir: &Path, output_dir: &Path, file_id: &str, artist_line: &str, title: &str) -> Self {
        let interim_name = sanitize_file_name(&format!("{file_id}.{INTERIM_EXTENSION}"));
        Self {
            interim: work_dir.join(interim_name),
            final_path: output_dir.join(final_file_name(artist_line, title)),
        }
    }

    /// Same interim, final name numbered `n` so it cannot clash with an
    /// earlier item of the batch that has the same artist line and title.
    pub fn numbered(&self, artist_line: &str, title: &str, n: usize) -> Self {
        let output_dir = self.final_path.parent().unwrap_or_else(|| Path::new(""));
        Self {
            interim: self.interim.clone(),
            final_path: output_dir.join(numbered_file_name(artist_line, title, n)),
        }
    }

    pub fn interim_exists(&self) -> bool {
        self.interim.is_file()
    }

    pub fn final_exists(&self) -> bool {
        self.final_path.is_file()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn temp_path_appends_part() {
        let p = temp_path(Path::new("abc.mp4"));
        assert_eq!(p.to_string_lossy(), "abc.mp4.part");
        let p2 = temp_path(Path::new("/tmp/work/abc.mp4"));
        assert_eq!(p2.to_string_lossy(), "/tmp/work/abc.mp4.part");
    }

    #[test]
    fn artifact_paths_layout() {
        let paths = ArtifactPaths::new(
            Path::new("/work"),
            Path::new("/music"),
            "f00dfeed",
            "Daft Punk",
            "One More Time",
        );
        assert_eq!(paths.interim, PathBuf::from("/work/f00dfeed.mp4"));
        assert_eq!(paths.final_path, PathBuf::from("/music/Daft Punk - One More Time.m4a"));
    }

    #[test]
    fn numbered_paths_keep_interim() {
        let paths = ArtifactPaths::new(Path::new("/work"), Path::new("/music"), "f2", "A", "Intro");
        let second = paths.numbered("A", "Intro", 2);
        assert_eq!(second.interim, paths.interim);
        assert_eq!(second.final_path, PathBuf::from("/music/A - Intro (2).m4a"));
    }

    #[test]
    fn existence_reflects_the_filesystem() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ArtifactPaths::new(dir.path(), dir.path(), "id1", "A", "T");
        assert!(!paths.interim_exists());
        assert!(!paths.final_exists());
        std::fs::write(&paths.interim, b"enc").unwrap();
        assert!(paths.interim_exists());
        // A leftover .part is not a finished interim artifact.
        std::fs::remove_file(&paths.interim).unwrap();
        std::fs::write(temp_path(&paths.interim), b"half").unwrap();
        assert!(!paths.interim_exists());
    }

    #[test]
    fn sequential_write_then_finalize() {
        let dir = tempfile::tempdir().unwrap();
        let final_path = dir.path().join("sub").join("output.mp4");
        let tp = temp_path(&final_path);

        let writer = StorageWriterBuilder::create(&tp).unwrap().build();
        let mut offset = 0;
        for chunk in [&b"hello "[..], b"streaming ", b"world"] {
            writer.write_at(offset, chunk).unwrap();
            offset += chunk.len() as u64;
        }
        writer.sync().unwrap();
        writer.finalize(&final_path).unwrap();

        assert!(!tp.exists());
        let mut buf = String::new();
        std::fs::File::open(&final_path)
            .unwrap()
            .read_to_string(&mut buf)
            .unwrap();
        assert_eq!(buf, "hello streaming world");
    }

    #[test]
    fn discard_removes_the_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let tp = dir.path().join("x.mp4.part");
        let writer = StorageWriterBuilder::create(&tp).unwrap().build();
        writer.write_at(0, b"partial").unwrap();
        writer.discard();
        assert!(!tp.exists());
    }
}
