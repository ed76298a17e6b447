//! Output file renaming.
//!
//! The capture service names its output with whatever extension it guesses
//! (often `.unknown` for custom pipelines). Once a capture succeeds the file
//! is renamed to the extension of the profile that produced it.

use std::path::{Path, PathBuf};

use castmate_common::error::{CastmateError, CastmateResult};

/// `raw` with its extension replaced by `extension`, or with `extension`
/// appended when the file name has none. Directory names are never touched.
pub fn corrected_path(raw: &Path, extension: &str) -> PathBuf {
    raw.with_extension(extension.trim_start_matches('.'))
}

/// Rename the file at `raw` to carry `extension` and return the new path.
///
/// Idempotent: a file that already has the extension is left where it is.
/// `std::fs::rename` replaces the target atomically on the same filesystem.
pub fn correct_output_path(raw: &Path, extension: &str) -> CastmateResult<PathBuf> {
    if raw.file_name().is_none() {
        return Err(CastmateError::capture(format!(
            "Capture output {raw:?} has no file name"
        )));
    }

    let target = corrected_path(raw, extension);
    if target == raw {
        return Ok(target);
    }

    tracing::info!(from = ?raw, to = ?target, "Fixing capture file extension");
    std::fs::rename(raw, &target)?;
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn scratch_dir() -> PathBuf {
        static NEXT: AtomicUsize = AtomicUsize::new(0);
        let dir = std::env::temp_dir().join(format!(
            "castmate-output-{}-{}",
            std::process::id(),
            NEXT.fetch_add(1, Ordering::SeqCst)
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn replaces_unknown_extension() {
        assert_eq!(
            corrected_path(Path::new("/home/u/Videos/Screencast.unknown"), "webm"),
            PathBuf::from("/home/u/Videos/Screencast.webm")
        );
    }

    #[test]
    fn appends_when_missing() {
        assert_eq!(
            corrected_path(Path::new("/tmp/Screencast"), "mp4"),
            PathBuf::from("/tmp/Screencast.mp4")
        );
    }

    #[test]
    fn dots_in_directories_are_ignored() {
        assert_eq!(
            corrected_path(Path::new("/tmp/my.videos/Screencast"), "mp4"),
            PathBuf::from("/tmp/my.videos/Screencast.mp4")
        );
    }

    #[test]
    fn leading_dot_in_extension_is_accepted() {
        assert_eq!(
            corrected_path(Path::new("cast.unknown"), ".mp4"),
            PathBuf::from("cast.mp4")
        );
    }

    #[test]
    fn renames_file_on_disk_once() {
        let dir = scratch_dir();
        let raw = dir.join("Screencast from 2024-05-01.unknown");
        std::fs::write(&raw, b"webm").unwrap();

        let first = correct_output_path(&raw, "webm").unwrap();
        assert_eq!(first, dir.join("Screencast from 2024-05-01.webm"));
        assert!(first.exists());
        assert!(!raw.exists());

        let second = correct_output_path(&first, "webm").unwrap();
        assert_eq!(second, first);
        assert!(second.exists());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = scratch_dir();
        let err = correct_output_path(&dir.join("gone.unknown"), "mp4").unwrap_err();
        assert!(matches!(err, CastmateError::Io(_)));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn path_without_file_name_is_rejected() {
        assert!(correct_output_path(Path::new("/"), "mp4").is_err());
    }

    proptest! {
        #[test]
        fn correction_is_idempotent(
            dir in "(/[a-z.]{1,8}){0,3}",
            stem in "[A-Za-z0-9 _-]{1,12}",
            ext in prop::option::of("[a-z0-9]{1,7}"),
            target in "[a-z0-9]{2,4}",
        ) {
            let name = match ext {
                Some(ext) => format!("{stem}.{ext}"),
                None => stem,
            };
            let raw = PathBuf::from(format!("{dir}/{name}"));
            let once = corrected_path(&raw, &target);
            let twice = corrected_path(&once, &target);
            prop_assert_eq!(&once, &twice);
            prop_assert_eq!(once.extension().and_then(|e| e.to_str()), Some(target.as_str()));
            prop_assert_eq!(once.parent(), raw.parent());
        }
    }
}
