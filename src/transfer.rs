/// Copy and move primitives used to place files in the target directory.
///
/// Copies carry the source's permissions and timestamps over to the
/// destination. Moves prefer a rename and fall back to copy-then-delete when
/// source and destination live on different filesystems. An existing
/// destination is always overwritten, unless it is the source file itself.
use std::fs::{self, File, FileTimes};
use std::io;
use std::path::Path;

/// Whether files are copied or moved into the target directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TransferMode {
    /// Leave the source file in place.
    #[default]
    Copy,
    /// Remove the source file once it has been placed.
    Move,
}

impl TransferMode {
    /// Maps the command-line `--move` flag to a mode.
    pub fn from_move_flag(move_files: bool) -> Self {
        if move_files {
            TransferMode::Move
        } else {
            TransferMode::Copy
        }
    }

    /// Returns the imperative verb, e.g. "copy".
    pub fn verb(&self) -> &'static str {
        match self {
            TransferMode::Copy => "copy",
            TransferMode::Move => "move",
        }
    }

    /// Returns the past tense used in progress messages, e.g. "Copied".
    pub fn past_tense(&self) -> &'static str {
        match self {
            TransferMode::Copy => "Copied",
            TransferMode::Move => "Moved",
        }
    }

    /// Transfers `source` to `destination` according to this mode.
    pub fn apply(&self, source: &Path, destination: &Path) -> io::Result<()> {
        match self {
            TransferMode::Copy => copy_with_metadata(source, destination).map(|_| ()),
            TransferMode::Move => move_file(source, destination),
        }
    }
}

/// Copies a file together with its permissions and access/modification times.
///
/// Returns the number of bytes copied. Copying a file onto itself is refused,
/// since `fs::copy` would truncate it before reading.
pub fn copy_with_metadata(source: &Path, destination: &Path) -> io::Result<u64> {
    if is_same_file(source, destination) {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!(
                "{} and {} are the same file",
                source.display(),
                destination.display()
            ),
        ));
    }

    let bytes = fs::copy(source, destination)?;

    let metadata = fs::metadata(source)?;
    let mut times = FileTimes::new().set_modified(metadata.modified()?);
    if let Ok(accessed) = metadata.accessed() {
        times = times.set_accessed(accessed);
    }
    open_for_times(destination)?.set_times(times)?;

    Ok(bytes)
}

/// Moves a file, falling back to copy and delete across filesystems.
pub fn move_file(source: &Path, destination: &Path) -> io::Result<()> {
    match fs::rename(source, destination) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            copy_with_metadata(source, destination)?;
            fs::remove_file(source)
        }
        Err(e) => Err(e),
    }
}

/// True when both paths name the same existing file, hard links included.
#[cfg(unix)]
fn is_same_file(a: &Path, b: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;

    match (fs::metadata(a), fs::metadata(b)) {
        (Ok(a), Ok(b)) => a.dev() == b.dev() && a.ino() == b.ino(),
        _ => false,
    }
}

#[cfg(not(unix))]
fn is_same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

// The destination may have inherited read-only permissions from the source,
// so it is not reopened for writing.
#[cfg(not(windows))]
fn open_for_times(path: &Path) -> io::Result<File> {
    File::open(path)
}

#[cfg(windows)]
fn open_for_times(path: &Path) -> io::Result<File> {
    use std::os::windows::fs::OpenOptionsExt;

    const FILE_WRITE_ATTRIBUTES: u32 = 0x0100;
    File::options()
        .access_mode(FILE_WRITE_ATTRIBUTES)
        .open(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    fn backdate(path: &Path, seconds: u64) -> SystemTime {
        let when = SystemTime::UNIX_EPOCH + Duration::from_secs(seconds);
        let file = File::options()
            .write(true)
            .open(path)
            .expect("Failed to open file");
        file.set_modified(when).expect("Failed to set mtime");
        when
    }

    #[test]
    fn test_copy_preserves_content_and_mtime() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let source = temp_dir.path().join("a.txt");
        let destination = temp_dir.path().join("file_01.txt");
        fs::write(&source, "hello").unwrap();
        let modified = backdate(&source, 1_600_000_000);

        let bytes = copy_with_metadata(&source, &destination).expect("copy failed");

        assert_eq!(bytes, 5);
        assert!(source.exists());
        assert_eq!(fs::read_to_string(&destination).unwrap(), "hello");
        assert_eq!(
            fs::metadata(&destination).unwrap().modified().unwrap(),
            modified
        );
    }

    #[test]
    fn test_copy_overwrites_existing_destination() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let source = temp_dir.path().join("new.txt");
        let destination = temp_dir.path().join("old.txt");
        fs::write(&source, "new").unwrap();
        fs::write(&destination, "old contents").unwrap();

        TransferMode::Copy.apply(&source, &destination).unwrap();

        assert_eq!(fs::read_to_string(&destination).unwrap(), "new");
    }

    #[test]
    fn test_copy_onto_itself_is_refused() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let source = temp_dir.path().join("file_01.txt");
        fs::write(&source, "precious").unwrap();
        let same = temp_dir.path().join(".").join("file_01.txt");

        let err = TransferMode::Copy
            .apply(&source, &same)
            .expect_err("copying a file onto itself should fail");

        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert_eq!(fs::read_to_string(&source).unwrap(), "precious");
    }

    #[cfg(unix)]
    #[test]
    fn test_copy_onto_hard_link_is_refused() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let source = temp_dir.path().join("a.txt");
        let link = temp_dir.path().join("b.txt");
        fs::write(&source, "linked").unwrap();
        fs::hard_link(&source, &link).unwrap();

        assert!(copy_with_metadata(&source, &link).is_err());
        assert_eq!(fs::read_to_string(&link).unwrap(), "linked");
    }

    #[test]
    fn test_move_removes_source() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let source = temp_dir.path().join("b.png");
        let destination = temp_dir.path().join("img_01.png");
        fs::write(&source, "png").unwrap();

        TransferMode::Move.apply(&source, &destination).unwrap();

        assert!(!source.exists());
        assert_eq!(fs::read_to_string(&destination).unwrap(), "png");
    }

    #[test]
    fn test_missing_source_is_an_error() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let source = temp_dir.path().join("missing.txt");
        let destination = temp_dir.path().join("out.txt");

        assert!(TransferMode::Copy.apply(&source, &destination).is_err());
        assert!(TransferMode::Move.apply(&source, &destination).is_err());
        assert!(!destination.exists());
    }

    #[test]
    fn test_mode_from_move_flag() {
        assert_eq!(TransferMode::from_move_flag(true), TransferMode::Move);
        assert_eq!(TransferMode::from_move_flag(false), TransferMode::Copy);
        assert_eq!(TransferMode::default(), TransferMode::Copy);
        assert_eq!(TransferMode::Move.past_tense(), "Moved");
    }
}
