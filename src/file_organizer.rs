/// Sequential renaming of files into a target directory.
///
/// Files found under a source directory are grouped by lowercased extension.
/// Each group is sorted by full path and numbered from 1, and every file is
/// copied or moved into the target directory under a name rendered from the
/// group's naming pattern plus the file's original extension.
use crate::config::CompiledFilters;
use crate::naming_pattern::{NamingPattern, PatternError};
use crate::transfer::TransferMode;
use std::collections::{BTreeMap, HashMap};
use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::{Path, PathBuf};

/// Pattern used for extensions without a registered pattern.
pub const DEFAULT_PATTERN: &str = "file_{:02d}";

/// Discovered files keyed by lowercased extension ("" for none).
pub type FileGroups = BTreeMap<String, Vec<PathBuf>>;

/// Number of files organized per extension.
pub type ExtensionCounts = BTreeMap<String, usize>;

/// Errors that can occur during file organization operations.
#[derive(Debug)]
pub enum OrganizeError {
    /// Failed to create the target directory.
    DirectoryCreationFailed {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The source directory does not exist.
    SourceNotFound { path: PathBuf },
    /// Failed to list a directory during discovery.
    DirectoryReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },
    /// A naming pattern could not be parsed.
    InvalidPattern {
        pattern: String,
        reason: PatternError,
    },
    /// Failed to copy or move a file to its destination.
    TransferFailed {
        mode: TransferMode,
        source: PathBuf,
        destination: PathBuf,
        source_error: std::io::Error,
    },
}

impl std::fmt::Display for OrganizeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DirectoryCreationFailed { path, source } => {
                write!(
                    f,
                    "Failed to create directory {}: {}",
                    path.display(),
                    source
                )
            }
            Self::SourceNotFound { path } => {
                write!(f, "Folder {} does not exist", path.display())
            }
            Self::DirectoryReadFailed { path, source } => {
                write!(f, "Failed to read directory {}: {}", path.display(), source)
            }
            Self::InvalidPattern { pattern, reason } => {
                write!(f, "Invalid naming pattern '{}': {}", pattern, reason)
            }
            Self::TransferFailed {
                mode,
                source,
                destination,
                source_error,
            } => {
                write!(
                    f,
                    "Failed to {} {} to {}: {}",
                    mode.verb(),
                    source.display(),
                    destination.display(),
                    source_error
                )
            }
        }
    }
}

impl std::error::Error for OrganizeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::DirectoryCreationFailed { source, .. }
            | Self::DirectoryReadFailed { source, .. } => Some(source),
            Self::TransferFailed { source_error, .. } => Some(source_error),
            Self::InvalidPattern { reason, .. } => Some(reason),
            Self::SourceNotFound { .. } => None,
        }
    }
}

/// Result type for file organization operations.
pub type OrganizeResult<T> = Result<T, OrganizeError>;

/// A single planned copy or move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    /// The file being organized.
    pub source: PathBuf,
    /// Where it ends up inside the target directory.
    pub destination: PathBuf,
    /// The extension group the file belongs to.
    pub extension: String,
    /// 1-based position of the file within its group.
    pub sequence: usize,
}

/// A file that could not be organized, and why.
#[derive(Debug)]
pub struct FileFailure {
    pub path: PathBuf,
    pub error: OrganizeError,
}

/// Every transfer an organize run will attempt, in execution order.
#[derive(Debug, Default)]
pub struct Plan {
    pub transfers: Vec<Transfer>,
    /// Files whose destination name could not be rendered.
    pub failures: Vec<FileFailure>,
}

impl Plan {
    /// Number of discovered files, including those that already failed.
    pub fn file_count(&self) -> usize {
        self.transfers.len() + self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.file_count() == 0
    }
}

/// Outcome of an organize run.
#[derive(Debug, Default)]
pub struct OrganizeReport {
    /// Successfully organized files per extension.
    pub counts: ExtensionCounts,
    /// Transfers that completed.
    pub completed: Vec<Transfer>,
    /// Files that were skipped because of an error.
    pub failures: Vec<FileFailure>,
}

impl OrganizeReport {
    /// Total number of files organized across all extensions.
    pub fn total_organized(&self) -> usize {
        self.counts.values().sum()
    }

    /// Returns true if no file failed.
    pub fn is_complete_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Strips leading dots and lowercases an extension, so `".JPG"` becomes `"jpg"`.
pub fn normalize_extension(extension: &str) -> String {
    extension.trim_start_matches('.').to_lowercase()
}

/// The extension carried over to the destination name, if any.
///
/// Dotfiles such as `.bashrc` and names ending in a dot have none.
fn file_extension(path: &Path) -> Option<&OsStr> {
    path.extension().filter(|ext| !ext.is_empty())
}

/// The group key of a file: its lowercased extension, or `""` when it has none.
pub fn extension_key(path: &Path) -> String {
    file_extension(path)
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

fn destination_name(pattern: &NamingPattern, sequence: usize, source: &Path) -> OsString {
    let mut name = OsString::from(pattern.render(sequence));
    if let Some(ext) = file_extension(source) {
        name.push(".");
        name.push(ext);
    }
    name
}

/// Renames files into a target directory, numbering them per extension.
///
/// # Examples
///
/// ```no_run
/// use smartfile::file_organizer::Organizer;
/// use std::path::Path;
///
/// let mut organizer = Organizer::new("renamed_files").expect("target directory");
/// organizer.set_naming_pattern("jpg", "image_{:02d}");
/// organizer.set_naming_pattern(".TXT", "ann_{:02d}");
///
/// let counts = organizer.organize(Path::new("source_folder"), false, false);
/// for (extension, count) in &counts {
///     println!("{}: {} files", extension, count);
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Organizer {
    target: PathBuf,
    naming_patterns: HashMap<String, String>,
    default_pattern: String,
    filters: CompiledFilters,
}

impl Organizer {
    /// Creates an organizer for `target`, creating the directory and any
    /// missing parents.
    ///
    /// # Errors
    ///
    /// Returns `OrganizeError::DirectoryCreationFailed` if the directory cannot
    /// be created, for example because a file already occupies the path.
    pub fn new(target: impl Into<PathBuf>) -> OrganizeResult<Self> {
        let target = target.into();
        fs::create_dir_all(&target).map_err(|e| OrganizeError::DirectoryCreationFailed {
            path: target.clone(),
            source: e,
        })?;
        Ok(Self::preview(target))
    }

    /// Creates an organizer without touching the filesystem.
    ///
    /// Planning works as usual; executing transfers will fail if the target
    /// directory does not exist.
    pub fn preview(target: impl Into<PathBuf>) -> Self {
        Self {
            target: target.into(),
            naming_patterns: HashMap::new(),
            default_pattern: DEFAULT_PATTERN.to_string(),
            filters: CompiledFilters::default(),
        }
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Registers or replaces the pattern for an extension.
    ///
    /// The extension may be given with or without a leading dot and in any
    /// case. The pattern is not validated until it is used.
    pub fn set_naming_pattern(&mut self, extension: &str, pattern: impl Into<String>) {
        self.naming_patterns
            .insert(normalize_extension(extension), pattern.into());
    }

    /// Replaces the pattern used for extensions without their own.
    pub fn set_default_pattern(&mut self, pattern: impl Into<String>) {
        self.default_pattern = pattern.into();
    }

    /// Restricts which files discovery picks up.
    pub fn set_filters(&mut self, filters: CompiledFilters) {
        self.filters = filters;
    }

    pub fn default_pattern(&self) -> &str {
        &self.default_pattern
    }

    /// The pattern template that applies to a normalized extension.
    pub fn pattern_for(&self, extension: &str) -> &str {
        self.naming_patterns
            .get(extension)
            .map(String::as_str)
            .unwrap_or(&self.default_pattern)
    }

    /// Finds regular files under `source_root`, grouped by extension.
    ///
    /// Without `recursive` only direct children are considered. Symlinks and
    /// special files are skipped and never followed. With `recursive`, a
    /// subdirectory that cannot be listed is logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns `OrganizeError::DirectoryReadFailed` if `source_root` itself
    /// cannot be listed.
    pub fn discover(&self, source_root: &Path, recursive: bool) -> OrganizeResult<FileGroups> {
        let mut groups = FileGroups::new();
        self.collect_files(source_root, source_root, recursive, &mut groups)?;
        Ok(groups)
    }

    fn collect_files(
        &self,
        source_root: &Path,
        dir: &Path,
        recursive: bool,
        groups: &mut FileGroups,
    ) -> OrganizeResult<()> {
        let entries = fs::read_dir(dir).map_err(|e| OrganizeError::DirectoryReadFailed {
            path: dir.to_path_buf(),
            source: e,
        })?;

        let mut subdirectories = Vec::new();
        for entry in entries.flatten() {
            let Ok(file_type) = entry.file_type() else {
                continue;
            };
            let path = entry.path();

            if file_type.is_file() {
                let relative = path.strip_prefix(source_root).unwrap_or(&path);
                if self.filters.should_include(relative) {
                    groups.entry(extension_key(&path)).or_default().push(path);
                }
            } else if recursive && file_type.is_dir() {
                subdirectories.push(path);
            }
        }

        for subdirectory in subdirectories {
            if let Err(e) = self.collect_files(source_root, &subdirectory, recursive, groups) {
                tracing::warn!("Skipping {}: {}", subdirectory.display(), e);
            }
        }

        Ok(())
    }

    /// Works out the destination of every file under `source_root`.
    ///
    /// Each extension group is sorted by full path and numbered from 1. When a
    /// group's pattern does not parse, all of its files are recorded as
    /// failures instead.
    ///
    /// # Errors
    ///
    /// Returns `OrganizeError::SourceNotFound` if `source_root` does not exist,
    /// or `OrganizeError::DirectoryReadFailed` if it cannot be listed.
    pub fn plan(&self, source_root: &Path, recursive: bool) -> OrganizeResult<Plan> {
        if !source_root.exists() {
            return Err(OrganizeError::SourceNotFound {
                path: source_root.to_path_buf(),
            });
        }

        let mut plan = Plan::default();
        for (extension, mut files) in self.discover(source_root, recursive)? {
            files.sort_by(|a, b| a.as_os_str().cmp(b.as_os_str()));

            let template = self.pattern_for(&extension);
            let pattern = match NamingPattern::parse(template) {
                Ok(pattern) => pattern,
                Err(reason) => {
                    tracing::warn!(
                        "Pattern '{}' for extension '{}' is invalid: {}",
                        template,
                        extension,
                        reason
                    );
                    plan.failures.extend(files.into_iter().map(|path| FileFailure {
                        path,
                        error: OrganizeError::InvalidPattern {
                            pattern: template.to_string(),
                            reason: reason.clone(),
                        },
                    }));
                    continue;
                }
            };

            for (index, source) in files.into_iter().enumerate() {
                let sequence = index + 1;
                let destination = self
                    .target
                    .join(destination_name(&pattern, sequence, &source));
                plan.transfers.push(Transfer {
                    source,
                    destination,
                    extension: extension.clone(),
                    sequence,
                });
            }
        }

        Ok(plan)
    }

    /// Performs every transfer of `plan`.
    ///
    /// `on_progress` is called after each transfer with the error, if any. A
    /// failed transfer is recorded in the report and never stops the batch.
    pub fn execute<F>(&self, plan: Plan, mode: TransferMode, mut on_progress: F) -> OrganizeReport
    where
        F: FnMut(&Transfer, Option<&OrganizeError>),
    {
        let mut report = OrganizeReport {
            failures: plan.failures,
            ..Default::default()
        };

        for transfer in plan.transfers {
            match mode.apply(&transfer.source, &transfer.destination) {
                Ok(()) => {
                    tracing::debug!(
                        "{} {} to {}",
                        mode.past_tense(),
                        transfer.source.display(),
                        transfer.destination.display()
                    );
                    on_progress(&transfer, None);
                    *report.counts.entry(transfer.extension.clone()).or_insert(0) += 1;
                    report.completed.push(transfer);
                }
                Err(e) => {
                    let error = OrganizeError::TransferFailed {
                        mode,
                        source: transfer.source.clone(),
                        destination: transfer.destination.clone(),
                        source_error: e,
                    };
                    tracing::warn!("Error organizing file {}: {}", transfer.source.display(), error);
                    on_progress(&transfer, Some(&error));
                    report.failures.push(FileFailure {
                        path: transfer.source,
                        error,
                    });
                }
            }
        }

        report
    }

    /// Plans and executes a full run, returning the detailed report.
    ///
    /// A missing or unreadable source directory is logged and produces an
    /// empty report without writing anything to the target.
    pub fn organize_with_report(
        &self,
        source_root: &Path,
        recursive: bool,
        mode: TransferMode,
    ) -> OrganizeReport {
        match self.plan(source_root, recursive) {
            Ok(plan) => {
                tracing::info!(
                    "Organizing {} files from {} into {}",
                    plan.file_count(),
                    source_root.display(),
                    self.target.display()
                );
                self.execute(plan, mode, |_, _| {})
            }
            Err(e) => {
                tracing::error!("Error: {}", e);
                OrganizeReport::default()
            }
        }
    }

    /// Copies (or, with `move_files`, moves) every file under `source_root`
    /// into the target directory and returns the per-extension counts.
    ///
    /// Files that fail are reported and left out of the counts.
    pub fn organize(&self, source_root: &Path, recursive: bool, move_files: bool) -> ExtensionCounts {
        self.organize_with_report(source_root, recursive, TransferMode::from_move_flag(move_files))
            .counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(base: &Path, rel: &str) -> PathBuf {
        let path = base.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        fs::write(&path, rel).expect("Failed to write test file");
        path
    }

    #[test]
    fn test_new_creates_nested_target() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let target = temp_dir.path().join("a/b/c");

        let organizer = Organizer::new(&target).expect("Failed to create organizer");

        assert!(target.is_dir());
        assert_eq!(organizer.target(), target);
        assert_eq!(organizer.default_pattern(), DEFAULT_PATTERN);
    }

    #[test]
    fn test_new_fails_when_target_is_a_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let target = write(temp_dir.path(), "occupied");

        let result = Organizer::new(&target);
        assert!(matches!(
            result,
            Err(OrganizeError::DirectoryCreationFailed { .. })
        ));
    }

    #[test]
    fn test_set_naming_pattern_normalizes_extension() {
        let mut organizer = Organizer::preview("unused");
        organizer.set_naming_pattern(".JPG", "img_{:02d}");
        organizer.set_naming_pattern("..Txt", "t_{}");

        assert_eq!(organizer.pattern_for("jpg"), "img_{:02d}");
        assert_eq!(organizer.pattern_for("txt"), "t_{}");
        assert_eq!(organizer.pattern_for("png"), DEFAULT_PATTERN);

        organizer.set_naming_pattern("jpg", "photo_{}");
        assert_eq!(organizer.pattern_for("jpg"), "photo_{}");
    }

    #[test]
    fn test_set_default_pattern() {
        let mut organizer = Organizer::preview("unused");
        organizer.set_default_pattern("item-{:03}");
        assert_eq!(organizer.pattern_for("anything"), "item-{:03}");
    }

    #[test]
    fn test_extension_key() {
        assert_eq!(extension_key(Path::new("A.JPG")), "jpg");
        assert_eq!(extension_key(Path::new("archive.tar.gz")), "gz");
        assert_eq!(extension_key(Path::new("README")), "");
        assert_eq!(extension_key(Path::new(".bashrc")), "");
        assert_eq!(extension_key(Path::new("trailing.")), "");
    }

    #[test]
    fn test_discover_non_recursive_skips_subdirectories() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();
        write(root, "a.txt");
        write(root, "B.TXT");
        write(root, "notes");
        write(root, "sub/c.txt");

        let groups = Organizer::preview("unused").discover(root, false).unwrap();

        assert_eq!(groups.len(), 2);
        assert_eq!(groups["txt"].len(), 2);
        assert_eq!(groups[""].len(), 1);
    }

    #[test]
    fn test_discover_recursive_includes_nested_files() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();
        write(root, "x.png");
        write(root, "sub/y.png");
        write(root, "sub/deeper/z.png");
        write(root, "other/w.md");

        let groups = Organizer::preview("unused").discover(root, true).unwrap();

        assert_eq!(groups["png"].len(), 3);
        assert_eq!(groups["md"].len(), 1);
        // current level first
        assert_eq!(groups["png"][0], root.join("x.png"));
    }

    #[test]
    fn test_discover_missing_root_is_an_error() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let result = Organizer::preview("unused").discover(&temp_dir.path().join("nope"), false);
        assert!(matches!(
            result,
            Err(OrganizeError::DirectoryReadFailed { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_discover_skips_symlinks() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path().join("src");
        let real = write(temp_dir.path(), "outside/real.txt");
        fs::create_dir(&root).unwrap();
        std::os::unix::fs::symlink(&real, root.join("link.txt")).unwrap();
        std::os::unix::fs::symlink(real.parent().unwrap(), root.join("linkdir")).unwrap();

        let groups = Organizer::preview("unused").discover(&root, true).unwrap();
        assert!(groups.is_empty());
    }

    #[test]
    fn test_plan_numbers_groups_by_sorted_path() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path().join("src");
        write(&root, "b.txt");
        write(&root, "a.txt");
        write(&root, "c.jpg");

        let mut organizer = Organizer::preview(temp_dir.path().join("out"));
        organizer.set_naming_pattern("jpg", "img_{:02d}");
        let plan = organizer.plan(&root, false).unwrap();

        assert!(plan.failures.is_empty());
        let names: Vec<(PathBuf, PathBuf)> = plan
            .transfers
            .iter()
            .map(|t| (t.source.clone(), t.destination.clone()))
            .collect();
        let out = temp_dir.path().join("out");
        assert_eq!(
            names,
            vec![
                (root.join("c.jpg"), out.join("img_01.jpg")),
                (root.join("a.txt"), out.join("file_01.txt")),
                (root.join("b.txt"), out.join("file_02.txt")),
            ]
        );
    }

    #[test]
    fn test_plan_keeps_original_extension_case() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path().join("src");
        write(&root, "A.JPG");
        write(&root, "b.jpg");
        write(&root, "Makefile");

        let mut organizer = Organizer::preview("out");
        organizer.set_naming_pattern("jpg", "img_{:02d}");
        let plan = organizer.plan(&root, false).unwrap();

        let destinations: Vec<PathBuf> = plan.transfers.iter().map(|t| t.destination.clone()).collect();
        assert!(destinations.contains(&PathBuf::from("out/img_01.JPG")));
        assert!(destinations.contains(&PathBuf::from("out/img_02.jpg")));
        assert!(destinations.contains(&PathBuf::from("out/file_01")));
    }

    #[test]
    fn test_plan_invalid_pattern_fails_only_its_group() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path().join("src");
        write(&root, "a.txt");
        write(&root, "b.txt");
        write(&root, "c.jpg");

        let mut organizer = Organizer::preview("out");
        organizer.set_naming_pattern("txt", "broken_{:02d");
        let plan = organizer.plan(&root, false).unwrap();

        assert_eq!(plan.failures.len(), 2);
        assert_eq!(plan.transfers.len(), 1);
        assert_eq!(plan.file_count(), 3);
        assert!(matches!(
            plan.failures[0].error,
            OrganizeError::InvalidPattern { .. }
        ));
    }

    #[test]
    fn test_plan_missing_source() {
        let result = Organizer::preview("out").plan(Path::new("/definitely/not/here"), true);
        assert!(matches!(result, Err(OrganizeError::SourceNotFound { .. })));
    }

    #[test]
    fn test_execute_continues_after_failure() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path().join("src");
        write(&root, "a.txt");
        write(&root, "b.txt");
        let organizer = Organizer::new(temp_dir.path().join("out")).unwrap();
        let plan = organizer.plan(&root, false).unwrap();

        // Vanishes between planning and execution.
        fs::remove_file(root.join("a.txt")).unwrap();

        let mut seen = Vec::new();
        let report = organizer.execute(plan, TransferMode::Copy, |transfer, error| {
            seen.push((transfer.sequence, error.is_some()));
        });

        assert_eq!(seen, vec![(1, true), (2, false)]);
        assert_eq!(report.counts.get("txt"), Some(&1));
        assert_eq!(report.failures.len(), 1);
        assert!(!report.is_complete_success());
        assert!(temp_dir.path().join("out/file_02.txt").exists());
    }

    #[test]
    fn test_organize_missing_source_returns_empty() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let target = temp_dir.path().join("out");
        let organizer = Organizer::new(&target).unwrap();

        let counts = organizer.organize(&temp_dir.path().join("missing"), false, false);

        assert!(counts.is_empty());
        assert_eq!(fs::read_dir(&target).unwrap().count(), 0);
    }

    #[test]
    fn test_organize_move_counts_and_removes() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path().join("src");
        write(&root, "one.md");
        write(&root, "two.md");
        let organizer = Organizer::new(temp_dir.path().join("out")).unwrap();

        let report = organizer.organize_with_report(&root, false, TransferMode::Move);

        assert_eq!(report.total_organized(), 2);
        assert_eq!(report.completed.len(), 2);
        assert!(!root.join("one.md").exists());
        assert!(!root.join("two.md").exists());
        assert_eq!(
            fs::read_to_string(temp_dir.path().join("out/file_01.md")).unwrap(),
            "one.md"
        );
    }
}
