//! Mirroring of a source tree into a managed target directory.
//!
//! The target holds three things: `context/` with the persisted scrambler
//! state, `obfuscated/` with the mirrored tree, and a sentinel file marking
//! the directory as ours so that it can be removed safely later.

use fescate_transform::context::ContextStore;
use fescate_transform::{ObfuscationConfig, Obfuscator};
use fescate_utils::errors::{ObfuscateError, WalkError};
use std::fs::{self, File, Metadata};
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

/// Marker file identifying a managed output directory.
pub const SENTINEL: &str = ".fescate-directory";

/// Paths inside a managed target directory.
#[derive(Debug, Clone)]
pub struct Layout {
    pub root: PathBuf,
    pub context: PathBuf,
    pub obfuscated: PathBuf,
}

impl Layout {
    pub fn new(target: &Path) -> Self {
        Self {
            root: target.to_path_buf(),
            context: target.join("context"),
            obfuscated: target.join("obfuscated"),
        }
    }

    /// Create the directories and the sentinel.
    pub fn create(&self) -> Result<(), WalkError> {
        for dir in [&self.root, &self.context, &self.obfuscated] {
            fs::create_dir_all(dir).map_err(|source| WalkError::CreateDir {
                path: dir.clone(),
                source,
            })?;
        }
        let sentinel = self.root.join(SENTINEL);
        if !sentinel.exists() {
            File::create(&sentinel).map_err(|source| WalkError::CreateDir {
                path: sentinel.clone(),
                source,
            })?;
        }
        Ok(())
    }

    pub fn is_managed(target: &Path) -> bool {
        target.join(SENTINEL).is_file()
    }
}

/// Remove a managed directory. A missing directory is not an error; one
/// without the sentinel is refused.
pub fn clean(target: &Path) -> Result<bool, WalkError> {
    if !target.exists() {
        return Ok(false);
    }
    if !Layout::is_managed(target) {
        return Err(WalkError::NotManaged(target.to_path_buf()));
    }
    fs::remove_dir_all(target).map_err(|source| WalkError::Unlink {
        path: target.to_path_buf(),
        source,
    })?;
    info!("removed {}", target.display());
    Ok(true)
}

/// How one candidate file ended up in the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileOutcome {
    Obfuscated,
    /// Not a candidate for obfuscation.
    Copied,
    /// Empty source copied as is.
    Empty,
    /// Obfuscation failed and the source was copied as is.
    Failed,
}

/// What happened to the entries of one mirror run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MirrorStats {
    pub obfuscated: usize,
    pub copied: usize,
    pub linked: usize,
    /// Target already newer than the source.
    pub unchanged: usize,
    /// Obfuscation failed and the file was copied as is.
    pub failed: usize,
}

/// Walks `source` and reproduces it under `target`.
#[derive(Debug)]
pub struct Mirror<'a> {
    config: &'a ObfuscationConfig,
    source: &'a Path,
    target: &'a Path,
}

impl<'a> Mirror<'a> {
    pub fn new(config: &'a ObfuscationConfig, source: &'a Path, target: &'a Path) -> Self {
        Self {
            config,
            source,
            target,
        }
    }

    fn relative<'p>(&self, path: &'p Path) -> &'p Path {
        path.strip_prefix(self.source).unwrap_or(path)
    }

    fn matches(patterns: &[String], relative: &Path) -> bool {
        let text = relative.to_string_lossy();
        patterns.iter().any(|p| !p.is_empty() && text.contains(p.as_str()))
    }

    fn is_skipped(&self, path: &Path) -> bool {
        let relative = self.relative(path);
        let skipped = Self::matches(&self.config.skip, relative);
        if skipped {
            warn!("skipping {}", relative.display());
        }
        skipped
    }

    /// Files that go through the obfuscator rather than being copied.
    fn is_candidate(&self, relative: &Path) -> bool {
        let ext = relative.extension().and_then(|e| e.to_str()).unwrap_or("");
        self.config.obfuscates_extension(ext) && !Self::matches(&self.config.keep, relative)
    }

    fn entries(&self) -> impl Iterator<Item = Result<DirEntry, WalkError>> + '_ {
        let limit = self.config.max_nested_directory;
        WalkDir::new(self.source)
            .follow_links(self.config.follow_symlinks)
            .min_depth(1)
            .max_depth(limit + 1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |e| !self.is_skipped(e.path()))
            .map(move |entry| {
                let entry = entry.map_err(|e| walk_error(e, limit))?;
                if entry.depth() > limit {
                    return Err(WalkError::TooDeep(limit));
                }
                Ok(entry)
            })
    }

    /// Run the Grab Pass over every candidate file. Parse failures are left
    /// for the rewrite phase to report.
    pub fn grab(&self, obfuscator: &mut Obfuscator) -> Result<usize, ObfuscateError> {
        if !self.source.is_dir() {
            return Err(WalkError::DirectoryMissing(self.source.to_path_buf()).into());
        }
        let mut grabbed = 0;
        for entry in self.entries() {
            let entry = entry?;
            if !entry.file_type().is_file() || !self.is_candidate(self.relative(entry.path())) {
                continue;
            }
            let source = match read_source(entry.path()) {
                Ok(source) => source,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    debug!("grab skipped {}: {}", entry.path().display(), e);
                    continue;
                }
            };
            match obfuscator.grab(&source) {
                Ok(n) => grabbed += n,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => debug!("grab skipped {}: {}", entry.path().display(), e),
            }
        }
        Ok(grabbed)
    }

    /// Mirror the tree, obfuscating candidate files.
    pub fn run(&self, obfuscator: &mut Obfuscator) -> Result<MirrorStats, ObfuscateError> {
        if !self.source.is_dir() {
            return Err(WalkError::DirectoryMissing(self.source.to_path_buf()).into());
        }
        let mut stats = MirrorStats::default();
        for entry in self.entries() {
            let entry = entry?;
            let relative = self.relative(entry.path()).to_path_buf();
            let dest = self.target.join(&relative);
            let file_type = entry.file_type();

            if file_type.is_dir() {
                fs::create_dir_all(&dest).map_err(|source| WalkError::CreateDir {
                    path: dest.clone(),
                    source,
                })?;
                continue;
            }
            if file_type.is_symlink() {
                link(entry.path(), &dest)?;
                stats.linked += 1;
                continue;
            }

            let meta = entry.metadata().map_err(|e| walk_error(e, 0))?;
            if is_up_to_date(&meta, &dest) {
                stats.unchanged += 1;
                continue;
            }
            make_room(&dest)?;

            let outcome = if self.is_candidate(&relative) {
                self.obfuscate_file(obfuscator, entry.path(), &dest)?
            } else {
                fs::copy(entry.path(), &dest)?;
                FileOutcome::Copied
            };
            match outcome {
                FileOutcome::Obfuscated => stats.obfuscated += 1,
                FileOutcome::Copied => stats.copied += 1,
                FileOutcome::Empty | FileOutcome::Failed => stats.failed += 1,
            }
            preserve(&meta, &dest, outcome == FileOutcome::Failed)?;
        }
        info!(
            "{:>14} {} obfuscated, {} copied, {} linked, {} unchanged, {} failed",
            "Mirror", stats.obfuscated, stats.copied, stats.linked, stats.unchanged, stats.failed
        );
        Ok(stats)
    }

    /// Full run: restore the contexts in `store`, grab, mirror and save the
    /// contexts again. The contexts are saved even when the mirror stops
    /// early, since files already written use the names handed out so far.
    pub fn run_with_context(
        &self,
        obfuscator: &mut Obfuscator,
        store: &ContextStore,
    ) -> Result<MirrorStats, ObfuscateError> {
        let restored = obfuscator.restore_context(store)?;
        info!("{:>14} {} context file(s)", "Restore", restored);

        let grabbed = self.grab(obfuscator)?;
        obfuscator.resolve_constants();
        info!("{:>14} {} constant(s)", "Grab", grabbed);

        let outcome = self.run(obfuscator);
        let saved = obfuscator.save_context(store);
        if let (Err(e), Err(save)) = (&outcome, &saved) {
            warn!("could not save contexts after failed run ({}): {}", e, save);
        }
        let stats = outcome?;
        saved?;
        Ok(stats)
    }

    /// Obfuscate one file into `dest`, falling back to a plain copy when the
    /// failure is not fatal and the configuration tolerates it.
    fn obfuscate_file(
        &self,
        obfuscator: &mut Obfuscator,
        path: &Path,
        dest: &Path,
    ) -> Result<FileOutcome, ObfuscateError> {
        let outcome = read_source(path).and_then(|source| obfuscator.obfuscate(&source));
        match outcome {
            Ok(result) => {
                debug!(
                    "{}: {} -> {} bytes",
                    path.display(),
                    result.original_size,
                    result.obfuscated_size
                );
                fs::write(dest, result.source)?;
                Ok(FileOutcome::Obfuscated)
            }
            Err(e) if e.is_fatal() => Err(e),
            Err(ObfuscateError::EmptySource(_)) => {
                warn!("{} is empty; copied unchanged", path.display());
                fs::copy(path, dest)?;
                Ok(FileOutcome::Empty)
            }
            Err(e) if self.config.abort_on_error => Err(ObfuscateError::Aborted {
                path: path.to_path_buf(),
                reason: e.to_string(),
            }),
            Err(e) => {
                warn!("{}: {}; copied unchanged", path.display(), e);
                fs::copy(path, dest)?;
                Ok(FileOutcome::Failed)
            }
        }
    }
}

/// Read a source file. Text that is not UTF-8 is a per-file failure.
fn read_source(path: &Path) -> Result<String, ObfuscateError> {
    let bytes = fs::read(path)?;
    String::from_utf8(bytes).map_err(|source| ObfuscateError::NotUtf8 {
        path: path.to_path_buf(),
        source,
    })
}

fn walk_error(err: walkdir::Error, limit: usize) -> WalkError {
    if err.loop_ancestor().is_some() {
        return WalkError::TooDeep(limit);
    }
    let path = err.path().map(Path::to_path_buf).unwrap_or_default();
    WalkError::Stat {
        path,
        source: io::Error::from(err),
    }
}

fn is_up_to_date(source: &Metadata, dest: &Path) -> bool {
    let Ok(dest) = fs::metadata(dest) else {
        return false;
    };
    match (source.modified(), dest.modified()) {
        (Ok(src), Ok(dst)) => dst >= src,
        _ => false,
    }
}

/// Remove whatever non-file entry sits at `dest`.
fn make_room(dest: &Path) -> Result<(), WalkError> {
    let Ok(meta) = fs::symlink_metadata(dest) else {
        return Ok(());
    };
    let removed = if meta.is_dir() {
        fs::remove_dir_all(dest)
    } else if meta.file_type().is_symlink() {
        fs::remove_file(dest)
    } else {
        return Ok(());
    };
    removed.map_err(|source| WalkError::Unlink {
        path: dest.to_path_buf(),
        source,
    })
}

#[cfg(unix)]
fn link(source: &Path, dest: &Path) -> Result<(), ObfuscateError> {
    let target = fs::read_link(source)?;
    if fs::symlink_metadata(dest).is_ok() {
        let removed = if dest.is_dir() && !fs::symlink_metadata(dest)?.file_type().is_symlink() {
            fs::remove_dir_all(dest)
        } else {
            fs::remove_file(dest)
        };
        removed.map_err(|source| WalkError::Unlink {
            path: dest.to_path_buf(),
            source,
        })?;
    }
    std::os::unix::fs::symlink(target, dest)?;
    Ok(())
}

#[cfg(not(unix))]
fn link(source: &Path, dest: &Path) -> Result<(), ObfuscateError> {
    make_room(dest)?;
    fs::copy(source, dest)?;
    Ok(())
}

/// Copy permissions and, on Unix, ownership. The modification time is copied
/// as well unless `retry` is set; then it is reset to the epoch so that the
/// next run treats the target as stale.
fn preserve(meta: &Metadata, dest: &Path, retry: bool) -> Result<(), ObfuscateError> {
    let modified = if retry {
        Ok(SystemTime::UNIX_EPOCH)
    } else {
        meta.modified()
    };
    if let Ok(modified) = modified {
        File::options().write(true).open(dest)?.set_modified(modified)?;
    }
    fs::set_permissions(dest, meta.permissions())?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        if let Err(e) = std::os::unix::fs::chown(dest, Some(meta.uid()), Some(meta.gid())) {
            debug!("could not preserve owner of {}: {}", dest.display(), e);
        }
    }
    Ok(())
}
