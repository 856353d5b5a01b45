use std::path::PathBuf;
use thiserror::Error;

/// Error type for identifier generation.
#[derive(Debug, Clone, Error)]
pub enum ScrambleError {
    /// No free candidate was found within the retry budget.
    #[error("[{category}] no free identifier for `{name}` after {attempts} attempts")]
    Exhausted {
        category: &'static str,
        name: String,
        attempts: usize,
    },
}

/// Errors raised while reading or writing persisted scrambler state.
#[derive(Debug, Error)]
pub enum ContextError {
    /// The blob was written by an incompatible layout.
    #[error("context format of `{category}` is {found}, expected {expected}; rerun with --clean")]
    VersionMismatch {
        category: &'static str,
        found: String,
        expected: &'static str,
    },
    #[error("could not access context file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed context file '{path}': {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors produced while turning source text into a syntax tree.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The external parser could not be launched or exited unsuccessfully.
    #[error("parser command `{command}` failed: {reason}")]
    Command { command: String, reason: String },
    #[error("parser output is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// A node is missing a field or carries an unexpected shape.
    #[error("malformed `{node}` node: {msg}")]
    Malformed { node: String, msg: String },
    #[error("unsupported node type `{0}`")]
    Unsupported(String),
    #[error("io error while parsing: {0}")]
    Io(#[from] std::io::Error),
}

/// Constructs the rewrite pass refuses to transform.
#[derive(Debug, Error)]
pub enum RewriteError {
    #[error("`{keyword}` depth must be a literal integer")]
    NonLiteralDepth { keyword: &'static str },
    #[error("`{keyword} {depth}` found with only {available} enclosing loop(s)")]
    OutsideLoop {
        keyword: &'static str,
        depth: usize,
        available: usize,
    },
    /// `define()` / `defined()` / `function_exists()` called with an unsupported argument shape.
    #[error("unsupported use of {function}(): {expected}")]
    CallShape {
        function: String,
        expected: &'static str,
    },
    #[error(transparent)]
    Scramble(#[from] ScrambleError),
}

impl RewriteError {
    /// Whether the whole run must stop regardless of the abort policy.
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Scramble(_))
    }
}

/// Configuration loading and validation failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Failures while mirroring a source tree into the target directory.
#[derive(Debug, Error)]
pub enum WalkError {
    #[error("source directory '{0}' cannot be read")]
    DirectoryMissing(PathBuf),
    #[error("more than {0} nested directories; symlink loop?")]
    TooDeep(usize),
    #[error("cannot stat '{path}': {source}")]
    Stat {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot unlink '{path}': {source}")]
    Unlink {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot create directory '{path}': {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("'{0}' is not a managed output directory")]
    NotManaged(PathBuf),
}

/// Errors that can occur during obfuscation.
#[derive(Debug, Error)]
pub enum ObfuscateError {
    #[error("no target directory given")]
    MissingTarget,
    #[error("source '{0}' does not exist or is not readable")]
    SourceUnreadable(PathBuf),
    #[error("'{0}' is empty")]
    EmptySource(String),
    #[error("'{path}' is not valid UTF-8")]
    NotUtf8 {
        path: PathBuf,
        #[source]
        source: std::string::FromUtf8Error,
    },
    /// A file failed and the run was configured to stop at the first failure.
    #[error("aborting after error in '{path}': {reason}")]
    Aborted { path: PathBuf, reason: String },
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("rewrite error: {0}")]
    Rewrite(#[from] RewriteError),
    #[error("scramble error: {0}")]
    Scramble(#[from] ScrambleError),
    #[error("context error: {0}")]
    Context(#[from] ContextError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Walk(#[from] WalkError),
    #[error("file error: {0}")]
    File(#[from] std::io::Error),
}

impl ObfuscateError {
    /// Process exit code for this failure.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Context(ContextError::VersionMismatch { .. }) => 1,
            Self::Scramble(_) | Self::Rewrite(RewriteError::Scramble(_)) => 2,
            Self::MissingTarget => 15,
            Self::SourceUnreadable(_) => 16,
            Self::Config(_) => 17,
            Self::Walk(WalkError::CreateDir { .. }) => 51,
            Self::Walk(WalkError::TooDeep(_)) => 52,
            Self::Walk(WalkError::DirectoryMissing(_)) => 53,
            Self::Walk(WalkError::Stat { .. }) => 54,
            Self::Walk(WalkError::Unlink { .. }) => 55,
            Self::Aborted { .. } => 57,
            Self::Walk(WalkError::NotManaged(_)) => 58,
            _ => 60,
        }
    }

    /// Whether the error must stop the run even when per-file errors are tolerated.
    pub const fn is_fatal(&self) -> bool {
        match self {
            Self::Parse(_) | Self::EmptySource(_) | Self::NotUtf8 { .. } => false,
            Self::Rewrite(e) => e.is_fatal(),
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_distinct() {
        let errors = [
            ObfuscateError::Context(ContextError::VersionMismatch {
                category: "label",
                found: "0.9".into(),
                expected: "1.0",
            }),
            ObfuscateError::Scramble(ScrambleError::Exhausted {
                category: "variable",
                name: "x".into(),
                attempts: 50,
            }),
            ObfuscateError::MissingTarget,
            ObfuscateError::SourceUnreadable("src".into()),
            ObfuscateError::Walk(WalkError::CreateDir {
                path: "t".into(),
                source: std::io::Error::other("denied"),
            }),
            ObfuscateError::Walk(WalkError::TooDeep(99)),
            ObfuscateError::Walk(WalkError::DirectoryMissing("d".into())),
            ObfuscateError::Walk(WalkError::Stat {
                path: "f".into(),
                source: std::io::Error::other("gone"),
            }),
            ObfuscateError::Walk(WalkError::Unlink {
                path: "f".into(),
                source: std::io::Error::other("busy"),
            }),
            ObfuscateError::Aborted {
                path: "a.php".into(),
                reason: "bad".into(),
            },
            ObfuscateError::Walk(WalkError::NotManaged("t".into())),
        ];
        let mut codes: Vec<i32> = errors.iter().map(ObfuscateError::exit_code).collect();
        let total = codes.len();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), total);
    }

    #[test]
    fn rewrite_errors_are_per_file_unless_scrambling_failed() {
        let shape = ObfuscateError::Rewrite(RewriteError::NonLiteralDepth { keyword: "break" });
        assert!(!shape.is_fatal());
        let exhausted = RewriteError::Scramble(ScrambleError::Exhausted {
            category: "label",
            name: "!label0".into(),
            attempts: 50,
        });
        assert!(exhausted.is_fatal());
        assert_eq!(ObfuscateError::Rewrite(exhausted).exit_code(), 2);
    }

    #[test]
    fn undecodable_source_is_per_file() {
        let source = String::from_utf8(vec![b'c', b'a', b'f', 0xe9]).unwrap_err();
        let err = ObfuscateError::NotUtf8 {
            path: "legacy.php".into(),
            source,
        };
        assert!(!err.is_fatal());
        assert!(ObfuscateError::File(std::io::Error::other("disk")).is_fatal());
    }
}
