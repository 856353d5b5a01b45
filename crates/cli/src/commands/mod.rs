use clap::Subcommand;
use fescate_transform::ObfuscationConfig;
use fescate_utils::errors::ObfuscateError;
use std::path::{Path, PathBuf};
use tracing::debug;

pub mod clean;
pub mod file;
pub mod obfuscate;

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG: &str = "fescate.json";

#[derive(Debug, Subcommand)]
pub enum Cmd {
    /// Obfuscate a source directory into a managed target directory
    Obfuscate(obfuscate::ObfuscateArgs),

    /// Obfuscate a single file to stdout
    File(file::FileArgs),

    /// Remove a managed target directory
    Clean(clean::CleanArgs),
}

pub trait Command {
    fn execute(self) -> Result<(), ObfuscateError>;
}

impl Command for Cmd {
    fn execute(self) -> Result<(), ObfuscateError> {
        match self {
            Cmd::Obfuscate(args) => args.execute(),
            Cmd::File(args) => args.execute(),
            Cmd::Clean(args) => args.execute(),
        }
    }
}

/// Load `path`, or `fescate.json` if present, or the defaults.
pub fn load_config(path: Option<&Path>) -> Result<ObfuscationConfig, ObfuscateError> {
    let path: Option<PathBuf> = match path {
        Some(path) => Some(path.to_path_buf()),
        None => Some(PathBuf::from(DEFAULT_CONFIG)).filter(|p| p.is_file()),
    };
    match path {
        Some(path) => {
            debug!("loading configuration from {}", path.display());
            Ok(ObfuscationConfig::load(&path)?)
        }
        None => Ok(ObfuscationConfig::default()),
    }
}
