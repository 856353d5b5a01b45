use crate::mirror;
use clap::Args;
use fescate_utils::errors::ObfuscateError;
use std::path::PathBuf;
use tracing::info;

/// Arguments for the `clean` subcommand.
#[derive(Debug, Args)]
pub struct CleanArgs {
    /// Managed target directory to remove.
    pub target: PathBuf,
}

impl super::Command for CleanArgs {
    fn execute(self) -> Result<(), ObfuscateError> {
        if !mirror::clean(&self.target)? {
            info!("{} does not exist; nothing to clean", self.target.display());
        }
        Ok(())
    }
}
