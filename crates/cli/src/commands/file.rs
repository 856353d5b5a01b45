use clap::Args;
use fescate_transform::Obfuscator;
use fescate_utils::errors::ObfuscateError;
use std::fs;
use std::path::PathBuf;

/// Arguments for the `file` subcommand.
#[derive(Debug, Args)]
pub struct FileArgs {
    /// PHP file to obfuscate; the result goes to stdout.
    pub path: PathBuf,
    /// JSON configuration file (default: ./fescate.json when present).
    #[arg(long)]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Obfuscates one file with fresh scramblers; no context is read or written.
impl super::Command for FileArgs {
    fn execute(self) -> Result<(), ObfuscateError> {
        let source = fs::read_to_string(&self.path)
            .map_err(|_| ObfuscateError::SourceUnreadable(self.path.clone()))?;
        let mut config = super::load_config(self.config.as_deref())?;
        if self.seed.is_some() {
            config.seed = self.seed;
        }

        let mut obfuscator = Obfuscator::new(config)?;
        obfuscator.grab(&source)?;
        obfuscator.resolve_constants();
        let result = obfuscator.obfuscate(&source)?;
        print!("{}", result.source);
        Ok(())
    }
}
