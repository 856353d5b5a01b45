/// Module for the `obfuscate` subcommand, which mirrors a PHP source tree into a
/// managed target directory with every matching file obfuscated.
///
/// Contexts persisted by earlier runs are restored first so that names keep their
/// replacements across runs, and saved again at the end, also after a failure.
use crate::mirror::{self, Layout, Mirror};
use clap::Args;
use fescate_transform::context::ContextStore;
use fescate_transform::Obfuscator;
use fescate_utils::errors::ObfuscateError;
use serde_json::json;
use std::fs;
use std::path::PathBuf;
use tracing::info;

/// Arguments for the `obfuscate` subcommand.
#[derive(Debug, Args)]
pub struct ObfuscateArgs {
    /// Source directory to obfuscate.
    pub source: PathBuf,
    /// Managed target directory receiving `obfuscated/` and `context/`.
    #[arg(short = 'o', long)]
    pub target: Option<PathBuf>,
    /// JSON configuration file (default: ./fescate.json when present).
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Remove the target directory before running.
    #[arg(long)]
    pub clean: bool,
    /// Seed for reproducible output.
    #[arg(long)]
    pub seed: Option<u64>,
    /// Disable statement shuffling.
    #[arg(long)]
    pub no_shuffle: bool,
    /// Path to emit a JSON run summary (optional).
    #[arg(long)]
    pub emit: Option<PathBuf>,
}

impl super::Command for ObfuscateArgs {
    fn execute(self) -> Result<(), ObfuscateError> {
        let target = self.target.ok_or(ObfuscateError::MissingTarget)?;
        if fs::metadata(&self.source).is_err() {
            return Err(ObfuscateError::SourceUnreadable(self.source));
        }

        let mut config = super::load_config(self.config.as_deref())?;
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if self.no_shuffle {
            config.shuffle_stmts = false;
        }
        if self.clean || config.clean_mode {
            mirror::clean(&target)?;
        }

        let layout = Layout::new(&target);
        layout.create()?;
        let store = ContextStore::new(&layout.context);

        let mut obfuscator = Obfuscator::new(config.clone())?;
        let mirror = Mirror::new(&config, &self.source, &layout.obfuscated);
        let stats = mirror.run_with_context(&mut obfuscator, &store)?;
        obfuscator.report();

        if let Some(path) = self.emit {
            let summary = json!({
                "source": self.source,
                "target": layout.obfuscated,
                "obfuscated": stats.obfuscated,
                "copied": stats.copied,
                "linked": stats.linked,
                "unchanged": stats.unchanged,
                "failed": stats.failed,
                "constants": obfuscator.constants().len(),
                "scrambled": obfuscator
                    .scramblers()
                    .iter()
                    .map(|s| (s.category().as_str(), s.len()))
                    .collect::<std::collections::BTreeMap<_, _>>(),
            });
            let text = serde_json::to_string_pretty(&summary).map_err(std::io::Error::other)?;
            fs::write(&path, text)?;
            info!("wrote run summary to {}", path.display());
        }
        Ok(())
    }
}
