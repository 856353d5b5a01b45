pub mod config;
pub mod context;
pub mod control_flow;
pub mod grab;
pub mod obfuscator;
pub mod pass;
pub mod scram;
pub mod scrambler;
pub mod shuffle;

pub use config::ObfuscationConfig;
pub use grab::ConstantTable;
pub use obfuscator::Obfuscator;
pub use scrambler::{Category, Scrambler, Scramblers};

use fescate_core::ast::Stmt;
use fescate_utils::errors::RewriteError;
use rand::rngs::StdRng;

/// State shared by every transform of one run.
///
/// Scramblers and grabbed constants outlive a single file, so they are passed
/// in rather than owned by the transform.
#[derive(Debug)]
pub struct RewriteContext<'a> {
    pub config: &'a ObfuscationConfig,
    pub scramblers: &'a mut Scramblers,
    pub constants: &'a ConstantTable,
}

/// Trait for source-level obfuscation transforms.
pub trait Transform {
    /// Returns the transform's name for logging and identification.
    fn name(&self) -> &'static str;
    /// Applies the transform to a parsed file, returning whether changes were made.
    fn apply(
        &self,
        program: &mut Vec<Stmt>,
        cx: &mut RewriteContext<'_>,
        rng: &mut StdRng,
    ) -> Result<bool, RewriteError>;
}
