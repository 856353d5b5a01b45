use crate::config::ObfuscationConfig;
use crate::context::ContextStore;
use crate::grab::{ConstantTable, GrabVisitor};
use crate::scram::Scram;
use crate::scrambler::Scramblers;
use crate::shuffle::Shuffle;
use crate::{pass, RewriteContext, Transform};
use fescate_core::ast::Stmt;
use fescate_core::frontend::{ExternalParser, SourceParser};
use fescate_core::printer::{Printer, PrinterOptions};
use fescate_core::reserved::Builtins;
use fescate_core::traverse::Traverser;
use fescate_utils::errors::ObfuscateError;
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Result of obfuscating one source text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObfuscationResult {
    /// The rewritten source, ready to be written out.
    pub source: String,
    pub original_size: usize,
    pub obfuscated_size: usize,
    /// Names of the transforms that changed something.
    pub transforms_applied: Vec<String>,
}

/// Main obfuscation pipeline.
///
/// One instance serves a whole run: the scramblers and the grabbed constant
/// table are shared by every file so that a name gets the same replacement
/// wherever it appears.
pub struct Obfuscator {
    config: ObfuscationConfig,
    scramblers: Scramblers,
    constants: ConstantTable,
    parser: Box<dyn SourceParser>,
    transforms: Vec<Box<dyn Transform>>,
    rng: StdRng,
}

impl std::fmt::Debug for Obfuscator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Obfuscator")
            .field("config", &self.config)
            .field("scramblers", &self.scramblers)
            .field("constants", &format!("{} constants", self.constants.len()))
            .field(
                "transforms",
                &format!("{} transforms", self.transforms.len()),
            )
            .finish()
    }
}

impl Obfuscator {
    /// Build the pipeline with the external parser named in the configuration
    /// and the built-in symbol tables, extended by `builtins_file` if set.
    pub fn new(config: ObfuscationConfig) -> Result<Self, ObfuscateError> {
        let mut builtins = Builtins::standard();
        if let Some(path) = &config.builtins_file {
            builtins = builtins.merge(Builtins::from_file(path)?);
            debug!("merged built-in symbols from {}", path.display());
        }
        let parser = ExternalParser::new(&config.parser_command)?;
        Ok(Self::with_parser(config, &builtins, Box::new(parser)))
    }

    pub fn with_parser(
        config: ObfuscationConfig,
        builtins: &Builtins,
        parser: Box<dyn SourceParser>,
    ) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            scramblers: Scramblers::new(&config, builtins),
            constants: ConstantTable::new(),
            transforms: vec![Box::new(Scram), Box::new(Shuffle)],
            config,
            parser,
            rng,
        }
    }

    pub const fn config(&self) -> &ObfuscationConfig {
        &self.config
    }

    pub const fn scramblers(&self) -> &Scramblers {
        &self.scramblers
    }

    pub const fn constants(&self) -> &ConstantTable {
        &self.constants
    }

    fn parse(&self, source: &str) -> Result<Vec<Stmt>, ObfuscateError> {
        Ok(self.parser.parse(source)?)
    }

    /// Record the constant declarations of one source. Returns how many new
    /// constants were found.
    pub fn grab(&mut self, source: &str) -> Result<usize, ObfuscateError> {
        let (_, body) = split_shebang(source);
        if body.trim().is_empty() {
            return Ok(0);
        }
        let program = self.parse(body)?;
        let before = self.constants.len();
        let mut visitor = GrabVisitor::new(&mut self.constants);
        Traverser::new(&mut visitor).traverse(program)?;
        Ok(self.constants.len() - before)
    }

    /// Substitute forward references once every source has been grabbed.
    pub fn resolve_constants(&mut self) -> usize {
        let resolved = self.constants.resolve();
        debug!(
            "{} grabbed constant(s), {} with forward references",
            self.constants.len(),
            resolved
        );
        resolved
    }

    /// Obfuscate one source text.
    pub fn obfuscate(&mut self, source: &str) -> Result<ObfuscationResult, ObfuscateError> {
        let (shebang, body) = split_shebang(source);
        if body.trim().is_empty() {
            if !self.config.allow_overwrite_empty_files {
                return Err(ObfuscateError::EmptySource("source".into()));
            }
            return Ok(ObfuscationResult {
                source: source.to_string(),
                original_size: source.len(),
                obfuscated_size: source.len(),
                transforms_applied: Vec::new(),
            });
        }

        let mut program = self.parse(body)?;
        debug!("parsed {} top-level statement(s)", program.len());

        let mut applied = Vec::new();
        let mut cx = RewriteContext {
            config: &self.config,
            scramblers: &mut self.scramblers,
            constants: &self.constants,
        };
        for transform in &self.transforms {
            let passes = std::slice::from_ref(transform);
            if pass::run(&mut program, passes, &mut cx, &mut self.rng)? > 0 {
                applied.push(transform.name().to_string());
            }
        }

        let options = PrinterOptions {
            obfuscate_strings: self.config.obfuscate_string,
            keep_doc_comments: !self.config.remove_comments,
            compact: self.config.strip_indentation,
        };
        let printed = Printer::new(options, &mut self.rng).print_file(&program);
        let mut output = String::with_capacity(shebang.len() + printed.len());
        output.push_str(shebang);
        match &self.config.comment {
            Some(comment) => output.push_str(&with_header(&printed, comment)),
            None => output.push_str(&printed),
        }

        Ok(ObfuscationResult {
            original_size: source.len(),
            obfuscated_size: output.len(),
            source: output,
            transforms_applied: applied,
        })
    }

    /// Load persisted scrambler state. Returns how many categories were restored.
    pub fn restore_context(&mut self, store: &ContextStore) -> Result<usize, ObfuscateError> {
        Ok(store.restore_all(&mut self.scramblers)?)
    }

    pub fn save_context(&self, store: &ContextStore) -> Result<(), ObfuscateError> {
        Ok(store.save_all(&self.scramblers)?)
    }

    /// Log per-category totals.
    pub fn report(&self) {
        self.scramblers.report();
        info!("[{:<17}] grabbed:   {:>8}", "constants", self.constants.len());
    }
}

/// Split a leading `#!` line off the source. The line keeps its newline.
fn split_shebang(source: &str) -> (&str, &str) {
    if !source.starts_with("#!") {
        return ("", source);
    }
    match source.find('\n') {
        Some(end) => source.split_at(end + 1),
        None => (source, ""),
    }
}

/// Insert a block comment right after the opening tag.
fn with_header(printed: &str, comment: &str) -> String {
    let body = printed.strip_prefix("<?php").unwrap_or(printed);
    let lines: Vec<String> = comment.lines().map(|l| format!(" * {l}").trim_end().to_string()).collect();
    format!("<?php\n/*\n{}\n */\n{}", lines.join("\n"), body.trim_start())
}
