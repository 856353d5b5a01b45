use crate::config::{ChunkMode, ObfuscationConfig};
use crate::scrambler::{Category, Scrambler};
use crate::{RewriteContext, Transform};
use fescate_core::ast::Stmt;
use fescate_utils::errors::{RewriteError, ScrambleError};
use rand::{rngs::StdRng, seq::SliceRandom};
use std::mem;
use tracing::debug;

/// Chunk sizing taken from the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShufflePolicy {
    pub mode: ChunkMode,
    pub min_chunk_size: usize,
    pub chunk_ratio: usize,
}

impl ShufflePolicy {
    pub fn from_config(config: &ObfuscationConfig) -> Self {
        Self {
            mode: config.chunk_mode,
            min_chunk_size: config.min_chunk_size.max(1),
            chunk_ratio: config.chunk_ratio.max(2),
        }
    }

    /// Statements per chunk for a body of `count` statements.
    pub fn chunk_size(&self, count: usize) -> usize {
        match self.mode {
            ChunkMode::Fixed => self.min_chunk_size,
            ChunkMode::Ratio => count.div_ceil(self.chunk_ratio).max(self.min_chunk_size),
        }
    }

    /// Whether a body of `count` statements is long enough to shuffle.
    pub fn applies(&self, count: usize) -> bool {
        let size = self.chunk_size(count);
        size > 0 && count > 2 * size
    }
}

impl Default for ShufflePolicy {
    fn default() -> Self {
        Self::from_config(&ObfuscationConfig::default())
    }
}

/// Split `stmts` into goto-linked chunks and reorder the chunks.
///
/// Each chunk becomes `label_i: ...; goto label_{i+1};`. A leading
/// `goto label_0` enters the chain and a trailing `label_n:` leaves it, so the
/// statements still run in their original order. Returns `false` and leaves
/// `stmts` alone unless [`ShufflePolicy::applies`].
pub fn shuffle_stmts(
    stmts: &mut Vec<Stmt>,
    policy: &ShufflePolicy,
    labels: &mut Scrambler,
    rng: &mut StdRng,
) -> Result<bool, ScrambleError> {
    if !policy.applies(stmts.len()) {
        return Ok(false);
    }
    let size = policy.chunk_size(stmts.len());

    let first = labels.new_label()?;
    let mut previous = first.clone();
    let mut chunks: Vec<Vec<Stmt>> = Vec::new();
    let mut pending = mem::take(stmts).into_iter().peekable();
    while pending.peek().is_some() {
        let next = labels.new_label()?;
        let mut chunk = Vec::with_capacity(size + 2);
        chunk.push(Stmt::Label(mem::replace(&mut previous, next.clone())));
        chunk.extend(pending.by_ref().take(size));
        chunk.push(Stmt::Goto(next));
        chunks.push(chunk);
    }
    chunks.shuffle(rng);

    debug!("shuffled {} chunks of {} statement(s)", chunks.len(), size);
    stmts.push(Stmt::Goto(first));
    stmts.extend(chunks.into_iter().flatten());
    stmts.push(Stmt::Label(previous));
    Ok(true)
}

/// Statements that must keep their place at the top of a file.
fn is_pinned(stmt: &Stmt) -> bool {
    matches!(
        stmt,
        Stmt::Use { .. } | Stmt::GroupUse { .. } | Stmt::Declare { .. }
    )
}

/// Shuffle a whole program body.
///
/// The last statement stays last, and nothing before the last import or
/// `declare` moves.
pub fn shuffle_program(
    stmts: &mut Vec<Stmt>,
    policy: &ShufflePolicy,
    labels: &mut Scrambler,
    rng: &mut StdRng,
) -> Result<bool, ScrambleError> {
    if stmts.len() <= 2 {
        return Ok(false);
    }
    let Some(last) = stmts.pop() else {
        return Ok(false);
    };
    let pinned = stmts.iter().rposition(is_pinned).map_or(0, |i| i + 1);
    let mut body = stmts.split_off(pinned);
    let shuffled = shuffle_stmts(&mut body, policy, labels, rng);
    stmts.append(&mut body);
    stmts.push(last);
    shuffled
}

/// Top-level statement shuffling.
#[derive(Debug, Default)]
pub struct Shuffle;

impl Transform for Shuffle {
    fn name(&self) -> &'static str {
        "Shuffle"
    }

    fn apply(
        &self,
        program: &mut Vec<Stmt>,
        cx: &mut RewriteContext<'_>,
        rng: &mut StdRng,
    ) -> Result<bool, RewriteError> {
        if !cx.config.shuffle_stmts {
            return Ok(false);
        }
        if program.len() <= 2 {
            debug!("Not enough statements to shuffle");
            return Ok(false);
        }
        let policy = ShufflePolicy::from_config(cx.config);
        let labels = cx.scramblers.get_mut(Category::Label);
        Ok(shuffle_program(program, &policy, labels, rng)?)
    }
}
