use crate::{RewriteContext, Transform};
use fescate_core::ast::Stmt;
use fescate_utils::errors::RewriteError;
use rand::rngs::StdRng;
use tracing::debug;

/// Trait for running a sequence of transforms over one parsed file.
pub trait Pass {
    fn run(
        &self,
        program: &mut Vec<Stmt>,
        passes: &[Box<dyn Transform>],
        cx: &mut RewriteContext<'_>,
        rng: &mut StdRng,
    ) -> Result<usize, RewriteError>;
}

/// Default implementation of the Pass trait: every transform in order, each
/// seeing the output of the previous one.
#[derive(Debug, Default)]
pub struct DefaultPass;

impl Pass for DefaultPass {
    fn run(
        &self,
        program: &mut Vec<Stmt>,
        passes: &[Box<dyn Transform>],
        cx: &mut RewriteContext<'_>,
        rng: &mut StdRng,
    ) -> Result<usize, RewriteError> {
        let mut mutated = 0;
        for pass in passes {
            let changed = pass.apply(program, cx, rng)?;
            debug!(
                "{:>14} {} ({} top-level statements)",
                pass.name(),
                if changed { "✓" } else { "·" },
                program.len()
            );
            mutated += usize::from(changed);
        }
        Ok(mutated)
    }
}

/// Convenience function to run the default pass.
pub fn run(
    program: &mut Vec<Stmt>,
    passes: &[Box<dyn Transform>],
    cx: &mut RewriteContext<'_>,
    rng: &mut StdRng,
) -> Result<usize, RewriteError> {
    DefaultPass.run(program, passes, cx, rng)
}
