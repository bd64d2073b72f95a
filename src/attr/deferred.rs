use std::ops::{Deref, DerefMut};

use crate::attr::argument::ArgumentCache;
use crate::attr::Attributor;
use crate::resolve::ResolutionPhase;

/// Whether a deferred-attribution round is probing candidates or
/// committing the winner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrMode {
    Speculative,
    Check,
}

/// One frame of the deferred-attribution stack: the mode and resolution
/// phase under which deferred types are currently being completed.
#[derive(Debug, Clone, Copy)]
pub struct DeferredAttrContext {
    pub mode: AttrMode,
    pub phase: ResolutionPhase,
}

impl DeferredAttrContext {
    pub fn speculative(phase: ResolutionPhase) -> Self {
        DeferredAttrContext {
            mode: AttrMode::Speculative,
            phase,
        }
    }

    pub fn check(phase: ResolutionPhase) -> Self {
        DeferredAttrContext {
            mode: AttrMode::Check,
            phase,
        }
    }
}

/// Scoped swap of the argument-type cache: a fresh cache is installed on
/// entry and the previous one restored when the guard drops, on every
/// exit path. Speculative attribution runs inside one of these so its
/// cache entries never leak into the enclosing round.
pub struct LocalCacheContext<'s, 'a, 'c> {
    attr: &'s mut Attributor<'a, 'c>,
    saved: Option<ArgumentCache<'a>>,
}

impl<'s, 'a, 'c> LocalCacheContext<'s, 'a, 'c> {
    pub fn enter(attr: &'s mut Attributor<'a, 'c>) -> Self {
        let saved = std::mem::take(&mut attr.arg_cache);
        LocalCacheContext {
            attr,
            saved: Some(saved),
        }
    }
}

impl<'s, 'a, 'c> Deref for LocalCacheContext<'s, 'a, 'c> {
    type Target = Attributor<'a, 'c>;

    fn deref(&self) -> &Self::Target {
        self.attr
    }
}

impl<'s, 'a, 'c> DerefMut for LocalCacheContext<'s, 'a, 'c> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.attr
    }
}

impl<'s, 'a, 'c> Drop for LocalCacheContext<'s, 'a, 'c> {
    fn drop(&mut self) {
        self.attr.arg_cache = self.saved.take().expect("cache already restored");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::Arena;
    use crate::attr::argument::{ArgumentKind, ArgumentType};
    use crate::attr::Attributor;
    use crate::context::Context;
    use crate::options::Options;
    use crate::tree::{Tree, TreeMaker, TreePool};
    use crate::types::Const;

    fn entry<'a>(tree: &'a Tree<'a>) -> ArgumentType<'a> {
        ArgumentType {
            kind: ArgumentKind::Parens,
            tree,
            speculative: tree,
            resolved: None,
            results: Vec::new(),
        }
    }

    #[test]
    fn local_cache_restores_previous_cache() {
        let mut ctx = Context::new(Options::new());
        let source = ctx.sources.add("T.java", "f(1)");
        let nodes = Arena::new();
        let refs = Arena::new();
        let pool = TreePool::new(&nodes, &refs);
        let maker = TreeMaker::new(pool);
        let mut attr = Attributor::new(&mut ctx, pool, source);

        let lit = maker.literal(Const::Int(1));
        let pos = attr.unique_pos(lit);
        attr.arg_cache.insert(pos, entry(lit));
        assert_eq!(attr.arg_cache.len(), 1);
        {
            let mut guard = LocalCacheContext::enter(&mut attr);
            assert_eq!(guard.arg_cache.len(), 0);
            let marker = maker.literal(Const::Int(2));
            let inner_pos = guard.unique_pos(marker);
            guard.arg_cache.insert(inner_pos, entry(marker));
            assert_eq!(guard.arg_cache.len(), 1);
        }
        // The speculative cache is gone; the outer entry is back.
        assert_eq!(attr.arg_cache.len(), 1);
        assert!(attr.arg_cache.get(&pos).is_some());
    }
}
