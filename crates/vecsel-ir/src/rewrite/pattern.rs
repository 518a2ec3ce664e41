//! Rewrite pattern trait and prioritized pattern sets.

use std::collections::HashMap;

use derive_more::{Display, Error};

use super::rewriter::PatternRewriter;
use crate::context::IrContext;
use crate::ops::OpKind;
use crate::refs::OpRef;

/// Explicit rejection of an operation shape the rules cannot express
/// (a masked load, for instance). Unlike a plain mismatch, this stops the
/// driver from trying further rules on the operation.
#[derive(Clone, Debug, Display, Error, PartialEq, Eq)]
#[display("{reason}")]
pub struct UnsupportedInput {
    pub reason: String,
}

impl UnsupportedInput {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// `Ok(true)`: rewritten. `Ok(false)`: does not apply. `Err`: rejected.
pub type MatchResult = Result<bool, UnsupportedInput>;

/// A local rewrite rule.
///
/// Implementations must finish every check before creating operations:
/// an operation created and then abandoned would still count as a use of
/// its operands.
pub trait RewritePattern {
    fn match_and_rewrite(
        &self,
        ctx: &mut IrContext,
        op: OpRef,
        rewriter: &mut PatternRewriter<'_>,
    ) -> MatchResult;

    /// Operation kinds the rule is registered for.
    fn roots(&self) -> &'static [OpKind];

    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

struct PatternEntry {
    priority: u32,
    pattern: Box<dyn RewritePattern>,
}

/// Rules indexed by root kind, tried in ascending priority.
///
/// A rule registered without an explicit priority gets its declaration
/// index; ties keep declaration order.
#[derive(Default)]
pub struct PatternSet {
    entries: Vec<PatternEntry>,
    by_kind: HashMap<OpKind, Vec<usize>>,
}

impl PatternSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(self, pattern: impl RewritePattern + 'static) -> Self {
        let priority = self.entries.len() as u32;
        self.add_with_priority(pattern, priority)
    }

    pub fn add_with_priority(mut self, pattern: impl RewritePattern + 'static, priority: u32) -> Self {
        let index = self.entries.len();
        for &kind in pattern.roots() {
            let list = self.by_kind.entry(kind).or_default();
            list.push(index);
            // Stable: equal priorities stay in declaration order.
            let entries = &self.entries;
            list.sort_by_key(|&i| {
                if i == index {
                    priority
                } else {
                    entries[i].priority
                }
            });
        }
        self.entries.push(PatternEntry {
            priority,
            pattern: Box::new(pattern),
        });
        self
    }

    /// Rules registered for `kind`, in the order the driver tries them.
    pub fn for_kind(&self, kind: OpKind) -> impl Iterator<Item = &dyn RewritePattern> + '_ {
        self.by_kind
            .get(&kind)
            .into_iter()
            .flatten()
            .map(|&i| self.entries[i].pattern.as_ref())
    }

    /// `(name, priority)` of the rules for `kind`, in trial order.
    pub fn priorities(&self, kind: OpKind) -> Vec<(&'static str, u32)> {
        self.by_kind
            .get(&kind)
            .into_iter()
            .flatten()
            .map(|&i| (self.entries[i].pattern.name(), self.entries[i].priority))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str, &'static [OpKind]);

    impl RewritePattern for Named {
        fn match_and_rewrite(
            &self,
            _: &mut IrContext,
            _: OpRef,
            _: &mut PatternRewriter<'_>,
        ) -> MatchResult {
            Ok(false)
        }

        fn roots(&self) -> &'static [OpKind] {
            self.1
        }

        fn name(&self) -> &'static str {
            self.0
        }
    }

    #[test]
    fn declaration_order_is_default_priority() {
        let set = PatternSet::new()
            .add(Named("first", &[OpKind::AddI]))
            .add(Named("other", &[OpKind::SubI]))
            .add(Named("second", &[OpKind::AddI, OpKind::SubI]));

        assert_eq!(set.priorities(OpKind::AddI), vec![("first", 0), ("second", 2)]);
        assert_eq!(set.priorities(OpKind::SubI), vec![("other", 1), ("second", 2)]);
        assert_eq!(set.for_kind(OpKind::MulI).count(), 0);
    }

    #[test]
    fn explicit_priority_reorders() {
        let set = PatternSet::new()
            .add(Named("a", &[OpKind::AddI]))
            .add(Named("b", &[OpKind::AddI]))
            .add_with_priority(Named("tied-with-a", &[OpKind::AddI]), 0);

        let names: Vec<_> = set.for_kind(OpKind::AddI).map(|p| p.name()).collect();
        assert_eq!(names, vec!["a", "tied-with-a", "b"]);

        let set = PatternSet::new()
            .add_with_priority(Named("b", &[OpKind::AddI]), 5)
            .add_with_priority(Named("a", &[OpKind::AddI]), 1);
        let names: Vec<_> = set.for_kind(OpKind::AddI).map(|p| p.name()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
