//! Lowering options.

use crate::errors::LowerResult;
use crate::target::TargetGeneration;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LowerOptions {
    pub target: TargetGeneration,
    /// Fixed-point shift applied by the `ups`/`srs` pairs the generation-2
    /// multiply and multiply-accumulate rules emit.
    pub shift: i64,
    /// Rewrite-driver iteration budget.
    pub max_iterations: usize,
    /// Fail the pass when operations remain illegal. When false, survivors
    /// are only reported.
    pub fail_on_illegal: bool,
}

impl Default for LowerOptions {
    fn default() -> Self {
        Self {
            target: TargetGeneration::Aie,
            shift: 0,
            max_iterations: 10,
            fail_on_illegal: true,
        }
    }
}

impl LowerOptions {
    /// Options for the generation named by `selector` (`"aie"` or `"aieml"`).
    pub fn from_selector(selector: &str) -> LowerResult<Self> {
        Ok(Self::default().with_target(selector.parse()?))
    }

    pub fn with_target(mut self, target: TargetGeneration) -> Self {
        self.target = target;
        self
    }

    pub fn with_shift(mut self, shift: i64) -> Self {
        self.shift = shift;
        self
    }

    pub fn with_max_iterations(mut self, n: usize) -> Self {
        self.max_iterations = n;
        self
    }

    pub fn with_fail_on_illegal(mut self, fail: bool) -> Self {
        self.fail_on_illegal = fail;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::LowerErrorKind;

    #[test]
    fn from_selector() {
        let options = LowerOptions::from_selector("aieml").unwrap().with_shift(3);
        assert_eq!(options.target, TargetGeneration::AieMl);
        assert_eq!(options.shift, 3);
        assert!(options.fail_on_illegal);

        let err = LowerOptions::from_selector("").unwrap_err();
        assert!(matches!(err.kind(), LowerErrorKind::UnknownTarget(s) if s.is_empty()));
    }
}
