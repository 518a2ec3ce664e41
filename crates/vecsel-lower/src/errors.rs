//! Error types for vector lowering.

use derive_more::Display;
use vecsel_ir::rewrite::IllegalOp;
use vecsel_ir::{OpKind, OpRef};

pub type LowerResult<T> = Result<T, LowerError>;

#[derive(Clone, Display, Debug, PartialEq)]
#[display("{kind}")]
pub struct LowerError {
    kind: Box<LowerErrorKind>,
}

impl<E> From<E> for LowerError
where
    LowerErrorKind: From<E>,
{
    fn from(error: E) -> Self {
        LowerError {
            kind: Box::new(LowerErrorKind::from(error)),
        }
    }
}

impl LowerError {
    pub fn kind(&self) -> &LowerErrorKind {
        &self.kind
    }

    pub fn unknown_target(selector: impl std::fmt::Display) -> Self {
        LowerErrorKind::UnknownTarget(selector.to_string()).into()
    }

    pub fn unsupported(op: OpRef, kind: OpKind, reason: impl std::fmt::Display) -> Self {
        LowerErrorKind::Unsupported {
            op,
            kind,
            reason: reason.to_string(),
        }
        .into()
    }

    pub fn illegal_operations(ops: Vec<IllegalOp>) -> Self {
        LowerErrorKind::IllegalOperations(ops).into()
    }

    pub fn not_a_function(kind: OpKind) -> Self {
        LowerErrorKind::NotAFunction(kind).into()
    }
}

#[derive(Clone, Display, Debug, PartialEq)]
pub enum LowerErrorKind {
    #[display("unknown target '{_0}'")]
    UnknownTarget(String),

    #[display("{kind} ({op}): {reason}")]
    Unsupported {
        op: OpRef,
        kind: OpKind,
        reason: String,
    },

    #[display("{} operation(s) left illegal: {}", _0.len(), list(_0))]
    IllegalOperations(Vec<IllegalOp>),

    #[display("expected func.func, got {_0}")]
    NotAFunction(OpKind),
}

fn list(ops: &[IllegalOp]) -> String {
    ops.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

impl std::error::Error for LowerError {}

#[cfg(test)]
mod tests {
    use super::*;
    use vecsel_ir::IrContext;
    use vecsel_ir::dialect::func;

    #[test]
    fn messages() {
        let mut ctx = IrContext::new();
        let (f, _) = func::func(&mut ctx, "f", vec![]);

        let err = LowerError::unsupported(f, OpKind::TransferRead, "masked loads are not supported");
        assert_eq!(
            err.to_string(),
            format!("vector.transfer_read ({f}): masked loads are not supported")
        );

        let err = LowerError::illegal_operations(vec![IllegalOp {
            op: f,
            kind: OpKind::AddI,
        }]);
        assert_eq!(err.to_string(), format!("1 operation(s) left illegal: arith.addi ({f})"));
        assert!(matches!(err.kind(), LowerErrorKind::IllegalOperations(ops) if ops.len() == 1));

        assert_eq!(
            LowerError::not_a_function(OpKind::AddI).to_string(),
            "expected func.func, got arith.addi"
        );
    }
}
