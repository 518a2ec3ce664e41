//! Typed constructors and accessors for each dialect.
//!
//! Constructors create a detached operation (not yet in any block) and
//! return its `OpRef`; callers insert it through a block or a rewriter.

pub mod aievec;
pub mod arith;
pub mod builtin;
pub mod func;
pub mod vector;

/// Define `fn name(ctx, lhs, rhs) -> OpRef` constructors whose result type
/// is the type of `lhs`.
macro_rules! same_type_binary_ops {
    ($($(#[$meta:meta])* $name:ident => $kind:ident;)*) => {
        $(
            $(#[$meta])*
            pub fn $name(
                ctx: &mut $crate::context::IrContext,
                lhs: $crate::refs::ValueRef,
                rhs: $crate::refs::ValueRef,
            ) -> $crate::refs::OpRef {
                let ty = ctx.value_ty(lhs);
                $crate::context::OperationDataBuilder::new($crate::ops::OpKind::$kind)
                    .operands([lhs, rhs])
                    .result(ty)
                    .create(ctx)
            }
        )*
    };
}

pub(crate) use same_type_binary_ops;
