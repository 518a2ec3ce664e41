//! `builtin` dialect.

use crate::context::{IrContext, OperationDataBuilder};
use crate::ops::OpKind;
use crate::refs::{OpRef, TypeRef, ValueRef};

/// Reinterpret `value` as `ty` without changing its bits.
pub fn unrealized_cast(ctx: &mut IrContext, value: ValueRef, ty: TypeRef) -> OpRef {
    OperationDataBuilder::new(OpKind::UnrealizedCast)
        .operand(value)
        .result(ty)
        .create(ctx)
}
