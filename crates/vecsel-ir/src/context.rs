//! IrContext: arena-based mutable storage for the operation graph.
//!
//! All entities (operations, values, blocks, regions) are stored in
//! `PrimaryMap`s owned by `IrContext`. Entity lists (operands, results)
//! use `EntityList + ListPool` for compact 4-byte per-field storage.

use std::collections::BTreeMap;

use cranelift_entity::{EntityList, ListPool, PrimaryMap, SecondaryMap};
use smallvec::SmallVec;

use crate::ops::OpKind;
use crate::refs::*;
use crate::types::*;

// ============================================================================
// Use-chain
// ============================================================================

/// A single use of a value: which operation uses it, at which operand index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Use {
    pub user: OpRef,
    pub operand_index: u32,
}

// ============================================================================
// Entity data types
// ============================================================================

/// Data for a single operation in the arena.
pub struct OperationData {
    pub kind: OpKind,
    pub operands: EntityList<ValueRef>,
    pub results: EntityList<TypeRef>,
    pub attributes: BTreeMap<&'static str, Attribute>,
    pub regions: SmallVec<[RegionRef; 1]>,
    pub parent_block: Option<BlockRef>,
}

/// Data for a single SSA value.
pub struct ValueData {
    pub def: ValueDef,
    pub ty: TypeRef,
}

/// Data for a basic block.
pub struct BlockData {
    pub args: Vec<TypeRef>,
    pub ops: SmallVec<[OpRef; 8]>,
    pub parent_region: Option<RegionRef>,
}

impl BlockData {
    pub fn new(args: Vec<TypeRef>) -> Self {
        Self {
            args,
            ops: SmallVec::new(),
            parent_region: None,
        }
    }
}

/// Data for a region (list of blocks).
pub struct RegionData {
    pub blocks: SmallVec<[BlockRef; 1]>,
    pub parent_op: Option<OpRef>,
}

impl RegionData {
    pub fn new(blocks: impl IntoIterator<Item = BlockRef>) -> Self {
        Self {
            blocks: blocks.into_iter().collect(),
            parent_op: None,
        }
    }
}

// ============================================================================
// IrContext
// ============================================================================

/// Arena-based mutable operation graph.
///
/// Owns all entities and provides methods for creating, querying,
/// and mutating them. Use-chains are automatically maintained.
pub struct IrContext {
    ops: PrimaryMap<OpRef, OperationData>,
    values: PrimaryMap<ValueRef, ValueData>,
    blocks: PrimaryMap<BlockRef, BlockData>,
    regions: PrimaryMap<RegionRef, RegionData>,

    /// Use-chain: for each value, the list of operations that use it.
    uses: SecondaryMap<ValueRef, SmallVec<[Use; 2]>>,

    pub types: TypeInterner,

    /// Backing pools for EntityList storage.
    value_pool: ListPool<ValueRef>,
    type_pool: ListPool<TypeRef>,

    /// Mapping from operation to its result ValueRefs.
    result_values: SecondaryMap<OpRef, EntityList<ValueRef>>,
    /// Mapping from block to its argument ValueRefs.
    block_arg_values: SecondaryMap<BlockRef, EntityList<ValueRef>>,
}

impl IrContext {
    pub fn new() -> Self {
        Self {
            ops: PrimaryMap::new(),
            values: PrimaryMap::new(),
            blocks: PrimaryMap::new(),
            regions: PrimaryMap::new(),
            uses: SecondaryMap::new(),
            types: TypeInterner::new(),
            value_pool: ListPool::new(),
            type_pool: ListPool::new(),
            result_values: SecondaryMap::new(),
            block_arg_values: SecondaryMap::new(),
        }
    }

    // ========================================================================
    // Operation
    // ========================================================================

    /// Create a new operation and allocate result values for it.
    ///
    /// The operation's operands are registered in the use-chain.
    /// Use `push_op` or `insert_op_before` to attach it to a block.
    ///
    /// # Panics
    ///
    /// Panics if `data.parent_block` is `Some`, or if any region in
    /// `data.regions` already belongs to another operation.
    pub fn create_op(&mut self, data: OperationData) -> OpRef {
        assert!(
            data.parent_block.is_none(),
            "create_op: operation must not have parent_block set; \
             use push_op to attach to a block after creation",
        );

        let operand_slice: SmallVec<[ValueRef; 8]> =
            data.operands.as_slice(&self.value_pool).into();
        let result_types: SmallVec<[TypeRef; 2]> = data.results.as_slice(&self.type_pool).into();
        let regions = data.regions.clone();

        let op = self.ops.push(data);

        for &r in &regions {
            if let Some(existing) = self.regions[r].parent_op {
                panic!(
                    "create_op: region {r} already belongs to operation {existing}; \
                     cannot reassign to {op}",
                );
            }
            self.regions[r].parent_op = Some(op);
        }

        for (idx, &val) in operand_slice.iter().enumerate() {
            self.uses[val].push(Use {
                user: op,
                operand_index: idx as u32,
            });
        }

        let mut result_value_list = EntityList::new();
        for (idx, &ty) in result_types.iter().enumerate() {
            let v = self.values.push(ValueData {
                def: ValueDef::OpResult(op, idx as u32),
                ty,
            });
            result_value_list.push(v, &mut self.value_pool);
        }
        self.result_values[op] = result_value_list;

        op
    }

    pub fn op(&self, op: OpRef) -> &OperationData {
        &self.ops[op]
    }

    pub fn op_kind(&self, op: OpRef) -> OpKind {
        self.ops[op].kind
    }

    pub fn op_operands(&self, op: OpRef) -> &[ValueRef] {
        self.ops[op].operands.as_slice(&self.value_pool)
    }

    pub fn op_result_types(&self, op: OpRef) -> &[TypeRef] {
        self.ops[op].results.as_slice(&self.type_pool)
    }

    /// Get the i-th result value of an operation.
    pub fn op_result(&self, op: OpRef, index: u32) -> ValueRef {
        self.result_values[op].as_slice(&self.value_pool)[index as usize]
    }

    pub fn op_results(&self, op: OpRef) -> &[ValueRef] {
        self.result_values[op].as_slice(&self.value_pool)
    }

    /// Remove an operation, clearing its use-chain entries.
    ///
    /// Does NOT remove it from its parent block. Use `remove_op_from_block` first.
    ///
    /// # Panics
    ///
    /// Panics if the operation is still attached to a block, or if any
    /// result value still has uses.
    pub fn remove_op(&mut self, op: OpRef) {
        if let Some(block) = self.ops[op].parent_block {
            panic!(
                "remove_op: operation {op} is still attached to {block}; \
                 call remove_op_from_block first"
            );
        }

        let results: SmallVec<[ValueRef; 2]> =
            self.result_values[op].as_slice(&self.value_pool).into();
        for &val in &results {
            assert!(
                self.uses[val].is_empty(),
                "remove_op: result value {val} still has {} use(s); \
                 replace all uses before removing the operation",
                self.uses[val].len()
            );
        }

        let operands: SmallVec<[ValueRef; 8]> =
            self.ops[op].operands.as_slice(&self.value_pool).into();
        for (idx, &val) in operands.iter().enumerate() {
            self.uses[val].retain(|u| !(u.user == op && u.operand_index == idx as u32));
        }
    }

    // === Attributes ===

    pub fn attr(&self, op: OpRef, key: &str) -> Option<&Attribute> {
        self.ops[op].attributes.get(key)
    }

    pub fn int_attr(&self, op: OpRef, key: &str) -> Option<i64> {
        self.attr(op, key).and_then(Attribute::as_int)
    }

    pub fn bool_attr(&self, op: OpRef, key: &str) -> Option<bool> {
        self.attr(op, key).and_then(Attribute::as_bool)
    }

    pub fn str_attr(&self, op: OpRef, key: &str) -> Option<&str> {
        self.attr(op, key).and_then(Attribute::as_str)
    }

    // ========================================================================
    // Value
    // ========================================================================

    pub fn value(&self, v: ValueRef) -> &ValueData {
        &self.values[v]
    }

    pub fn value_ty(&self, v: ValueRef) -> TypeRef {
        self.values[v].ty
    }

    pub fn value_def(&self, v: ValueRef) -> ValueDef {
        self.values[v].def
    }

    /// The operation producing `v`, or `None` for block arguments.
    pub fn defining_op(&self, v: ValueRef) -> Option<OpRef> {
        match self.values[v].def {
            ValueDef::OpResult(op, _) => Some(op),
            ValueDef::BlockArg(..) => None,
        }
    }

    // ========================================================================
    // Block
    // ========================================================================

    /// Create a new block and allocate argument values for it.
    pub fn create_block(&mut self, data: BlockData) -> BlockRef {
        let arg_types = data.args.clone();
        let block = self.blocks.push(data);

        let mut arg_value_list = EntityList::new();
        for (idx, ty) in arg_types.into_iter().enumerate() {
            let v = self.values.push(ValueData {
                def: ValueDef::BlockArg(block, idx as u32),
                ty,
            });
            arg_value_list.push(v, &mut self.value_pool);
        }
        self.block_arg_values[block] = arg_value_list;

        block
    }

    pub fn block(&self, b: BlockRef) -> &BlockData {
        &self.blocks[b]
    }

    pub fn block_arg(&self, b: BlockRef, index: u32) -> ValueRef {
        self.block_arg_values[b].as_slice(&self.value_pool)[index as usize]
    }

    pub fn block_args(&self, b: BlockRef) -> &[ValueRef] {
        self.block_arg_values[b].as_slice(&self.value_pool)
    }

    /// Append an operation to the end of a block.
    ///
    /// # Panics
    ///
    /// Panics if the operation already belongs to a block.
    pub fn push_op(&mut self, block: BlockRef, op: OpRef) {
        if let Some(existing) = self.ops[op].parent_block {
            panic!("push_op: operation {op} already belongs to {existing}");
        }
        self.ops[op].parent_block = Some(block);
        self.blocks[block].ops.push(op);
    }

    /// Insert an operation before `before` in the given block.
    ///
    /// # Panics
    ///
    /// Panics if the operation already belongs to a block, or if `before`
    /// is not found in the block.
    pub fn insert_op_before(&mut self, block: BlockRef, before: OpRef, op: OpRef) {
        if let Some(existing) = self.ops[op].parent_block {
            panic!("insert_op_before: operation {op} already belongs to {existing}");
        }
        let ops = &mut self.blocks[block].ops;
        let Some(pos) = ops.iter().position(|&o| o == before) else {
            panic!("insert_op_before: {before} not found in {block}");
        };
        ops.insert(pos, op);
        self.ops[op].parent_block = Some(block);
    }

    /// Remove an operation from a block (does not destroy the operation).
    pub fn remove_op_from_block(&mut self, block: BlockRef, op: OpRef) {
        self.blocks[block].ops.retain(|o| *o != op);
        if self.ops[op].parent_block == Some(block) {
            self.ops[op].parent_block = None;
        }
    }

    // ========================================================================
    // Region
    // ========================================================================

    /// Create a new region.
    ///
    /// # Panics
    ///
    /// Panics if any block in `data.blocks` already belongs to another region.
    pub fn create_region(&mut self, data: RegionData) -> RegionRef {
        let region = self.regions.push(data);

        let blocks = self.regions[region].blocks.clone();
        for &b in &blocks {
            if let Some(existing) = self.blocks[b].parent_region {
                panic!(
                    "create_region: block {b} already belongs to region {existing}; \
                     cannot reassign to {region}",
                );
            }
            self.blocks[b].parent_region = Some(region);
        }

        region
    }

    pub fn region(&self, r: RegionRef) -> &RegionData {
        &self.regions[r]
    }

    // ========================================================================
    // Use-chain
    // ========================================================================

    pub fn uses(&self, v: ValueRef) -> &[Use] {
        &self.uses[v]
    }

    pub fn has_uses(&self, v: ValueRef) -> bool {
        !self.uses[v].is_empty()
    }

    /// Distinct operations using `v`, in use-chain order.
    pub fn users(&self, v: ValueRef) -> SmallVec<[OpRef; 4]> {
        let mut users: SmallVec<[OpRef; 4]> = SmallVec::new();
        for u in &self.uses[v] {
            if !users.contains(&u.user) {
                users.push(u.user);
            }
        }
        users
    }

    // ========================================================================
    // RAUW (Replace All Uses With)
    // ========================================================================

    /// Replace all uses of `old` with `new` in all operations.
    ///
    /// Updates both operand lists and the use-chain.
    pub fn replace_all_uses(&mut self, old: ValueRef, new: ValueRef) {
        if old == new {
            return;
        }
        let old_uses = std::mem::take(&mut self.uses[old]);

        for u in &old_uses {
            let operands = &mut self.ops[u.user].operands;
            let slice = operands.as_mut_slice(&mut self.value_pool);
            debug_assert_eq!(slice[u.operand_index as usize], old);
            slice[u.operand_index as usize] = new;

            self.uses[new].push(*u);
        }
    }
}

impl Default for IrContext {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// OperationDataBuilder
// ============================================================================

/// Builder for constructing `OperationData` with pool-backed lists.
///
/// Collects operands and result types into `Vec`s, then packs them
/// into `EntityList`s on `build()`.
pub struct OperationDataBuilder {
    kind: OpKind,
    operands: Vec<ValueRef>,
    results: Vec<TypeRef>,
    attributes: BTreeMap<&'static str, Attribute>,
    regions: SmallVec<[RegionRef; 1]>,
}

impl OperationDataBuilder {
    pub fn new(kind: OpKind) -> Self {
        Self {
            kind,
            operands: Vec::new(),
            results: Vec::new(),
            attributes: BTreeMap::new(),
            regions: SmallVec::new(),
        }
    }

    pub fn operand(mut self, v: ValueRef) -> Self {
        self.operands.push(v);
        self
    }

    pub fn operands(mut self, vs: impl IntoIterator<Item = ValueRef>) -> Self {
        self.operands.extend(vs);
        self
    }

    pub fn result(mut self, ty: TypeRef) -> Self {
        self.results.push(ty);
        self
    }

    pub fn attr(mut self, key: &'static str, val: impl Into<Attribute>) -> Self {
        self.attributes.insert(key, val.into());
        self
    }

    pub fn region(mut self, r: RegionRef) -> Self {
        self.regions.push(r);
        self
    }

    /// Build the `OperationData`, packing vecs into `EntityList`s using
    /// the context's pools.
    pub fn build(self, ctx: &mut IrContext) -> OperationData {
        let mut operands = EntityList::new();
        for v in self.operands {
            operands.push(v, &mut ctx.value_pool);
        }
        let mut results = EntityList::new();
        for ty in self.results {
            results.push(ty, &mut ctx.type_pool);
        }
        OperationData {
            kind: self.kind,
            operands,
            results,
            attributes: self.attributes,
            regions: self.regions,
            parent_block: None,
        }
    }

    /// Build and create the operation in one step.
    pub fn create(self, ctx: &mut IrContext) -> OpRef {
        let data = self.build(ctx);
        ctx.create_op(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn i32_type(ctx: &mut IrContext) -> TypeRef {
        ctx.types.int(32)
    }

    fn constant(ctx: &mut IrContext, ty: TypeRef, value: i64) -> OpRef {
        OperationDataBuilder::new(OpKind::Constant)
            .result(ty)
            .attr("value", value)
            .create(ctx)
    }

    #[test]
    fn create_op_and_read_back() {
        let mut ctx = IrContext::new();
        let i32_ty = i32_type(&mut ctx);

        let op = constant(&mut ctx, i32_ty, 42);

        assert_eq!(ctx.op_kind(op), OpKind::Constant);
        assert_eq!(ctx.op_result_types(op), &[i32_ty]);
        assert_eq!(ctx.int_attr(op, "value"), Some(42));
        assert_eq!(ctx.value_def(ctx.op_result(op, 0)), ValueDef::OpResult(op, 0));
    }

    #[test]
    fn block_args_and_defining_op() {
        let mut ctx = IrContext::new();
        let i32_ty = i32_type(&mut ctx);

        let block = ctx.create_block(BlockData::new(vec![i32_ty, i32_ty]));
        let a0 = ctx.block_arg(block, 0);
        let a1 = ctx.block_arg(block, 1);
        assert_ne!(a0, a1);
        assert_eq!(ctx.value_def(a1), ValueDef::BlockArg(block, 1));
        assert_eq!(ctx.defining_op(a0), None);

        let op = constant(&mut ctx, i32_ty, 1);
        let v = ctx.op_result(op, 0);
        assert_eq!(ctx.defining_op(v), Some(op));
    }

    #[test]
    fn use_chain_tracking() {
        let mut ctx = IrContext::new();
        let i32_ty = i32_type(&mut ctx);

        let op1 = constant(&mut ctx, i32_ty, 1);
        let v1 = ctx.op_result(op1, 0);
        assert!(!ctx.has_uses(v1));

        let op2 = OperationDataBuilder::new(OpKind::AddI)
            .operands([v1, v1])
            .result(i32_ty)
            .create(&mut ctx);

        let uses = ctx.uses(v1);
        assert_eq!(uses.len(), 2);
        assert_eq!(uses[0].user, op2);
        assert_eq!(uses[1].operand_index, 1);
        assert_eq!(ctx.users(v1).as_slice(), &[op2]);
    }

    #[test]
    fn rauw() {
        let mut ctx = IrContext::new();
        let i32_ty = i32_type(&mut ctx);

        let op1 = constant(&mut ctx, i32_ty, 1);
        let v_old = ctx.op_result(op1, 0);
        let op2 = constant(&mut ctx, i32_ty, 2);
        let v_new = ctx.op_result(op2, 0);

        let op3 = OperationDataBuilder::new(OpKind::AddI)
            .operands([v_old, v_old])
            .result(i32_ty)
            .create(&mut ctx);

        ctx.replace_all_uses(v_old, v_new);

        assert!(!ctx.has_uses(v_old));
        assert_eq!(ctx.uses(v_new).len(), 2);
        assert_eq!(ctx.op_operands(op3), &[v_new, v_new]);
    }

    #[test]
    fn parent_tracking_and_insertion() {
        let mut ctx = IrContext::new();
        let i32_ty = i32_type(&mut ctx);

        let block = ctx.create_block(BlockData::new(vec![]));
        let op_a = constant(&mut ctx, i32_ty, 1);
        let op_c = constant(&mut ctx, i32_ty, 3);
        ctx.push_op(block, op_a);
        ctx.push_op(block, op_c);

        let op_b = constant(&mut ctx, i32_ty, 2);
        ctx.insert_op_before(block, op_c, op_b);
        assert_eq!(ctx.block(block).ops.as_slice(), &[op_a, op_b, op_c]);
        assert_eq!(ctx.op(op_b).parent_block, Some(block));

        ctx.remove_op_from_block(block, op_b);
        assert_eq!(ctx.block(block).ops.as_slice(), &[op_a, op_c]);
        assert_eq!(ctx.op(op_b).parent_block, None);

        let region = ctx.create_region(RegionData::new([block]));
        assert_eq!(ctx.block(block).parent_region, Some(region));
    }

    #[test]
    #[should_panic(expected = "still has")]
    fn remove_op_panics_when_result_has_uses() {
        let mut ctx = IrContext::new();
        let i32_ty = i32_type(&mut ctx);

        let op1 = constant(&mut ctx, i32_ty, 1);
        let v1 = ctx.op_result(op1, 0);
        let _op2 = OperationDataBuilder::new(OpKind::AddI)
            .operands([v1, v1])
            .result(i32_ty)
            .create(&mut ctx);

        ctx.remove_op(op1);
    }

    #[test]
    #[should_panic(expected = "already belongs to region")]
    fn create_region_panics_when_block_already_owned() {
        let mut ctx = IrContext::new();
        let block = ctx.create_block(BlockData::new(vec![]));
        let _r1 = ctx.create_region(RegionData::new([block]));
        ctx.create_region(RegionData::new([block]));
    }
}
