//! Hardware generations and their lane/width tables.

use std::fmt;
use std::str::FromStr;

use vecsel_ir::{FloatFormat, TypeData, TypeInterner, TypeRef, VectorShape};

use crate::errors::LowerError;

/// Target hardware generation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TargetGeneration {
    /// Generation 1: 256-bit vector registers, shuffle-attributed
    /// `add`/`sub`/`fma` instructions, 48/80-bit accumulators.
    #[default]
    Aie,
    /// Generation 2: 512-bit vector registers, elementwise instructions,
    /// 32/64-bit accumulators.
    AieMl,
}

impl TargetGeneration {
    pub fn selector(self) -> &'static str {
        match self {
            TargetGeneration::Aie => "aie",
            TargetGeneration::AieMl => "aieml",
        }
    }

    /// Width of a native vector register in bits.
    pub fn native_vector_bits(self) -> u32 {
        match self {
            TargetGeneration::Aie => 256,
            TargetGeneration::AieMl => 512,
        }
    }

    /// Largest effective access a single `upd` may perform.
    pub fn max_load_bits(self) -> u32 {
        2 * self.native_vector_bits()
    }
}

impl fmt::Display for TargetGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.selector())
    }
}

impl FromStr for TargetGeneration {
    type Err = LowerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "aie" => Ok(TargetGeneration::Aie),
            "aieml" => Ok(TargetGeneration::AieMl),
            other => Err(LowerError::unknown_target(other)),
        }
    }
}

/// (lanes, element bits) pairs of the generation-2 elementwise add/sub
/// and integer add reduction.
pub const ELEMENTWISE_SHAPES: [(u32, u32); 4] = [(64, 8), (32, 16), (16, 32), (32, 32)];

/// Element widths of the generation-2 min/max/cmp/sel instructions.
pub const FULL_REGISTER_WIDTHS: [u32; 3] = [8, 16, 32];

/// Size of the register the generation-2 min/max/cmp/sel instructions
/// operate on.
pub const FULL_REGISTER_BITS: u32 = 512;

pub fn is_elementwise_shape(shape: &VectorShape) -> bool {
    ELEMENTWISE_SHAPES.contains(&shape.pair())
}

/// Exactly one 512-bit register of 8, 16 or 32-bit lanes.
pub fn is_full_register(shape: &VectorShape) -> bool {
    FULL_REGISTER_WIDTHS.contains(&shape.elem_bits) && shape.bits() == FULL_REGISTER_BITS
}

/// Accumulator form of vector type `ty` on `generation`, keeping the lane
/// count. `None` if `ty` is not a vector.
pub fn accumulator_type(
    types: &mut TypeInterner,
    ty: TypeRef,
    generation: TargetGeneration,
) -> Option<TypeRef> {
    let shape = types.vector_shape(ty)?;
    let elem = match (types.get(shape.elem).clone(), generation) {
        (TypeData::Int { width, .. }, TargetGeneration::AieMl) => {
            types.int(if width <= 16 { 32 } else { 64 })
        }
        (TypeData::Int { width, .. }, TargetGeneration::Aie) => {
            types.int(if width <= 16 { 48 } else { 80 })
        }
        (TypeData::Float(format), TargetGeneration::AieMl) if format.width() == 16 => {
            types.float(FloatFormat::F32)
        }
        _ => shape.elem,
    };
    Some(types.vector(shape.lanes, elem))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_selector() {
        assert_eq!("aie".parse::<TargetGeneration>().unwrap(), TargetGeneration::Aie);
        assert_eq!("aieml".parse::<TargetGeneration>().unwrap(), TargetGeneration::AieMl);
        let err = "aie3".parse::<TargetGeneration>().unwrap_err();
        assert_eq!(err.to_string(), "unknown target 'aie3'");
    }

    #[test]
    fn accumulator_types() {
        let mut types = TypeInterner::new();
        let i8_ty = types.int(8);
        let i32_ty = types.int(32);
        let bf16 = types.float(FloatFormat::BF16);
        let f32_ty = types.float(FloatFormat::F32);
        let v_i8 = types.vector(32, i8_ty);
        let v_i32 = types.vector(16, i32_ty);
        let v_bf16 = types.vector(16, bf16);
        let v_f32 = types.vector(16, f32_ty);

        let render = |types: &mut TypeInterner, ty, generation| {
            let acc = accumulator_type(types, ty, generation).unwrap();
            types.render(acc)
        };
        assert_eq!(render(&mut types, v_i8, TargetGeneration::AieMl), "vector<32xi32>");
        assert_eq!(render(&mut types, v_i32, TargetGeneration::AieMl), "vector<16xi64>");
        assert_eq!(render(&mut types, v_bf16, TargetGeneration::AieMl), "vector<16xf32>");
        assert_eq!(render(&mut types, v_f32, TargetGeneration::AieMl), "vector<16xf32>");
        assert_eq!(render(&mut types, v_i8, TargetGeneration::Aie), "vector<32xi48>");
        assert_eq!(render(&mut types, v_i32, TargetGeneration::Aie), "vector<16xi80>");
        assert_eq!(render(&mut types, v_bf16, TargetGeneration::Aie), "vector<16xbf16>");
        assert_eq!(accumulator_type(&mut types, i32_ty, TargetGeneration::Aie), None);
    }

    #[test]
    fn shape_tables() {
        let mut types = TypeInterner::new();
        let i16_ty = types.int(16);
        let i32_ty = types.int(32);
        let v32xi16 = types.vector(32, i16_ty);
        let v8xi32 = types.vector(8, i32_ty);
        let a = types.vector_shape(v32xi16).unwrap();
        let b = types.vector_shape(v8xi32).unwrap();
        assert!(is_elementwise_shape(&a) && is_full_register(&a));
        assert!(!is_elementwise_shape(&b) && !is_full_register(&b));
    }
}
