//! Type interning and attribute values for the operation graph.

use std::collections::HashMap;
use std::fmt::Write;

use cranelift_entity::PrimaryMap;
use smallvec::SmallVec;

use crate::ops::{CombiningKind, FloatPredicate, IntPredicate, PermutationMap};
use crate::refs::TypeRef;

// ============================================================================
// Attribute
// ============================================================================

/// Named constants attached to an operation.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Attribute {
    /// Unit/nil value.
    Unit,
    Bool(bool),
    /// Integer constant stored as raw bits (signless).
    IntBits(u64),
    /// Float constant stored as raw `f64` bits.
    FloatBits(u64),
    String(String),
    Type(TypeRef),
    /// List of attributes.
    List(Vec<Attribute>),
    IntPredicate(IntPredicate),
    FloatPredicate(FloatPredicate),
    Combining(CombiningKind),
    Map(PermutationMap),
}

impl Attribute {
    pub fn float(value: f64) -> Self {
        Attribute::FloatBits(value.to_bits())
    }

    /// Interpret an `IntBits` attribute as a signed integer.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Attribute::IntBits(bits) => Some(i64::from_ne_bytes(bits.to_ne_bytes())),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Attribute::FloatBits(bits) => Some(f64::from_bits(*bits)),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Attribute::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Attribute::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<i64> for Attribute {
    fn from(value: i64) -> Self {
        Attribute::IntBits(u64::from_ne_bytes(value.to_ne_bytes()))
    }
}

impl From<u64> for Attribute {
    fn from(value: u64) -> Self {
        Attribute::IntBits(value)
    }
}

impl From<bool> for Attribute {
    fn from(value: bool) -> Self {
        Attribute::Bool(value)
    }
}

impl From<Vec<Attribute>> for Attribute {
    fn from(value: Vec<Attribute>) -> Self {
        Attribute::List(value)
    }
}

impl From<String> for Attribute {
    fn from(value: String) -> Self {
        Attribute::String(value)
    }
}

impl From<&str> for Attribute {
    fn from(value: &str) -> Self {
        Attribute::String(value.to_string())
    }
}

impl From<IntPredicate> for Attribute {
    fn from(value: IntPredicate) -> Self {
        Attribute::IntPredicate(value)
    }
}

impl From<FloatPredicate> for Attribute {
    fn from(value: FloatPredicate) -> Self {
        Attribute::FloatPredicate(value)
    }
}

impl From<CombiningKind> for Attribute {
    fn from(value: CombiningKind) -> Self {
        Attribute::Combining(value)
    }
}

impl From<PermutationMap> for Attribute {
    fn from(value: PermutationMap) -> Self {
        Attribute::Map(value)
    }
}

// ============================================================================
// TypeData
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Signedness {
    Signless,
    Signed,
    Unsigned,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FloatFormat {
    F16,
    BF16,
    F32,
}

impl FloatFormat {
    pub fn width(self) -> u32 {
        match self {
            FloatFormat::F16 | FloatFormat::BF16 => 16,
            FloatFormat::F32 => 32,
        }
    }
}

/// Data for a single interned type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeData {
    Int { width: u32, signedness: Signedness },
    Float(FloatFormat),
    Index,
    /// One-dimensional vector of scalar elements.
    Vector { lanes: u32, elem: TypeRef },
    /// Row-major memory buffer addressed by strided loads.
    MemRef {
        shape: SmallVec<[u32; 2]>,
        elem: TypeRef,
    },
}

/// Lane layout of a vector type, resolved against the interner.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VectorShape {
    pub lanes: u32,
    pub elem: TypeRef,
    pub elem_bits: u32,
    pub is_float: bool,
}

impl VectorShape {
    /// Total size of the vector in bits.
    pub fn bits(&self) -> u32 {
        self.lanes * self.elem_bits
    }

    /// `(lane count, element width)` pair used by the lane/width tables.
    pub fn pair(&self) -> (u32, u32) {
        (self.lanes, self.elem_bits)
    }
}

// ============================================================================
// TypeInterner
// ============================================================================

/// Deduplicating type interner. Same `TypeData` always yields the same `TypeRef`.
pub struct TypeInterner {
    types: PrimaryMap<TypeRef, TypeData>,
    dedup: HashMap<TypeData, TypeRef>,
}

impl TypeInterner {
    pub fn new() -> Self {
        Self {
            types: PrimaryMap::new(),
            dedup: HashMap::default(),
        }
    }

    /// Intern a type, returning an existing ref if the data matches.
    pub fn intern(&mut self, data: TypeData) -> TypeRef {
        if let Some(&existing) = self.dedup.get(&data) {
            return existing;
        }
        let r = self.types.push(data.clone());
        self.dedup.insert(data, r);
        r
    }

    /// Look up type data by reference.
    pub fn get(&self, r: TypeRef) -> &TypeData {
        &self.types[r]
    }

    // === Constructors ===

    pub fn int(&mut self, width: u32) -> TypeRef {
        self.intern(TypeData::Int {
            width,
            signedness: Signedness::Signless,
        })
    }

    pub fn uint(&mut self, width: u32) -> TypeRef {
        self.intern(TypeData::Int {
            width,
            signedness: Signedness::Unsigned,
        })
    }

    pub fn float(&mut self, format: FloatFormat) -> TypeRef {
        self.intern(TypeData::Float(format))
    }

    pub fn index(&mut self) -> TypeRef {
        self.intern(TypeData::Index)
    }

    pub fn vector(&mut self, lanes: u32, elem: TypeRef) -> TypeRef {
        self.intern(TypeData::Vector { lanes, elem })
    }

    pub fn memref(&mut self, shape: &[u32], elem: TypeRef) -> TypeRef {
        self.intern(TypeData::MemRef {
            shape: shape.into(),
            elem,
        })
    }

    // === Queries ===

    pub fn is_vector(&self, ty: TypeRef) -> bool {
        matches!(self.get(ty), TypeData::Vector { .. })
    }

    pub fn is_float(&self, ty: TypeRef) -> bool {
        matches!(self.get(ty), TypeData::Float(_))
    }

    /// Bit width of a scalar integer or float type.
    pub fn scalar_bits(&self, ty: TypeRef) -> Option<u32> {
        match self.get(ty) {
            TypeData::Int { width, .. } => Some(*width),
            TypeData::Float(format) => Some(format.width()),
            _ => None,
        }
    }

    /// Element type of a vector or memref; scalars are their own element type.
    pub fn element_type(&self, ty: TypeRef) -> TypeRef {
        match self.get(ty) {
            TypeData::Vector { elem, .. } | TypeData::MemRef { elem, .. } => *elem,
            _ => ty,
        }
    }

    pub fn vector_shape(&self, ty: TypeRef) -> Option<VectorShape> {
        let TypeData::Vector { lanes, elem } = self.get(ty) else {
            return None;
        };
        Some(VectorShape {
            lanes: *lanes,
            elem: *elem,
            elem_bits: self.scalar_bits(*elem)?,
            is_float: self.is_float(*elem),
        })
    }

    /// Render a type in its textual form, e.g. `vector<32xi16>`.
    pub fn render(&self, ty: TypeRef) -> String {
        let mut out = String::new();
        self.render_into(&mut out, ty);
        out
    }

    fn render_into(&self, out: &mut String, ty: TypeRef) {
        match self.get(ty) {
            TypeData::Int { width, signedness } => {
                let prefix = match signedness {
                    Signedness::Signless => "i",
                    Signedness::Signed => "si",
                    Signedness::Unsigned => "ui",
                };
                let _ = write!(out, "{prefix}{width}");
            }
            TypeData::Float(FloatFormat::F16) => out.push_str("f16"),
            TypeData::Float(FloatFormat::BF16) => out.push_str("bf16"),
            TypeData::Float(FloatFormat::F32) => out.push_str("f32"),
            TypeData::Index => out.push_str("index"),
            TypeData::Vector { lanes, elem } => {
                let _ = write!(out, "vector<{lanes}x");
                self.render_into(out, *elem);
                out.push('>');
            }
            TypeData::MemRef { shape, elem } => {
                out.push_str("memref<");
                for dim in shape {
                    let _ = write!(out, "{dim}x");
                }
                self.render_into(out, *elem);
                out.push('>');
            }
        }
    }
}

impl Default for TypeInterner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_interner_dedup() {
        let mut interner = TypeInterner::new();
        let r1 = interner.int(32);
        let r2 = interner.int(32);
        assert_eq!(r1, r2, "same TypeData must yield same TypeRef");
    }

    #[test]
    fn type_interner_distinct() {
        let mut interner = TypeInterner::new();
        let r1 = interner.int(32);
        let r2 = interner.uint(32);
        assert_ne!(r1, r2, "signedness is part of the type");
    }

    #[test]
    fn vector_shape_resolves_element_width() {
        let mut interner = TypeInterner::new();
        let i16_ty = interner.int(16);
        let v = interner.vector(32, i16_ty);
        let shape = interner.vector_shape(v).unwrap();
        assert_eq!(shape.pair(), (32, 16));
        assert_eq!(shape.bits(), 512);
        assert!(!shape.is_float);

        let bf16 = interner.float(FloatFormat::BF16);
        let fv = interner.vector(16, bf16);
        let fshape = interner.vector_shape(fv).unwrap();
        assert_eq!(fshape.bits(), 256);
        assert!(fshape.is_float);

        assert_eq!(interner.vector_shape(i16_ty), None);
    }

    #[test]
    fn render_types() {
        let mut interner = TypeInterner::new();
        let i8_ty = interner.int(8);
        let u32_ty = interner.uint(32);
        let f32_ty = interner.float(FloatFormat::F32);
        let v = interner.vector(64, i8_ty);
        let m = interner.memref(&[4, 256], f32_ty);
        assert_eq!(interner.render(v), "vector<64xi8>");
        assert_eq!(interner.render(u32_ty), "ui32");
        assert_eq!(interner.render(m), "memref<4x256xf32>");
    }

    #[test]
    fn attribute_int_round_trip() {
        let attr = Attribute::from(-68i64);
        assert_eq!(attr.as_int(), Some(-68));
        assert_eq!(Attribute::float(1.5).as_float(), Some(1.5));
    }
}
