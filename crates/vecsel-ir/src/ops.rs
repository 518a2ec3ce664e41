//! Closed operation vocabulary.
//!
//! Every operation in the graph carries an [`OpKind`]. Generic input
//! operations live in the `arith` and `vector` dialects; target instructions
//! live in `aievec`. The kind determines the dialect, the printed mnemonic
//! and whether the operation may be removed when its results are unused.

use std::fmt;

/// Namespace an operation kind belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Dialect {
    Func,
    Builtin,
    Arith,
    Vector,
    AieVec,
}

impl Dialect {
    pub fn name(self) -> &'static str {
        match self {
            Dialect::Func => "func",
            Dialect::Builtin => "builtin",
            Dialect::Arith => "arith",
            Dialect::Vector => "vector",
            Dialect::AieVec => "aievec",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

macro_rules! op_kinds {
    ($($dialect:ident { $($variant:ident => $mnemonic:literal),* $(,)? })*) => {
        /// Tag identifying what an operation computes.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum OpKind {
            $($($variant,)*)*
        }

        impl OpKind {
            /// All kinds, in declaration order.
            pub const ALL: &'static [OpKind] = &[$($(OpKind::$variant,)*)*];

            pub fn dialect(self) -> Dialect {
                match self {
                    $($(OpKind::$variant => Dialect::$dialect,)*)*
                }
            }

            pub fn mnemonic(self) -> &'static str {
                match self {
                    $($(OpKind::$variant => $mnemonic,)*)*
                }
            }
        }
    };
}

op_kinds! {
    Func {
        Func => "func",
        Return => "return",
    }
    Builtin {
        UnrealizedCast => "unrealized_conversion_cast",
    }
    Arith {
        Constant => "constant",
        AddI => "addi",
        AddF => "addf",
        SubI => "subi",
        SubF => "subf",
        MulI => "muli",
        MulF => "mulf",
        MinSI => "minsi",
        MaxSI => "maxsi",
        MinF => "minf",
        MaxF => "maxf",
        CmpI => "cmpi",
        CmpF => "cmpf",
        Select => "select",
        ExtSI => "extsi",
        ExtF => "extf",
    }
    Vector {
        Reduction => "reduction",
        Broadcast => "broadcast",
        Extract => "extract",
        TransferRead => "transfer_read",
    }
    AieVec {
        Upd => "upd",
        Ups => "ups",
        Srs => "srs",
        Cast => "cast",
        Concat => "concat",
        Ext => "ext",
        Shift => "shift",
        ExtElem => "ext_elem",
        BroadcastLane => "broadcast",
        BroadcastScalar => "broadcast_scalar",
        Add => "add",
        Sub => "sub",
        Mul => "mul",
        Fma => "fma",
        AddElem => "add_elem",
        SubElem => "sub_elem",
        MulElem => "mul_elem",
        FmaElem => "fma_elem",
        Min => "min",
        Max => "max",
        Cmp => "cmp",
        Sel => "sel",
    }
}

impl OpKind {
    /// Whether the operation is free of side effects.
    pub fn is_pure(self) -> bool {
        !matches!(self, OpKind::Return)
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.dialect(), self.mnemonic())
    }
}

// ============================================================================
// Predicates
// ============================================================================

/// Integer comparison predicate (`arith.cmpi`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IntPredicate {
    Eq,
    Ne,
    Slt,
    Sle,
    Sgt,
    Sge,
    Ult,
    Ule,
    Ugt,
    Uge,
}

impl IntPredicate {
    pub fn mnemonic(self) -> &'static str {
        match self {
            IntPredicate::Eq => "eq",
            IntPredicate::Ne => "ne",
            IntPredicate::Slt => "slt",
            IntPredicate::Sle => "sle",
            IntPredicate::Sgt => "sgt",
            IntPredicate::Sge => "sge",
            IntPredicate::Ult => "ult",
            IntPredicate::Ule => "ule",
            IntPredicate::Ugt => "ugt",
            IntPredicate::Uge => "uge",
        }
    }
}

/// Floating-point comparison predicate (`arith.cmpf`).
///
/// `O*` predicates are ordered (false if either operand is NaN), `U*` are
/// unordered (true if either operand is NaN).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FloatPredicate {
    AlwaysFalse,
    Oeq,
    Ogt,
    Oge,
    Olt,
    Ole,
    One,
    Ord,
    Ueq,
    Ugt,
    Uge,
    Ult,
    Ule,
    Une,
    Uno,
    AlwaysTrue,
}

impl FloatPredicate {
    pub fn mnemonic(self) -> &'static str {
        match self {
            FloatPredicate::AlwaysFalse => "false",
            FloatPredicate::Oeq => "oeq",
            FloatPredicate::Ogt => "ogt",
            FloatPredicate::Oge => "oge",
            FloatPredicate::Olt => "olt",
            FloatPredicate::Ole => "ole",
            FloatPredicate::One => "one",
            FloatPredicate::Ord => "ord",
            FloatPredicate::Ueq => "ueq",
            FloatPredicate::Ugt => "ugt",
            FloatPredicate::Uge => "uge",
            FloatPredicate::Ult => "ult",
            FloatPredicate::Ule => "ule",
            FloatPredicate::Une => "une",
            FloatPredicate::Uno => "uno",
            FloatPredicate::AlwaysTrue => "true",
        }
    }
}

/// Combining function of a `vector.reduction`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CombiningKind {
    Add,
    Mul,
    MinSI,
    MinUI,
    MaxSI,
    MaxUI,
    MinF,
    MaxF,
}

impl CombiningKind {
    pub fn mnemonic(self) -> &'static str {
        match self {
            CombiningKind::Add => "add",
            CombiningKind::Mul => "mul",
            CombiningKind::MinSI => "minsi",
            CombiningKind::MinUI => "minui",
            CombiningKind::MaxSI => "maxsi",
            CombiningKind::MaxUI => "maxui",
            CombiningKind::MinF => "minf",
            CombiningKind::MaxF => "maxf",
        }
    }

    pub fn is_min(self) -> bool {
        matches!(
            self,
            CombiningKind::MinSI | CombiningKind::MinUI | CombiningKind::MinF
        )
    }

    pub fn is_max(self) -> bool {
        matches!(
            self,
            CombiningKind::MaxSI | CombiningKind::MaxUI | CombiningKind::MaxF
        )
    }
}

// ============================================================================
// Permutation maps
// ============================================================================

/// One result expression of a [`PermutationMap`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MapResult {
    /// The access follows memory dimension `d`.
    Dim(u32),
    /// The access is pinned to a constant index (a broadcast read).
    Constant(i64),
}

/// Mapping from memory dimensions to vector dimensions of a load.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PermutationMap {
    pub num_dims: u32,
    pub results: Vec<MapResult>,
}

impl PermutationMap {
    /// `(d0, ..., dn) -> (dn)`: a contiguous read along the innermost dimension.
    pub fn minor_identity(num_dims: u32) -> Self {
        Self {
            num_dims,
            results: vec![MapResult::Dim(num_dims.saturating_sub(1))],
        }
    }

    /// True when the map reads the innermost memory dimensions in order.
    pub fn is_minor_identity(&self) -> bool {
        let n = self.results.len() as u32;
        if n > self.num_dims {
            return false;
        }
        let first = self.num_dims - n;
        self.results
            .iter()
            .enumerate()
            .all(|(i, r)| *r == MapResult::Dim(first + i as u32))
    }

    /// True when every result is a constant.
    pub fn is_constant(&self) -> bool {
        !self.results.is_empty()
            && self
                .results
                .iter()
                .all(|r| matches!(r, MapResult::Constant(_)))
    }
}

impl fmt::Display for PermutationMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for d in 0..self.num_dims {
            if d > 0 {
                f.write_str(", ")?;
            }
            write!(f, "d{d}")?;
        }
        f.write_str(") -> (")?;
        for (i, r) in self.results.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            match r {
                MapResult::Dim(d) => write!(f, "d{d}")?,
                MapResult::Constant(c) => write!(f, "{c}")?,
            }
        }
        f.write_str(")")
    }
}

// ============================================================================
// Attribute keys
// ============================================================================

/// Attribute names used by the operation vocabulary.
pub mod attr {
    pub const VALUE: &str = "value";
    pub const SYM_NAME: &str = "sym_name";
    pub const PREDICATE: &str = "predicate";
    pub const KIND: &str = "kind";
    pub const POSITION: &str = "position";
    pub const PERMUTATION_MAP: &str = "permutation_map";

    pub const OFFSET: &str = "offset";
    pub const INDEX: &str = "index";
    pub const SHIFT: &str = "shift";
    pub const IS_RES_ACC: &str = "is_res_acc";
    pub const IS_ACC: &str = "is_acc";
    pub const IDX: &str = "idx";
    pub const PRED: &str = "pred";
    pub const FMSUB: &str = "fmsub";

    pub const XSTART: &str = "xstart";
    pub const XOFFSETS: &str = "xoffsets";
    pub const XOFFSETS_HI: &str = "xoffsets_hi";
    pub const XSTEP: &str = "xstep";
    pub const XSQUARE: &str = "xsquare";
    pub const ZSTART: &str = "zstart";
    pub const ZOFFSETS: &str = "zoffsets";
    pub const ZOFFSETS_HI: &str = "zoffsets_hi";
    pub const ZSTEP: &str = "zstep";
    pub const ZSQUARE: &str = "zsquare";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_display_includes_dialect() {
        assert_eq!(OpKind::AddI.to_string(), "arith.addi");
        assert_eq!(OpKind::TransferRead.to_string(), "vector.transfer_read");
        assert_eq!(OpKind::BroadcastLane.to_string(), "aievec.broadcast");
        assert_eq!(
            OpKind::UnrealizedCast.to_string(),
            "builtin.unrealized_conversion_cast"
        );
    }

    #[test]
    fn only_return_is_impure() {
        let impure: Vec<_> = OpKind::ALL.iter().filter(|k| !k.is_pure()).collect();
        assert_eq!(impure, vec![&OpKind::Return]);
    }

    #[test]
    fn minor_identity_detection() {
        assert!(PermutationMap::minor_identity(1).is_minor_identity());
        assert!(PermutationMap::minor_identity(2).is_minor_identity());

        let transposed = PermutationMap {
            num_dims: 2,
            results: vec![MapResult::Dim(0)],
        };
        assert!(!transposed.is_minor_identity());

        let splat = PermutationMap {
            num_dims: 1,
            results: vec![MapResult::Constant(0)],
        };
        assert!(!splat.is_minor_identity());
        assert!(splat.is_constant());
        assert_eq!(splat.to_string(), "(d0) -> (0)");
    }
}
