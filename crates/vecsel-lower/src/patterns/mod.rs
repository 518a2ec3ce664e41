//! Rewrite rules from generic vector operations to target instructions.
//!
//! Rules are grouped by what they lower; [`pattern_set`] assembles the rule
//! set of one hardware generation. Within a root kind, rules are tried in
//! registration order.

pub mod broadcast;
pub mod compare;
pub mod elementwise;
pub mod load;
pub mod mac;
pub mod mul;
pub mod reduction;
pub(crate) mod util;

use vecsel_ir::OpKind;
use vecsel_ir::rewrite::PatternSet;

use crate::options::LowerOptions;
use crate::target::TargetGeneration;

use broadcast::ExtractBroadcastToLane;
use compare::{CmpToMask, SelectToSel};
use elementwise::{AddSubToElem, MinMaxToElem, ShuffledAddSub};
use load::{SplitUpd, TransferReadToUpd};
use mac::{FoldBroadcastToFma, MulAddToFma, MulAddToFmaElem};
use mul::{MulFToMulElem, MulIToMulElem};
use reduction::{
    Bf16AddReduction, F32AddReduction, IntAddReduction, MaxReduction, MinReduction,
};

/// The rule set for `options.target`.
pub fn pattern_set(options: &LowerOptions) -> PatternSet {
    match options.target {
        TargetGeneration::Aie => aie_patterns(),
        TargetGeneration::AieMl => aieml_patterns(options.shift),
    }
}

fn aie_patterns() -> PatternSet {
    let max_vector_bits = TargetGeneration::Aie.native_vector_bits();
    PatternSet::new()
        .add(TransferReadToUpd)
        .add(SplitUpd { max_vector_bits })
        .add(MulAddToFma)
        .add(FoldBroadcastToFma)
        .add(ShuffledAddSub { kind: OpKind::AddI })
        .add(ShuffledAddSub { kind: OpKind::AddF })
        .add(ShuffledAddSub { kind: OpKind::SubI })
        .add(ShuffledAddSub { kind: OpKind::SubF })
}

fn aieml_patterns(shift: i64) -> PatternSet {
    let max_vector_bits = TargetGeneration::AieMl.native_vector_bits();
    PatternSet::new()
        .add(TransferReadToUpd)
        .add(SplitUpd { max_vector_bits })
        .add(MulAddToFmaElem { shift })
        .add(AddSubToElem { kind: OpKind::AddI })
        .add(AddSubToElem { kind: OpKind::SubI })
        .add(AddSubToElem { kind: OpKind::AddF })
        .add(AddSubToElem { kind: OpKind::SubF })
        .add(MinMaxToElem { kind: OpKind::MinSI })
        .add(MinMaxToElem { kind: OpKind::MaxSI })
        .add(MinMaxToElem { kind: OpKind::MinF })
        .add(MinMaxToElem { kind: OpKind::MaxF })
        .add(CmpToMask { kind: OpKind::CmpI })
        .add(CmpToMask { kind: OpKind::CmpF })
        .add(SelectToSel)
        .add(MinReduction)
        .add(MaxReduction)
        .add(IntAddReduction)
        .add(F32AddReduction)
        .add(Bf16AddReduction)
        .add(ExtractBroadcastToLane)
        .add(MulIToMulElem { shift })
        .add(MulFToMulElem { shift })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multiply_accumulate_is_tried_before_plain_add() {
        let aie = pattern_set(&LowerOptions::default());
        let names: Vec<_> = aie.priorities(OpKind::AddI).into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["MulAddToFma", "AddIToAdd"]);

        let aieml = pattern_set(&LowerOptions::default().with_target(TargetGeneration::AieMl));
        let names: Vec<_> = aieml.priorities(OpKind::AddI).into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["MulAddToFmaElem", "AddIToAddElem"]);

        let reductions: Vec<_> = aieml
            .priorities(OpKind::Reduction)
            .into_iter()
            .map(|(n, _)| n)
            .collect();
        assert_eq!(
            reductions,
            [
                "MinReduction",
                "MaxReduction",
                "IntAddReduction",
                "F32AddReduction",
                "Bf16AddReduction"
            ]
        );
        assert!(aie.priorities(OpKind::Reduction).is_empty());
    }
}
