//! The election rule: a pure function of locally observed peer state.
//! No election messages are ever sent; convergence is eventual and
//! relies on every peer running this same rule.

use crate::peer_table::PeerSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElectionDecision {
    Promote,
    Demote,
    NoChange,
}

/// Step 4 of the check loop, spec-exact:
///
/// - currently master AND `mastersHigherWeight >= mastersRequired` → demote
/// - else not master AND eligible AND `mastersHigherWeight < mastersRequired`
///   AND NOT `anyEligibleHigherWeight` → promote
/// - else no change
///
/// `masters_required == 0` makes the promotion branch's
/// `masters_higher_weight < masters_required` clause unsatisfiable for
/// any non-negative count, so no instance ever promotes — this is
/// intentional (see spec Open Questions) and not treated as an error
/// here.
pub fn evaluate(
    is_master: bool,
    is_master_eligible: bool,
    masters_required: u32,
    summary: PeerSummary,
) -> ElectionDecision {
    let masters_required = masters_required as usize;
    if is_master && summary.masters_higher_weight >= masters_required {
        ElectionDecision::Demote
    } else if !is_master
        && is_master_eligible
        && summary.masters_higher_weight < masters_required
        && !summary.any_eligible_higher_weight
    {
        ElectionDecision::Promote
    } else {
        ElectionDecision::NoChange
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(masters_higher_weight: usize, any_eligible_higher_weight: bool) -> PeerSummary {
        PeerSummary {
            masters_found: 0,
            masters_higher_weight,
            any_eligible_higher_weight,
        }
    }

    #[test]
    fn promotes_when_uncontested_and_eligible() {
        let decision = evaluate(false, true, 1, summary(0, false));
        assert_eq!(decision, ElectionDecision::Promote);
    }

    #[test]
    fn does_not_promote_when_ineligible() {
        let decision = evaluate(false, false, 1, summary(0, false));
        assert_eq!(decision, ElectionDecision::NoChange);
    }

    #[test]
    fn does_not_promote_when_a_higher_weighted_eligible_peer_exists() {
        let decision = evaluate(false, true, 1, summary(0, true));
        assert_eq!(decision, ElectionDecision::NoChange);
    }

    #[test]
    fn demotes_when_enough_higher_weighted_masters_appear() {
        let decision = evaluate(true, true, 1, summary(1, false));
        assert_eq!(decision, ElectionDecision::Demote);
    }

    #[test]
    fn stays_master_when_not_enough_higher_weighted_masters() {
        // mastersRequired = 2: one higher-weighted master isn't enough to unseat.
        let decision = evaluate(true, true, 2, summary(1, false));
        assert_eq!(decision, ElectionDecision::NoChange);
    }

    #[test]
    fn masters_required_zero_never_promotes() {
        let decision = evaluate(false, true, 0, summary(0, false));
        assert_eq!(decision, ElectionDecision::NoChange);
    }

    #[test]
    fn equal_weight_never_counts_as_dominant() {
        // Both instances eligible, identical weight, neither currently
        // master: summary.any_eligible_higher_weight is false for both
        // sides (strict `>` only), so both promote on the same tick.
        // This is the documented convergence hazard, not a bug.
        let decision = evaluate(false, true, 1, summary(0, false));
        assert_eq!(decision, ElectionDecision::Promote);
    }
}
