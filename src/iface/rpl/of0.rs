//! Objective Function Zero, RFC 6552, with the step-of-rank derived
//! from the link ETX the way the Wi-SUN FAN profile prescribes.

use super::rank::Rank;

pub(crate) struct ObjectiveFunction0;

impl ObjectiveFunction0 {
    pub(crate) const OCP: u16 = 0;

    const RANK_STRETCH: u16 = 0;
    const RANK_FACTOR: u16 = 1;

    const MIN_STEP_OF_RANK: u16 = 1;
    const MAX_STEP_OF_RANK: u16 = 9;

    /// The step of rank for a link, approximated from the smoothed
    /// ETX as `3·ETX - 2`: a perfect link (ETX 1) gives step 1.
    fn step_of_rank(etx_x128: u16) -> u16 {
        let step = (3 * etx_x128 as u32).saturating_sub(2 * 128) / 128;
        (step as u16).clamp(Self::MIN_STEP_OF_RANK, Self::MAX_STEP_OF_RANK)
    }

    /// The rank increase over a link, RFC 6552 § 4.1, clamped below to
    /// MinHopRankIncrease.
    pub(crate) fn rank_increase(etx_x128: u16, min_hop_rank_increase: u16) -> u16 {
        let increase = (Self::RANK_FACTOR * Self::step_of_rank(etx_x128) + Self::RANK_STRETCH)
            .saturating_mul(min_hop_rank_increase);
        increase.max(min_hop_rank_increase)
    }

    /// The path cost of reaching the root through a parent
    /// advertising `parent_rank`.
    pub(crate) fn path_cost(parent_rank: Rank, etx_x128: u16) -> u16 {
        parent_rank
            .raw_value()
            .saturating_add(Self::rank_increase(
                etx_x128,
                parent_rank.min_hop_rank_increase,
            ))
            .min(Rank::INFINITE.raw_value())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn step_of_rank_from_etx() {
        // ETX 1.0 -> step 1
        assert_eq!(ObjectiveFunction0::step_of_rank(128), 1);
        // ETX 2.0 -> step 4
        assert_eq!(ObjectiveFunction0::step_of_rank(256), 4);
        // ETX 3.0 -> step 7
        assert_eq!(ObjectiveFunction0::step_of_rank(384), 7);
        // clamped above
        assert_eq!(ObjectiveFunction0::step_of_rank(4 * 128), 9);
        assert_eq!(ObjectiveFunction0::step_of_rank(100 * 128), 9);
        // clamped below, even for a bogus ETX < 1
        assert_eq!(ObjectiveFunction0::step_of_rank(64), 1);
    }

    #[test]
    fn rank_increase_clamps_to_min_hop() {
        assert_eq!(ObjectiveFunction0::rank_increase(128, 128), 128);
        assert_eq!(ObjectiveFunction0::rank_increase(256, 128), 512);
        assert_eq!(ObjectiveFunction0::rank_increase(128, 256), 256);
    }

    #[test]
    fn path_cost_saturates_at_infinite() {
        let parent = Rank::new(0xfff0, 256);
        assert_eq!(
            ObjectiveFunction0::path_cost(parent, 128),
            Rank::INFINITE.raw_value()
        );

        let parent = Rank::new(256, 128);
        assert_eq!(ObjectiveFunction0::path_cost(parent, 128), 256 + 128);
    }
}
