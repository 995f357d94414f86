//! Dispatch sizing for the compute pass.

use gl::types::GLint;

/// Smallest power of two >= `x`.
///
/// Bit-smearing form: decrement, OR in right-shifts by 1, 2, 4, 8 and 16,
/// then increment. `x` must be at least 1 (window dimensions always are).
pub fn round_up_to_pow2(x: u32) -> u32 {
    debug_assert!(x >= 1, "round_up_to_pow2 is undefined for 0");
    let mut v = x.wrapping_sub(1);
    v |= v >> 1;
    v |= v >> 2;
    v |= v >> 4;
    v |= v >> 8;
    v |= v >> 16;
    v.wrapping_add(1)
}

/// Work-group counts for a dispatch covering `width` × `height`.
///
/// Each dimension is rounded up to the next power of two, then
/// integer-divided by the matching work-group dimension. A work group
/// that does not evenly divide the rounded dimension leaves the excess
/// uncovered; accepted policy, not a defect to patch here.
///
/// Returns `None` when the work-group size has a non-positive dimension,
/// which is what the query reports when the compute program failed to
/// link.
pub fn group_counts(width: u32, height: u32, work_group_size: [GLint; 3]) -> Option<(u32, u32)> {
    let wx = u32::try_from(work_group_size[0]).ok().filter(|&v| v > 0)?;
    let wy = u32::try_from(work_group_size[1]).ok().filter(|&v| v > 0)?;
    Some((round_up_to_pow2(width) / wx, round_up_to_pow2(height) / wy))
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── round_up_to_pow2 ──────────────────────────────────────────────────

    #[test]
    fn one_maps_to_one() {
        assert_eq!(round_up_to_pow2(1), 1);
    }

    #[test]
    fn rounds_up_between_powers() {
        assert_eq!(round_up_to_pow2(5), 8);
        assert_eq!(round_up_to_pow2(600), 1024);
        assert_eq!(round_up_to_pow2(800), 1024);
    }

    #[test]
    fn powers_of_two_are_fixed_points() {
        assert_eq!(round_up_to_pow2(1024), 1024);
        for shift in 0..=31 {
            let p = 1u32 << shift;
            assert_eq!(round_up_to_pow2(p), p);
        }
    }

    #[test]
    fn just_above_a_power_doubles() {
        assert_eq!(round_up_to_pow2(1025), 2048);
    }

    #[test]
    fn idempotent_on_its_own_results() {
        for n in [1u32, 2, 3, 5, 17, 100, 799, 1024, 1025, 65_537] {
            let p = round_up_to_pow2(n);
            assert_eq!(round_up_to_pow2(p), p);
        }
    }

    #[test]
    fn top_of_domain() {
        assert_eq!(round_up_to_pow2((1 << 31) - 1), 1 << 31);
        assert_eq!(round_up_to_pow2(1 << 31), 1 << 31);
    }

    // ── group_counts ──────────────────────────────────────────────────────

    #[test]
    fn counts_divide_the_rounded_dimensions() {
        assert_eq!(group_counts(800, 600, [8, 8, 1]), Some((128, 128)));
    }

    #[test]
    fn resize_scenario_updates_counts() {
        // 800x600 and 1024x768 both round to 1024 per axis.
        assert_eq!(group_counts(800, 600, [16, 16, 1]), Some((64, 64)));
        assert_eq!(group_counts(1024, 768, [16, 16, 1]), Some((64, 64)));
        assert_eq!(group_counts(1025, 768, [16, 16, 1]), Some((128, 64)));
    }

    #[test]
    fn uneven_work_group_truncates() {
        // 1024 / 24 = 42; the remainder stays uncovered by contract.
        assert_eq!(group_counts(800, 600, [24, 24, 1]), Some((42, 42)));
    }

    #[test]
    fn unlinked_program_yields_none() {
        assert_eq!(group_counts(800, 600, [0, 0, 0]), None);
        assert_eq!(group_counts(800, 600, [8, 0, 1]), None);
        assert_eq!(group_counts(800, 600, [-1, 8, 1]), None);
    }
}
