//! Capture and reinforcement arithmetic for territories

use super::territory::{Territory, MAX_POINTS};

/// Scales raw particle collisions into territory points
pub const HIT_DAMPENING: f64 = 0.1;

/// What a single hit report did to a territory
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CaptureOutcome {
    /// Owner added points (saturating at the cap)
    Reinforced { points: f64 },
    /// Another color wore points down without flipping it
    Contested { points: f64 },
    /// Ownership flipped; the overflow became the new owner's points
    Captured { points: f64 },
    /// Report carried no usable amount
    Ignored,
}

/// Apply one `hit_territory` report.
///
/// Reports are not commutative: callers must apply them in arrival order.
/// A neutral territory counts as owned by nobody, so any color's first hit
/// on it flips ownership once points reach zero.
pub fn apply_hit(territory: &mut Territory, attacker_color: &str, raw_hits: f64) -> CaptureOutcome {
    if !raw_hits.is_finite() || raw_hits <= 0.0 {
        return CaptureOutcome::Ignored;
    }

    let amount = raw_hits * HIT_DAMPENING;

    if territory.controlling_color.as_deref() == Some(attacker_color) {
        territory.points = (territory.points + amount).min(MAX_POINTS);
        return CaptureOutcome::Reinforced {
            points: territory.points,
        };
    }

    let remaining = territory.points - amount;
    if remaining <= 0.0 {
        territory.controlling_color = Some(attacker_color.to_string());
        territory.points = remaining.abs().min(MAX_POINTS);
        CaptureOutcome::Captured {
            points: territory.points,
        }
    } else {
        territory.points = remaining;
        CaptureOutcome::Contested {
            points: territory.points,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ws::protocol::Vector3;

    fn owned(color: &str, points: f64) -> Territory {
        let mut territory = Territory::new("t", Vector3::new(0.0, 0.0, 0.0), 3.0);
        territory.controlling_color = Some(color.to_string());
        territory.points = points;
        territory
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn overflow_flips_ownership() {
        let mut territory = owned("A", 5.0);
        let outcome = apply_hit(&mut territory, "B", 100.0);

        assert!(matches!(outcome, CaptureOutcome::Captured { .. }));
        assert_eq!(territory.controlling_color.as_deref(), Some("B"));
        assert_close(territory.points, 5.0);
    }

    #[test]
    fn reinforcement_saturates() {
        let mut territory = owned("A", 90.0);
        apply_hit(&mut territory, "A", 200.0);

        assert_eq!(territory.controlling_color.as_deref(), Some("A"));
        assert_close(territory.points, 100.0);
    }

    #[test]
    fn partial_damage_keeps_owner() {
        let mut territory = owned("A", 50.0);
        let outcome = apply_hit(&mut territory, "B", 30.0);

        assert!(matches!(outcome, CaptureOutcome::Contested { .. }));
        assert_eq!(territory.controlling_color.as_deref(), Some("A"));
        assert_close(territory.points, 47.0);
    }

    #[test]
    fn exact_zero_flips_with_zero_points() {
        let mut territory = owned("A", 10.0);
        apply_hit(&mut territory, "B", 100.0);

        assert_eq!(territory.controlling_color.as_deref(), Some("B"));
        assert_close(territory.points, 0.0);
    }

    #[test]
    fn neutral_territory_is_captured_by_first_hit() {
        let mut territory = Territory::new("t", Vector3::new(0.0, 0.0, 0.0), 3.0);
        apply_hit(&mut territory, "C", 40.0);

        assert_eq!(territory.controlling_color.as_deref(), Some("C"));
        assert_close(territory.points, 4.0);
    }

    #[test]
    fn huge_overflow_is_clamped() {
        let mut territory = owned("A", 1.0);
        apply_hit(&mut territory, "B", 1_000_000.0);
        assert_close(territory.points, MAX_POINTS);
    }

    #[test]
    fn non_positive_reports_are_ignored() {
        let mut territory = owned("A", 20.0);
        for bad in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            assert_eq!(apply_hit(&mut territory, "B", bad), CaptureOutcome::Ignored);
        }
        assert_eq!(territory, owned("A", 20.0));
    }

    #[test]
    fn order_of_reports_changes_outcome() {
        let mut first = owned("A", 95.0);
        apply_hit(&mut first, "B", 100.0);
        apply_hit(&mut first, "A", 100.0);

        let mut second = owned("A", 95.0);
        apply_hit(&mut second, "A", 100.0);
        apply_hit(&mut second, "B", 100.0);

        assert_close(first.points, 95.0);
        assert_close(second.points, 90.0);
    }

    #[test]
    fn points_stay_in_bounds_over_long_sequences() {
        let mut territory = Territory::new("t", Vector3::new(0.0, 0.0, 0.0), 3.0);
        let colors = ["A", "B", "C"];
        for i in 0..500u32 {
            let color = colors[(i * 7 % 3) as usize];
            let hits = f64::from((i * 37) % 900 + 1);
            apply_hit(&mut territory, color, hits);
            assert!((0.0..=MAX_POINTS).contains(&territory.points));
        }
    }
}
