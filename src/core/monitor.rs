//! Threshold monitor: breach detection against stored high/low lines and the
//! post-alert ratchet.
//!
//! The breach state is transient, recomputed each run from the live price and
//! the stored lines; the ratcheted line itself is the only cross-run memory.

/// Ratchet factors are fixed policy, not configuration. Each confirmed breach
/// widens the band by 1% in the breach direction so the same crossing does
/// not re-alert at the same price on the next run.
pub const HIGH_RATCHET: f64 = 1.01;
pub const LOW_RATCHET: f64 = 0.99;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Breach {
    High,
    Low,
}

impl Breach {
    pub fn direction(&self) -> &'static str {
        match self {
            Breach::High => "upward",
            Breach::Low => "downward",
        }
    }
}

/// Compare a live price against the trigger lines.
///
/// Both lines must be present or the record is skipped entirely (no
/// transition). The high line is checked first; crossings are strict.
pub fn check_lines(high_line: Option<f64>, low_line: Option<f64>, price: f64) -> Option<Breach> {
    let (high, low) = match (high_line, low_line) {
        (Some(high), Some(low)) => (high, low),
        _ => return None,
    };
    if price > high {
        Some(Breach::High)
    } else if price < low {
        Some(Breach::Low)
    } else {
        None
    }
}

/// The new trigger line after a confirmed, dispatched breach at `price`.
pub fn ratchet(breach: Breach, price: f64) -> f64 {
    match breach {
        Breach::High => price * HIGH_RATCHET,
        Breach::Low => price * LOW_RATCHET,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::record::round_dp;

    #[test]
    fn test_no_breach_inside_band() {
        assert_eq!(check_lines(Some(110.0), Some(90.0), 100.0), None);
        // Touching a line is not a crossing
        assert_eq!(check_lines(Some(110.0), Some(90.0), 110.0), None);
        assert_eq!(check_lines(Some(110.0), Some(90.0), 90.0), None);
    }

    #[test]
    fn test_high_and_low_breaches() {
        assert_eq!(check_lines(Some(110.0), Some(90.0), 110.01), Some(Breach::High));
        assert_eq!(check_lines(Some(110.0), Some(90.0), 89.99), Some(Breach::Low));
    }

    #[test]
    fn test_missing_line_disables_alerting() {
        assert_eq!(check_lines(None, Some(90.0), 200.0), None);
        assert_eq!(check_lines(Some(110.0), None, 0.0), None);
        assert_eq!(check_lines(None, None, 100.0), None);
    }

    #[test]
    fn test_ratchet_monotonicity() {
        let price = 123.456;
        let new_high = round_dp(ratchet(Breach::High, price), 2);
        assert_eq!(new_high, round_dp(price * 1.01, 2));
        assert!(new_high > price);

        let new_low = round_dp(ratchet(Breach::Low, price), 2);
        assert_eq!(new_low, round_dp(price * 0.99, 2));
        assert!(new_low < price);
    }

    #[test]
    fn test_ratchet_suppresses_realert_at_same_price() {
        let price = 150.0;
        let new_high = ratchet(Breach::High, price);
        assert_eq!(check_lines(Some(new_high), Some(0.0), price), None);

        let new_low = ratchet(Breach::Low, price);
        assert_eq!(check_lines(Some(f64::MAX), Some(new_low), price), None);
    }
}
