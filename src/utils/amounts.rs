use crate::constants::{MINIMUM_PROVIDER_RESERVATION_AMOUNT, QUOTE_SCALE, STRICT_MINIMUM_PROVIDER_RESERVATION_AMOUNT};
use alloy_primitives::U256;

/// Convert a token amount to satoshis at `quote` (tokens per satoshi, scaled by `quote_scale`).
/// Returns `None` for a zero quote, which has no price yet.
pub fn tokens_to_satoshis(amount: u128, quote: U256, quote_scale: u64) -> Option<U256> {
    if quote.is_zero() {
        return None;
    }
    Some(U256::from(amount).saturating_mul(U256::from(quote_scale)) / quote)
}

/// Minimum-reservation rules shared by every queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LiquidityThresholds {
    pub minimum_reservation_sats: u64,
    pub strict_minimum_reservation_sats: u64,
    pub quote_scale: u64,
}

impl Default for LiquidityThresholds {
    fn default() -> Self {
        Self {
            minimum_reservation_sats: MINIMUM_PROVIDER_RESERVATION_AMOUNT,
            strict_minimum_reservation_sats: STRICT_MINIMUM_PROVIDER_RESERVATION_AMOUNT,
            quote_scale: QUOTE_SCALE,
        }
    }
}

impl LiquidityThresholds {
    /// True when `available` tokens can still cover a minimum reservation at `quote`.
    /// With a zero quote any nonzero amount qualifies.
    pub fn meets_minimum(&self, available: u128, quote: U256) -> bool {
        if available == 0 {
            return false;
        }
        match tokens_to_satoshis(available, quote, self.quote_scale) {
            Some(satoshis) => satoshis >= U256::from(self.minimum_reservation_sats),
            None => true,
        }
    }

    /// Removal-queue rule: a nonzero owed amount at or above the strict minimum.
    pub fn meets_strict_minimum(&self, satoshis: u64) -> bool {
        satoshis != 0 && satoshis >= self.strict_minimum_reservation_sats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_to_satoshis() {
        // 1 token per satoshi
        assert_eq!(tokens_to_satoshis(10_000, U256::from(QUOTE_SCALE), QUOTE_SCALE), Some(U256::from(10_000)));
        // 4 tokens per satoshi
        assert_eq!(tokens_to_satoshis(10_000, U256::from(4 * QUOTE_SCALE), QUOTE_SCALE), Some(U256::from(2_500)));
        assert_eq!(tokens_to_satoshis(10_000, U256::ZERO, QUOTE_SCALE), None);
    }

    #[test]
    fn test_meets_minimum() {
        let thresholds = LiquidityThresholds::default();
        let quote = U256::from(QUOTE_SCALE);
        assert!(thresholds.meets_minimum(1_000, quote));
        assert!(!thresholds.meets_minimum(999, quote));
        assert!(!thresholds.meets_minimum(0, quote));
        assert!(thresholds.meets_minimum(1, U256::ZERO));
        assert!(!thresholds.meets_minimum(0, U256::ZERO));
    }

    #[test]
    fn test_meets_strict_minimum() {
        let thresholds = LiquidityThresholds::default();
        assert!(thresholds.meets_strict_minimum(600));
        assert!(!thresholds.meets_strict_minimum(599));
        assert!(!thresholds.meets_strict_minimum(0));
    }
}
