use crate::registry::{FeeDefinition, Sharer};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Drift between the fee and the summed shares that triggers reconciliation.
pub const RECONCILIATION_TOLERANCE: Decimal = dec!(0.01);

/// One sharer's portion of a computed fee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharerCalculation {
    pub sharer_type: String,
    pub sharer_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sharer_name: Option<String>,
    pub percentage: Decimal,
    pub amount: Decimal,
    pub is_primary: bool,
    /// Reconciliation added to this share (non-zero only on the primary sharer).
    pub adjustment: Decimal,
}

impl SharerCalculation {
    fn from_sharer(sharer: &Sharer, amount: Decimal) -> Self {
        SharerCalculation {
            sharer_type: sharer.sharer_type.clone(),
            sharer_id: sharer.sharer_id.clone(),
            sharer_name: sharer.sharer_name.clone(),
            percentage: sharer.percentage,
            amount,
            is_primary: sharer.is_primary,
            adjustment: Decimal::ZERO,
        }
    }

    pub fn is_adjusted(&self) -> bool {
        !self.adjustment.is_zero()
    }
}

/// Split `fee_amount` across the definition's sharers.
///
/// Shares come out in sharer-list order, each exactly `fee_amount × pct / 100`.
/// When the shares miss the fee by more than [`RECONCILIATION_TOLERANCE`] the
/// whole difference is booked on the primary sharer. Unshared definitions
/// yield an empty list.
pub fn distribute_sharers(fee: &FeeDefinition, fee_amount: Decimal) -> Vec<SharerCalculation> {
    if !fee.shared || fee.sharers.is_empty() {
        return Vec::new();
    }

    let mut shares: Vec<SharerCalculation> = fee
        .sharers
        .iter()
        .map(|s| SharerCalculation::from_sharer(s, share_of(fee_amount, s.percentage)))
        .collect();

    let distributed: Decimal = shares.iter().map(|s| s.amount).sum();
    let drift = fee_amount - distributed;
    if drift.abs() > RECONCILIATION_TOLERANCE {
        if let Some(primary) = shares.iter_mut().find(|s| s.is_primary) {
            primary.amount += drift;
            primary.adjustment = drift;
        }
    }

    shares
}

fn share_of(fee_amount: Decimal, percentage: Decimal) -> Decimal {
    fee_amount * (percentage / Decimal::ONE_HUNDRED)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{Calculation, FeeScope};

    fn shared_fee(sharers: Vec<Sharer>) -> FeeDefinition {
        FeeDefinition::new(
            1,
            "acme",
            "shared",
            "TRANSFER",
            &["WEB"],
            FeeScope::Default,
            Calculation::Fixed { amount: dec!(10.01) },
        )
        .with_sharers(sharers)
    }

    fn total(shares: &[SharerCalculation]) -> Decimal {
        shares.iter().map(|s| s.amount).sum()
    }

    #[test]
    fn test_sixty_forty_on_ten_oh_one() {
        let fee = shared_fee(vec![
            Sharer::new("PRIMARY", "A", dec!(60), true),
            Sharer::new("PARTNER", "B", dec!(40), false),
        ]);
        let shares = distribute_sharers(&fee, dec!(10.01));
        assert_eq!(shares.len(), 2);
        assert_eq!(shares[0].sharer_id, "A");
        assert_eq!(shares[0].amount, dec!(6.006));
        assert_eq!(shares[1].amount, dec!(4.004));
        assert_eq!(total(&shares), dec!(10.01));
        assert!(shares.iter().all(|s| !s.is_adjusted()));
    }

    #[test]
    fn test_thirds_sum_exactly() {
        let fee = shared_fee(vec![
            Sharer::new("PARTNER", "B", dec!(33.33), false),
            Sharer::new("PRIMARY", "A", dec!(33.34), true),
            Sharer::new("PARTNER", "C", dec!(33.33), false),
        ]);
        let shares = distribute_sharers(&fee, dec!(1));
        assert_eq!(shares[0].amount, dec!(0.3333));
        assert_eq!(shares[1].amount, dec!(0.3334));
        assert_eq!(shares[2].amount, dec!(0.3333));
        assert_eq!(total(&shares), dec!(1));
    }

    #[test]
    fn test_order_is_preserved() {
        let fee = shared_fee(vec![
            Sharer::new("PARTNER", "z", dec!(10), false),
            Sharer::new("PRIMARY", "a", dec!(90), true),
        ]);
        let ids: Vec<String> = distribute_sharers(&fee, dec!(50))
            .into_iter()
            .map(|s| s.sharer_id)
            .collect();
        assert_eq!(ids, vec!["z".to_string(), "a".to_string()]);
    }

    #[test]
    fn test_sub_cent_fee_splits_proportionally() {
        let fee = shared_fee(vec![
            Sharer::new("PRIMARY", "A", dec!(50), true),
            Sharer::new("PARTNER", "B", dec!(50), false),
        ]);
        let shares = distribute_sharers(&fee, dec!(0.01));
        assert_eq!(shares[0].amount, dec!(0.005));
        assert_eq!(shares[1].amount, dec!(0.005));
        assert_eq!(total(&shares), dec!(0.01));
    }

    #[test]
    fn test_five_equal_sharers_on_tiny_fee_never_go_negative() {
        let sharers = (0..5)
            .map(|i| Sharer::new("PARTNER", &format!("s{}", i), dec!(20), i == 0))
            .collect();
        let fee = shared_fee(sharers);
        let shares = distribute_sharers(&fee, dec!(0.025));
        assert!(shares.iter().all(|s| s.amount == dec!(0.005)));
        assert!(shares.iter().all(|s| s.amount >= Decimal::ZERO));
        assert_eq!(total(&shares), dec!(0.025));
    }

    #[test]
    fn test_drift_beyond_tolerance_lands_on_primary() {
        // Percentages short of 100 only reach here when validation was bypassed.
        let fee = shared_fee(vec![
            Sharer::new("PARTNER", "B", dec!(30), false),
            Sharer::new("PRIMARY", "A", dec!(60), true),
        ]);
        let shares = distribute_sharers(&fee, dec!(10));
        assert_eq!(shares[0].amount, dec!(3));
        assert_eq!(shares[1].amount, dec!(7));
        assert_eq!(shares[1].adjustment, dec!(1));
        assert!(!shares[0].is_adjusted());
        assert_eq!(total(&shares), dec!(10));
    }

    #[test]
    fn test_drift_within_tolerance_is_left_alone() {
        let fee = shared_fee(vec![
            Sharer::new("PRIMARY", "A", dec!(60), true),
            Sharer::new("PARTNER", "B", dec!(39.99), false),
        ]);
        let shares = distribute_sharers(&fee, dec!(10));
        assert_eq!(shares[0].amount, dec!(6));
        assert_eq!(shares[1].amount, dec!(3.999));
        assert!(shares.iter().all(|s| !s.is_adjusted()));
    }

    #[test]
    fn test_unshared_fee_yields_nothing() {
        let mut fee = shared_fee(vec![
            Sharer::new("PRIMARY", "A", dec!(50), true),
            Sharer::new("PARTNER", "B", dec!(50), false),
        ]);
        fee.shared = false;
        assert!(distribute_sharers(&fee, dec!(10)).is_empty());

        let mut fee = shared_fee(Vec::new());
        fee.shared = true;
        assert!(distribute_sharers(&fee, dec!(10)).is_empty());
    }

    #[test]
    fn test_zero_fee() {
        let fee = shared_fee(vec![
            Sharer::new("PRIMARY", "A", dec!(70), true),
            Sharer::new("PARTNER", "B", dec!(30), false),
        ]);
        let shares = distribute_sharers(&fee, Decimal::ZERO);
        assert!(shares.iter().all(|s| s.amount.is_zero()));
    }
}
