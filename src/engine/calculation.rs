use crate::error::{Error, Result};
use crate::registry::{Calculation, FeeDefinition, RangeTier};
use rust_decimal::Decimal;

/// Compute the fee a definition charges on `amount`.
///
/// Definitions are trusted to have passed `validate_definition`; a ranged fee
/// whose tiers do not cover `amount` fails with `NoApplicableTier`. The result
/// is floored at zero.
pub fn compute_fee_amount(fee: &FeeDefinition, amount: Decimal) -> Result<Decimal> {
    let computed = match &fee.calculation {
        Calculation::Fixed { amount: fixed } => *fixed,
        Calculation::Percentage { rate } => percent_of(amount, *rate)?,
        Calculation::Ranged { tiers } => {
            let tier = select_tier(tiers, amount).ok_or(Error::NoApplicableTier(amount))?;
            match tier.effective_rate() {
                Some(rate) => percent_of(amount, rate)?,
                None => tier.amount,
            }
        }
    };

    Ok(computed.max(Decimal::ZERO))
}

/// First tier, in ascending minimum order, whose `[min, max)` contains `amount`.
pub fn select_tier(tiers: &[RangeTier], amount: Decimal) -> Option<&RangeTier> {
    let mut sorted: Vec<&RangeTier> = tiers.iter().collect();
    sorted.sort_by(|a, b| a.min_amount.cmp(&b.min_amount));
    sorted.into_iter().find(|t| t.contains(amount))
}

/// `amount × rate / 100`, exact.
pub fn percent_of(amount: Decimal, rate: Decimal) -> Result<Decimal> {
    let factor = rate / Decimal::ONE_HUNDRED;
    amount.checked_mul(factor).ok_or_else(|| {
        Error::InvalidRequest(format!(
            "Fee computation overflow: {} × {}%",
            amount, rate
        ))
    })
}
