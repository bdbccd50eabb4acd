use crate::error::{Error, Result};
use crate::registry::{Calculation, FeeDefinition, FeeScope, RangeTier, Sharer};
use rust_decimal::Decimal;
use std::collections::HashSet;

/// Check that tiers, once sorted by minimum, form one continuous ladder.
///
/// Every non-final tier must end exactly where the next one starts; the final
/// tier is either open-ended or ends above its own minimum.
pub fn validate_range_tiers(tiers: &[RangeTier]) -> Result<()> {
    if tiers.is_empty() {
        return Err(Error::InvalidRangeSet(
            "Fee ranges must be provided for RANGED fees".to_string(),
        ));
    }

    let mut sorted: Vec<&RangeTier> = tiers.iter().collect();
    sorted.sort_by(|a, b| a.min_amount.cmp(&b.min_amount));

    for (i, tier) in sorted.iter().enumerate() {
        if tier.min_amount < Decimal::ZERO {
            return Err(Error::InvalidRangeSet(format!(
                "Min amount must be non-negative, got {}",
                tier.min_amount
            )));
        }
        if tier.amount < Decimal::ZERO {
            return Err(Error::InvalidRangeSet(format!(
                "Amount must be non-negative for all ranges, got {}",
                tier.amount
            )));
        }
        if tier.rate.is_some_and(|r| r < Decimal::ZERO) {
            return Err(Error::InvalidRangeSet(format!(
                "Rate must be non-negative for range starting at {}",
                tier.min_amount
            )));
        }

        match sorted.get(i + 1) {
            Some(next) => {
                if tier.max_amount != Some(next.min_amount) {
                    return Err(Error::InvalidRangeSet(format!(
                        "Ranges must be continuous without gaps or overlaps: range starting at {} ends at {}, next starts at {}",
                        tier.min_amount,
                        display_bound(tier.max_amount),
                        next.min_amount
                    )));
                }
            }
            None => {
                if let Some(max) = tier.max_amount {
                    if max <= tier.min_amount {
                        return Err(Error::InvalidRangeSet(format!(
                            "Max amount must be greater than min amount for the last range: [{}, {})",
                            tier.min_amount, max
                        )));
                    }
                }
            }
        }
    }

    Ok(())
}

/// Check a shared fee's beneficiaries: at least two, exactly one primary,
/// unique ids, every share in (0, 100] and the shares summing to exactly 100.
pub fn validate_sharers(sharers: &[Sharer]) -> Result<()> {
    if sharers.len() < 2 {
        return Err(Error::InvalidSharerSet(format!(
            "At least 2 fee sharers are required, got {}",
            sharers.len()
        )));
    }

    let primaries = sharers.iter().filter(|s| s.is_primary).count();
    if primaries != 1 {
        return Err(Error::InvalidSharerSet(format!(
            "There must be exactly one primary fee sharer, got {}",
            primaries
        )));
    }

    let hundred = Decimal::ONE_HUNDRED;
    if let Some(bad) = sharers
        .iter()
        .find(|s| s.percentage <= Decimal::ZERO || s.percentage > hundred)
    {
        return Err(Error::InvalidSharerSet(format!(
            "Percentage of sharer {} must be in (0, 100], got {}",
            bad.sharer_id, bad.percentage
        )));
    }

    let total: Decimal = sharers.iter().map(|s| s.percentage).sum();
    if total != hundred {
        return Err(Error::InvalidSharerSet(format!(
            "Total percentage of all fee sharers must equal 100, got {}",
            total
        )));
    }

    let mut seen = HashSet::new();
    for sharer in sharers {
        if !seen.insert(sharer.sharer_id.as_str()) {
            return Err(Error::InvalidSharerSet(format!(
                "Fee sharer IDs must be unique: {} appears more than once",
                sharer.sharer_id
            )));
        }
    }

    Ok(())
}

/// Structural validation of a whole definition, run before every write.
///
/// Catalog membership and per-tenant uniqueness need the registry and are
/// checked by the admin layer.
pub fn validate_definition(fee: &FeeDefinition) -> Result<()> {
    if fee.name.trim().is_empty() {
        return Err(Error::InvalidDefinition("Name is required".to_string()));
    }
    if fee.transaction_type.trim().is_empty() {
        return Err(Error::InvalidDefinition(
            "Transaction type is required".to_string(),
        ));
    }
    if fee.channels.is_empty() {
        return Err(Error::InvalidDefinition(
            "At least one channel must be provided".to_string(),
        ));
    }

    match &fee.calculation {
        Calculation::Fixed { amount } => {
            if *amount <= Decimal::ZERO {
                return Err(Error::InvalidDefinition(
                    "Fixed amount must be greater than 0 for FIXED fees".to_string(),
                ));
            }
        }
        Calculation::Percentage { rate } => {
            if *rate <= Decimal::ZERO {
                return Err(Error::InvalidDefinition(
                    "Percentage rate must be greater than 0 for PERCENTAGE fees".to_string(),
                ));
            }
        }
        Calculation::Ranged { tiers } => validate_range_tiers(tiers)?,
    }

    match &fee.scope {
        FeeScope::Default => {}
        scope => {
            let blank = scope.reference_id().map_or(true, |id| id.trim().is_empty());
            if blank {
                return Err(Error::InvalidDefinition(format!(
                    "Reference id must be provided for {} fees",
                    scope.kind()
                )));
            }
        }
    }

    if fee.shared {
        validate_sharers(&fee.sharers)?;
    } else if !fee.sharers.is_empty() {
        return Err(Error::InvalidDefinition(
            "Fee sharers should not be provided when fee is not shared".to_string(),
        ));
    }

    Ok(())
}

fn display_bound(bound: Option<Decimal>) -> String {
    bound.map_or_else(|| "infinity".to_string(), |b| b.to_string())
}
