use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Which identifier a fee definition is keyed to beyond transaction type and channel.
///
/// The reference id lives inside the variant, so a `Default` scope can never carry
/// one and every other scope always does.
#[derive(Debug, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeeScope {
    Default,
    Product { product_id: String },
    Processor { processor_id: String },
    Client { client_id: String },
}

/// Discriminant of [`FeeScope`], for display and kind comparisons.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScopeKind {
    Default,
    Product,
    Processor,
    Client,
}

impl FeeScope {
    pub fn kind(&self) -> ScopeKind {
        match self {
            FeeScope::Default => ScopeKind::Default,
            FeeScope::Product { .. } => ScopeKind::Product,
            FeeScope::Processor { .. } => ScopeKind::Processor,
            FeeScope::Client { .. } => ScopeKind::Client,
        }
    }

    /// Scope-specific reference id; `None` only for `Default`.
    pub fn reference_id(&self) -> Option<&str> {
        match self {
            FeeScope::Default => None,
            FeeScope::Product { product_id } => Some(product_id),
            FeeScope::Processor { processor_id } => Some(processor_id),
            FeeScope::Client { client_id } => Some(client_id),
        }
    }
}

impl fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ScopeKind::Default => "DEFAULT",
            ScopeKind::Product => "PRODUCT",
            ScopeKind::Processor => "PROCESSOR",
            ScopeKind::Client => "CLIENT",
        };
        f.write_str(s)
    }
}

impl fmt::Display for FeeScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.reference_id() {
            Some(id) => write!(f, "{}({})", self.kind(), id),
            None => write!(f, "{}", self.kind()),
        }
    }
}

/// Pricing strategy of a fee definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Calculation {
    /// Flat fee regardless of the transaction amount.
    Fixed { amount: Decimal },
    /// `rate` percent of the transaction amount.
    Percentage { rate: Decimal },
    /// Tiered brackets, each with its own flat amount or rate.
    Ranged { tiers: Vec<RangeTier> },
}

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CalculationKind {
    Fixed,
    Percentage,
    Ranged,
}

impl Calculation {
    pub fn kind(&self) -> CalculationKind {
        match self {
            Calculation::Fixed { .. } => CalculationKind::Fixed,
            Calculation::Percentage { .. } => CalculationKind::Percentage,
            Calculation::Ranged { .. } => CalculationKind::Ranged,
        }
    }
}

impl FromStr for ScopeKind {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DEFAULT" => Ok(ScopeKind::Default),
            "PRODUCT" => Ok(ScopeKind::Product),
            "PROCESSOR" => Ok(ScopeKind::Processor),
            "CLIENT" => Ok(ScopeKind::Client),
            _ => Err(crate::error::Error::InvalidRequest(format!(
                "Unknown fee scope: {}",
                s
            ))),
        }
    }
}

impl FromStr for CalculationKind {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "FIXED" => Ok(CalculationKind::Fixed),
            "PERCENTAGE" => Ok(CalculationKind::Percentage),
            "RANGED" => Ok(CalculationKind::Ranged),
            _ => Err(crate::error::Error::InvalidRequest(format!(
                "Unknown calculation type: {}",
                s
            ))),
        }
    }
}

impl fmt::Display for CalculationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CalculationKind::Fixed => "FIXED",
            CalculationKind::Percentage => "PERCENTAGE",
            CalculationKind::Ranged => "RANGED",
        };
        f.write_str(s)
    }
}

/// One amount bracket of a ranged fee: `[min_amount, max_amount)`.
///
/// A `None` maximum leaves the bracket open-ended. When `rate` is present and
/// positive the fee is `rate` percent of the amount, otherwise the flat `amount`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeTier {
    pub min_amount: Decimal,
    #[serde(default)]
    pub max_amount: Option<Decimal>,
    pub amount: Decimal,
    #[serde(default)]
    pub rate: Option<Decimal>,
}

impl RangeTier {
    /// Tier charging a flat amount.
    pub fn flat(min_amount: Decimal, max_amount: Option<Decimal>, amount: Decimal) -> Self {
        RangeTier {
            min_amount,
            max_amount,
            amount,
            rate: None,
        }
    }

    /// Tier charging `rate` percent of the transaction amount.
    pub fn rated(min_amount: Decimal, max_amount: Option<Decimal>, rate: Decimal) -> Self {
        RangeTier {
            min_amount,
            max_amount,
            amount: Decimal::ZERO,
            rate: Some(rate),
        }
    }

    /// Half-open membership test.
    pub fn contains(&self, amount: Decimal) -> bool {
        amount >= self.min_amount && self.max_amount.map_or(true, |max| amount < max)
    }

    /// The rate to apply, if this tier is rate-based.
    pub fn effective_rate(&self) -> Option<Decimal> {
        self.rate.filter(|r| *r > Decimal::ZERO)
    }
}

/// A beneficiary of a shared fee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sharer {
    /// "PRIMARY", "PARTNER", "AFFILIATE", ...
    pub sharer_type: String,
    pub sharer_id: String,
    #[serde(default)]
    pub sharer_name: Option<String>,
    pub percentage: Decimal,
    #[serde(default)]
    pub is_primary: bool,
}

impl Sharer {
    pub fn new(sharer_type: &str, sharer_id: &str, percentage: Decimal, is_primary: bool) -> Self {
        Sharer {
            sharer_type: sharer_type.to_string(),
            sharer_id: sharer_id.to_string(),
            sharer_name: None,
            percentage,
            is_primary,
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.sharer_name = Some(name.to_string());
        self
    }
}

/// Fee definition aggregate.
///
/// Identity: `id` (unique across tenants), owned by `tenant_id`.
///
/// Invariants (checked by `engine::validate_definition` before every write):
/// - `channels` is non-empty
/// - shared fees carry at least two sharers summing to 100 with one primary
/// - unshared fees carry no sharers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeDefinition {
    pub id: u64,
    pub tenant_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub transaction_type: String,
    pub channels: BTreeSet<String>,
    pub scope: FeeScope,
    pub calculation: Calculation,
    pub shared: bool,
    pub active: bool,
    #[serde(default)]
    pub sharers: Vec<Sharer>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl FeeDefinition {
    /// Create an active, unshared definition with no timestamps; mostly useful in tests.
    pub fn new(
        id: u64,
        tenant_id: &str,
        name: &str,
        transaction_type: &str,
        channels: &[&str],
        scope: FeeScope,
        calculation: Calculation,
    ) -> Self {
        FeeDefinition {
            id,
            tenant_id: tenant_id.to_string(),
            name: name.to_string(),
            description: None,
            transaction_type: transaction_type.to_string(),
            channels: channels.iter().map(|c| c.to_string()).collect(),
            scope,
            calculation,
            shared: false,
            active: true,
            sharers: Vec::new(),
            created_at: 0,
            updated_at: 0,
        }
    }

    /// Attach a sharer list and mark the definition shared.
    pub fn with_sharers(mut self, sharers: Vec<Sharer>) -> Self {
        self.shared = true;
        self.sharers = sharers;
        self
    }

    pub fn scope_kind(&self) -> ScopeKind {
        self.scope.kind()
    }

    pub fn calculation_kind(&self) -> CalculationKind {
        self.calculation.kind()
    }

    /// True when the definition applies to this transaction type on this channel.
    pub fn serves(&self, transaction_type: &str, channel: &str) -> bool {
        self.transaction_type == transaction_type && self.channels.contains(channel)
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}
