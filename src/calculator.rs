use crate::config::Config;
use crate::current_timestamp;
use crate::engine::{
    compute_fee_amount, distribute_sharers, trace_resolution, CascadeKeys, SharerCalculation,
};
use crate::error::{Error, Result};
use crate::registry::{CalculationKind, FeeDefinition, FeeScope, Registry};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// A fee calculation request as received from a caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculationRequest {
    /// Blank or missing selects the configured default tenant.
    #[serde(default)]
    pub tenant_id: Option<String>,
    pub transaction_type: String,
    pub channel: String,
    pub amount: Decimal,
    #[serde(default)]
    pub product_id: Option<String>,
    #[serde(default)]
    pub processor_id: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default = "default_apply_sharing")]
    pub apply_sharing: bool,
}

fn default_apply_sharing() -> bool {
    true
}

impl CalculationRequest {
    pub fn new(transaction_type: &str, channel: &str, amount: Decimal) -> Self {
        CalculationRequest {
            tenant_id: None,
            transaction_type: transaction_type.to_string(),
            channel: channel.to_string(),
            amount,
            product_id: None,
            processor_id: None,
            client_id: None,
            apply_sharing: true,
        }
    }

    pub fn cascade_keys(&self) -> CascadeKeys<'_> {
        CascadeKeys::new(
            self.client_id.as_deref(),
            self.product_id.as_deref(),
            self.processor_id.as_deref(),
        )
    }
}

/// Summary of the definition that priced a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedFee {
    pub id: u64,
    pub name: String,
    pub scope: FeeScope,
    pub calculation: CalculationKind,
}

impl From<&FeeDefinition> for AppliedFee {
    fn from(fee: &FeeDefinition) -> Self {
        AppliedFee {
            id: fee.id,
            name: fee.name.clone(),
            scope: fee.scope.clone(),
            calculation: fee.calculation_kind(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculationResponse {
    pub original_amount: Decimal,
    pub fee_amount: Decimal,
    pub total_amount: Decimal,
    pub applied_fee: AppliedFee,
    pub sharer_calculations: Vec<SharerCalculation>,
    /// Cascade levels attempted, most specific first, up to and including the hit.
    pub cascade_path: Vec<String>,
    pub calculated_at: i64,
}

/// Resolve, price and split one transaction against the registry.
pub fn calculate(
    registry: &Registry,
    config: &Config,
    request: &CalculationRequest,
) -> Result<CalculationResponse> {
    calculate_at(registry, config, request, current_timestamp())
}

/// As [`calculate`], with an explicit timestamp.
pub fn calculate_at(
    registry: &Registry,
    config: &Config,
    request: &CalculationRequest,
    at: i64,
) -> Result<CalculationResponse> {
    validate_request(request)?;

    let tenant_id = config.effective_tenant_id(request.tenant_id.as_deref());
    if registry
        .active_transaction_type(&request.transaction_type)
        .is_none()
    {
        return Err(Error::TransactionTypeNotFound(
            request.transaction_type.clone(),
        ));
    }
    if registry.active_channel(&request.channel).is_none() {
        return Err(Error::ChannelNotFound(request.channel.clone()));
    }

    let candidates = registry.candidates(&tenant_id, &request.transaction_type, &request.channel);
    let keys = request.cascade_keys();
    info!(
        tenant_id = %tenant_id,
        transaction_type = %request.transaction_type,
        channel = %request.channel,
        cascade = %keys.describe(),
        candidates = candidates.len(),
        "resolving fee"
    );

    let resolution = trace_resolution(&candidates, &keys);
    let misses = if resolution.fee.is_some() {
        resolution.attempted.len() - 1
    } else {
        resolution.attempted.len()
    };
    for level in &resolution.attempted[..misses] {
        debug!(level = %level, "no fee at cascade level");
    }
    let cascade_path: Vec<String> = resolution
        .attempted
        .iter()
        .map(|level| level.to_string())
        .collect();
    let fee = resolution.into_fee()?;

    let fee_amount = compute_fee_amount(fee, request.amount)?;
    let sharer_calculations = if request.apply_sharing {
        distribute_sharers(fee, fee_amount)
    } else {
        Vec::new()
    };

    for share in sharer_calculations.iter().filter(|s| s.is_adjusted()) {
        warn!(
            fee_id = fee.id,
            sharer_id = %share.sharer_id,
            adjustment = %share.adjustment,
            "distribution drift reconciled onto primary sharer"
        );
    }

    let total_amount = request.amount.checked_add(fee_amount).ok_or_else(|| {
        Error::InvalidRequest(format!(
            "Total amount overflow: {} + {}",
            request.amount, fee_amount
        ))
    })?;

    info!(
        fee_id = fee.id,
        scope = %fee.scope,
        fee_amount = %fee_amount,
        "fee resolved"
    );

    Ok(CalculationResponse {
        original_amount: request.amount,
        fee_amount,
        total_amount,
        applied_fee: AppliedFee::from(fee),
        sharer_calculations,
        cascade_path,
        calculated_at: at,
    })
}

fn validate_request(request: &CalculationRequest) -> Result<()> {
    if request.amount <= Decimal::ZERO {
        return Err(Error::InvalidRequest(
            "Amount must be greater than 0".to_string(),
        ));
    }
    if request.transaction_type.trim().is_empty() {
        return Err(Error::InvalidRequest(
            "Transaction type is required".to_string(),
        ));
    }
    if request.channel.trim().is_empty() {
        return Err(Error::InvalidRequest("Channel is required".to_string()));
    }
    Ok(())
}
