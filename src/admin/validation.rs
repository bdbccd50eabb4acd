use crate::admin::command::{Command, CommandRecord, FeeDraft, FeePatch};
use crate::engine::{validate_definition, validate_sharers};
use crate::error::{Error, Result};
use crate::registry::{Calculation, CatalogKind, FeeDefinition, Registry, Sharer};

/// Dry-run a command against the registry.
///
/// Returns the definition the command would store, or `None` for catalog
/// commands. Nothing is mutated.
pub fn validate(registry: &Registry, record: &CommandRecord) -> Result<Option<FeeDefinition>> {
    let at = record.issued_at;
    match &record.command {
        Command::RegisterCatalogEntry { kind, code, .. } => {
            validate_register_catalog_entry(registry, *kind, code).map(|_| None)
        }
        Command::SetCatalogEntryActive { kind, code, .. } => {
            validate_set_catalog_entry_active(registry, *kind, code).map(|_| None)
        }
        Command::CreateFee {
            tenant_id, draft, ..
        } => validate_create_fee(registry, tenant_id, draft, at).map(Some),
        Command::ReplaceFee {
            tenant_id,
            fee_id,
            draft,
        } => validate_replace_fee(registry, tenant_id, *fee_id, draft, at).map(Some),
        Command::PatchFee {
            tenant_id,
            fee_id,
            patch,
        } => validate_patch_fee(registry, tenant_id, *fee_id, patch, at).map(Some),
        Command::ReplaceSharers {
            tenant_id,
            fee_id,
            sharers,
        } => validate_replace_sharers(registry, tenant_id, *fee_id, sharers, at).map(Some),
        Command::SetFeeActive {
            tenant_id,
            fee_id,
            active,
        } => validate_set_fee_active(registry, tenant_id, *fee_id, *active, at).map(Some),
    }
}

pub fn validate_register_catalog_entry(
    registry: &Registry,
    kind: CatalogKind,
    code: &str,
) -> Result<()> {
    if code.trim().is_empty() {
        return Err(Error::InvalidRequest(format!("A {} code is required", kind)));
    }
    if registry.get_catalog_entry(kind, code).is_some() {
        return Err(Error::CatalogEntryExists(format!("{} {}", kind, code)));
    }
    Ok(())
}

pub fn validate_set_catalog_entry_active(
    registry: &Registry,
    kind: CatalogKind,
    code: &str,
) -> Result<()> {
    registry
        .get_catalog_entry(kind, code)
        .map(|_| ())
        .ok_or_else(|| catalog_not_found(kind, code))
}

/// Validate a create and return the definition it would insert.
pub fn validate_create_fee(
    registry: &Registry,
    tenant_id: &str,
    draft: &FeeDraft,
    at: i64,
) -> Result<FeeDefinition> {
    if tenant_id.trim().is_empty() {
        return Err(Error::InvalidDefinition("Tenant id is required".to_string()));
    }

    let fee = definition_from_draft(registry.next_fee_id, tenant_id, draft, at, at);
    validate_definition(&fee)?;
    check_catalog_references(registry, &fee)?;
    check_tenant_uniqueness(registry, &fee)?;
    Ok(fee)
}

/// Validate a whole-definition replacement.
///
/// Scope kind and calculation kind are part of a definition's identity and
/// cannot be changed this way.
pub fn validate_replace_fee(
    registry: &Registry,
    tenant_id: &str,
    fee_id: u64,
    draft: &FeeDraft,
    at: i64,
) -> Result<FeeDefinition> {
    let existing = existing_fee(registry, tenant_id, fee_id)?;

    if draft.scope.kind() != existing.scope_kind() {
        return Err(Error::InvalidDefinition(format!(
            "Scope kind cannot change on update: {} -> {}",
            existing.scope_kind(),
            draft.scope.kind()
        )));
    }
    if draft.calculation.kind() != existing.calculation_kind() {
        return Err(Error::InvalidDefinition(format!(
            "Calculation kind cannot change on update: {} -> {}",
            existing.calculation_kind(),
            draft.calculation.kind()
        )));
    }

    let fee = definition_from_draft(fee_id, tenant_id, draft, existing.created_at, at);
    validate_definition(&fee)?;
    check_catalog_references(registry, &fee)?;
    check_tenant_uniqueness(registry, &fee)?;
    Ok(fee)
}

pub fn validate_patch_fee(
    registry: &Registry,
    tenant_id: &str,
    fee_id: u64,
    patch: &FeePatch,
    at: i64,
) -> Result<FeeDefinition> {
    let mut fee = existing_fee(registry, tenant_id, fee_id)?.clone();

    if let Some(name) = &patch.name {
        fee.name = name.trim().to_string();
    }
    if let Some(description) = &patch.description {
        fee.description = Some(description.clone());
    }
    if let Some(active) = patch.active {
        fee.active = active;
    }
    if let Some(shared) = patch.shared {
        fee.shared = shared;
        if !shared {
            fee.sharers.clear();
        }
    }
    if let Some(amount) = patch.fixed_amount {
        match &mut fee.calculation {
            Calculation::Fixed { amount: fixed } => *fixed = amount,
            _ => {
                return Err(Error::InvalidDefinition(
                    "Cannot update fixed amount for non-FIXED fee".to_string(),
                ))
            }
        }
    }
    if let Some(rate) = patch.percentage_rate {
        match &mut fee.calculation {
            Calculation::Percentage { rate: current } => *current = rate,
            _ => {
                return Err(Error::InvalidDefinition(
                    "Cannot update percentage rate for non-PERCENTAGE fee".to_string(),
                ))
            }
        }
    }

    fee.updated_at = at;
    validate_definition(&fee)?;
    check_tenant_uniqueness(registry, &fee)?;
    Ok(fee)
}

pub fn validate_replace_sharers(
    registry: &Registry,
    tenant_id: &str,
    fee_id: u64,
    sharers: &[Sharer],
    at: i64,
) -> Result<FeeDefinition> {
    let mut fee = existing_fee(registry, tenant_id, fee_id)?.clone();
    if !fee.shared {
        return Err(Error::FeeNotShared(fee_id));
    }

    validate_sharers(sharers)?;
    fee.sharers = sharers.to_vec();
    fee.updated_at = at;
    validate_definition(&fee)?;
    Ok(fee)
}

pub fn validate_set_fee_active(
    registry: &Registry,
    tenant_id: &str,
    fee_id: u64,
    active: bool,
    at: i64,
) -> Result<FeeDefinition> {
    let mut fee = existing_fee(registry, tenant_id, fee_id)?.clone();
    fee.active = active;
    fee.updated_at = at;
    check_tenant_uniqueness(registry, &fee)?;
    Ok(fee)
}

fn existing_fee<'a>(registry: &'a Registry, tenant_id: &str, fee_id: u64) -> Result<&'a FeeDefinition> {
    registry
        .get_fee(tenant_id, fee_id)
        .ok_or(Error::FeeNotFound(fee_id))
}

fn definition_from_draft(
    id: u64,
    tenant_id: &str,
    draft: &FeeDraft,
    created_at: i64,
    updated_at: i64,
) -> FeeDefinition {
    FeeDefinition {
        id,
        tenant_id: tenant_id.to_string(),
        name: draft.name.trim().to_string(),
        description: draft.description.clone(),
        transaction_type: draft.transaction_type.clone(),
        channels: draft.channels.iter().cloned().collect(),
        scope: draft.scope.clone(),
        calculation: draft.calculation.clone(),
        shared: draft.shared,
        active: draft.active,
        sharers: draft.sharers.clone(),
        created_at,
        updated_at,
    }
}

/// The transaction type and every channel must be active catalog entries.
fn check_catalog_references(registry: &Registry, fee: &FeeDefinition) -> Result<()> {
    if registry.active_transaction_type(&fee.transaction_type).is_none() {
        return Err(Error::TransactionTypeNotFound(fee.transaction_type.clone()));
    }

    let missing: Vec<&str> = fee
        .channels
        .iter()
        .filter(|c| registry.active_channel(c).is_none())
        .map(String::as_str)
        .collect();
    if !missing.is_empty() {
        return Err(Error::ChannelNotFound(missing.join(", ")));
    }

    Ok(())
}

/// Names are unique per tenant, and at most one active DEFAULT fee may cover
/// any (transaction type, channel) pair.
fn check_tenant_uniqueness(registry: &Registry, fee: &FeeDefinition) -> Result<()> {
    if registry.name_taken(&fee.tenant_id, &fee.name, Some(fee.id)) {
        return Err(Error::InvalidDefinition(format!(
            "Fee with name '{}' already exists for this tenant",
            fee.name
        )));
    }
    if let Some(other) = registry.default_conflict(fee) {
        return Err(Error::InvalidDefinition(format!(
            "Active DEFAULT fee {} already covers transaction type {} on an overlapping channel",
            other, fee.transaction_type
        )));
    }
    Ok(())
}

fn catalog_not_found(kind: CatalogKind, code: &str) -> Error {
    match kind {
        CatalogKind::TransactionType => Error::TransactionTypeNotFound(code.to_string()),
        CatalogKind::Channel => Error::ChannelNotFound(code.to_string()),
    }
}
