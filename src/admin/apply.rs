use crate::admin::command::{Command, CommandRecord};
use crate::admin::validation::{
    validate_create_fee, validate_patch_fee, validate_register_catalog_entry,
    validate_replace_fee, validate_replace_sharers, validate_set_catalog_entry_active,
    validate_set_fee_active,
};
use crate::error::Result;
use crate::registry::{CatalogEntry, CatalogKind, Registry};
use tracing::debug;

/// Validate `record` and return the registry it produces.
///
/// The input registry is never touched; on error the caller keeps its old one.
pub fn apply(registry: &Registry, record: &CommandRecord) -> Result<Registry> {
    let at = record.issued_at;
    let mut next = registry.clone();

    match &record.command {
        Command::RegisterCatalogEntry {
            kind,
            code,
            description,
        } => {
            validate_register_catalog_entry(registry, *kind, code)?;
            apply_register_catalog_entry(&mut next, *kind, code, description.as_deref());
        }
        Command::SetCatalogEntryActive { kind, code, active } => {
            validate_set_catalog_entry_active(registry, *kind, code)?;
            if let Some(entry) = next.catalog_mut(*kind).get_mut(code) {
                entry.active = *active;
            }
            debug!(%kind, code = %code, active, "catalog entry toggled");
        }
        Command::CreateFee {
            tenant_id,
            tenant_name,
            draft,
        } => {
            let fee = validate_create_fee(registry, tenant_id, draft, at)?;
            next.get_or_create_tenant(tenant_id, tenant_name, at);
            debug!(fee_id = fee.id, tenant_id = %tenant_id, scope = %fee.scope, "fee created");
            next.insert_fee(fee);
        }
        Command::ReplaceFee {
            tenant_id,
            fee_id,
            draft,
        } => {
            let fee = validate_replace_fee(registry, tenant_id, *fee_id, draft, at)?;
            debug!(fee_id, tenant_id = %tenant_id, "fee replaced");
            next.insert_fee(fee);
        }
        Command::PatchFee {
            tenant_id,
            fee_id,
            patch,
        } => {
            let fee = validate_patch_fee(registry, tenant_id, *fee_id, patch, at)?;
            debug!(fee_id, tenant_id = %tenant_id, "fee patched");
            next.insert_fee(fee);
        }
        Command::ReplaceSharers {
            tenant_id,
            fee_id,
            sharers,
        } => {
            let fee = validate_replace_sharers(registry, tenant_id, *fee_id, sharers, at)?;
            debug!(fee_id, sharers = sharers.len(), "sharers replaced");
            next.insert_fee(fee);
        }
        Command::SetFeeActive {
            tenant_id,
            fee_id,
            active,
        } => {
            let fee = validate_set_fee_active(registry, tenant_id, *fee_id, *active, at)?;
            debug!(fee_id, active, "fee toggled");
            next.insert_fee(fee);
        }
    }

    Ok(next)
}

fn apply_register_catalog_entry(
    registry: &mut Registry,
    kind: CatalogKind,
    code: &str,
    description: Option<&str>,
) {
    registry
        .catalog_mut(kind)
        .insert(code.to_string(), CatalogEntry::new(code, description));
    debug!(%kind, code = %code, "catalog entry registered");
}
