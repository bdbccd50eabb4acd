use crate::current_timestamp;
use crate::error::{Error, Result};
use crate::registry::{Calculation, CatalogKind, FeeScope, Sharer};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Everything needed to create or wholly replace a fee definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeDraft {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub transaction_type: String,
    pub channels: Vec<String>,
    pub scope: FeeScope,
    pub calculation: Calculation,
    #[serde(default)]
    pub shared: bool,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub sharers: Vec<Sharer>,
}

fn default_active() -> bool {
    true
}

/// Partial update of a fee definition. Absent fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    /// Setting this to false also drops every sharer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_amount: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentage_rate: Option<Decimal>,
}

impl FeePatch {
    /// Build a patch from a loose JSON object, rejecting unknown field names.
    pub fn from_fields(fields: &Map<String, Value>) -> Result<Self> {
        let mut patch = FeePatch::default();
        for (field, value) in fields {
            match field.as_str() {
                "name" => patch.name = Some(string_field(field, value)?),
                "description" => patch.description = Some(string_field(field, value)?),
                "active" => patch.active = Some(bool_field(field, value)?),
                "shared" => patch.shared = Some(bool_field(field, value)?),
                "fixed_amount" => patch.fixed_amount = Some(decimal_field(field, value)?),
                "percentage_rate" => patch.percentage_rate = Some(decimal_field(field, value)?),
                other => return Err(Error::UnknownPatchField(other.to_string())),
            }
        }
        Ok(patch)
    }

    pub fn is_empty(&self) -> bool {
        *self == FeePatch::default()
    }
}

fn string_field(field: &str, value: &Value) -> Result<String> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| Error::InvalidDefinition(format!("Field {} must be a string", field)))
}

fn bool_field(field: &str, value: &Value) -> Result<bool> {
    value
        .as_bool()
        .ok_or_else(|| Error::InvalidDefinition(format!("Field {} must be a boolean", field)))
}

fn decimal_field(field: &str, value: &Value) -> Result<Decimal> {
    serde_json::from_value(value.clone())
        .map_err(|e| Error::InvalidDefinition(format!("Field {} must be a decimal: {}", field, e)))
}

/// Administrative mutation of the registry.
///
/// Commands are validated against the current registry and applied to a copy;
/// a rejected command leaves the registry untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Add a transaction type or channel to its catalog (created active).
    RegisterCatalogEntry {
        kind: CatalogKind,
        code: String,
        description: Option<String>,
    },
    SetCatalogEntryActive {
        kind: CatalogKind,
        code: String,
        active: bool,
    },
    /// Create a fee definition, creating the tenant on first use.
    CreateFee {
        tenant_id: String,
        tenant_name: String,
        draft: FeeDraft,
    },
    /// Replace every field of a definition; scope and calculation kinds are fixed.
    ReplaceFee {
        tenant_id: String,
        fee_id: u64,
        draft: FeeDraft,
    },
    PatchFee {
        tenant_id: String,
        fee_id: u64,
        patch: FeePatch,
    },
    /// Replace the sharer list of a shared fee as a batch.
    ReplaceSharers {
        tenant_id: String,
        fee_id: u64,
        sharers: Vec<Sharer>,
    },
    SetFeeActive {
        tenant_id: String,
        fee_id: u64,
        active: bool,
    },
}

/// A command as it is logged: stamped with the time it was issued so replay
/// reproduces the same timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandRecord {
    pub issued_at: i64,
    pub command: Command,
}

impl CommandRecord {
    /// Stamp a command with the current time.
    pub fn new(command: Command) -> Self {
        CommandRecord {
            issued_at: current_timestamp(),
            command,
        }
    }

    pub fn at(issued_at: i64, command: Command) -> Self {
        CommandRecord { issued_at, command }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_draft_defaults() {
        let draft: FeeDraft = serde_json::from_value(json!({
            "name": "transfer fee",
            "transaction_type": "TRANSFER",
            "channels": ["WEB"],
            "scope": { "kind": "default" },
            "calculation": { "kind": "fixed", "amount": "2.50" }
        }))
        .unwrap();
        assert!(draft.active);
        assert!(!draft.shared);
        assert!(draft.sharers.is_empty());
        assert_eq!(
            draft.calculation,
            Calculation::Fixed { amount: dec!(2.50) }
        );
    }

    #[test]
    fn test_draft_accepts_numeric_decimals() {
        let draft: FeeDraft = serde_json::from_value(json!({
            "name": "tiered",
            "transaction_type": "TRANSFER",
            "channels": ["WEB"],
            "scope": { "kind": "client", "client_id": "c-1" },
            "calculation": { "kind": "ranged", "tiers": [
                { "min_amount": 0, "max_amount": 100, "amount": 5 },
                { "min_amount": 100, "amount": 0, "rate": 1.5 }
            ]}
        }))
        .unwrap();
        match draft.calculation {
            Calculation::Ranged { tiers } => {
                assert_eq!(tiers.len(), 2);
                assert_eq!(tiers[0].max_amount, Some(dec!(100)));
                assert_eq!(tiers[1].max_amount, None);
                assert_eq!(tiers[1].rate, Some(dec!(1.5)));
            }
            other => panic!("unexpected calculation {:?}", other),
        }
    }

    #[test]
    fn test_patch_from_fields() {
        let fields = json!({
            "name": "renamed",
            "active": false,
            "fixed_amount": "3.25"
        });
        let patch = FeePatch::from_fields(fields.as_object().unwrap()).unwrap();
        assert_eq!(patch.name.as_deref(), Some("renamed"));
        assert_eq!(patch.active, Some(false));
        assert_eq!(patch.fixed_amount, Some(dec!(3.25)));
        assert!(patch.shared.is_none());
        assert!(!patch.is_empty());
    }

    #[test]
    fn test_patch_unknown_field() {
        let fields = json!({ "colour": "blue" });
        assert!(matches!(
            FeePatch::from_fields(fields.as_object().unwrap()),
            Err(Error::UnknownPatchField(f)) if f == "colour"
        ));
    }

    #[test]
    fn test_patch_wrong_type() {
        let fields = json!({ "active": "yes" });
        assert!(FeePatch::from_fields(fields.as_object().unwrap()).is_err());
    }

    #[test]
    fn test_record_round_trips_through_json() {
        let record = CommandRecord::at(
            42,
            Command::SetFeeActive {
                tenant_id: "acme".to_string(),
                fee_id: 3,
                active: false,
            },
        );
        let bytes = serde_json::to_vec(&record).unwrap();
        let back: CommandRecord = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(back, record);
    }
}
