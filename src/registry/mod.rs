pub mod catalog;
pub mod fee;
pub mod tenant;

pub use catalog::{CatalogEntry, CatalogKind};
pub use fee::{
    Calculation, CalculationKind, FeeDefinition, FeeScope, RangeTier, ScopeKind, Sharer,
};
pub use tenant::Tenant;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Optional criteria for listing a tenant's fee definitions. Unset fields
/// match everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeeFilter {
    pub scope: Option<ScopeKind>,
    pub calculation: Option<CalculationKind>,
    pub active: Option<bool>,
    pub shared: Option<bool>,
}

impl FeeFilter {
    pub fn matches(&self, fee: &FeeDefinition) -> bool {
        self.scope.map_or(true, |kind| fee.scope_kind() == kind)
            && self
                .calculation
                .map_or(true, |kind| fee.calculation_kind() == kind)
            && self.active.map_or(true, |active| fee.active == active)
            && self.shared.map_or(true, |shared| fee.shared == shared)
    }
}

/// Core domain state: tenants, the transaction-type and channel catalogs, and
/// every fee definition.
///
/// The registry is fully reconstructible by replaying the admin command log.
/// Fee definitions are kept in id order so "first encountered" is stable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Registry {
    /// Tenants indexed by tenant id
    pub tenants: HashMap<String, Tenant>,

    /// Transaction types indexed by code
    pub transaction_types: HashMap<String, CatalogEntry>,

    /// Channels indexed by code
    pub channels: HashMap<String, CatalogEntry>,

    /// Fee definitions indexed by id
    pub fees: BTreeMap<u64, FeeDefinition>,

    /// Id handed to the next created fee definition
    pub next_fee_id: u64,
}

impl Registry {
    /// Create empty genesis registry
    pub fn new() -> Self {
        Registry {
            tenants: HashMap::new(),
            transaction_types: HashMap::new(),
            channels: HashMap::new(),
            fees: BTreeMap::new(),
            next_fee_id: 1,
        }
    }

    pub fn get_tenant(&self, tenant_id: &str) -> Option<&Tenant> {
        self.tenants.get(tenant_id)
    }

    /// Get or create a tenant (returns mutable reference)
    pub fn get_or_create_tenant(&mut self, tenant_id: &str, name: &str, at: i64) -> &mut Tenant {
        self.tenants
            .entry(tenant_id.to_string())
            .or_insert_with(|| Tenant::new(tenant_id, name, at))
    }

    pub fn catalog(&self, kind: CatalogKind) -> &HashMap<String, CatalogEntry> {
        match kind {
            CatalogKind::TransactionType => &self.transaction_types,
            CatalogKind::Channel => &self.channels,
        }
    }

    pub fn catalog_mut(&mut self, kind: CatalogKind) -> &mut HashMap<String, CatalogEntry> {
        match kind {
            CatalogKind::TransactionType => &mut self.transaction_types,
            CatalogKind::Channel => &mut self.channels,
        }
    }

    pub fn get_catalog_entry(&self, kind: CatalogKind, code: &str) -> Option<&CatalogEntry> {
        self.catalog(kind).get(code)
    }

    /// Catalog entries of one kind, sorted by code.
    pub fn catalog_entries(&self, kind: CatalogKind) -> Vec<&CatalogEntry> {
        let mut entries: Vec<&CatalogEntry> = self.catalog(kind).values().collect();
        entries.sort_by(|a, b| a.code.cmp(&b.code));
        entries
    }

    /// Resolve a transaction type name to its active record.
    pub fn active_transaction_type(&self, name: &str) -> Option<&CatalogEntry> {
        self.transaction_types.get(name).filter(|t| t.is_active())
    }

    /// Resolve a channel name to its active record.
    pub fn active_channel(&self, name: &str) -> Option<&CatalogEntry> {
        self.channels.get(name).filter(|c| c.is_active())
    }

    /// Get a fee definition owned by `tenant_id`.
    pub fn get_fee(&self, tenant_id: &str, id: u64) -> Option<&FeeDefinition> {
        self.fees.get(&id).filter(|f| f.tenant_id == tenant_id)
    }

    /// Insert or replace a fee definition.
    pub fn insert_fee(&mut self, fee: FeeDefinition) {
        if fee.id >= self.next_fee_id {
            self.next_fee_id = fee.id + 1;
        }
        self.fees.insert(fee.id, fee);
    }

    /// Fee definitions of a tenant passing `filter`, in id order.
    pub fn search_fees(&self, tenant_id: &str, filter: &FeeFilter) -> Vec<&FeeDefinition> {
        self.fees
            .values()
            .filter(|f| f.tenant_id == tenant_id && filter.matches(f))
            .collect()
    }

    /// Active fee definitions of a tenant, in id order.
    pub fn active_fees(&self, tenant_id: &str) -> Vec<&FeeDefinition> {
        self.fees
            .values()
            .filter(|f| f.tenant_id == tenant_id && f.is_active())
            .collect()
    }

    /// Active definitions of a tenant serving (transaction_type, channel).
    ///
    /// This is the pre-filtered candidate set handed to the cascade resolver.
    pub fn candidates(
        &self,
        tenant_id: &str,
        transaction_type: &str,
        channel: &str,
    ) -> Vec<&FeeDefinition> {
        self.active_fees(tenant_id)
            .into_iter()
            .filter(|f| f.serves(transaction_type, channel))
            .collect()
    }

    /// True if another definition of the tenant already uses `name`.
    pub fn name_taken(&self, tenant_id: &str, name: &str, except: Option<u64>) -> bool {
        self.fees
            .values()
            .any(|f| f.tenant_id == tenant_id && f.name == name && Some(f.id) != except)
    }

    /// Id of an active DEFAULT definition that would compete with `fee` for any
    /// of its (transaction type, channel) combinations.
    pub fn default_conflict(&self, fee: &FeeDefinition) -> Option<u64> {
        if !fee.active || fee.scope != FeeScope::Default {
            return None;
        }
        self.fees
            .values()
            .filter(|other| other.id != fee.id && other.tenant_id == fee.tenant_id)
            .filter(|other| other.active && other.scope == FeeScope::Default)
            .filter(|other| other.transaction_type == fee.transaction_type)
            .find(|other| !other.channels.is_disjoint(&fee.channels))
            .map(|other| other.id)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Registry::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn fixed_fee(id: u64, tenant: &str, name: &str, channels: &[&str], scope: FeeScope) -> FeeDefinition {
        FeeDefinition::new(
            id,
            tenant,
            name,
            "TRANSFER",
            channels,
            scope,
            Calculation::Fixed { amount: dec!(1) },
        )
    }

    #[test]
    fn test_registry_creation() {
        let registry = Registry::new();
        assert!(registry.tenants.is_empty());
        assert!(registry.fees.is_empty());
        assert_eq!(registry.next_fee_id, 1);
    }

    #[test]
    fn test_get_or_create_tenant_keeps_first_name() {
        let mut registry = Registry::new();
        registry.get_or_create_tenant("acme", "Acme", 10);
        let tenant = registry.get_or_create_tenant("acme", "Other", 20);
        assert_eq!(tenant.name, "Acme");
        assert_eq!(tenant.created_at, 10);
    }

    #[test]
    fn test_active_catalog_lookup() {
        let mut registry = Registry::new();
        registry
            .transaction_types
            .insert("TRANSFER".to_string(), CatalogEntry::new("TRANSFER", None));
        let mut web = CatalogEntry::new("WEB", None);
        web.active = false;
        registry.channels.insert("WEB".to_string(), web);

        assert!(registry.active_transaction_type("TRANSFER").is_some());
        assert!(registry.active_channel("WEB").is_none());
        assert!(registry.active_channel("MOBILE").is_none());
    }

    #[test]
    fn test_insert_fee_advances_next_id() {
        let mut registry = Registry::new();
        registry.insert_fee(fixed_fee(5, "acme", "a", &["WEB"], FeeScope::Default));
        assert_eq!(registry.next_fee_id, 6);
        registry.insert_fee(fixed_fee(2, "acme", "b", &["WEB"], FeeScope::Default));
        assert_eq!(registry.next_fee_id, 6);
    }

    #[test]
    fn test_get_fee_is_tenant_scoped() {
        let mut registry = Registry::new();
        registry.insert_fee(fixed_fee(1, "acme", "a", &["WEB"], FeeScope::Default));
        assert!(registry.get_fee("acme", 1).is_some());
        assert!(registry.get_fee("globex", 1).is_none());
    }

    #[test]
    fn test_candidates_filter_active_type_and_channel() {
        let mut registry = Registry::new();
        registry.insert_fee(fixed_fee(1, "acme", "a", &["WEB"], FeeScope::Default));
        let mut inactive = fixed_fee(2, "acme", "b", &["WEB"], FeeScope::Default);
        inactive.active = false;
        registry.insert_fee(inactive);
        registry.insert_fee(fixed_fee(3, "acme", "c", &["MOBILE"], FeeScope::Default));
        registry.insert_fee(fixed_fee(4, "globex", "d", &["WEB"], FeeScope::Default));

        let ids: Vec<u64> = registry
            .candidates("acme", "TRANSFER", "WEB")
            .iter()
            .map(|f| f.id)
            .collect();
        assert_eq!(ids, vec![1]);
    }

    #[test]
    fn test_search_fees_by_filter() {
        let mut registry = Registry::new();
        registry.insert_fee(fixed_fee(1, "acme", "a", &["WEB"], FeeScope::Default));
        let mut inactive = fixed_fee(2, "acme", "b", &["WEB"], FeeScope::Default);
        inactive.active = false;
        registry.insert_fee(inactive);
        let mut percentage = fixed_fee(
            3,
            "acme",
            "c",
            &["WEB"],
            FeeScope::Client {
                client_id: "c1".to_string(),
            },
        );
        percentage.calculation = Calculation::Percentage { rate: dec!(2) };
        registry.insert_fee(percentage);
        registry.insert_fee(fixed_fee(4, "globex", "d", &["WEB"], FeeScope::Default));

        let ids = |filter: FeeFilter| -> Vec<u64> {
            registry
                .search_fees("acme", &filter)
                .iter()
                .map(|f| f.id)
                .collect()
        };

        assert_eq!(ids(FeeFilter::default()), vec![1, 2, 3]);
        assert_eq!(
            ids(FeeFilter {
                scope: Some(ScopeKind::Default),
                active: Some(true),
                ..FeeFilter::default()
            }),
            vec![1]
        );
        assert_eq!(
            ids(FeeFilter {
                calculation: Some(CalculationKind::Percentage),
                ..FeeFilter::default()
            }),
            vec![3]
        );
        assert_eq!(
            ids(FeeFilter {
                active: Some(false),
                ..FeeFilter::default()
            }),
            vec![2]
        );
        assert!(ids(FeeFilter {
            shared: Some(true),
            ..FeeFilter::default()
        })
        .is_empty());
    }

    #[test]
    fn test_name_taken() {
        let mut registry = Registry::new();
        registry.insert_fee(fixed_fee(1, "acme", "a", &["WEB"], FeeScope::Default));
        assert!(registry.name_taken("acme", "a", None));
        assert!(!registry.name_taken("acme", "a", Some(1)));
        assert!(!registry.name_taken("globex", "a", None));
    }

    #[test]
    fn test_default_conflict_on_overlapping_channels() {
        let mut registry = Registry::new();
        registry.insert_fee(fixed_fee(1, "acme", "a", &["WEB", "MOBILE"], FeeScope::Default));

        let overlapping = fixed_fee(2, "acme", "b", &["MOBILE"], FeeScope::Default);
        assert_eq!(registry.default_conflict(&overlapping), Some(1));

        let disjoint = fixed_fee(2, "acme", "b", &["USSD"], FeeScope::Default);
        assert_eq!(registry.default_conflict(&disjoint), None);

        let scoped = fixed_fee(
            2,
            "acme",
            "b",
            &["WEB"],
            FeeScope::Client {
                client_id: "c".to_string(),
            },
        );
        assert_eq!(registry.default_conflict(&scoped), None);

        let other_tenant = fixed_fee(2, "globex", "b", &["WEB"], FeeScope::Default);
        assert_eq!(registry.default_conflict(&other_tenant), None);
    }
}
