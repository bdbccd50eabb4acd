use serde::{Deserialize, Serialize};

/// Tenant record. Created lazily the first time a fee is defined for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    pub tenant_id: String,
    pub name: String,
    pub created_at: i64,
}

impl Tenant {
    pub fn new(tenant_id: &str, name: &str, created_at: i64) -> Self {
        Tenant {
            tenant_id: tenant_id.to_string(),
            name: name.to_string(),
            created_at,
        }
    }
}
