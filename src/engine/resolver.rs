use crate::error::{Error, Result};
use crate::registry::{FeeDefinition, FeeScope};
use std::borrow::Borrow;
use std::fmt;

/// One specificity level of the cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CascadeLevel<'a> {
    Client(&'a str),
    Product(&'a str),
    Processor(&'a str),
    Default,
}

impl CascadeLevel<'_> {
    /// Whether a definition scoped `scope` answers this level.
    pub fn matches(&self, scope: &FeeScope) -> bool {
        match self {
            CascadeLevel::Client(id) => {
                matches!(scope, FeeScope::Client { client_id } if client_id == id)
            }
            CascadeLevel::Product(id) => {
                matches!(scope, FeeScope::Product { product_id } if product_id == id)
            }
            CascadeLevel::Processor(id) => {
                matches!(scope, FeeScope::Processor { processor_id } if processor_id == id)
            }
            CascadeLevel::Default => matches!(scope, FeeScope::Default),
        }
    }
}

impl fmt::Display for CascadeLevel<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CascadeLevel::Client(id) => write!(f, "CLIENT({})", id),
            CascadeLevel::Product(id) => write!(f, "PRODUCT({})", id),
            CascadeLevel::Processor(id) => write!(f, "PROCESSOR({})", id),
            CascadeLevel::Default => f.write_str("DEFAULT"),
        }
    }
}

/// Optional identifiers a calculation request may carry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CascadeKeys<'a> {
    pub client_id: Option<&'a str>,
    pub product_id: Option<&'a str>,
    pub processor_id: Option<&'a str>,
}

impl<'a> CascadeKeys<'a> {
    pub fn new(
        client_id: Option<&'a str>,
        product_id: Option<&'a str>,
        processor_id: Option<&'a str>,
    ) -> Self {
        CascadeKeys {
            client_id,
            product_id,
            processor_id,
        }
    }

    /// Levels to try, most specific first. A level appears only when its id was
    /// supplied and is not blank; `Default` always closes the chain.
    pub fn chain(&self) -> Vec<CascadeLevel<'a>> {
        let supplied = |id: Option<&'a str>| id.filter(|s| !s.trim().is_empty());

        let mut levels = Vec::with_capacity(4);
        if let Some(id) = supplied(self.client_id) {
            levels.push(CascadeLevel::Client(id));
        }
        if let Some(id) = supplied(self.product_id) {
            levels.push(CascadeLevel::Product(id));
        }
        if let Some(id) = supplied(self.processor_id) {
            levels.push(CascadeLevel::Processor(id));
        }
        levels.push(CascadeLevel::Default);
        levels
    }

    /// Human-readable chain, e.g. `CLIENT(c1) → DEFAULT`.
    pub fn describe(&self) -> String {
        self.chain()
            .iter()
            .map(|level| level.to_string())
            .collect::<Vec<_>>()
            .join(" → ")
    }
}

/// Outcome of walking the cascade: the hit, if any, and every level tried on
/// the way, most specific first, the hit included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution<'a, 'k> {
    pub fee: Option<&'a FeeDefinition>,
    pub attempted: Vec<CascadeLevel<'k>>,
}

impl<'a> Resolution<'a, '_> {
    /// The matched definition, or `NoApplicableFee` when every level missed.
    pub fn into_fee(self) -> Result<&'a FeeDefinition> {
        self.fee.ok_or(Error::NoApplicableFee)
    }
}

/// Walk the cascade over a candidate set already filtered by tenant,
/// transaction type, channel and active flag.
///
/// Levels are tried in order and the walk stops at the first hit; a level
/// with no matching definition hands over to the next one. Within a level the
/// first candidate in input order is taken.
pub fn trace_resolution<'a, 'k, D: Borrow<FeeDefinition>>(
    candidates: &'a [D],
    keys: &CascadeKeys<'k>,
) -> Resolution<'a, 'k> {
    let mut attempted = Vec::new();
    let mut fee = None;
    for level in keys.chain() {
        attempted.push(level);
        fee = find_at_level(candidates, &level);
        if fee.is_some() {
            break;
        }
    }
    Resolution { fee, attempted }
}

/// Pick the single applicable definition from the candidate set.
pub fn resolve_fee<'a, D: Borrow<FeeDefinition>>(
    candidates: &'a [D],
    keys: &CascadeKeys<'_>,
) -> Result<&'a FeeDefinition> {
    trace_resolution(candidates, keys).into_fee()
}

/// First candidate answering one cascade level.
pub fn find_at_level<'a, D: Borrow<FeeDefinition>>(
    candidates: &'a [D],
    level: &CascadeLevel<'_>,
) -> Option<&'a FeeDefinition> {
    candidates
        .iter()
        .map(|c| <D as Borrow<FeeDefinition>>::borrow(c))
        .find(|fee| level.matches(&fee.scope))
}
