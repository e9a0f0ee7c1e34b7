//! Merges listing stubs and detail enrichment into final records

use crate::crawler::parser::{ItemDetail, ItemStub};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Separator used when ports are flattened into one export column
pub const PORT_SEPARATOR: &str = ",";

/// One exportable catalog entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Record {
    pub id: String,
    pub name: String,
    pub description: String,
    pub ports: Vec<String>,
    pub category: String,
    pub risk: u8,
    pub popularity: u8,
    pub affected_products: Vec<String>,
    pub impact: String,
    pub technology: String,
    pub behavior: Vec<String>,
    pub references: Vec<String>,
}

impl Record {
    /// A record for a stub whose detail page could not be fetched
    pub fn from_stub(stub: &ItemStub) -> Self {
        Self {
            id: stub.id.clone(),
            name: stub.name.clone(),
            category: stub.category.clone(),
            risk: stub.risk,
            popularity: stub.popularity,
            ..Self::default()
        }
    }

    /// A record enriched with its detail page
    ///
    /// The listing summary stands in when the detail page has no
    /// description of its own.
    pub fn enriched(stub: &ItemStub, detail: &ItemDetail) -> Self {
        let description = if detail.description.is_empty() {
            stub.summary.clone()
        } else {
            detail.description.clone()
        };

        Self {
            description,
            ports: detail.ports.clone(),
            affected_products: detail.affected_products.clone(),
            impact: detail.impact.clone(),
            technology: detail.technology.clone(),
            behavior: detail.behavior.clone(),
            references: detail.references.clone(),
            ..Self::from_stub(stub)
        }
    }

    /// Ports joined into a single export column
    pub fn ports_joined(&self) -> String {
        self.ports.join(PORT_SEPARATOR)
    }
}

/// Drops repeated identifiers, keeping the first occurrence of each
pub fn dedup_stubs(stubs: impl IntoIterator<Item = ItemStub>) -> Vec<ItemStub> {
    let mut seen = HashSet::new();
    stubs
        .into_iter()
        .filter(|stub| seen.insert(stub.id.clone()))
        .collect()
}

/// Produces one record per distinct stub identifier, in first-seen order
///
/// Stubs without a detail entry still yield a record with an empty
/// description and no ports. Detail entries that match no stub are ignored.
pub fn merge(stubs: &[ItemStub], details_by_id: &HashMap<String, ItemDetail>) -> Vec<Record> {
    let mut seen = HashSet::with_capacity(stubs.len());
    let mut records = Vec::with_capacity(stubs.len());

    for stub in stubs {
        if !seen.insert(stub.id.as_str()) {
            tracing::debug!("Skipping repeated identifier {}", stub.id);
            continue;
        }

        let record = match details_by_id.get(&stub.id) {
            Some(detail) => Record::enriched(stub, detail),
            None => Record::from_stub(stub),
        };
        records.push(record);
    }

    records
}
