use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Company,
    Sector,
    Regulator,
    Person,
    Event,
}

impl EntityKind {
    pub const ALL: [EntityKind; 5] = [
        EntityKind::Company,
        EntityKind::Sector,
        EntityKind::Regulator,
        EntityKind::Person,
        EntityKind::Event,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::Company => "company",
            EntityKind::Sector => "sector",
            EntityKind::Regulator => "regulator",
            EntityKind::Person => "person",
            EntityKind::Event => "event",
        }
    }
}

/// Structured tags attached to one article. All sets are case-insensitively unique.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySet {
    pub companies: BTreeSet<String>,
    pub sectors: BTreeSet<String>,
    pub regulators: BTreeSet<String>,
    pub people: BTreeSet<String>,
    pub events: BTreeSet<String>,
}

impl EntitySet {
    pub fn get(&self, kind: EntityKind) -> &BTreeSet<String> {
        match kind {
            EntityKind::Company => &self.companies,
            EntityKind::Sector => &self.sectors,
            EntityKind::Regulator => &self.regulators,
            EntityKind::Person => &self.people,
            EntityKind::Event => &self.events,
        }
    }

    fn get_mut(&mut self, kind: EntityKind) -> &mut BTreeSet<String> {
        match kind {
            EntityKind::Company => &mut self.companies,
            EntityKind::Sector => &mut self.sectors,
            EntityKind::Regulator => &mut self.regulators,
            EntityKind::Person => &mut self.people,
            EntityKind::Event => &mut self.events,
        }
    }

    /// Insert unless an entry equal ignoring case is already present.
    /// Returns whether the value was added.
    pub fn insert(&mut self, kind: EntityKind, value: &str) -> bool {
        let value = value.trim();
        if value.is_empty() || self.contains(kind, value) {
            return false;
        }
        self.get_mut(kind).insert(value.to_string())
    }

    pub fn contains(&self, kind: EntityKind, value: &str) -> bool {
        self.get(kind).iter().any(|v| v.eq_ignore_ascii_case(value.trim()))
    }

    pub fn merge(&mut self, other: &EntitySet) {
        for kind in EntityKind::ALL {
            for value in other.get(kind) {
                self.insert(kind, value);
            }
        }
    }

    pub fn len(&self) -> usize {
        EntityKind::ALL.iter().map(|k| self.get(*k).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImpactBasis {
    Regulator,
    Sector,
    Direct,
}

impl ImpactBasis {
    /// Higher wins when one symbol is reached through several bases
    pub fn precedence(&self) -> u8 {
        match self {
            ImpactBasis::Direct => 3,
            ImpactBasis::Sector => 2,
            ImpactBasis::Regulator => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockImpact {
    pub symbol: String,
    /// In [0, 1]
    pub confidence: f32,
    pub basis: ImpactBasis,
    pub reason: String,
}
