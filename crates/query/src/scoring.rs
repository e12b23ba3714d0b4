use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use extract::{EntityKind, EntitySet, KeywordTable};
use index::{RecordFilter, StoredRecord};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    pub default_max_results: usize,
    pub max_results_cap: usize,
    /// Vector-index hits pulled before entity expansion
    pub candidate_pool: usize,
    pub semantic_weight: f32,
    pub entity_weight: f32,
    pub impact_weight: f32,
    pub relevance_floor: f32,
    pub summary_chars: usize,
    /// Symbols listed in the response's impact summary
    pub impact_summary_len: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_max_results: 5,
            max_results_cap: 50,
            candidate_pool: 20,
            semantic_weight: 0.6,
            entity_weight: 0.2,
            impact_weight: 0.3,
            relevance_floor: 0.25,
            summary_chars: 240,
            impact_summary_len: 10,
        }
    }
}

impl QueryConfig {
    pub fn clamp_max_results(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_max_results)
            .clamp(1, self.max_results_cap.max(1))
    }

    pub fn relevance(&self, cosine: f32, overlap: usize, best_confidence: Option<f32>) -> f32 {
        self.semantic_weight * cosine.max(0.0)
            + self.entity_weight * overlap as f32
            + self.impact_weight * best_confidence.unwrap_or(0.0)
    }
}

/// How a stored record was reached from the query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPath {
    Semantic,
    Company,
    Sector,
    SectorExpansion,
    Regulator,
    Event,
}

impl MatchPath {
    pub fn label(&self) -> &'static str {
        match self {
            MatchPath::Semantic => "semantic",
            MatchPath::Company => "company",
            MatchPath::Sector => "sector",
            MatchPath::SectorExpansion => "sector expansion",
            MatchPath::Regulator => "regulator",
            MatchPath::Event => "event",
        }
    }
}

/// Query entities resolved against the keyword table.
#[derive(Debug, Clone, Default)]
pub struct QueryTargets {
    pub entities: EntitySet,
    /// Sector -> table companies pulled in by sector expansion
    pub sector_companies: BTreeMap<String, Vec<String>>,
    /// Symbols of the query's companies and sectors
    pub symbols: BTreeSet<String>,
}

impl QueryTargets {
    pub fn new(entities: EntitySet, table: &KeywordTable) -> Self {
        let mut symbols = BTreeSet::new();
        for company in &entities.companies {
            if let Some(symbol) = table.symbol_for(company) {
                symbols.insert(symbol.to_string());
            }
        }

        let mut sector_companies = BTreeMap::new();
        for sector in &entities.sectors {
            let companies = table.companies_in_sector(sector);
            symbols.extend(companies.iter().map(|c| c.symbol.clone()));
            sector_companies.insert(sector.clone(), companies.into_iter().map(|c| c.name.clone()).collect());
        }

        Self {
            entities,
            sector_companies,
            symbols,
        }
    }

    pub fn has_entities(&self) -> bool {
        !self.entities.is_empty()
    }

    /// Metadata filter with sector expansion folded into the company list.
    pub fn filter(&self) -> RecordFilter {
        let mut companies = self.entities.companies.clone();
        for expanded in self.sector_companies.values() {
            companies.extend(expanded.iter().cloned());
        }

        RecordFilter {
            companies,
            sectors: self.entities.sectors.clone(),
            regulators: self.entities.regulators.clone(),
        }
    }

    /// Which query entities `record` carries, and through which path.
    pub fn match_record(&self, record: &StoredRecord) -> EntityMatch {
        let tags = &record.entities;
        let mut found = EntityMatch::default();

        for company in &self.entities.companies {
            if tags.contains(EntityKind::Company, company) {
                found.hit(MatchPath::Company, EntityKind::Company, company);
            }
        }

        for sector in &self.entities.sectors {
            if tags.contains(EntityKind::Sector, sector) {
                found.hit(MatchPath::Sector, EntityKind::Sector, sector);
                continue;
            }
            let via = self
                .sector_companies
                .get(sector)
                .and_then(|companies| companies.iter().find(|c| tags.contains(EntityKind::Company, c)));
            if let Some(company) = via {
                found.hit(MatchPath::SectorExpansion, EntityKind::Sector, sector);
                found.expansions.push((sector.clone(), company.clone()));
            }
        }

        for regulator in &self.entities.regulators {
            if tags.contains(EntityKind::Regulator, regulator) {
                found.hit(MatchPath::Regulator, EntityKind::Regulator, regulator);
            }
        }

        for event in &self.entities.events {
            if tags.contains(EntityKind::Event, event) {
                found.hit(MatchPath::Event, EntityKind::Event, event);
            }
        }

        found
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityMatch {
    /// Query entities found on the record
    pub matched: EntitySet,
    pub paths: BTreeSet<MatchPath>,
    /// (query sector, record company) pairs behind sector-expansion hits
    pub expansions: Vec<(String, String)>,
}

impl EntityMatch {
    fn hit(&mut self, path: MatchPath, kind: EntityKind, value: &str) {
        self.matched.insert(kind, value);
        self.paths.insert(path);
    }

    pub fn overlap(&self) -> usize {
        self.matched.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entities(pairs: &[(EntityKind, &str)]) -> EntitySet {
        let mut set = EntitySet::default();
        for (kind, value) in pairs {
            set.insert(*kind, value);
        }
        set
    }

    fn record_with(tags: EntitySet) -> StoredRecord {
        let id = ingest::ArticleId::generate();
        StoredRecord {
            id,
            headline: "h".to_string(),
            content: "c".to_string(),
            source: "s".to_string(),
            published_at: chrono::Utc::now(),
            url: None,
            normalized_text: "h c".to_string(),
            embedding: vec![1.0],
            member_ids: BTreeSet::from([id]),
            sources: BTreeSet::new(),
            merged_text: "h\nc".to_string(),
            entities: tags,
            impacts: Vec::new(),
            stored_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_clamp_max_results() {
        let config = QueryConfig::default();
        assert_eq!(config.clamp_max_results(None), 5);
        assert_eq!(config.clamp_max_results(Some(0)), 1);
        assert_eq!(config.clamp_max_results(Some(500)), 50);
        assert_eq!(config.clamp_max_results(Some(12)), 12);
    }

    #[test]
    fn test_relevance_weights() {
        let config = QueryConfig::default();
        assert!((config.relevance(1.0, 1, Some(1.0)) - 1.1).abs() < 1e-6);
        assert!((config.relevance(-0.5, 0, None)).abs() < 1e-6);
    }

    #[test]
    fn test_sector_expansion_targets() {
        let table = KeywordTable::default();
        let targets = QueryTargets::new(entities(&[(EntityKind::Sector, "IT")]), &table);

        assert!(targets.symbols.contains("INFY"));
        assert!(targets.symbols.contains("TCS"));
        let filter = targets.filter();
        assert!(filter.companies.contains("Wipro"));
        assert!(filter.sectors.contains("IT"));
    }

    #[test]
    fn test_match_paths() {
        let table = KeywordTable::default();
        let targets = QueryTargets::new(
            entities(&[
                (EntityKind::Sector, "Banking"),
                (EntityKind::Regulator, "RBI"),
                (EntityKind::Event, "rate hike"),
            ]),
            &table,
        );

        let via_company = record_with(entities(&[(EntityKind::Company, "ICICI Bank"), (EntityKind::Regulator, "RBI")]));
        let found = targets.match_record(&via_company);
        assert_eq!(
            found.paths.iter().copied().collect::<Vec<_>>(),
            vec![MatchPath::SectorExpansion, MatchPath::Regulator]
        );
        assert_eq!(found.expansions, vec![("Banking".to_string(), "ICICI Bank".to_string())]);
        assert_eq!(found.overlap(), 2);

        let unrelated = record_with(entities(&[(EntityKind::Sector, "Pharma")]));
        assert_eq!(targets.match_record(&unrelated), EntityMatch::default());
    }
}
