use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::keywords::KeywordTable;
use crate::schema::{ImpactBasis, StockImpact};
use crate::stage::ExtractionOutcome;
use ingest::NewsError;

/// Confidence ranges for indirect impacts. Direct mentions are always 1.0.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImpactConfig {
    pub sector_min: f32,
    pub sector_max: f32,
    /// Added per sector keyword hit beyond the first
    pub sector_step: f32,
    pub regulator_min: f32,
    pub regulator_max: f32,
}

impl Default for ImpactConfig {
    fn default() -> Self {
        Self {
            sector_min: 0.6,
            sector_max: 0.8,
            sector_step: 0.05,
            regulator_min: 0.3,
            regulator_max: 0.7,
        }
    }
}

impl ImpactConfig {
    pub fn sector_confidence(&self, hits: usize) -> f32 {
        let extra = hits.saturating_sub(1) as f32;
        (self.sector_min + self.sector_step * extra).min(self.sector_max)
    }

    pub fn regulator_confidence(&self, regulator_hits: usize, total_hits: usize) -> f32 {
        let share = if total_hits == 0 {
            1.0
        } else {
            (regulator_hits as f32 / total_hits as f32).min(1.0)
        };
        (self.regulator_min + (self.regulator_max - self.regulator_min) * share)
            .clamp(self.regulator_min, self.regulator_max)
    }
}

/// The keyword table could not map every entity; `partial` holds what did map.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct MappingError {
    pub message: String,
    pub partial: Vec<StockImpact>,
}

impl From<MappingError> for NewsError {
    fn from(err: MappingError) -> Self {
        NewsError::Mapping(err.message)
    }
}

#[derive(Clone)]
pub struct StockImpactStage {
    table: Arc<KeywordTable>,
    config: ImpactConfig,
}

impl StockImpactStage {
    pub fn new(table: Arc<KeywordTable>, config: ImpactConfig) -> Self {
        Self { table, config }
    }

    pub fn map(&self, outcome: &ExtractionOutcome) -> Result<Vec<StockImpact>, MappingError> {
        let entities = &outcome.entities;
        let mut best: BTreeMap<String, StockImpact> = BTreeMap::new();
        let mut problems: Vec<String> = Vec::new();

        for name in &entities.companies {
            let Some(company) = self.table.company(name) else {
                continue;
            };
            if self.table.sector(&company.sector).is_none() {
                problems.push(format!(
                    "company '{}' maps to unknown sector '{}'",
                    company.name, company.sector
                ));
            }
            offer(&mut best, StockImpact {
                symbol: company.symbol.clone(),
                confidence: 1.0,
                basis: ImpactBasis::Direct,
                reason: format!("{} is mentioned directly", company.name),
            });
        }

        for sector in &entities.sectors {
            let symbols = self.table.symbols_in_sector(sector);
            if symbols.is_empty() {
                problems.push(format!("sector '{}' has no symbols", sector));
                continue;
            }
            let hits = outcome.sector_hits.get(sector).copied().unwrap_or(1);
            let confidence = self.config.sector_confidence(hits);
            for symbol in symbols {
                offer(&mut best, StockImpact {
                    symbol: symbol.to_string(),
                    confidence,
                    basis: ImpactBasis::Sector,
                    reason: format!("{} sector news ({} keyword hits)", sector, hits),
                });
            }
        }

        for name in &entities.regulators {
            let Some(regulator) = self.table.regulator(name) else {
                continue;
            };
            let hits = outcome.regulator_hits.get(&regulator.name).copied().unwrap_or(1);
            let confidence = self.config.regulator_confidence(hits, outcome.total_hits.max(hits));
            for sector in &regulator.sectors {
                if self.table.sector(sector).is_none() {
                    problems.push(format!(
                        "regulator '{}' oversees unknown sector '{}'",
                        regulator.name, sector
                    ));
                    continue;
                }
                for symbol in self.table.symbols_in_sector(sector) {
                    offer(&mut best, StockImpact {
                        symbol: symbol.to_string(),
                        confidence,
                        basis: ImpactBasis::Regulator,
                        reason: format!("{} action affects the {} sector", regulator.name, sector),
                    });
                }
            }
        }

        let mut impacts: Vec<StockImpact> = best.into_values().collect();
        impacts.sort_by(|a, b| {
            b.confidence
                .total_cmp(&a.confidence)
                .then_with(|| a.symbol.cmp(&b.symbol))
        });

        debug!(impacts = impacts.len(), problems = problems.len(), "stock impacts mapped");

        if problems.is_empty() {
            Ok(impacts)
        } else {
            Err(MappingError {
                message: problems.join("; "),
                partial: impacts,
            })
        }
    }
}

/// Keep the strongest claim on a symbol: basis precedence first, then confidence.
fn offer(best: &mut BTreeMap<String, StockImpact>, impact: StockImpact) {
    match best.get(&impact.symbol) {
        Some(current)
            if (current.basis.precedence(), current.confidence)
                >= (impact.basis.precedence(), impact.confidence) => {}
        _ => {
            best.insert(impact.symbol.clone(), impact);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keywords::CompanyEntry;
    use crate::schema::{EntityKind, EntitySet};

    fn stage() -> StockImpactStage {
        StockImpactStage::new(Arc::new(KeywordTable::default()), ImpactConfig::default())
    }

    fn outcome(entities: &[(EntityKind, &str)]) -> ExtractionOutcome {
        let mut set = EntitySet::default();
        for (kind, value) in entities {
            set.insert(*kind, value);
        }
        ExtractionOutcome {
            entities: set,
            ..ExtractionOutcome::default()
        }
    }

    fn find<'a>(impacts: &'a [StockImpact], symbol: &str) -> &'a StockImpact {
        impacts.iter().find(|i| i.symbol == symbol).unwrap()
    }

    #[test]
    fn test_sector_confidence_range() {
        let config = ImpactConfig::default();
        assert!((config.sector_confidence(1) - 0.6).abs() < 1e-6);
        assert!((config.sector_confidence(3) - 0.7).abs() < 1e-6);
        assert!((config.sector_confidence(40) - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_regulator_confidence_range() {
        let config = ImpactConfig::default();
        assert!((config.regulator_confidence(3, 4) - 0.6).abs() < 1e-6);
        assert!((config.regulator_confidence(1, 1) - 0.7).abs() < 1e-6);
        assert!((config.regulator_confidence(1, 100) - 0.304).abs() < 1e-6);
    }

    #[test]
    fn test_direct_wins_over_sector() {
        let mut input = outcome(&[(EntityKind::Company, "HDFC Bank"), (EntityKind::Sector, "Banking")]);
        input.sector_hits.insert("Banking".to_string(), 2);
        input.total_hits = 3;

        let impacts = stage().map(&input).unwrap();
        let hdfc = find(&impacts, "HDFCBANK");
        assert_eq!(hdfc.basis, ImpactBasis::Direct);
        assert_eq!(hdfc.confidence, 1.0);

        let icici = find(&impacts, "ICICIBANK");
        assert_eq!(icici.basis, ImpactBasis::Sector);
        assert!((icici.confidence - 0.65).abs() < 1e-6);

        assert_eq!(impacts.len(), 8);
        assert_eq!(impacts[0].symbol, "HDFCBANK");
        assert_eq!(impacts.iter().filter(|i| i.symbol == "HDFCBANK").count(), 1);
    }

    #[test]
    fn test_regulator_impacts_banking() {
        let mut input = outcome(&[(EntityKind::Regulator, "RBI"), (EntityKind::Event, "rate hike")]);
        input.regulator_hits.insert("RBI".to_string(), 3);
        input.total_hits = 4;

        let impacts = stage().map(&input).unwrap();
        assert_eq!(impacts.len(), 8);
        for impact in &impacts {
            assert_eq!(impact.basis, ImpactBasis::Regulator);
            assert!(impact.confidence >= 0.3 && impact.confidence <= 0.7);
        }
        assert!((find(&impacts, "SBIN").confidence - 0.6).abs() < 1e-6);
        // Equal confidences fall back to symbol order
        let symbols: Vec<&str> = impacts.iter().map(|i| i.symbol.as_str()).collect();
        let mut sorted = symbols.clone();
        sorted.sort();
        assert_eq!(symbols, sorted);
    }

    #[test]
    fn test_sector_beats_regulator() {
        let mut input = outcome(&[(EntityKind::Regulator, "FED"), (EntityKind::Sector, "IT")]);
        input.regulator_hits.insert("FED".to_string(), 1);
        input.total_hits = 1;

        let impacts = stage().map(&input).unwrap();
        let infy = find(&impacts, "INFY");
        assert_eq!(infy.basis, ImpactBasis::Sector);
        assert!((infy.confidence - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_unknown_company_has_no_impact() {
        let impacts = stage().map(&outcome(&[(EntityKind::Company, "Moody's")])).unwrap();
        assert!(impacts.is_empty());
    }

    #[test]
    fn test_inconsistent_table_keeps_partial_impacts() {
        let mut table = KeywordTable::default();
        table.companies.push(CompanyEntry {
            name: "Bharti Airtel".to_string(),
            symbol: "BHARTIARTL".to_string(),
            sector: "Telecom".to_string(),
            aliases: Vec::new(),
        });
        let stage = StockImpactStage::new(Arc::new(table), ImpactConfig::default());

        let err = stage
            .map(&outcome(&[(EntityKind::Company, "Bharti Airtel"), (EntityKind::Company, "Infosys")]))
            .unwrap_err();
        assert!(err.message.contains("Telecom"));
        assert_eq!(err.partial.len(), 2);

        let news_error: NewsError = err.into();
        assert_eq!(news_error.kind(), "mapping");
    }

    #[test]
    fn test_sector_without_symbols() {
        let err = stage().map(&outcome(&[(EntityKind::Sector, "Telecom")])).unwrap_err();
        assert!(err.partial.is_empty());
        assert!(err.message.contains("no symbols"));
    }
}
