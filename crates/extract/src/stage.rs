use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::keywords::KeywordTable;
use crate::matcher::KeywordMatcher;
use crate::normalizer::{EntityNormalizer, Resolved};
use crate::schema::{EntityKind, EntitySet};
use crate::tagger::{EntityExtractorPort, Span, SpanKind};
use ingest::{NewsError, bounded};

/// Entities plus the keyword evidence the impact stage scores against.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractionOutcome {
    pub entities: EntitySet,
    /// Sector name -> keyword hits
    pub sector_hits: BTreeMap<String, usize>,
    /// Regulator name -> keyword hits
    pub regulator_hits: BTreeMap<String, usize>,
    /// Every counted keyword hit, events included
    pub total_hits: usize,
}

/// Tagger output merged with keyword-table matches.
#[derive(Clone)]
pub struct EntityExtractionStage {
    tagger: Arc<dyn EntityExtractorPort>,
    table: Arc<KeywordTable>,
    matcher: Arc<KeywordMatcher>,
    normalizer: Arc<EntityNormalizer>,
}

impl EntityExtractionStage {
    pub fn new(tagger: Arc<dyn EntityExtractorPort>, table: Arc<KeywordTable>) -> Result<Self> {
        let matcher = KeywordMatcher::new(&table).context("Failed to compile keyword table")?;
        let normalizer = EntityNormalizer::new(&table);

        Ok(Self {
            tagger,
            table,
            matcher: Arc::new(matcher),
            normalizer: Arc::new(normalizer),
        })
    }

    pub fn table(&self) -> &KeywordTable {
        &self.table
    }

    pub async fn extract(&self, text: &str, timeout: Duration) -> Result<ExtractionOutcome, NewsError> {
        let spans = bounded("entity_extractor", timeout, self.tagger.extract(text)).await?;
        let outcome = self.combine(text, &spans);

        debug!(
            spans = spans.len(),
            entities = outcome.entities.len(),
            keyword_hits = outcome.total_hits,
            "entities extracted"
        );
        Ok(outcome)
    }

    /// Keyword matches only, no tagger call.
    pub fn match_keywords(&self, text: &str) -> ExtractionOutcome {
        self.combine(text, &[])
    }

    fn combine(&self, text: &str, spans: &[Span]) -> ExtractionOutcome {
        let hits = self.matcher.scan(text);
        let mut outcome = ExtractionOutcome {
            total_hits: hits.total(),
            ..ExtractionOutcome::default()
        };
        let entities = &mut outcome.entities;

        for &idx in hits.companies.keys() {
            entities.insert(EntityKind::Company, &self.table.companies[idx].name);
        }
        for (&idx, &count) in &hits.regulators {
            let name = &self.table.regulators[idx].name;
            entities.insert(EntityKind::Regulator, name);
            outcome.regulator_hits.insert(name.clone(), count);
        }
        for (&idx, &count) in &hits.sectors {
            let name = &self.table.sectors[idx].name;
            entities.insert(EntityKind::Sector, name);
            outcome.sector_hits.insert(name.clone(), count);
        }
        for &idx in hits.events.keys() {
            entities.insert(EntityKind::Event, &self.table.events[idx].name);
        }

        for span in spans {
            match span.kind {
                SpanKind::Person => {
                    entities.insert(EntityKind::Person, &span.text);
                }
                SpanKind::Organization => match self.normalizer.resolve_organization(&span.text) {
                    Resolved::Company(name) | Resolved::Unknown(name) => {
                        entities.insert(EntityKind::Company, &name);
                    }
                    Resolved::Regulator(name) => {
                        // Keyword matching already counted it unless the tagger saw a new form
                        if entities.insert(EntityKind::Regulator, &name) {
                            outcome.regulator_hits.insert(name, 1);
                            outcome.total_hits += 1;
                        }
                    }
                },
            }
        }

        outcome
    }
}
