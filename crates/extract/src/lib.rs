pub mod schema;
pub mod keywords;
pub mod matcher;
pub mod normalizer;
pub mod llm;
pub mod prompt;
pub mod tagger;
pub mod stage;
pub mod impact;

pub use schema::{EntityKind, EntitySet, ImpactBasis, StockImpact};
pub use keywords::{CompanyEntry, EventEntry, KeywordTable, RegulatorEntry, SectorEntry};
pub use matcher::{KeywordHits, KeywordMatcher};
pub use normalizer::{EntityNormalizer, Resolved};
pub use llm::OllamaClient;
pub use tagger::{EntityExtractorPort, NullTagger, OllamaTagger, Span, SpanKind};
pub use stage::{EntityExtractionStage, ExtractionOutcome};
pub use impact::{ImpactConfig, MappingError, StockImpactStage};
