pub mod scoring;
pub mod reasoning;
pub mod engine;

pub use scoring::{EntityMatch, MatchPath, QueryConfig, QueryTargets};
pub use engine::{QueryEngine, QueryResponse, QueryResult};
