pub mod record;
pub mod ports;
pub mod memory;
pub mod file_store;
pub mod embeddings;
pub mod qdrant_index;
pub mod storage;

pub use record::{StoredRecord, sort_recent};
pub use ports::{MetadataStorePort, RecordFilter, VectorIndexPort};
pub use memory::{InMemoryMetadataStore, InMemoryVectorIndex};
pub use file_store::JsonFileMetadataStore;
pub use embeddings::OllamaEmbedder;
pub use qdrant_index::QdrantVectorIndex;
pub use storage::StorageStage;
