pub mod article;
pub mod embedding;
pub mod error;
pub mod normalizer;
pub mod reader;
pub mod stage;

pub use article::{ArticleId, CanonicalArticle, RawArticle};
pub use embedding::{EmbeddingPort, cosine_similarity};
pub use error::{NewsError, bounded};
pub use normalizer::{matching_text, normalize_text};
pub use reader::ArticleReader;
pub use stage::IngestionStage;

use anyhow::Result;
use std::path::Path;

/// Load raw articles from a single file or every article file in a directory
pub async fn load_articles(path: &Path) -> Result<Vec<RawArticle>> {
    if path.is_dir() {
        ArticleReader::read_directory(path).await
    } else {
        ArticleReader::read_file(path).await
    }
}
