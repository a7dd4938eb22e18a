//! The vectors / position map / document store triple.
//!
//! The three structures are constructed together and never edited
//! independently: `position_map[i]` is the stringified position itself, so
//! the correspondence between matrix row, index slot, and document key is
//! an identity rather than a separately maintained mapping.  The bundle is
//! created once per corpus snapshot, read-only afterwards, and rebuilt
//! wholesale when the source data changes.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::info;

use crate::anchors;
use crate::embedding::Matrix;
use crate::index::flat::FlatIndex;
use crate::ingestion::corpus::ParsedRecord;
use crate::normalize;
use crate::types::FatwaError;

const META_FILE: &str = "index_meta.json";
const VECTORS_FILE: &str = "vectors.f32";
const DOCSTORE_FILE: &str = "docstore.json";
const POSITION_MAP_FILE: &str = "position_map.json";

/// One entry of the document store: the embedded text plus the source
/// record's metadata.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredDocument {
    pub page_content: String,
    pub category: Option<String>,
    pub url: String,
}

#[derive(Serialize, Deserialize)]
struct IndexMeta {
    count: usize,
    dimension: usize,
}

/// Exact-search index, position map, and document store as one unit.
#[derive(Clone, Debug)]
pub struct IndexBundle {
    index: FlatIndex,
    position_map: BTreeMap<usize, String>,
    documents: BTreeMap<String, StoredDocument>,
}

impl IndexBundle {
    /// Assembles the bundle.  The single precondition guarding the
    /// positional invariant: the matrix and document list must be the same
    /// length, else the build aborts.
    pub fn build(matrix: Matrix, documents: Vec<StoredDocument>) -> Result<Self, FatwaError> {
        if matrix.rows() != documents.len() {
            return Err(FatwaError::LengthMismatch {
                vectors: matrix.rows(),
                documents: documents.len(),
            });
        }

        let position_map: BTreeMap<usize, String> =
            (0..documents.len()).map(|i| (i, i.to_string())).collect();
        let documents: BTreeMap<String, StoredDocument> = documents
            .into_iter()
            .enumerate()
            .map(|(i, doc)| (i.to_string(), doc))
            .collect();

        info!(count = position_map.len(), "index bundle assembled");
        Ok(Self {
            index: FlatIndex::new(matrix),
            position_map,
            documents,
        })
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn dimensions(&self) -> usize {
        self.index.dimensions()
    }

    /// The raw vector row backing one position.
    pub fn vector(&self, position: usize) -> &[f32] {
        self.index.matrix().row(position)
    }

    /// The document stored at one position.
    pub fn document(&self, position: usize) -> Option<&StoredDocument> {
        self.position_map
            .get(&position)
            .and_then(|key| self.documents.get(key))
    }

    /// Read-only similarity query for downstream consumers: the `k`
    /// nearest documents by squared Euclidean distance, ascending.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(&StoredDocument, f32)>, FatwaError> {
        self.index
            .search(query, k)?
            .into_iter()
            .map(|(position, distance)| {
                let key = self.position_map.get(&position).ok_or_else(|| {
                    FatwaError::Config(format!("position {position} missing from position map"))
                })?;
                let document = self.documents.get(key).ok_or_else(|| {
                    FatwaError::Config(format!("document key {key} missing from store"))
                })?;
                Ok((document, distance))
            })
            .collect()
    }

    /// Writes the bundle directory.  All four files are required together
    /// for the bundle to be loadable; there is no partial or streaming
    /// form.
    pub async fn save(&self, dir: &Path) -> Result<(), FatwaError> {
        fs::create_dir_all(dir).await?;

        let meta = IndexMeta {
            count: self.len(),
            dimension: self.dimensions(),
        };
        fs::write(dir.join(META_FILE), serde_json::to_string_pretty(&meta)?).await?;
        self.index.matrix().write_to(&dir.join(VECTORS_FILE)).await?;
        fs::write(
            dir.join(DOCSTORE_FILE),
            serde_json::to_string_pretty(&self.documents)?,
        )
        .await?;
        fs::write(
            dir.join(POSITION_MAP_FILE),
            serde_json::to_string_pretty(&self.position_map)?,
        )
        .await?;

        info!(dir = %dir.display(), count = self.len(), "index bundle saved");
        Ok(())
    }

    /// Loads a bundle directory, verifying the positional invariant before
    /// serving any query.
    pub async fn load(dir: &Path) -> Result<Self, FatwaError> {
        let meta: IndexMeta =
            serde_json::from_str(&fs::read_to_string(dir.join(META_FILE)).await?)?;
        let matrix = Matrix::read_from(&dir.join(VECTORS_FILE), meta.dimension).await?;
        if matrix.rows() != meta.count {
            return Err(FatwaError::Config(format!(
                "vector file holds {} rows but metadata declares {}",
                matrix.rows(),
                meta.count
            )));
        }

        let documents: BTreeMap<String, StoredDocument> =
            serde_json::from_str(&fs::read_to_string(dir.join(DOCSTORE_FILE)).await?)?;
        let position_map: BTreeMap<usize, String> =
            serde_json::from_str(&fs::read_to_string(dir.join(POSITION_MAP_FILE)).await?)?;

        validate_correspondence(meta.count, &position_map, &documents)?;

        Ok(Self {
            index: FlatIndex::new(matrix),
            position_map,
            documents,
        })
    }
}

/// The position map must be a bijection from `[0, count)` onto the
/// document-store keys.
fn validate_correspondence(
    count: usize,
    position_map: &BTreeMap<usize, String>,
    documents: &BTreeMap<String, StoredDocument>,
) -> Result<(), FatwaError> {
    if position_map.len() != count || documents.len() != count {
        return Err(FatwaError::Config(format!(
            "bundle is inconsistent: {count} vectors, {} positions, {} documents",
            position_map.len(),
            documents.len()
        )));
    }
    for position in 0..count {
        let key = position_map.get(&position).ok_or_else(|| {
            FatwaError::Config(format!("position {position} missing from position map"))
        })?;
        if !documents.contains_key(key) {
            return Err(FatwaError::Config(format!(
                "position {position} maps to key {key} with no stored document"
            )));
        }
    }
    Ok(())
}

/// Prepares the document store entries (and thereby the embedding corpus)
/// from successfully parsed records, preserving record order.  Records
/// with `error` set stay behind in the corpus store for auditing.
pub fn documents_from_records(records: &[ParsedRecord]) -> Vec<StoredDocument> {
    records
        .iter()
        .filter(|record| record.is_parsed())
        .map(|record| StoredDocument {
            page_content: compose_page_content(
                record.question.as_deref().unwrap_or_default(),
                record.answer.as_deref().unwrap_or_default(),
            ),
            category: record.category.clone(),
            url: record.url.clone(),
        })
        .collect()
}

/// The text handed to the embedding model: labeled question and answer
/// with invocation phrases removed and the wider diacritic set stripped.
fn compose_page_content(question: &str, answer: &str) -> String {
    format!(
        "سوال:\n{}\n\nجواب:\n{}",
        normalize::clean_for_embedding(&strip_invocations(question)),
        normalize::clean_for_embedding(&strip_invocations(answer)),
    )
}

fn strip_invocations(text: &str) -> String {
    text.replace(anchors::ANSWER_START, "")
        .replace(anchors::ANSWER_END, "")
}
