//! Product catalog loader
//!
//! Loads products from YAML/JSON files, embeds the ones without a usable
//! vector, and builds a [`ProductIndex`]. A file holds either
//! `{version?, products: [...]}` or a bare product array.

use futures::stream::{self, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

use stylist_core::{EmbeddingProvider, Product};

use crate::index::{IndexHandle, ProductIndex};
use crate::RagError;

const EMBED_BATCH_SIZE: usize = 32;

/// Catalog file format
#[derive(Debug, Serialize, Deserialize)]
pub struct CatalogFile {
    /// Version for format compatibility
    #[serde(default)]
    pub version: Option<String>,
    pub products: Vec<Product>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CatalogDocument {
    Wrapped(CatalogFile),
    Bare(Vec<Product>),
}

/// Outcome of a load
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoadReport {
    pub version: u64,
    pub files: usize,
    pub products: usize,
    /// Records dropped by validation
    pub rejected: usize,
    /// Products embedded during the load
    pub embedded: usize,
}

/// Catalog loader for populating the index
pub struct CatalogLoader {
    embedder: Arc<dyn EmbeddingProvider>,
    concurrency: usize,
    /// Held from version assignment through the swap
    reindex_lock: Mutex<()>,
}

impl CatalogLoader {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, concurrency: usize) -> Self {
        Self {
            embedder,
            concurrency: concurrency.max(1),
            reindex_lock: Mutex::new(()),
        }
    }

    /// Read every product under `path` (a file or a directory of files)
    ///
    /// In a directory, unreadable files are logged and skipped.
    pub fn read_path(path: &Path) -> Result<(Vec<Product>, usize), RagError> {
        if !path.exists() {
            return Err(RagError::Catalog(format!(
                "catalog path does not exist: {}",
                path.display()
            )));
        }

        if path.is_file() {
            return Ok((Self::read_file(path)?, 1));
        }

        let entries = std::fs::read_dir(path)
            .map_err(|e| RagError::Catalog(format!("Failed to read directory: {}", e)))?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| is_catalog_file(p))
            .collect();
        files.sort();

        let mut products = Vec::new();
        let mut loaded = 0;
        for file in &files {
            match Self::read_file(file) {
                Ok(batch) => {
                    tracing::info!(
                        file = %file.display(),
                        products = batch.len(),
                        "Loaded catalog file"
                    );
                    products.extend(batch);
                    loaded += 1;
                },
                Err(e) => {
                    tracing::error!(
                        file = %file.display(),
                        error = %e,
                        "Failed to load catalog file"
                    );
                },
            }
        }

        Ok((products, loaded))
    }

    fn read_file(path: &Path) -> Result<Vec<Product>, RagError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| RagError::Catalog(format!("Failed to read file: {}", e)))?;

        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let document: CatalogDocument = match extension {
            "json" => serde_json::from_str(&content)
                .map_err(|e| RagError::Catalog(format!("JSON parse error: {}", e)))?,
            "yaml" | "yml" => serde_yaml::from_str(&content)
                .map_err(|e| RagError::Catalog(format!("YAML parse error: {}", e)))?,
            _ => {
                return Err(RagError::Catalog(format!(
                    "Unsupported file type: {}",
                    extension
                )))
            },
        };

        Ok(match document {
            CatalogDocument::Wrapped(file) => file.products,
            CatalogDocument::Bare(products) => products,
        })
    }

    /// Drop records with an empty or duplicate id, an empty name, or a rating
    /// outside [0, 5]. The first occurrence of an id wins.
    pub fn validate(products: Vec<Product>) -> (Vec<Product>, usize) {
        let mut seen = HashSet::new();
        let total = products.len();
        let valid: Vec<Product> = products
            .into_iter()
            .filter(|p| {
                let rating_ok = p.rating.map_or(true, |r| (0.0..=5.0).contains(&r));
                let ok = !p.id.trim().is_empty() && !p.name.trim().is_empty() && rating_ok;
                if !ok {
                    tracing::warn!(product_id = %p.id, "Rejected invalid catalog record");
                    return false;
                }
                if !seen.insert(p.id.clone()) {
                    tracing::warn!(product_id = %p.id, "Rejected duplicate catalog record");
                    return false;
                }
                true
            })
            .collect();
        let rejected = total - valid.len();
        (valid, rejected)
    }

    /// Embed products whose vector is missing or has the wrong length
    pub async fn embed_missing(&self, products: &mut [Product]) -> Result<usize, RagError> {
        let dimension = self.embedder.dimension();
        let pending: Vec<usize> = products
            .iter()
            .enumerate()
            .filter(|(_, p)| p.embedding.len() != dimension)
            .map(|(i, _)| i)
            .collect();

        if pending.is_empty() {
            return Ok(0);
        }

        let batches: Vec<Vec<usize>> = pending
            .chunks(EMBED_BATCH_SIZE)
            .map(<[usize]>::to_vec)
            .collect();

        let texts: Vec<Vec<String>> = batches
            .iter()
            .map(|batch| batch.iter().map(|&i| products[i].embedding_text()).collect())
            .collect();

        let embedder = Arc::clone(&self.embedder);
        let vectors: Vec<Vec<Vec<f32>>> = stream::iter(texts)
            .map(|batch| {
                let embedder = Arc::clone(&embedder);
                async move {
                    embedder
                        .embed_batch(&batch)
                        .await
                        .map_err(|e| RagError::Embedding(e.to_string()))
                }
            })
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        for (batch, embedded) in batches.iter().zip(vectors) {
            if embedded.len() != batch.len() {
                return Err(RagError::Embedding(format!(
                    "Expected {} embeddings, got {}",
                    batch.len(),
                    embedded.len()
                )));
            }
            for (&i, vector) in batch.iter().zip(embedded) {
                products[i].embedding = vector;
            }
        }

        Ok(pending.len())
    }

    /// Load, validate and embed the catalog into a new index
    pub async fn build_index(
        &self,
        path: &Path,
        version: u64,
    ) -> Result<(ProductIndex, LoadReport), RagError> {
        let (products, files) = Self::read_path(path)?;
        let (mut products, rejected) = Self::validate(products);
        let embedded = self.embed_missing(&mut products).await?;

        let report = LoadReport {
            version,
            files,
            products: products.len(),
            rejected,
            embedded,
        };
        let index = ProductIndex::build(products, self.embedder.dimension(), version)?;

        tracing::info!(
            path = %path.display(),
            version,
            products = report.products,
            rejected,
            embedded,
            "Catalog indexed"
        );

        Ok((index, report))
    }

    /// Rebuild off to the side and swap it in; the old index stays live on failure
    ///
    /// Concurrent reindexes run one at a time, so versions stay strictly
    /// increasing and a slow stale build never replaces a newer one.
    pub async fn reindex(&self, path: &Path, handle: &IndexHandle) -> Result<LoadReport, RagError> {
        let _guard = self.reindex_lock.lock().await;
        let (index, report) = self.build_index(path, handle.next_version()).await?;
        handle.swap(index);
        Ok(report)
    }
}

fn is_catalog_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("json" | "yaml" | "yml")
    )
}
