//! # intro-graph — Warm-Introduction Path Engine
//!
//! Discovers and ranks warm-introduction paths between a fixed set of seed
//! people and an arbitrary target person or firm, over a relationship graph
//! assembled from noisy, multi-source contact records.
//!
//! ## Pipeline
//!
//! ```text
//! raw record ─► preprocess ─► normalize (─► resolve names) ─► Contact
//!   Contact batch ─► GraphConstructor ─► GraphStore (external)
//!   target ─► PathFinder ─► GraphStore path search ─► PathScorer ─► ScoredPath[]
//! ```
//!
//! ## Design Principles
//!
//! 1. **Trait at the store seam**: `GraphStore` is the only contract with the
//!    graph database; `MemoryStore` is the reference implementation.
//! 2. **Deterministic ids**: nodes and relationships are keyed by ids derived
//!    from canonical names, so repeated construction merges, never duplicates.
//! 3. **Explicit services**: the `EntityResolver` (and its cache) is passed in,
//!    never a process-wide singleton.
//! 4. **Typed failures**: `Error::is_recoverable()` separates skip-and-continue
//!    failures from ones that abort a batch.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use intro_graph::{IntroGraph, Provenance, RawRecord};
//!
//! # async fn example() -> intro_graph::Result<()> {
//! let graph = IntroGraph::open_memory();
//! let record = RawRecord::from_json(r#"{"Full Name": "John Smith", "Company": "Acme Capital"}"#)?;
//! let report = graph.ingest(&[record], &Provenance::new("csv")).await?;
//! assert_eq!(report.rows_imported, 1);
//!
//! graph.mark_seed("John Smith").await?;
//! for path in graph.find_paths_to("Acme Capital").await? {
//!     println!("{:.2} {:?}", path.normalized_score, path.metadata.connection_types);
//! }
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod config;
pub mod ingest;
pub mod resolve;
pub mod construct;
pub mod paths;
pub mod storage;
pub mod export;

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{info, warn};

// ============================================================================
// Re-exports
// ============================================================================

pub use model::{
    Contact, GraphNode, GraphRelationship, Label, NodeId, Path, PathElement, Properties,
    RelId, RelType, Source,
};
pub use config::{EngineConfig, ScoringWeights};
pub use ingest::{CleanRecord, NormalizedRow, Provenance, RawRecord, RowError, RowNormalizer};
pub use resolve::{AliasSource, EntityResolver, Resolution, StaticAliases};
pub use construct::{
    ConstructOptions, ConstructReport, GraphConstructor, MutualConnection, MutualSource, Mutation,
};
pub use paths::{PathFinder, PathScorer, ScoredPath, SegmentScorer};
pub use storage::{GraphStore, MemoryStore};

// ============================================================================
// Top-level handle
// ============================================================================

/// The primary entry point. Wraps a graph store together with the resolver
/// and configuration every stage shares.
pub struct IntroGraph<S: GraphStore> {
    store: S,
    resolver: EntityResolver,
    config: EngineConfig,
}

impl<S: GraphStore> IntroGraph<S> {
    /// Create a handle over `store`. Fails on an invalid configuration.
    pub fn with_store(store: S, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let resolver = EntityResolver::new(&config);
        Ok(Self { store, resolver, config })
    }

    /// Replace the resolver, e.g. one carrying an alias source.
    pub fn with_resolver(mut self, resolver: EntityResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn resolver(&self) -> &EntityResolver {
        &self.resolver
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Preprocess, normalize and construct a batch of raw records.
    ///
    /// Rows missing required fields are skipped and reported; everything
    /// else is handed to the constructor as one best-effort batch.
    pub async fn ingest(&self, records: &[RawRecord], provenance: &Provenance) -> Result<ImportReport> {
        let normalizer = RowNormalizer::new(&self.config).with_resolver(&self.resolver);
        let hint = provenance.hint();
        let mut report = ImportReport { rows_seen: records.len(), ..ImportReport::default() };
        let mut contacts = Vec::with_capacity(records.len());

        for (row, record) in records.iter().enumerate() {
            let clean = ingest::preprocess(record, Some(&hint));
            if clean.iter().all(|(key, _)| key.starts_with("source_")) {
                report.rows_skipped += 1;
                report.row_errors.push((row, "record produced no usable fields".into()));
                continue;
            }
            match normalizer.normalize(&clean, provenance).into_contact() {
                Ok(contact) => contacts.push(contact),
                Err(err) => {
                    let RowError::MissingRequired(fields) = &err;
                    for field in fields {
                        *report.missing_fields.entry((*field).to_string()).or_default() += 1;
                    }
                    warn!(row, error = %err, "skipping row");
                    report.rows_skipped += 1;
                    report.row_errors.push((row, err.to_string()));
                }
            }
        }

        report.rows_imported = contacts.len();
        let constructor = GraphConstructor::new(&self.store, &self.resolver, ConstructOptions::from(&self.config));
        report.construct = constructor.construct(&contacts).await?;

        info!(
            rows = report.rows_seen,
            imported = report.rows_imported,
            skipped = report.rows_skipped,
            failures = report.construct.failures.len(),
            "ingest complete"
        );
        Ok(report)
    }

    /// Ingest mutual-connection records (API or automation sourced).
    pub async fn ingest_mutual_connections(&self, records: &[MutualConnection]) -> Result<ConstructReport> {
        GraphConstructor::new(&self.store, &self.resolver, ConstructOptions::from(&self.config))
            .ingest_mutual_connections(records)
            .await
    }

    /// Flag the person named `name` as a seed (merging the node if needed).
    pub async fn mark_seed(&self, name: &str) -> Result<GraphNode> {
        let resolved = self.resolver.resolve(name).resolved_name;
        let props = Properties {
            name: Some(resolved),
            is_seed: Some(true),
            ..Properties::default()
        };
        self.store.create_or_update_node(&[Label::Person], props).await
    }

    /// Scored paths from any seed to the node `target`.
    pub async fn find_paths(&self, target: &NodeId) -> Result<Vec<ScoredPath>> {
        PathFinder::new(&self.store, &self.config).find_paths(target).await
    }

    /// Resolve `target_name` to a node, then find scored paths to it.
    pub async fn find_paths_to(&self, target_name: &str) -> Result<Vec<ScoredPath>> {
        let finder = PathFinder::new(&self.store, &self.config);
        let target = finder
            .resolve_target(target_name, &self.resolver)
            .await?
            .ok_or_else(|| Error::NotFound(format!("target '{target_name}'")))?;
        finder.find_paths(&target.id).await
    }
}

/// In-memory graph for testing and embedding.
impl IntroGraph<MemoryStore> {
    pub fn open_memory() -> Self {
        let config = EngineConfig::default();
        let resolver = EntityResolver::new(&config);
        Self { store: MemoryStore::new(), resolver, config }
    }
}

/// What happened to a batch of raw records.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub rows_seen: usize,
    pub rows_imported: usize,
    pub rows_skipped: usize,
    /// Required field → number of rows it was missing from.
    pub missing_fields: BTreeMap<String, usize>,
    /// `(row index, message)` for every skipped row.
    pub row_errors: Vec<(usize, String)>,
    pub construct: ConstructReport,
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Graph store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Graph store rejected {entity}: {message}")]
    StoreRejected { entity: String, message: String },

    #[error("Invalid entity {entity}: {message}")]
    InvalidEntity { entity: String, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Entity-scoped failures: log, skip the entity, keep the batch going.
    /// Everything else aborts the operation.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::StoreRejected { .. } | Error::InvalidEntity { .. } | Error::NotFound(_) | Error::Json(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
