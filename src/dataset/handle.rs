use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;
use crate::aggregate::facet::FacetTable;
use crate::core::config::IndexConfig;
use crate::core::convert::Converter;
use crate::core::cancel::CancellationToken;
use crate::core::error::{Error, ErrorKind, Result};
use crate::parallel::orchestrator::Orchestrator;
use crate::parallel::partitioner::Partitioner;
use crate::query::kind::QueryKind;
use crate::search::results::RankedResults;
use crate::shard::ShardIndex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DatasetState {
    /// Some partitions have not been indexed yet
    Uninitialized,
    /// Every partition has a live shard index
    Built,
    /// Derived from another dataset by `filter`
    Filtered,
    Closed,
}

/// Requested retention for a dataset's shards. Shards only ever live in
/// memory; the level is recorded so callers can inspect it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StorageLevel {
    #[default]
    None,
    MemoryOnly,
    MemoryAndDisk,
    DiskOnly,
}

/// One partition: its records plus the shard index built from them, if
/// built. A missing shard is rebuilt from the records on next use, unless
/// the slot has been closed.
struct ShardSlot<R> {
    partition: u32,
    records: Arc<Vec<R>>,
    shard: RwLock<Option<Arc<ShardIndex<R>>>>,
    closed: AtomicBool,
}

impl<R> ShardSlot<R>
where
    R: Clone + PartialEq + Send + Sync + 'static,
{
    fn new(partition: u32, records: Arc<Vec<R>>) -> Self {
        ShardSlot { partition, records, shard: RwLock::new(None), closed: AtomicBool::new(false) }
    }

    fn with_shard(partition: u32, shard: ShardIndex<R>) -> Result<Self> {
        Ok(ShardSlot {
            partition,
            records: shard.records()?,
            shard: RwLock::new(Some(Arc::new(shard))),
            closed: AtomicBool::new(false),
        })
    }

    fn get_or_build(&self, converter: &Converter<R>, config: &Arc<IndexConfig>) -> Result<Arc<ShardIndex<R>>> {
        if let Some(shard) = self.shard.read().as_ref() {
            return Ok(Arc::clone(shard));
        }

        let mut guard = self.shard.write();
        if let Some(shard) = guard.as_ref() {
            return Ok(Arc::clone(shard));
        }
        // set under this lock by `close`
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::closed_dataset());
        }

        let shard = Arc::new(ShardIndex::build(
            self.partition,
            Arc::clone(&self.records),
            Arc::clone(converter),
            Arc::clone(config),
        )?);
        *guard = Some(Arc::clone(&shard));
        Ok(shard)
    }

    fn is_built(&self) -> bool {
        self.shard.read().is_some()
    }

    /// Drop the shard; queries already holding it finish normally.
    fn invalidate(&self) -> bool {
        self.shard.write().take().is_some()
    }

    fn close(&self) {
        let mut guard = self.shard.write();
        self.closed.store(true, Ordering::Release);
        if let Some(shard) = guard.take() {
            shard.close();
        }
    }
}

/// A partitioned collection of records with one shard index per partition.
///
/// Queries fan out to every shard on the dataset's worker pool and the
/// per-shard answers are merged with their monoid, so the result does not
/// depend on how many shards there are or in which order they finish.
/// Shards are built lazily and rebuilt from the partition's records when
/// invalidated, which yields identical results.
pub struct Dataset<R> {
    id: Uuid,
    name: RwLock<Option<String>>,
    created_at: DateTime<Utc>,
    storage_level: RwLock<StorageLevel>,
    filtered: bool,
    closed: AtomicBool,
    slots: Vec<ShardSlot<R>>,
    converter: Converter<R>,
    config: Arc<IndexConfig>,
    orchestrator: Arc<Orchestrator>,
}

impl<R> fmt::Debug for Dataset<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dataset")
            .field("id", &self.id)
            .field("name", &*self.name.read())
            .field("partitions", &self.slots.len())
            .field("closed", &self.closed.load(Ordering::Acquire))
            .finish()
    }
}

impl<R> Dataset<R>
where
    R: Clone + PartialEq + Send + Sync + 'static,
{
    pub fn builder(converter: Converter<R>) -> DatasetBuilder<R> {
        DatasetBuilder::new(converter)
    }

    /// One shard per given partition. Shards are indexed on first use.
    pub fn from_partitions(partitions: Vec<Vec<R>>, converter: Converter<R>, config: IndexConfig) -> Result<Self> {
        config.validate()?;
        let orchestrator = Arc::new(Orchestrator::new(config.parallelism)?);

        let slots: Vec<ShardSlot<R>> = partitions
            .into_iter()
            .enumerate()
            .map(|(i, records)| ShardSlot::new(i as u32, Arc::new(records)))
            .collect();

        let dataset = Dataset {
            id: Uuid::new_v4(),
            name: RwLock::new(None),
            created_at: Utc::now(),
            storage_level: RwLock::new(StorageLevel::None),
            filtered: false,
            closed: AtomicBool::new(false),
            slots,
            converter,
            config: Arc::new(config),
            orchestrator,
        };

        info!(
            dataset = %dataset.id,
            shards = dataset.slots.len(),
            docs = dataset.slots.iter().map(|s| s.records.len()).sum::<usize>(),
            "Created dataset"
        );
        Ok(dataset)
    }

    /// Spread `records` round-robin over `num_partitions` partitions.
    pub fn from_records(records: Vec<R>, num_partitions: usize, converter: Converter<R>, config: IndexConfig) -> Result<Self> {
        let partitions = Partitioner::RoundRobin.split(records, num_partitions);
        Self::from_partitions(partitions, converter, config)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            Err(Error::closed_dataset())
        } else {
            Ok(())
        }
    }

    fn shard(&self, slot: &ShardSlot<R>) -> Result<Arc<ShardIndex<R>>> {
        slot.get_or_build(&self.converter, &self.config)
    }

    /// A shard closed underneath a running call reports the dataset as
    /// closed once `close` has started.
    fn map_closed(&self, err: Error) -> Error {
        if err.kind == ErrorKind::ClosedShard && self.closed.load(Ordering::Acquire) {
            Error::closed_dataset()
        } else {
            err
        }
    }

    /// Run `op` on every shard and fold the answers.
    fn run<M, F>(&self, op: F) -> Result<M>
    where
        M: crate::aggregate::monoid::Monoid + Send,
        F: Fn(&ShardIndex<R>) -> Result<M> + Sync,
    {
        self.ensure_open()?;
        self.orchestrator
            .query_all(&self.slots, |slot| {
                let shard = self.shard(slot)?;
                op(&shard)
            })
            .map_err(|e| self.map_closed(e))
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> Option<String> {
        self.name.read().clone()
    }

    pub fn set_name(&self, name: impl Into<String>) {
        let name = name.into();
        info!(dataset = %self.id, name = %name, "Renamed dataset");
        *self.name.write() = Some(name);
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    pub fn num_partitions(&self) -> usize {
        self.slots.len()
    }

    pub fn storage_level(&self) -> StorageLevel {
        *self.storage_level.read()
    }

    pub fn state(&self) -> DatasetState {
        if self.closed.load(Ordering::Acquire) {
            DatasetState::Closed
        } else if self.filtered {
            DatasetState::Filtered
        } else if self.slots.iter().all(ShardSlot::is_built) {
            DatasetState::Built
        } else {
            DatasetState::Uninitialized
        }
    }

    /// Top records across all shards for any query flavour, stopping early
    /// if `token` is cancelled before a shard starts.
    pub fn search_with(&self, kind: &QueryKind, top_k: Option<usize>, token: &CancellationToken) -> Result<RankedResults<R>> {
        self.ensure_open()?;
        let top_k = self.config.resolve_top_k(top_k)?;

        let results = self
            .orchestrator
            .query_all_with(
                &self.slots,
                |slot| {
                    let shard = self.shard(slot)?;
                    shard.execute_with(kind, top_k, token)
                },
                token,
            )
            .map_err(|e| self.map_closed(e))?;

        debug!(
            dataset = %self.id,
            kind = kind.name(),
            top_k,
            hits = results.len(),
            "Dataset query finished"
        );
        Ok(results.with_top_k(top_k))
    }

    pub fn search(&self, kind: &QueryKind, top_k: Option<usize>) -> Result<RankedResults<R>> {
        self.search_with(kind, top_k, &CancellationToken::new())
    }

    /// Lucene query syntax over the default field.
    pub fn query(&self, text: &str, top_k: usize) -> Result<RankedResults<R>> {
        self.search(&QueryKind::parsed(text), Some(top_k))
    }

    pub fn term_query(&self, field: &str, term: &str, top_k: usize) -> Result<RankedResults<R>> {
        self.search(&QueryKind::term(field, term), Some(top_k))
    }

    pub fn prefix_query(&self, field: &str, prefix: &str, top_k: usize) -> Result<RankedResults<R>> {
        self.search(&QueryKind::prefix(field, prefix), Some(top_k))
    }

    pub fn fuzzy_query(&self, field: &str, term: &str, max_edits: u8, top_k: usize) -> Result<RankedResults<R>> {
        self.search(&QueryKind::fuzzy(field, term, max_edits), Some(top_k))
    }

    pub fn phrase_query(&self, field: &str, phrase: &str, top_k: usize) -> Result<RankedResults<R>> {
        self.search(&QueryKind::phrase(field, phrase), Some(top_k))
    }

    pub fn facet_query(&self, text: &str, facet_field: &str, top_n: usize) -> Result<FacetTable> {
        self.facet_queries(text, &[facet_field], top_n)
    }

    /// Facet counts for several fields in one pass over the shards.
    pub fn facet_queries<S>(&self, text: &str, facet_fields: &[S], top_n: usize) -> Result<FacetTable>
    where
        S: AsRef<str> + Sync,
    {
        let top_n = self.config.resolve_top_n(Some(top_n))?;
        let table: FacetTable = self.run(|shard| shard.facet_queries(text, facet_fields, top_n))?;

        debug!(dataset = %self.id, fields = facet_fields.len(), top_n, "Dataset facets finished");
        Ok(table)
    }

    /// Most frequent terms of a field across the dataset. Needs
    /// `store_term_vectors`.
    pub fn term_frequencies(&self, field: &str, top_n: usize) -> Result<FacetTable> {
        let top_n = self.config.resolve_top_n(Some(top_n))?;
        self.run(|shard| shard.term_frequencies(field, top_n))
    }

    /// True if some record has every listed field containing its value.
    pub fn exists(&self, fields: &BTreeMap<String, String>) -> Result<bool> {
        self.ensure_open()?;
        self.orchestrator
            .any(&self.slots, |slot| {
                let shard = self.shard(slot)?;
                Ok(!shard.multi_term_query(fields, 1)?.is_empty())
            })
            .map_err(|e| self.map_closed(e))
    }

    pub fn exists_record(&self, record: &R) -> Result<bool> {
        self.ensure_open()?;
        self.orchestrator
            .any(&self.slots, |slot| {
                let shard = self.shard(slot)?;
                shard.is_defined(record)
            })
            .map_err(|e| self.map_closed(e))
    }

    pub fn fields(&self) -> Result<BTreeSet<String>> {
        self.run(|shard| shard.fields())
    }

    pub fn count(&self) -> Result<usize> {
        self.run(|shard| shard.size())
    }

    /// Every record, partition by partition.
    pub fn collect(&self) -> Result<Vec<R>> {
        self.ensure_open()?;
        let parts = self.orchestrator.map_all(&self.slots, |slot| Ok(slot.records.to_vec()))?;
        Ok(parts.into_iter().flatten().collect())
    }

    pub fn partition_sizes(&self) -> Result<Vec<usize>> {
        self.ensure_open()?;
        Ok(self.slots.iter().map(|s| s.records.len()).collect())
    }

    /// A new dataset holding the records that satisfy `predicate`, with
    /// the same partitioning and configuration.
    pub fn filter<F>(&self, predicate: F) -> Result<Dataset<R>>
    where
        F: Fn(&R) -> bool + Sync,
    {
        self.ensure_open()?;

        let shards = self
            .orchestrator
            .map_all(&self.slots, |slot| {
                let shard = self.shard(slot)?;
                shard.filter(&predicate)
            })
            .map_err(|e| self.map_closed(e))?;
        let slots = shards
            .into_iter()
            .enumerate()
            .map(|(i, shard)| ShardSlot::with_shard(i as u32, shard))
            .collect::<Result<Vec<_>>>()?;

        let filtered = Dataset {
            id: Uuid::new_v4(),
            name: RwLock::new(None),
            created_at: Utc::now(),
            storage_level: RwLock::new(self.storage_level()),
            filtered: true,
            closed: AtomicBool::new(false),
            slots,
            converter: Arc::clone(&self.converter),
            config: Arc::clone(&self.config),
            orchestrator: Arc::clone(&self.orchestrator),
        };

        info!(
            dataset = %self.id,
            filtered = %filtered.id,
            docs = filtered.slots.iter().map(|s| s.records.len()).sum::<usize>(),
            "Filtered dataset"
        );
        Ok(filtered)
    }

    /// Record the storage level and index every partition now.
    pub fn persist(&self, level: StorageLevel) -> Result<()> {
        self.ensure_open()?;
        *self.storage_level.write() = level;
        self.orchestrator
            .map_all(&self.slots, |slot| self.shard(slot).map(|_| ()))
            .map_err(|e| self.map_closed(e))?;

        info!(dataset = %self.id, level = ?level, "Persisted dataset");
        Ok(())
    }

    /// Drop one partition's shard so the next query rebuilds it.
    pub fn invalidate_partition(&self, partition: usize) -> Result<()> {
        self.ensure_open()?;
        let slot = self.slots.get(partition).ok_or_else(|| {
            Error::invalid_argument(format!(
                "partition {} out of range 0..{}", partition, self.slots.len()
            ))
        })?;

        if slot.invalidate() {
            debug!(dataset = %self.id, partition, "Invalidated shard");
        }
        Ok(())
    }

    /// Close every shard. Idempotent; all later calls fail with a
    /// closed-dataset error.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        for slot in &self.slots {
            slot.close();
        }
        info!(dataset = %self.id, shards = self.slots.len(), "Closed dataset");
    }
}

/// Builder for [`Dataset`]
pub struct DatasetBuilder<R> {
    converter: Converter<R>,
    config: IndexConfig,
    partitions: usize,
    partitioner: Partitioner,
    name: Option<String>,
}

impl<R> DatasetBuilder<R>
where
    R: Clone + PartialEq + Send + Sync + 'static,
{
    pub fn new(converter: Converter<R>) -> Self {
        let config = IndexConfig::default();
        DatasetBuilder {
            converter,
            partitions: config.parallelism,
            config,
            partitioner: Partitioner::default(),
            name: None,
        }
    }

    pub fn config(mut self, config: IndexConfig) -> Self {
        self.config = config;
        self
    }

    pub fn partitions(mut self, partitions: usize) -> Self {
        self.partitions = partitions;
        self
    }

    pub fn partitioner(mut self, partitioner: Partitioner) -> Self {
        self.partitioner = partitioner;
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn build(self, records: Vec<R>) -> Result<Dataset<R>> {
        let partitions = self.partitioner.split(records, self.partitions);
        let dataset = Dataset::from_partitions(partitions, self.converter, self.config)?;
        if let Some(name) = self.name {
            dataset.set_name(name);
        }
        Ok(dataset)
    }
}
