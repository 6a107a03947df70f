pub mod core;
pub mod analysis;
pub mod query;
pub mod scoring;
pub mod index;
pub mod search;
pub mod engine;
pub mod aggregate;
pub mod shard;
pub mod parallel;
pub mod dataset;

pub use crate::aggregate::facet::FacetTable;
pub use crate::aggregate::monoid::Monoid;
pub use crate::core::config::IndexConfig;
pub use crate::core::convert::{converter, Converter, ToDocument};
pub use crate::core::error::{Error, ErrorKind, Result};
pub use crate::core::types::{DocId, Document, FieldValue};
pub use crate::dataset::{Dataset, DatasetBuilder, DatasetState, StorageLevel};
pub use crate::core::cancel::CancellationToken;
pub use crate::parallel::Partitioner;
pub use crate::query::kind::QueryKind;
pub use crate::search::results::{RankedResults, ScoredMatch};
pub use crate::shard::ShardIndex;

/*
┌──────────────────────────────────── SHARDSEARCH LAYOUT ─────────────────────────────────────┐
│                                                                                              │
│  ┌────────────────────────────────────────────────────────────────────────────────────┐    │
│  │                               struct Dataset<R>                                     │    │
│  │  id: Uuid, name, storage_level, state                                               │    │
│  │  slots: Vec<ShardSlot<R>>          // records + lazily built Arc<ShardIndex<R>>     │    │
│  │  converter: Converter<R>           // Fn(&R) -> Document                            │    │
│  │  orchestrator: Arc<Orchestrator>   // rayon pool, monoid fold                       │    │
│  └────────────────────────────────────────────────────────────────────────────────────┘    │
│                                                                                              │
│  ┌────────────────────────┐  ┌──────────────────────┐  ┌─────────────────────┐            │
│  │ struct ShardIndex<R>   │  │ trait SearchEngine   │  │ trait Monoid        │            │
│  │ • records: Arc<Vec<R>> │  │ • InMemoryEngine     │  │ • RankedResults<R>  │            │
│  │ • documents            │  │ • ScanEngine         │  │ • FacetTable        │            │
│  │ • engine: Box<dyn>     │  │ • evaluate()         │  │ • usize, BTreeSet   │            │
│  └────────────────────────┘  └──────────────────────┘  └─────────────────────┘            │
│                                                                                              │
└──────────────────────────────────────────────────────────────────────────────────────────────┘

┌────────────────────────────────── RELATIONSHIPS ────────────────────────────────────────────┐
│                                                                                              │
│  Dataset ──fans_out_via──> Orchestrator ──par_iter──> ShardSlot ──builds──> ShardIndex      │
│                                 │                                                            │
│                                 └──try_reduce──> Monoid::combine                             │
│                                                                                              │
│  ShardIndex ──parses_with──> QueryParser ──produces──> Query                                 │
│       │                                                                                      │
│       └──owns──> SearchEngine ──InMemoryEngine──> InvertedIndex ──> FieldIndex               │
│                                                        │                                     │
│                                                        ├──contains──> PostingList            │
│                                                        └──contains──> PrefixIndex (fst)      │
│                                                                                              │
│  evaluate() ──scores_with──> BM25Scorer/TfIdfScorer ──implements──> Scorer                  │
│                                                                                              │
│  Analyzer ──tokenizer──> Token ──filters──> Lowercase/StopWord/Stemmer                       │
│                                                                                              │
└──────────────────────────────────────────────────────────────────────────────────────────────┘
*/
