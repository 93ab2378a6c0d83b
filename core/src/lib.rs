pub mod clean;
pub mod config;
pub mod corpus;
pub mod document;
pub mod error;
pub mod index;
pub mod ingest;
pub mod search;
pub mod tags;
pub mod text;
pub mod tokenizer;

pub use config::{Bm25Params, SearchConfig};
pub use corpus::{Corpus, CorpusSummary, TextField};
pub use document::{parse_date, Document, RawRecord, Tag, Tags};
pub use error::{CorpusError, Result};
pub use index::{Bm25Index, DocId, TermId};
pub use search::{SearchHit, SearchOptions, SearchResults};
