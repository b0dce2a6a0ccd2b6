//! gradkg ingest: folds recorded per-chunk LLM extractions into graph
//! nodes and edges.
//!
//! Every merger tolerates bad chunks. A chunk whose response cannot be
//! parsed is recorded in the [`MergeReport`] and contributes nothing; the
//! run carries on with the next chunk.

pub mod chunk;
pub mod includes;
pub mod normalize;
pub mod report;
pub mod requirements;
pub mod subjects;
pub mod substitutes;

pub use chunk::{load_chunks, ChunkMetadata, RecordedChunk};
pub use includes::merge_includes;
pub use report::{ChunkFailure, MergeReport, Promotion};
pub use requirements::merge_requirements;
pub use subjects::{merge_subjects, SubjectMerger};
pub use substitutes::{resolve_substitutes, AliasMap, ExtractionLog, SubstituteMerge};
