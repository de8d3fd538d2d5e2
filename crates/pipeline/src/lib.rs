//! Dataset passes over published education tables.
//!
//! A pass takes the bytes of one source file, decodes them into tables
//! ([`duodata_io`]), resolves each table's header against the dataset's
//! [`alias::AliasTable`], turns every row into keyed field emissions through
//! the dataset's parser ([`datasets`]), merges those per entity and year
//! ([`merge::EntityMerger`]) and finally hands finished records to a
//! [`sink::RecordSink`].
//!
//! [`discovery`] finds the downloadable files and their reference dates on a
//! listing page; fetching them is left to the caller.

pub mod alias;
pub mod datasets;
pub mod discovery;
pub mod engine;
pub mod error;
pub mod merge;
pub mod model;
pub mod normalize;
pub mod sink;

pub use datasets::{lookup, DatasetDef, DATASETS};
pub use discovery::{find_available_datasets, reference_date_from_file_name};
pub use engine::{run_dataset, run_pass, PassInput, PassOptions};
pub use error::PipelineError;
pub use model::{EntityKey, EntityKind, MergedRecord, PassStats, ReferenceDate};
pub use sink::{JsonLinesSink, RecordSink, VecSink};
