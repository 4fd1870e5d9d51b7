pub mod document;
pub mod loaders;

pub use document::{DataType, DocumentRecord, DocumentUri, FetchOutcome, FetchTarget};
pub use loaders::{source_from_config, DocumentSource, JsonFileSource, SparqlSource};
