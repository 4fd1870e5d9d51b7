pub mod rdf_client;

pub use rdf_client::{Fetcher, RdfClient, CONSTRUCT_QUERY};
