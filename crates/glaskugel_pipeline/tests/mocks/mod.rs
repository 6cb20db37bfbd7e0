pub mod datastore;
pub mod fetcher;
pub mod summarizer;
