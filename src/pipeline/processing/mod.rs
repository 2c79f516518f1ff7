pub mod clean;
pub mod enrich;
pub mod split;

pub use clean::{CleanedFrame, Cleaner, CleaningStats, DefaultCleaner, SentinelPredicate};
pub use enrich::{DefaultEnricher, Enricher};
pub use split::{DefaultSchemaSplitter, Dimension, SchemaSplitter, StarSchema};
