//! Roadmap rows and the enrichment pass over them.

mod enricher;
mod row;

pub use enricher::Enricher;
pub use row::RoadmapRow;
