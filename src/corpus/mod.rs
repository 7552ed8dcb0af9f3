pub mod delimited;
mod index;
pub mod package;
pub mod sheet;

pub use index::{CorpusEntry, CorpusIndex, LoadOptions};
