//! Profile lookups: identifier validation, normalized records, and the cache-first resolver.

pub mod lookup;
pub mod record;
pub mod resolver;

pub use lookup::*;
pub use record::*;
pub use resolver::*;
