//! Authentication-material lifecycle: the header set required by the order
//! API, its single-slot on-disk cache, extraction from observed browser
//! traffic, and the resolver that picks between manual token, cache, and
//! extraction for a run.

pub mod cache;
pub mod extract;
pub mod header_set;
pub mod resolver;

pub use cache::HeaderCache;
pub use extract::{Credentials, ExtractError, Extractor, SessionExtractor};
pub use header_set::HeaderSet;
pub use resolver::{AuthError, AuthResolver, Resolved, ResolvedVia};
