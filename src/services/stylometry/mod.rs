// Stylometry Module
// Quantitative writing-style fingerprints organized into submodules:
// - analyzer: builds a StylometricProfile from raw text
// - comparator: diffs a target and an actual profile
// - composite: merges reference-document profiles into one target
// - cache: content-addressed LRU/TTL store shared across runs

pub mod analyzer;
pub mod cache;
pub mod comparator;
pub mod composite;

pub use analyzer::{compute_profile, StylometricAnalyzer};
pub use cache::{cache_key, ProfileCache, DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_TTL};
pub use comparator::{severity_for, ProfileComparator, DEFAULT_TOP_N};
pub use composite::CompositeProfileBuilder;
