// Humanizer Core Services

pub mod capabilities;
pub mod config_store;
pub mod detector;
pub mod errors;
pub mod fusion;
pub mod llm_analyzer;
pub mod providers;
pub mod reference_library;
pub mod refinement;
pub mod stylometry;
pub mod text_processor;

pub use capabilities::*;
pub use config_store::{load_or_default, AppConfig, ConfigStore, RefineConfig};
pub use detector::HttpDetector;
pub use errors::{HumanizeError, HumanizeResult};
pub use fusion::{fuse, risk_level};
pub use providers::ChatProvider;
pub use reference_library::{DirectoryLibrary, StaticLibrary};
pub use refinement::{Capabilities, RefinementController};
pub use stylometry::{
    CompositeProfileBuilder, ProfileCache, ProfileComparator, StylometricAnalyzer,
};
