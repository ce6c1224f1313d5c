pub mod error;
pub mod mapping;
pub mod matcher;
pub mod normalize;
pub mod options;
pub mod output;
pub mod remap_generate;
pub mod selector;
pub mod style;

pub use error::RemapError;
pub use mapping::{load_mappings, CompiledMappings, MappingTable};
pub use options::{DeviceProfile, Order, RemapOptions, SourceSpec};
pub use remap_generate::remap_css::generate;
