mod registry;

pub use registry::{BuiltCommand, CliRegistry, RegistryError};
