//! Configuration: user settings file and path expansion.

pub mod paths;
pub mod settings;

pub use paths::expand_path;
pub use settings::Settings;
