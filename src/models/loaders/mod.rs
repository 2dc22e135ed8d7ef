pub mod toml_loader;

pub use toml_loader::{load_all_startup_files, load_startup_file};
