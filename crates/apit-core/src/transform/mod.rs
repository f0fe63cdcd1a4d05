pub mod export;
pub mod import;

pub use export::export;
pub use import::{ImportOptions, import, import_with_options};
