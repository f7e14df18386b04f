pub mod import;
pub mod inspect;

pub use import::ImportCommand;
pub use inspect::InspectCommand;
