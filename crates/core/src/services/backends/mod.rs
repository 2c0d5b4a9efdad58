pub mod ilspy;

pub use ilspy::IlspyBackend;
