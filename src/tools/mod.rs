// Shared macros
pub mod macros;

// Modular tools
pub mod batch;
pub mod fetch;
pub mod hunt;
pub mod probe;
pub mod race;
pub mod weibo;
