pub mod log;
pub mod store;

pub use log::*;
pub use store::*;
