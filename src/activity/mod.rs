pub mod backend;
pub mod gate;
pub mod sync;
pub mod types;
