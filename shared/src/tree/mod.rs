pub mod address;
pub mod container;
pub mod error;
pub mod node;
pub mod snapshot;
