// Identity module - opaque account addresses

mod address;

pub use address::*;
