mod gate;
mod probe;
mod table;
mod utils;

pub mod prime;

pub use probe::Probe;
pub use table::HashTable;
