mod delete;
mod executor;
mod insert;
mod nested_loop_join;
mod predicate;
mod projection;
mod seq_scan;
mod update;

pub use delete::*;
pub use executor::*;
pub use insert::*;
pub use nested_loop_join::*;
pub use predicate::*;
pub use projection::*;
pub use seq_scan::*;
pub use update::*;
