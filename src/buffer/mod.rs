mod buffer_pool_manager;
mod frame;
mod page_handle;
mod replacer;

pub use buffer_pool_manager::*;
pub use frame::*;
pub use page_handle::*;
pub use replacer::*;
