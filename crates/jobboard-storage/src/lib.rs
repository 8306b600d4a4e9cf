pub mod mem;
pub mod pager;
pub mod snapshot;
pub mod traits;

pub use mem::InMemoryStore;
pub use pager::{Pager, Shape};
pub use traits::*;
