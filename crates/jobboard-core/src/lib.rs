pub mod errors;
pub mod filter;
pub mod model;
pub mod page;
pub mod projection;
pub mod query;

pub use errors::*;
pub use filter::{Condition, Filter, RangeBounds, RangeOp};
pub use model::*;
pub use page::*;
pub use projection::Projection;
pub use query::{translate, RawPagination, RawQuery};
