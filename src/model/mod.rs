pub mod common;
pub mod git;
pub mod page;
pub mod record;
pub mod section;
pub mod spec;

pub use common::*;
pub use git::*;
pub use page::*;
pub use record::*;
pub use section::*;
pub use spec::*;
