pub mod edit_lock;
pub mod list_store;
pub mod listing;
pub mod payload;
pub mod permission;
pub mod persistence;
pub mod reconcile;
pub mod rows;
pub mod sections;
pub mod session;
pub mod state;
pub mod validate;

pub use edit_lock::*;
pub use list_store::*;
pub use listing::*;
pub use payload::*;
pub use permission::*;
pub use persistence::*;
pub use reconcile::*;
pub use rows::*;
pub use sections::*;
pub use session::*;
pub use state::*;
pub use validate::*;
