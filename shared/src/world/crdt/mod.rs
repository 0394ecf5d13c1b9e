mod error;
mod lww_store;

pub use error::CrdtError;
pub use lww_store::LwwComponentStore;
