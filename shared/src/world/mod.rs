pub mod crdt;
pub mod entity;
