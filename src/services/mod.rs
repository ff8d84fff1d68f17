//! Domain operations layered over the store.

pub mod accounts;
pub mod catalog;
pub mod projection;
pub mod slug;
