pub mod path;
pub mod slug;
pub mod store;

pub use store::{ReceiptStore, StorageError};
