pub mod repository;
pub mod sqlite;

pub use repository::{
    HistoryRepository, InMemoryRepository, SessionRecord, SessionStateRepository, Storage,
    StorageError,
};
