pub mod app_data_store;
pub mod keyword_store;
pub mod project_store;

pub use app_data_store::{AppDataStore, SharedStore};
pub use keyword_store::{KeywordRows, KeywordStore};
pub use project_store::ProjectStore;
