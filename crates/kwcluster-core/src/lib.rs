pub mod actions;
pub mod api;
pub mod cache;
pub mod config;
pub mod constants;
pub mod debounce;
pub mod error;
pub mod fetch;
pub mod materialize;
pub mod models;
pub mod notifications;
pub mod poller;
pub mod progress;
pub mod search;
pub mod selection;
pub mod stats;
pub mod store;

pub use actions::KeywordActions;
pub use api::{HttpKeywordApi, KeywordApi};
pub use cache::{ResultCache, SharedResultCache};
pub use config::CoreConfig;
pub use debounce::Debouncer;
pub use error::KeywordError;
pub use fetch::{FetchOutcome, FetchPath, FetchRequest, KeywordFetchOrchestrator};
pub use notifications::{Notification, NotificationLevel, NotificationQueue, SharedNotifications};
pub use poller::{PollStep, PollerHandle, ProcessingStatusPoller};
pub use progress::ProgressSmoother;
pub use selection::SelectionEngine;
pub use store::{AppDataStore, SharedStore};
