pub mod filters;
pub mod keyword;
pub mod processing;
pub mod project;

pub use filters::{KeywordFilters, MatchType, NumericRange, Pagination, SortColumn, SortDirection, SortSpec};
pub use keyword::{parse_string_list, Keyword, KeywordPatch, RawKeyword, View};
pub use processing::{FileError, ProcessingState, ProcessingStatus};
pub use project::{Project, ProjectStats};
