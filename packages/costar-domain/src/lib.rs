pub mod aggregate;
pub mod item;
pub mod role_filter;

pub use aggregate::aggregate;
pub use item::{Appearance, Credit, DEFAULT_SORT, ParticipantSummary, QueryConfig, ResolvedItem};
pub use role_filter::RoleFilter;
