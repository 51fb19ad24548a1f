// Service exports
pub mod cache;
pub mod notify;
pub mod postgres;
pub mod profiles;

pub use cache::{CacheError, CacheKey, CacheManager};
pub use notify::{NotifyClient, NotifyError};
pub use postgres::{NewCohortMember, NewSchedule, PostgresClient, PostgresError};
pub use profiles::{ProfileClient, ProfileError};
