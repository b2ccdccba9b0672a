//! Services for aggregation, querying and talking to the farm API

pub mod aggregator;
pub mod api;
pub mod config;
pub mod context;
pub mod dates;
pub mod export;
pub mod lactation;
pub mod loader;
pub mod policy;
pub mod query;

pub use aggregator::{Aggregator, SessionFilter};
pub use api::ApiClient;
pub use config::Config;
pub use context::{UserContext, UserStore};
pub use lactation::LactationPolicy;
