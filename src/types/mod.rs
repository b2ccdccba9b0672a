//! Type definitions for herdbook

mod content;
mod error;
mod herd;
pub mod lenient;
mod notice;
mod production;
mod session;
mod user;

pub use content::*;
pub use error::*;
pub use herd::*;
pub use notice::Notice;
pub use production::*;
pub use session::*;
pub use user::*;
