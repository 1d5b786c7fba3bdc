pub mod range;
pub mod session;
pub mod taxonomy;

pub use range::DateRange;
pub use session::{extract_domain, Session, SessionIdentity, UNKNOWN_CATEGORY};
pub use taxonomy::{AppOverride, AppOverrides, CategoryEntry, Taxonomy, DEFAULT_CATEGORIES};
