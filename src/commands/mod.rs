//! CLI commands implementation

pub mod events;
pub mod ingest;
pub mod init;
pub mod query;
pub mod status;

pub use events::*;
pub use ingest::*;
pub use init::*;
pub use query::*;
pub use status::*;
