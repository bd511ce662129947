//! Directory-scan analytics over WhatsApp group exports.
//!
//! The data root is laid out as `<assembly>/<YYYY-MM-DD>/messages/<group>.json`,
//! with group-membership spreadsheets under `<assembly>/groups/`. Every
//! aggregation is a fresh scan of whatever is on disk: [`Scan`] resolves the
//! requested date directories, loads each group file, and feeds it to a
//! [`GroupReducer`]. Files that cannot be read are recorded in the returned
//! [`ScanReport`] instead of aborting the scan.
//!
//! All I/O here is blocking; async callers should run it on a blocking thread.

pub mod aggregate;
pub mod error;
pub mod export;
pub mod filter;
pub mod layout;
pub mod loader;
pub mod record;
pub mod request;
pub mod resolver;
pub mod roster;
pub mod scan;
pub mod uploads;

pub use error::AnalyticsError;
pub use filter::{MessageFilter, SearchField, SearchQuery};
pub use layout::DataRoot;
pub use loader::PayloadPolicy;
pub use record::MessageRecord;
pub use request::AnalysisRequest;
pub use resolver::DateWindow;
pub use scan::{FileFailure, GroupReducer, GroupSource, LoadedGroup, Scan, ScanReport};
