//! Harbor metric families.
//!
//! | family         | fan-out over      | degraded runs |
//! |----------------|-------------------|---------------|
//! | `replications` | policies          | keep previous |
//! | `repositories` | projects          | cached        |
//! | `scans`        | none (one item)   | cached        |
//!
//! `repositories` follows the configured [`ApiVersion`](crate::ApiVersion):
//! v1 lists `/repositories?project_id=<id>` and adds a star count, v2 lists
//! `/projects/<name>/repositories`.

mod replications;
mod repositories;
mod scans;

pub use replications::{Policy, Replications};
pub use repositories::{Project, Repositories};
pub use scans::{ScanSummary, Scans};
