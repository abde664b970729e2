pub mod name;
pub mod rrset;
#[allow(clippy::module_inception)]
pub mod zone;

pub use name::ZoneName;
pub use rrset::RRset;
pub use zone::{DnssecZone, ZoneStats};
