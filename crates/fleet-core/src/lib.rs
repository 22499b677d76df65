pub mod clock;
pub mod config;
pub mod error;
pub mod labels;
pub mod types;

pub use clock::{Clock, SystemClock};
pub use config::FleetConfig;
pub use error::{FleetError, FleetResult};
pub use labels::LabelSet;
pub use types::*;
