//! HCP input records and batch loading

mod data;
pub mod loader;

pub use data::{wallet_signal_column, Channel, ChannelObservation, HcpBatch, HcpRecord};
pub use loader::{load_hcps, load_hcps_from_reader, InputColumns};
