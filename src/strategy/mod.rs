pub mod imbalance;
pub mod signal_filter;

pub use imbalance::{weighted_imbalance, ImbalanceGenerator, ObiConfig, SignalStrength};
pub use signal_filter::{
    FilterStats, FilteredSignal, SignalDirection, SignalFilter, SignalFilterConfig,
};
