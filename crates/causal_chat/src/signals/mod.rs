mod rules;
mod summary;

pub use rules::{dominant_signal, SignalEngine};
pub use summary::{SignalCount, SignalSummary};
