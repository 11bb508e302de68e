pub mod aggregate;
pub mod signal;

pub use aggregate::{overall_sentiment, overall_series, SentimentPoint};
pub use signal::{generate_signals, SignalConfig, SignalPoint};
