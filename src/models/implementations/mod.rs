pub mod modernbert;

pub use modernbert::{ModernBertSize, SentimentModernBertModel, SentimentModernBertOptions};
