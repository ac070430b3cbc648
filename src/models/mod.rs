pub mod implementations;

pub use implementations::{ModernBertSize, SentimentModernBertModel, SentimentModernBertOptions};
