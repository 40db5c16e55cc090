pub mod classifier;

pub use classifier::{CladeClassifier, DatasetRequest};
