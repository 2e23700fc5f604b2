mod export;
mod store;

pub use store::{AnnotationOutcome, PhotoStore};
