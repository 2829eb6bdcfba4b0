pub mod document;
pub mod fields;
pub mod memory;

pub use document::{DocumentStore, DocumentWatch, FieldValue};
pub use memory::MemoryStore;
