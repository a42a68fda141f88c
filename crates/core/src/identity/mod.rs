pub mod classifier;
pub mod enrollment;
pub mod reference;

pub use classifier::{IdentityClassifier, Observation};
pub use reference::{ReferenceEmbeddingSet, StoredProfile};
