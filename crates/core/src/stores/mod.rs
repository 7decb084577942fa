pub mod local;
pub mod memory;
pub mod qdrant;

pub use local::LocalStore;
pub use memory::{InMemoryIndex, IndexedChunk};
pub use qdrant::QdrantStore;
