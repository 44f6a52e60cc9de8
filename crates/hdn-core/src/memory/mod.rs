//! Memory Fan-out: routes tool and agent events to working, episodic, and
//! knowledge-graph memory stores.

pub mod embedding;
pub mod episodic;
pub mod fanout;
pub mod knowledge;
pub mod working;

pub use embedding::embed;
pub use episodic::{EpisodicRecord, EpisodicStore, Outcome};
pub use fanout::{MemoryEvent, MemoryFanout};
pub use knowledge::{Concept, KnowledgeGraph};
pub use working::WorkingMemoryStore;
