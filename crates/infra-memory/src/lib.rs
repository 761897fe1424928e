// Waitline Infrastructure - In-Memory Adapter
// Implements: QueueStore (no durability, per-queue locking)

mod memory_store;

pub use memory_store::InMemoryQueueStore;
