pub mod queue;
pub mod scheduler;
pub mod state;

pub use queue::JobQueue;
pub use scheduler::Engine;
pub use state::EngineState;
