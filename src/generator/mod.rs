pub mod analysis;
pub mod assemble;
pub mod context;
pub mod prompts;
pub mod research;
pub mod supervisor;
pub mod workflow;

pub use context::GeneratorContext;
