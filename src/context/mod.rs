/// Context assembly - Gateway
mod assembler;

pub use assembler::{total_chars, ContextAssembler};
