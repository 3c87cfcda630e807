pub mod pipeline;
pub mod progress;
pub mod sequence;
pub mod viewport;
