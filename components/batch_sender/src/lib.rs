pub mod flow;
pub mod prompt;
pub mod summary;
