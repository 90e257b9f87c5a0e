pub mod columns;
pub mod error;
pub mod frame;
pub mod output;
pub mod parser;
pub mod sampling;
