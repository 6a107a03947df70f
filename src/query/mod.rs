pub mod ast;
pub mod kind;
pub mod parser;
