pub mod annotation;
pub mod ast;
pub mod frontend;
pub mod printer;
pub mod reserved;
pub mod traverse;
pub mod tree;
