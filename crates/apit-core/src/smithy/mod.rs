//! Smithy IDL and JSON AST support.

pub mod ast;
pub mod parser;
pub mod prelude;
pub mod scanner;
pub mod traits;
pub mod unparse;

pub use ast::{Ast, Member, Shape, ShapeRef};
pub use parser::parse;
pub use unparse::unparse;
