//! Reusable building blocks shared by the compiler and the runtime

pub mod lexer;
