pub mod pages;
pub mod service;
pub mod tokens;
