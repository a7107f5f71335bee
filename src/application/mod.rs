//! Application services layer.

pub mod books;
pub mod error;
pub mod pagination;
pub mod repos;
