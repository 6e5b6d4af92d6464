//! HTTP handlers for table CRUD and operational endpoints.

pub mod entity;
pub mod ops;
pub use entity::*;
pub use ops::*;
