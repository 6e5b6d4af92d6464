//! CrudService: generic CRUD over the executor seam.

mod crud;
mod executor;
pub use crud::CrudService;
pub use executor::{Executor, PgExecutor};
