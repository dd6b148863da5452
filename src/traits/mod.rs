//! Core traits for the dependency injection container.

mod adapter;
mod dispose;
mod service;

pub use adapter::ContainerAdapter;
pub use dispose::Dispose;
pub use service::Service;
