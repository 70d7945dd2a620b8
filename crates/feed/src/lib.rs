pub mod client;

pub use client::{endpoint_for, ServiceClient};
