//! Session state and the workflows that drive it

pub mod service;
pub mod store;
