pub mod address;
pub mod error;
pub mod event;
pub mod fulfillment;
pub mod integration;
pub mod manifest;
pub mod order;
pub mod route;
