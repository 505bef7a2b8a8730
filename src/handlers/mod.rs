pub mod address;
pub mod error;
pub mod fulfillment;
pub mod health;
pub mod integrations;
pub mod manifests;
pub mod orders;
pub mod routes;
