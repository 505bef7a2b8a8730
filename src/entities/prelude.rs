pub use super::address_verifications::Entity as AddressVerifications;
pub use super::events::Entity as Events;
pub use super::integrations::Entity as Integrations;
pub use super::manifest_items::Entity as ManifestItems;
pub use super::manifests::Entity as Manifests;
pub use super::order_items::Entity as OrderItems;
pub use super::orders::Entity as Orders;
pub use super::pack_tasks::Entity as PackTasks;
pub use super::pick_tasks::Entity as PickTasks;
pub use super::route_stops::Entity as RouteStops;
pub use super::routes::Entity as Routes;
