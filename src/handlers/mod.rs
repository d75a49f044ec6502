pub mod auth;
pub mod driver;
pub mod invoice;
pub mod location;
pub mod maintenance;
pub mod password_reset;
pub mod route;
pub mod shipment;
pub mod tracking;
pub mod transaction;
pub mod truck;
pub mod user;
