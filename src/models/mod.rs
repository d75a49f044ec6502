pub mod driver;
pub mod invoice;
pub mod location;
pub mod maintenance;
pub mod password_reset;
pub mod route;
pub mod shipment;
pub mod transaction;
pub mod truck;
pub mod user;

/// One page of results plus the unpaginated total.
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
}
