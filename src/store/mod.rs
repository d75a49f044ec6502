//! Persistence seam between handlers and the database.
//!
//! Handlers own validation and business rules; a `Store` only reads and
//! writes rows. Multi-row writes that must land together (a shipment and
//! its first tracking entry, a tracking entry and the shipment status it
//! carries) are single methods so the Postgres implementation can wrap
//! them in one transaction.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::AppResult;
use crate::models::driver::{Driver, DriverChanges, DriverStatus, NewDriver};
use crate::models::invoice::{Invoice, InvoiceChanges, InvoiceFilter, NewInvoice};
use crate::models::location::{Location, LocationChanges, LocationFilter, NewLocation};
use crate::models::maintenance::{
    MaintenanceChanges, MaintenanceFilter, MaintenanceRecord, NewMaintenance, TruckServiceChange,
};
use crate::models::password_reset::{NewPasswordResetToken, PasswordResetToken};
use crate::models::route::{NewRoute, Route, RouteChanges, RouteFilter};
use crate::models::shipment::{
    NewShipment, NewTrackingEntry, Shipment, ShipmentChanges, ShipmentFilter, TrackingEntry,
};
use crate::models::transaction::{NewTransaction, Transaction, TransactionFilter};
use crate::models::truck::{NewTruck, Truck, TruckChanges, TruckFilter};
use crate::models::user::{NewUser, ProfileChanges, User, UserChanges, UserFilter};
use crate::models::Page;

/// What an active-route check is keyed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteRef {
    Truck(i64),
    Driver(i64),
    Shipment(i64),
}

#[async_trait]
pub trait Store: Send + Sync {
    // users
    async fn create_user(&self, user: NewUser) -> AppResult<User>;
    /// Like `create_user`, but the very first account becomes ADMIN. The
    /// emptiness check and the insert cannot interleave with another signup.
    async fn register_user(&self, user: NewUser) -> AppResult<User>;
    async fn find_user(&self, id: i64) -> AppResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>>;
    async fn list_users(&self, filter: &UserFilter, limit: i64, offset: i64) -> AppResult<Page<User>>;
    async fn update_profile(&self, id: i64, changes: ProfileChanges) -> AppResult<Option<User>>;
    async fn update_user(&self, id: i64, changes: UserChanges) -> AppResult<Option<User>>;

    // password reset tokens
    /// Stores a token and drops any earlier ones issued to the same user.
    async fn replace_reset_token(&self, token: NewPasswordResetToken) -> AppResult<()>;
    async fn active_reset_tokens(&self, lookup_prefix: &str, now: DateTime<Utc>) -> AppResult<Vec<PasswordResetToken>>;
    /// Deletes the token and stores the new password hash for its (active)
    /// owner in one write. `false` means the token was already used or the
    /// owner is gone, and nothing changed.
    async fn redeem_reset_token(&self, id: i64, password_hash: &str) -> AppResult<bool>;
    async fn purge_expired_reset_tokens(&self, now: DateTime<Utc>) -> AppResult<u64>;

    // locations
    async fn list_locations(&self, filter: &LocationFilter) -> AppResult<Vec<Location>>;
    async fn find_location(&self, id: i64) -> AppResult<Option<Location>>;
    async fn create_location(&self, location: NewLocation) -> AppResult<Location>;
    async fn update_location(&self, id: i64, changes: LocationChanges) -> AppResult<Option<Location>>;
    async fn deactivate_location(&self, id: i64) -> AppResult<Option<Location>>;
    /// True when a non-finished shipment starts or ends at the location.
    async fn location_has_active_shipments(&self, id: i64) -> AppResult<bool>;

    // drivers
    async fn list_drivers(&self, status: Option<DriverStatus>) -> AppResult<Vec<Driver>>;
    async fn find_driver(&self, id: i64) -> AppResult<Option<Driver>>;
    async fn find_driver_by_license(&self, license_number: &str) -> AppResult<Option<Driver>>;
    async fn find_driver_by_user(&self, user_id: i64) -> AppResult<Option<Driver>>;
    async fn create_driver(&self, driver: NewDriver) -> AppResult<Driver>;
    async fn update_driver(&self, id: i64, changes: DriverChanges) -> AppResult<Option<Driver>>;

    // trucks
    async fn list_trucks(&self, filter: &TruckFilter) -> AppResult<Vec<Truck>>;
    async fn find_truck(&self, id: i64) -> AppResult<Option<Truck>>;
    async fn find_truck_by_plate(&self, license_plate: &str) -> AppResult<Option<Truck>>;
    async fn create_truck(&self, truck: NewTruck) -> AppResult<Truck>;
    async fn update_truck(&self, id: i64, changes: TruckChanges) -> AppResult<Option<Truck>>;
    async fn delete_truck(&self, id: i64) -> AppResult<bool>;

    // maintenance
    async fn list_maintenance(&self, filter: &MaintenanceFilter, limit: i64, offset: i64) -> AppResult<Page<MaintenanceRecord>>;
    async fn find_maintenance(&self, id: i64) -> AppResult<Option<MaintenanceRecord>>;
    /// Inserts the record and applies `truck` to its truck in the same write.
    async fn create_maintenance(&self, record: NewMaintenance, truck: Option<TruckServiceChange>) -> AppResult<MaintenanceRecord>;
    async fn update_maintenance(
        &self,
        id: i64,
        changes: MaintenanceChanges,
        truck: Option<TruckServiceChange>,
    ) -> AppResult<Option<MaintenanceRecord>>;
    async fn delete_maintenance(&self, id: i64) -> AppResult<bool>;

    // routes
    async fn list_routes(&self, filter: &RouteFilter) -> AppResult<Vec<Route>>;
    async fn find_route(&self, id: i64) -> AppResult<Option<Route>>;
    async fn latest_route(&self, shipment_id: i64) -> AppResult<Option<Route>>;
    async fn create_route(&self, route: NewRoute) -> AppResult<Route>;
    async fn update_route(&self, id: i64, changes: RouteChanges) -> AppResult<Option<Route>>;
    async fn has_active_routes(&self, target: RouteRef) -> AppResult<bool>;

    // shipments
    async fn list_shipments(&self, filter: &ShipmentFilter) -> AppResult<Vec<Shipment>>;
    async fn find_shipment(&self, id: i64) -> AppResult<Option<Shipment>>;
    /// Inserts the shipment and its `SHIPMENT_CREATED` tracking entry.
    async fn create_shipment(&self, shipment: NewShipment, created_by: i64) -> AppResult<Shipment>;
    async fn update_shipment(&self, id: i64, changes: ShipmentChanges) -> AppResult<Option<Shipment>>;
    /// Removes the shipment with its tracking history and finished routes.
    async fn delete_shipment(&self, id: i64) -> AppResult<bool>;
    async fn list_tracking(&self, shipment_id: i64) -> AppResult<Vec<TrackingEntry>>;
    /// Inserts the entry and applies `changes` to its shipment in the same write.
    async fn record_tracking(&self, entry: NewTrackingEntry, changes: ShipmentChanges) -> AppResult<TrackingEntry>;

    // invoices
    async fn list_invoices(&self, filter: &InvoiceFilter, limit: i64, offset: i64) -> AppResult<Page<Invoice>>;
    async fn find_invoice(&self, id: i64) -> AppResult<Option<Invoice>>;
    async fn find_invoice_by_shipment(&self, shipment_id: i64) -> AppResult<Option<Invoice>>;
    async fn find_invoice_by_number(&self, invoice_number: &str) -> AppResult<Option<Invoice>>;
    async fn create_invoice(&self, invoice: NewInvoice) -> AppResult<Invoice>;
    async fn update_invoice(&self, id: i64, changes: InvoiceChanges) -> AppResult<Option<Invoice>>;

    // transactions
    async fn list_transactions(&self, filter: &TransactionFilter, limit: i64, offset: i64) -> AppResult<Page<Transaction>>;
    /// Inserts the transaction. A completed payment that brings the invoice's
    /// completed payments up to its amount marks the invoice PAID in the same write.
    async fn record_transaction(&self, transaction: NewTransaction) -> AppResult<Transaction>;
}
