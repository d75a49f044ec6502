//! In-process store for tests and local runs without a database.
//!
//! All tables sit behind one lock so a multi-row write is observed whole,
//! matching what the Postgres transactions give.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{RouteRef, Store};
use crate::error::{AppError, AppResult};
use crate::models::driver::{Driver, DriverChanges, DriverStatus, NewDriver};
use crate::models::invoice::{Invoice, InvoiceChanges, InvoiceFilter, InvoiceStatus, NewInvoice};
use crate::models::location::{Location, LocationChanges, LocationFilter, NewLocation};
use crate::models::maintenance::{
    MaintenanceChanges, MaintenanceFilter, MaintenanceRecord, MaintenanceStatus, NewMaintenance, TruckServiceChange,
};
use crate::models::password_reset::{NewPasswordResetToken, PasswordResetToken};
use crate::models::route::{NewRoute, Route, RouteChanges, RouteFilter};
use crate::models::shipment::{
    NewShipment, NewTrackingEntry, Shipment, ShipmentChanges, ShipmentFilter, ShipmentStatus,
    TrackingEntry, EVENT_CREATED,
};
use crate::models::transaction::{
    settles, NewTransaction, Transaction, TransactionFilter, TransactionKind, TransactionStatus,
};
use crate::models::truck::{NewTruck, Truck, TruckChanges, TruckFilter, TruckStatus};
use crate::models::user::{NewUser, ProfileChanges, Role, User, UserChanges, UserFilter};
use crate::models::Page;

const MISSING_REFERENCE: &str = "Referenced record does not exist";
const EMAIL_TAKEN: &str = "Email already in use by another user";

#[derive(Default)]
struct Tables {
    next_id: i64,
    users: BTreeMap<i64, User>,
    reset_tokens: BTreeMap<i64, PasswordResetToken>,
    locations: BTreeMap<i64, Location>,
    drivers: BTreeMap<i64, Driver>,
    trucks: BTreeMap<i64, Truck>,
    routes: BTreeMap<i64, Route>,
    shipments: BTreeMap<i64, Shipment>,
    tracking: BTreeMap<i64, TrackingEntry>,
    invoices: BTreeMap<i64, Invoice>,
    maintenance: BTreeMap<i64, MaintenanceRecord>,
    transactions: BTreeMap<i64, Transaction>,
}

/// Rows arrive newest first; slices out one page.
fn paginate<T: Clone>(rows: Vec<&T>, limit: i64, offset: i64) -> Page<T> {
    let total = rows.len() as i64;
    let items = rows
        .into_iter()
        .skip(usize::try_from(offset).unwrap_or(usize::MAX))
        .take(usize::try_from(limit).unwrap_or(0))
        .cloned()
        .collect();
    Page { items, total }
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    /// Refreshes the joined user columns the way the SQL join would.
    fn joined(&self, driver: &Driver) -> Driver {
        let mut driver = driver.clone();
        if let Some(user) = self.users.get(&driver.user_id) {
            driver.name = user.name.clone();
            driver.email = user.email.clone();
        }
        driver
    }

    fn require<T>(map: &BTreeMap<i64, T>, id: Option<i64>) -> AppResult<()> {
        match id {
            Some(id) if !map.contains_key(&id) => Err(AppError::validation(MISSING_REFERENCE)),
            _ => Ok(()),
        }
    }

    fn insert_user(&mut self, user: NewUser) -> AppResult<User> {
        if self.users.values().any(|u| u.email.eq_ignore_ascii_case(&user.email)) {
            return Err(AppError::conflict("Email already registered"));
        }
        let now = Utc::now();
        let created = User {
            id: self.next_id(),
            email: user.email,
            name: user.name,
            password_hash: user.password_hash,
            role: user.role,
            phone: user.phone,
            company: user.company,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        self.users.insert(created.id, created.clone());
        Ok(created)
    }

    /// Refreshes the joined truck columns of a maintenance row.
    fn with_truck(&self, record: &MaintenanceRecord) -> MaintenanceRecord {
        let mut record = record.clone();
        if let Some(truck) = self.trucks.get(&record.truck_id) {
            record.license_plate = truck.license_plate.clone();
            record.owner_id = truck.owner_id;
        }
        record
    }

    fn service_truck(&mut self, truck_id: i64, change: Option<TruckServiceChange>) {
        let Some(change) = change else {
            return;
        };
        if let Some(truck) = self.trucks.get_mut(&truck_id) {
            truck.status = change.status;
            if change.serviced_on.is_some() {
                truck.last_maintenance_date = change.serviced_on;
            }
            truck.updated_at = Utc::now();
        }
    }

    fn apply_shipment_changes(&mut self, id: i64, changes: ShipmentChanges) -> AppResult<Option<Shipment>> {
        if let Some(Some(carrier)) = changes.carrier_id {
            Self::require(&self.users, Some(carrier))?;
        }
        let Some(shipment) = self.shipments.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(status) = changes.status {
            shipment.status = status;
        }
        if let Some(priority) = changes.priority {
            shipment.priority = priority;
        }
        if let Some(carrier) = changes.carrier_id {
            shipment.carrier_id = carrier;
        }
        shipment.weight = changes.weight.or(shipment.weight);
        shipment.volume = changes.volume.or(shipment.volume);
        shipment.description = changes.description.or(shipment.description.take());
        shipment.price = changes.price.or(shipment.price);
        shipment.scheduled_pickup = changes.scheduled_pickup.or(shipment.scheduled_pickup);
        shipment.scheduled_delivery = changes.scheduled_delivery.or(shipment.scheduled_delivery);
        shipment.actual_pickup = changes.actual_pickup.or(shipment.actual_pickup);
        shipment.actual_delivery = changes.actual_delivery.or(shipment.actual_delivery);
        shipment.updated_at = Utc::now();
        Ok(Some(shipment.clone()))
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(&self, user: NewUser) -> AppResult<User> {
        self.tables.write().await.insert_user(user)
    }

    async fn register_user(&self, mut user: NewUser) -> AppResult<User> {
        let mut t = self.tables.write().await;
        if t.users.is_empty() {
            user.role = Role::Admin;
        }
        t.insert_user(user)
    }

    async fn find_user(&self, id: i64) -> AppResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let t = self.tables.read().await;
        Ok(t.users.values().find(|u| u.email.eq_ignore_ascii_case(email)).cloned())
    }

    async fn list_users(&self, filter: &UserFilter, limit: i64, offset: i64) -> AppResult<Page<User>> {
        let t = self.tables.read().await;
        let rows = t.users.values().rev().filter(|u| filter.matches(u)).collect();
        Ok(paginate(rows, limit, offset))
    }

    async fn update_profile(&self, id: i64, changes: ProfileChanges) -> AppResult<Option<User>> {
        let mut t = self.tables.write().await;
        let Some(user) = t.users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = changes.name {
            user.name = name;
        }
        if changes.phone.is_some() {
            user.phone = changes.phone;
        }
        if changes.company.is_some() {
            user.company = changes.company;
        }
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn update_user(&self, id: i64, changes: UserChanges) -> AppResult<Option<User>> {
        let mut t = self.tables.write().await;
        if let Some(email) = &changes.email {
            if t.users.values().any(|u| u.id != id && u.email.eq_ignore_ascii_case(email)) {
                return Err(AppError::conflict(EMAIL_TAKEN));
            }
        }
        let Some(user) = t.users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(v) = changes.email {
            user.email = v;
        }
        if let Some(v) = changes.name {
            user.name = v;
        }
        if let Some(v) = changes.role {
            user.role = v;
        }
        if let Some(v) = changes.is_active {
            user.is_active = v;
        }
        if changes.phone.is_some() {
            user.phone = changes.phone;
        }
        if changes.company.is_some() {
            user.company = changes.company;
        }
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn replace_reset_token(&self, token: NewPasswordResetToken) -> AppResult<()> {
        let mut t = self.tables.write().await;
        t.reset_tokens.retain(|_, existing| existing.user_id != token.user_id);
        let id = t.next_id();
        t.reset_tokens.insert(
            id,
            PasswordResetToken {
                id,
                user_id: token.user_id,
                lookup_prefix: token.lookup_prefix,
                token_hash: token.token_hash,
                expires_at: token.expires_at,
                created_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn active_reset_tokens(&self, lookup_prefix: &str, now: DateTime<Utc>) -> AppResult<Vec<PasswordResetToken>> {
        let t = self.tables.read().await;
        Ok(t.reset_tokens
            .values()
            .filter(|tok| tok.lookup_prefix == lookup_prefix && tok.expires_at > now)
            .cloned()
            .collect())
    }

    async fn redeem_reset_token(&self, id: i64, password_hash: &str) -> AppResult<bool> {
        let mut t = self.tables.write().await;
        let Some(user_id) = t.reset_tokens.get(&id).map(|tok| tok.user_id) else {
            return Ok(false);
        };
        let Some(user) = t.users.get_mut(&user_id).filter(|u| u.is_active) else {
            return Ok(false);
        };
        user.password_hash = password_hash.to_string();
        user.updated_at = Utc::now();
        t.reset_tokens.remove(&id);
        Ok(true)
    }

    async fn purge_expired_reset_tokens(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let mut t = self.tables.write().await;
        let before = t.reset_tokens.len();
        t.reset_tokens.retain(|_, tok| tok.expires_at > now);
        Ok((before - t.reset_tokens.len()) as u64)
    }

    async fn list_locations(&self, filter: &LocationFilter) -> AppResult<Vec<Location>> {
        let t = self.tables.read().await;
        let query = filter.query.as_ref().map(|q| q.to_lowercase());
        let mut locations: Vec<Location> = t
            .locations
            .values()
            .filter(|l| filter.include_inactive || l.is_active)
            .filter(|l| filter.city.as_ref().is_none_or(|c| &l.city == c))
            .filter(|l| {
                query.as_ref().is_none_or(|q| {
                    l.name.to_lowercase().contains(q) || l.address.to_lowercase().contains(q)
                })
            })
            .cloned()
            .collect();
        locations.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(locations)
    }

    async fn find_location(&self, id: i64) -> AppResult<Option<Location>> {
        Ok(self.tables.read().await.locations.get(&id).cloned())
    }

    async fn create_location(&self, location: NewLocation) -> AppResult<Location> {
        let mut t = self.tables.write().await;
        let now = Utc::now();
        let created = Location {
            id: t.next_id(),
            name: location.name,
            address: location.address,
            city: location.city,
            state: location.state,
            country: location.country,
            postal_code: location.postal_code,
            latitude: location.latitude,
            longitude: location.longitude,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        t.locations.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_location(&self, id: i64, changes: LocationChanges) -> AppResult<Option<Location>> {
        let mut t = self.tables.write().await;
        let Some(loc) = t.locations.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(v) = changes.name {
            loc.name = v;
        }
        if let Some(v) = changes.address {
            loc.address = v;
        }
        if let Some(v) = changes.city {
            loc.city = v;
        }
        if let Some(v) = changes.country {
            loc.country = v;
        }
        loc.state = changes.state.or(loc.state.take());
        loc.postal_code = changes.postal_code.or(loc.postal_code.take());
        loc.latitude = changes.latitude.or(loc.latitude);
        loc.longitude = changes.longitude.or(loc.longitude);
        loc.updated_at = Utc::now();
        Ok(Some(loc.clone()))
    }

    async fn deactivate_location(&self, id: i64) -> AppResult<Option<Location>> {
        let mut t = self.tables.write().await;
        match t.locations.get_mut(&id) {
            Some(loc) if loc.is_active => {
                loc.is_active = false;
                loc.updated_at = Utc::now();
                Ok(Some(loc.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn location_has_active_shipments(&self, id: i64) -> AppResult<bool> {
        let t = self.tables.read().await;
        Ok(t.shipments
            .values()
            .any(|s| (s.origin_id == id || s.destination_id == id) && s.status.is_active()))
    }

    async fn list_drivers(&self, status: Option<DriverStatus>) -> AppResult<Vec<Driver>> {
        let t = self.tables.read().await;
        Ok(t.drivers
            .values()
            .rev()
            .filter(|d| match status {
                Some(s) => d.status == s,
                None => d.status != DriverStatus::Inactive,
            })
            .map(|d| t.joined(d))
            .collect())
    }

    async fn find_driver(&self, id: i64) -> AppResult<Option<Driver>> {
        let t = self.tables.read().await;
        Ok(t.drivers.get(&id).map(|d| t.joined(d)))
    }

    async fn find_driver_by_license(&self, license_number: &str) -> AppResult<Option<Driver>> {
        let t = self.tables.read().await;
        Ok(t.drivers
            .values()
            .find(|d| d.license_number == license_number)
            .map(|d| t.joined(d)))
    }

    async fn find_driver_by_user(&self, user_id: i64) -> AppResult<Option<Driver>> {
        let t = self.tables.read().await;
        Ok(t.drivers.values().find(|d| d.user_id == user_id).map(|d| t.joined(d)))
    }

    async fn create_driver(&self, driver: NewDriver) -> AppResult<Driver> {
        let mut t = self.tables.write().await;
        Tables::require(&t.users, Some(driver.user_id))?;
        if t.drivers
            .values()
            .any(|d| d.license_number == driver.license_number || d.user_id == driver.user_id)
        {
            return Err(AppError::conflict("Driver with this license number already exists"));
        }
        let now = Utc::now();
        let created = Driver {
            id: t.next_id(),
            user_id: driver.user_id,
            name: String::new(),
            email: String::new(),
            license_number: driver.license_number,
            license_expiry_date: driver.license_expiry_date,
            phone_number: driver.phone_number,
            status: driver.status,
            rating: None,
            created_at: now,
            updated_at: now,
        };
        t.drivers.insert(created.id, created.clone());
        Ok(t.joined(&created))
    }

    async fn update_driver(&self, id: i64, changes: DriverChanges) -> AppResult<Option<Driver>> {
        let mut t = self.tables.write().await;
        if let Some(license) = &changes.license_number {
            if t.drivers.values().any(|d| d.id != id && &d.license_number == license) {
                return Err(AppError::conflict("Driver with this license number already exists"));
            }
        }
        let Some(driver) = t.drivers.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(v) = changes.license_number {
            driver.license_number = v;
        }
        if let Some(v) = changes.license_expiry_date {
            driver.license_expiry_date = v;
        }
        if let Some(v) = changes.phone_number {
            driver.phone_number = v;
        }
        if let Some(v) = changes.status {
            driver.status = v;
        }
        driver.rating = changes.rating.or(driver.rating);
        driver.updated_at = Utc::now();
        let updated = driver.clone();
        Ok(Some(t.joined(&updated)))
    }

    async fn list_trucks(&self, filter: &TruckFilter) -> AppResult<Vec<Truck>> {
        let t = self.tables.read().await;
        Ok(t.trucks
            .values()
            .rev()
            .filter(|tr| filter.status.is_none_or(|s| tr.status == s))
            .filter(|tr| filter.driver_id.is_none_or(|d| tr.driver_id == Some(d)))
            .cloned()
            .collect())
    }

    async fn find_truck(&self, id: i64) -> AppResult<Option<Truck>> {
        Ok(self.tables.read().await.trucks.get(&id).cloned())
    }

    async fn find_truck_by_plate(&self, license_plate: &str) -> AppResult<Option<Truck>> {
        let t = self.tables.read().await;
        Ok(t.trucks.values().find(|tr| tr.license_plate == license_plate).cloned())
    }

    async fn create_truck(&self, truck: NewTruck) -> AppResult<Truck> {
        let mut t = self.tables.write().await;
        Tables::require(&t.drivers, truck.driver_id)?;
        Tables::require(&t.users, Some(truck.owner_id))?;
        if t.trucks.values().any(|tr| tr.license_plate == truck.license_plate) {
            return Err(AppError::conflict("Truck with this license plate already exists"));
        }
        let now = Utc::now();
        let created = Truck {
            id: t.next_id(),
            license_plate: truck.license_plate,
            make: truck.make,
            model: truck.model,
            year: truck.year,
            capacity: truck.capacity,
            fuel_type: truck.fuel_type,
            status: TruckStatus::Available,
            current_location: truck.current_location,
            driver_id: truck.driver_id,
            owner_id: truck.owner_id,
            last_maintenance_date: None,
            created_at: now,
            updated_at: now,
        };
        t.trucks.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_truck(&self, id: i64, changes: TruckChanges) -> AppResult<Option<Truck>> {
        let mut t = self.tables.write().await;
        if let Some(plate) = &changes.license_plate {
            if t.trucks.values().any(|tr| tr.id != id && &tr.license_plate == plate) {
                return Err(AppError::conflict("Truck with this license plate already exists"));
            }
        }
        if let Some(driver) = changes.driver_id {
            Tables::require(&t.drivers, driver)?;
        }
        let Some(truck) = t.trucks.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(v) = changes.license_plate {
            truck.license_plate = v;
        }
        if let Some(v) = changes.model {
            truck.model = v;
        }
        if let Some(v) = changes.year {
            truck.year = v;
        }
        if let Some(v) = changes.capacity {
            truck.capacity = v;
        }
        if let Some(v) = changes.fuel_type {
            truck.fuel_type = v;
        }
        if let Some(v) = changes.status {
            truck.status = v;
        }
        if let Some(v) = changes.driver_id {
            truck.driver_id = v;
        }
        truck.make = changes.make.or(truck.make.take());
        truck.current_location = changes.current_location.or(truck.current_location.take());
        truck.updated_at = Utc::now();
        Ok(Some(truck.clone()))
    }

    async fn delete_truck(&self, id: i64) -> AppResult<bool> {
        let mut t = self.tables.write().await;
        if t.trucks.remove(&id).is_none() {
            return Ok(false);
        }
        for route in t.routes.values_mut().filter(|r| r.truck_id == Some(id)) {
            route.truck_id = None;
        }
        t.maintenance.retain(|_, m| m.truck_id != id);
        Ok(true)
    }

    async fn list_maintenance(
        &self,
        filter: &MaintenanceFilter,
        limit: i64,
        offset: i64,
    ) -> AppResult<Page<MaintenanceRecord>> {
        let t = self.tables.read().await;
        let rows: Vec<MaintenanceRecord> = t
            .maintenance
            .values()
            .rev()
            .map(|m| t.with_truck(m))
            .filter(|m| filter.owner_id.is_none_or(|o| m.owner_id == o))
            .filter(|m| filter.truck_id.is_none_or(|id| m.truck_id == id))
            .filter(|m| filter.status.is_none_or(|s| m.status == s))
            .filter(|m| filter.priority.is_none_or(|p| m.priority == p))
            .collect();
        Ok(paginate(rows.iter().collect(), limit, offset))
    }

    async fn find_maintenance(&self, id: i64) -> AppResult<Option<MaintenanceRecord>> {
        let t = self.tables.read().await;
        Ok(t.maintenance.get(&id).map(|m| t.with_truck(m)))
    }

    async fn create_maintenance(
        &self,
        record: NewMaintenance,
        truck: Option<TruckServiceChange>,
    ) -> AppResult<MaintenanceRecord> {
        let mut t = self.tables.write().await;
        let (license_plate, owner_id) = match t.trucks.get(&record.truck_id) {
            Some(tr) => (tr.license_plate.clone(), tr.owner_id),
            None => return Err(AppError::validation(MISSING_REFERENCE)),
        };
        let now = Utc::now();
        let created = MaintenanceRecord {
            id: t.next_id(),
            truck_id: record.truck_id,
            license_plate,
            owner_id,
            maintenance_type: record.maintenance_type,
            service_type: record.service_type,
            description: record.description,
            scheduled_date: record.scheduled_date,
            completed_date: None,
            cost: record.cost,
            service_provider: record.service_provider,
            service_provider_contact: record.service_provider_contact,
            priority: record.priority,
            status: MaintenanceStatus::Scheduled,
            notes: record.notes,
            created_at: now,
            updated_at: now,
        };
        t.maintenance.insert(created.id, created.clone());
        t.service_truck(created.truck_id, truck);
        Ok(created)
    }

    async fn update_maintenance(
        &self,
        id: i64,
        changes: MaintenanceChanges,
        truck: Option<TruckServiceChange>,
    ) -> AppResult<Option<MaintenanceRecord>> {
        let mut t = self.tables.write().await;
        let Some(record) = t.maintenance.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(v) = changes.maintenance_type {
            record.maintenance_type = v;
        }
        if let Some(v) = changes.service_type {
            record.service_type = v;
        }
        if let Some(v) = changes.description {
            record.description = v;
        }
        if let Some(v) = changes.priority {
            record.priority = v;
        }
        if let Some(v) = changes.status {
            record.status = v;
        }
        record.scheduled_date = changes.scheduled_date.or(record.scheduled_date);
        record.completed_date = changes.completed_date.or(record.completed_date);
        record.cost = changes.cost.or(record.cost);
        record.service_provider = changes.service_provider.or(record.service_provider.take());
        record.service_provider_contact = changes.service_provider_contact.or(record.service_provider_contact.take());
        record.notes = changes.notes.or(record.notes.take());
        record.updated_at = Utc::now();
        let truck_id = record.truck_id;

        t.service_truck(truck_id, truck);
        Ok(t.maintenance.get(&id).map(|m| t.with_truck(m)))
    }

    async fn delete_maintenance(&self, id: i64) -> AppResult<bool> {
        Ok(self.tables.write().await.maintenance.remove(&id).is_some())
    }

    async fn list_routes(&self, filter: &RouteFilter) -> AppResult<Vec<Route>> {
        let t = self.tables.read().await;
        Ok(t.routes
            .values()
            .rev()
            .filter(|r| filter.status.is_none_or(|s| r.status == s))
            .filter(|r| filter.shipment_id.is_none_or(|s| r.shipment_id == s))
            .cloned()
            .collect())
    }

    async fn find_route(&self, id: i64) -> AppResult<Option<Route>> {
        Ok(self.tables.read().await.routes.get(&id).cloned())
    }

    async fn latest_route(&self, shipment_id: i64) -> AppResult<Option<Route>> {
        let t = self.tables.read().await;
        Ok(t.routes.values().rev().find(|r| r.shipment_id == shipment_id).cloned())
    }

    async fn create_route(&self, route: NewRoute) -> AppResult<Route> {
        let mut t = self.tables.write().await;
        Tables::require(&t.shipments, Some(route.shipment_id))?;
        Tables::require(&t.trucks, route.truck_id)?;
        Tables::require(&t.drivers, route.driver_id)?;
        let now = Utc::now();
        let created = Route {
            id: t.next_id(),
            shipment_id: route.shipment_id,
            truck_id: route.truck_id,
            driver_id: route.driver_id,
            status: route.status,
            created_at: now,
            updated_at: now,
        };
        t.routes.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_route(&self, id: i64, changes: RouteChanges) -> AppResult<Option<Route>> {
        let mut t = self.tables.write().await;
        if let Some(truck) = changes.truck_id {
            Tables::require(&t.trucks, truck)?;
        }
        if let Some(driver) = changes.driver_id {
            Tables::require(&t.drivers, driver)?;
        }
        let Some(route) = t.routes.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(v) = changes.truck_id {
            route.truck_id = v;
        }
        if let Some(v) = changes.driver_id {
            route.driver_id = v;
        }
        if let Some(v) = changes.status {
            route.status = v;
        }
        route.updated_at = Utc::now();
        Ok(Some(route.clone()))
    }

    async fn has_active_routes(&self, target: RouteRef) -> AppResult<bool> {
        let t = self.tables.read().await;
        Ok(t.routes.values().filter(|r| r.status.is_active()).any(|r| match target {
            RouteRef::Truck(id) => r.truck_id == Some(id),
            RouteRef::Driver(id) => r.driver_id == Some(id),
            RouteRef::Shipment(id) => r.shipment_id == id,
        }))
    }

    async fn list_shipments(&self, filter: &ShipmentFilter) -> AppResult<Vec<Shipment>> {
        let t = self.tables.read().await;
        Ok(t.shipments
            .values()
            .rev()
            .filter(|s| filter.status.is_none_or(|st| s.status == st))
            .filter(|s| filter.customer_id.is_none_or(|c| s.customer_id == c))
            .filter(|s| filter.carrier_id.is_none_or(|c| s.carrier_id == Some(c)))
            .cloned()
            .collect())
    }

    async fn find_shipment(&self, id: i64) -> AppResult<Option<Shipment>> {
        Ok(self.tables.read().await.shipments.get(&id).cloned())
    }

    async fn create_shipment(&self, shipment: NewShipment, created_by: i64) -> AppResult<Shipment> {
        let mut t = self.tables.write().await;
        Tables::require(&t.users, Some(shipment.customer_id))?;
        Tables::require(&t.users, shipment.carrier_id)?;
        Tables::require(&t.locations, Some(shipment.origin_id))?;
        Tables::require(&t.locations, Some(shipment.destination_id))?;
        if t.shipments.values().any(|s| s.tracking_number == shipment.tracking_number) {
            return Err(AppError::conflict("Tracking number already exists"));
        }
        let now = Utc::now();
        let created = Shipment {
            id: t.next_id(),
            tracking_number: shipment.tracking_number,
            customer_id: shipment.customer_id,
            carrier_id: shipment.carrier_id,
            origin_id: shipment.origin_id,
            destination_id: shipment.destination_id,
            status: ShipmentStatus::Pending,
            priority: shipment.priority,
            weight: shipment.weight,
            volume: shipment.volume,
            description: shipment.description,
            price: shipment.price,
            scheduled_pickup: shipment.scheduled_pickup,
            scheduled_delivery: shipment.scheduled_delivery,
            actual_pickup: None,
            actual_delivery: None,
            created_at: now,
            updated_at: now,
        };
        let entry = TrackingEntry {
            id: t.next_id(),
            shipment_id: created.id,
            event: EVENT_CREATED.to_string(),
            status: Some(ShipmentStatus::Pending),
            location_id: Some(created.origin_id),
            latitude: None,
            longitude: None,
            notes: Some("Shipment has been created and is pending confirmation".to_string()),
            updated_by: created_by,
            recorded_at: now,
        };
        t.shipments.insert(created.id, created.clone());
        t.tracking.insert(entry.id, entry);
        Ok(created)
    }

    async fn update_shipment(&self, id: i64, changes: ShipmentChanges) -> AppResult<Option<Shipment>> {
        self.tables.write().await.apply_shipment_changes(id, changes)
    }

    async fn delete_shipment(&self, id: i64) -> AppResult<bool> {
        let mut t = self.tables.write().await;
        t.routes.retain(|_, r| r.shipment_id != id);
        t.tracking.retain(|_, e| e.shipment_id != id);
        Ok(t.shipments.remove(&id).is_some())
    }

    async fn list_tracking(&self, shipment_id: i64) -> AppResult<Vec<TrackingEntry>> {
        let t = self.tables.read().await;
        Ok(t.tracking.values().rev().filter(|e| e.shipment_id == shipment_id).cloned().collect())
    }

    async fn record_tracking(&self, entry: NewTrackingEntry, changes: ShipmentChanges) -> AppResult<TrackingEntry> {
        let mut t = self.tables.write().await;
        Tables::require(&t.shipments, Some(entry.shipment_id))?;
        Tables::require(&t.locations, entry.location_id)?;
        let recorded = TrackingEntry {
            id: t.next_id(),
            shipment_id: entry.shipment_id,
            event: entry.event,
            status: entry.status,
            location_id: entry.location_id,
            latitude: entry.latitude,
            longitude: entry.longitude,
            notes: entry.notes,
            updated_by: entry.updated_by,
            recorded_at: Utc::now(),
        };
        t.apply_shipment_changes(recorded.shipment_id, changes)?;
        t.tracking.insert(recorded.id, recorded.clone());
        Ok(recorded)
    }

    async fn list_invoices(&self, filter: &InvoiceFilter, limit: i64, offset: i64) -> AppResult<Page<Invoice>> {
        let t = self.tables.read().await;
        let rows = t
            .invoices
            .values()
            .rev()
            .filter(|i| filter.user_id.is_none_or(|u| i.user_id == u))
            .filter(|i| filter.status.is_none_or(|s| i.status == s))
            .collect();
        Ok(paginate(rows, limit, offset))
    }

    async fn find_invoice(&self, id: i64) -> AppResult<Option<Invoice>> {
        Ok(self.tables.read().await.invoices.get(&id).cloned())
    }

    async fn find_invoice_by_shipment(&self, shipment_id: i64) -> AppResult<Option<Invoice>> {
        let t = self.tables.read().await;
        Ok(t.invoices.values().find(|i| i.shipment_id == shipment_id).cloned())
    }

    async fn find_invoice_by_number(&self, invoice_number: &str) -> AppResult<Option<Invoice>> {
        let t = self.tables.read().await;
        Ok(t.invoices.values().find(|i| i.invoice_number == invoice_number).cloned())
    }

    async fn create_invoice(&self, invoice: NewInvoice) -> AppResult<Invoice> {
        let mut t = self.tables.write().await;
        Tables::require(&t.shipments, Some(invoice.shipment_id))?;
        Tables::require(&t.users, Some(invoice.user_id))?;
        if t.invoices
            .values()
            .any(|i| i.invoice_number == invoice.invoice_number || i.shipment_id == invoice.shipment_id)
        {
            return Err(AppError::conflict("Invoice already exists"));
        }
        let now = Utc::now();
        let created = Invoice {
            id: t.next_id(),
            invoice_number: invoice.invoice_number,
            shipment_id: invoice.shipment_id,
            user_id: invoice.user_id,
            amount: invoice.amount,
            currency: invoice.currency,
            due_date: invoice.due_date,
            status: InvoiceStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        t.invoices.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_invoice(&self, id: i64, changes: InvoiceChanges) -> AppResult<Option<Invoice>> {
        let mut t = self.tables.write().await;
        let Some(invoice) = t.invoices.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(v) = changes.amount {
            invoice.amount = v;
        }
        if let Some(v) = changes.currency {
            invoice.currency = v;
        }
        if let Some(v) = changes.due_date {
            invoice.due_date = v;
        }
        if let Some(v) = changes.status {
            invoice.status = v;
        }
        invoice.updated_at = Utc::now();
        Ok(Some(invoice.clone()))
    }

    async fn list_transactions(
        &self,
        filter: &TransactionFilter,
        limit: i64,
        offset: i64,
    ) -> AppResult<Page<Transaction>> {
        let t = self.tables.read().await;
        let rows = t
            .transactions
            .values()
            .rev()
            .filter(|x| filter.user_id.is_none_or(|u| x.user_id == u))
            .filter(|x| filter.invoice_id.is_none_or(|i| x.invoice_id == Some(i)))
            .filter(|x| filter.kind.is_none_or(|k| x.kind == k))
            .filter(|x| filter.status.is_none_or(|s| x.status == s))
            .collect();
        Ok(paginate(rows, limit, offset))
    }

    async fn record_transaction(&self, transaction: NewTransaction) -> AppResult<Transaction> {
        let mut t = self.tables.write().await;
        Tables::require(&t.invoices, transaction.invoice_id)?;
        Tables::require(&t.users, Some(transaction.user_id))?;
        let now = Utc::now();
        let created = Transaction {
            id: t.next_id(),
            invoice_id: transaction.invoice_id,
            user_id: transaction.user_id,
            amount: transaction.amount,
            currency: transaction.currency,
            kind: transaction.kind,
            status: transaction.status,
            reference: transaction.reference,
            description: transaction.description,
            created_at: now,
        };
        t.transactions.insert(created.id, created.clone());

        if let (Some(invoice_id), TransactionKind::Payment, TransactionStatus::Completed) =
            (created.invoice_id, created.kind, created.status)
        {
            let paid: f64 = t
                .transactions
                .values()
                .filter(|x| x.invoice_id == Some(invoice_id))
                .filter(|x| x.kind == TransactionKind::Payment && x.status == TransactionStatus::Completed)
                .map(|x| x.amount)
                .sum();
            if let Some(invoice) = t.invoices.get_mut(&invoice_id) {
                let open = matches!(invoice.status, InvoiceStatus::Pending | InvoiceStatus::Overdue);
                if open && settles(paid, invoice.amount) {
                    invoice.status = InvoiceStatus::Paid;
                    invoice.updated_at = now;
                }
            }
        }
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::route::RouteStatus;
    use crate::models::shipment::Priority;
    use chrono::Duration;

    async fn seed_user(store: &MemoryStore, email: &str) -> User {
        store
            .create_user(NewUser {
                email: email.to_string(),
                name: "Seed".to_string(),
                password_hash: "x".to_string(),
                role: Role::Company,
                phone: None,
                company: None,
            })
            .await
            .unwrap()
    }

    async fn seed_shipment(store: &MemoryStore, owner: i64) -> Shipment {
        let mut ids = Vec::new();
        for name in ["Depot", "Port"] {
            let loc = store
                .create_location(NewLocation {
                    name: name.to_string(),
                    address: "1 Main St".to_string(),
                    city: "Casablanca".to_string(),
                    state: None,
                    country: "MA".to_string(),
                    postal_code: None,
                    latitude: None,
                    longitude: None,
                })
                .await
                .unwrap();
            ids.push(loc.id);
        }
        store
            .create_shipment(
                NewShipment {
                    tracking_number: format!("MRT-{owner}"),
                    customer_id: owner,
                    carrier_id: None,
                    origin_id: ids[0],
                    destination_id: ids[1],
                    priority: Priority::Normal,
                    weight: None,
                    volume: None,
                    description: None,
                    price: None,
                    scheduled_pickup: None,
                    scheduled_delivery: None,
                },
                owner,
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn duplicate_email_conflicts_case_insensitively() {
        let store = MemoryStore::new();
        seed_user(&store, "a@example.com").await;
        let err = store
            .create_user(NewUser {
                email: "A@Example.com".to_string(),
                name: "Other".to_string(),
                password_hash: "x".to_string(),
                role: Role::Individual,
                phone: None,
                company: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn new_reset_token_replaces_old_and_consumes_once() {
        let store = MemoryStore::new();
        let user = seed_user(&store, "r@example.com").await;
        let expires_at = Utc::now() + Duration::hours(1);
        for prefix in ["aaaa", "bbbb"] {
            store
                .replace_reset_token(NewPasswordResetToken {
                    user_id: user.id,
                    lookup_prefix: prefix.to_string(),
                    token_hash: "h".to_string(),
                    expires_at,
                })
                .await
                .unwrap();
        }

        assert!(store.active_reset_tokens("aaaa", Utc::now()).await.unwrap().is_empty());
        let live = store.active_reset_tokens("bbbb", Utc::now()).await.unwrap();
        assert_eq!(live.len(), 1);
        assert!(store.redeem_reset_token(live[0].id, "new-hash").await.unwrap());
        assert!(!store.redeem_reset_token(live[0].id, "other-hash").await.unwrap());
        assert_eq!(store.find_user(user.id).await.unwrap().unwrap().password_hash, "new-hash");
    }

    #[tokio::test]
    async fn reset_token_of_deactivated_user_is_kept_unredeemed() {
        let store = MemoryStore::new();
        let user = seed_user(&store, "d@example.com").await;
        store
            .replace_reset_token(NewPasswordResetToken {
                user_id: user.id,
                lookup_prefix: "dddd".to_string(),
                token_hash: "h".to_string(),
                expires_at: Utc::now() + Duration::hours(1),
            })
            .await
            .unwrap();
        let token = store.active_reset_tokens("dddd", Utc::now()).await.unwrap().remove(0);
        store
            .update_user(user.id, UserChanges { is_active: Some(false), ..Default::default() })
            .await
            .unwrap();

        assert!(!store.redeem_reset_token(token.id, "new-hash").await.unwrap());
        assert_eq!(store.find_user(user.id).await.unwrap().unwrap().password_hash, "x");
    }

    #[tokio::test]
    async fn only_the_first_registration_becomes_admin() {
        let store = MemoryStore::new();
        let mut roles = Vec::new();
        for email in ["first@example.com", "second@example.com"] {
            let user = store
                .register_user(NewUser {
                    email: email.to_string(),
                    name: "N".to_string(),
                    password_hash: "x".to_string(),
                    role: Role::Carrier,
                    phone: None,
                    company: None,
                })
                .await
                .unwrap();
            roles.push(user.role);
        }
        assert_eq!(roles, vec![Role::Admin, Role::Carrier]);
    }

    #[tokio::test]
    async fn admin_email_change_conflicts_with_other_accounts_only() {
        let store = MemoryStore::new();
        let a = seed_user(&store, "a@example.com").await;
        seed_user(&store, "b@example.com").await;

        let err = store
            .update_user(a.id, UserChanges { email: Some("B@example.com".into()), ..Default::default() })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let same = store
            .update_user(a.id, UserChanges { email: Some("a@example.com".into()), ..Default::default() })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(same.email, "a@example.com");
    }

    #[tokio::test]
    async fn completed_payments_settle_the_invoice() {
        let store = MemoryStore::new();
        let user = seed_user(&store, "p@example.com").await;
        let shipment = seed_shipment(&store, user.id).await;
        let invoice = store
            .create_invoice(NewInvoice {
                invoice_number: "INV-1".to_string(),
                shipment_id: shipment.id,
                user_id: user.id,
                amount: 100.0,
                currency: "MAD".to_string(),
                due_date: Utc::now().date_naive(),
            })
            .await
            .unwrap();
        let pay = |amount: f64| NewTransaction {
            invoice_id: Some(invoice.id),
            user_id: user.id,
            amount,
            currency: "MAD".to_string(),
            kind: TransactionKind::Payment,
            status: TransactionStatus::Completed,
            reference: None,
            description: None,
        };

        store.record_transaction(pay(60.0)).await.unwrap();
        assert_eq!(store.find_invoice(invoice.id).await.unwrap().unwrap().status, InvoiceStatus::Pending);
        store.record_transaction(pay(40.0)).await.unwrap();
        assert_eq!(store.find_invoice(invoice.id).await.unwrap().unwrap().status, InvoiceStatus::Paid);
    }

    #[tokio::test]
    async fn expired_tokens_are_hidden_and_purged() {
        let store = MemoryStore::new();
        let user = seed_user(&store, "e@example.com").await;
        store
            .replace_reset_token(NewPasswordResetToken {
                user_id: user.id,
                lookup_prefix: "cccc".to_string(),
                token_hash: "h".to_string(),
                expires_at: Utc::now() - Duration::seconds(1),
            })
            .await
            .unwrap();

        assert!(store.active_reset_tokens("cccc", Utc::now()).await.unwrap().is_empty());
        assert_eq!(store.purge_expired_reset_tokens(Utc::now()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn shipment_creation_writes_initial_tracking_entry() {
        let store = MemoryStore::new();
        let user = seed_user(&store, "s@example.com").await;
        let shipment = seed_shipment(&store, user.id).await;

        let history = store.list_tracking(shipment.id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].event, EVENT_CREATED);
        assert_eq!(history[0].status, Some(ShipmentStatus::Pending));
    }

    #[tokio::test]
    async fn active_routes_are_tracked_per_reference() {
        let store = MemoryStore::new();
        let user = seed_user(&store, "t@example.com").await;
        let shipment = seed_shipment(&store, user.id).await;
        let route = store
            .create_route(NewRoute {
                shipment_id: shipment.id,
                truck_id: None,
                driver_id: None,
                status: RouteStatus::Planned,
            })
            .await
            .unwrap();

        assert!(store.has_active_routes(RouteRef::Shipment(shipment.id)).await.unwrap());

        store
            .update_route(route.id, RouteChanges { status: Some(RouteStatus::Completed), ..Default::default() })
            .await
            .unwrap();
        assert!(!store.has_active_routes(RouteRef::Shipment(shipment.id)).await.unwrap());
    }

    #[tokio::test]
    async fn invoice_pages_report_unpaginated_total() {
        let store = MemoryStore::new();
        let user = seed_user(&store, "i@example.com").await;
        let first = seed_shipment(&store, user.id).await;
        let mut shipment_ids = vec![first.id];
        for n in 1..3 {
            let extra = store
                .create_shipment(
                    NewShipment {
                        tracking_number: format!("MRT-extra-{n}"),
                        customer_id: user.id,
                        carrier_id: None,
                        origin_id: first.origin_id,
                        destination_id: first.destination_id,
                        priority: Priority::Low,
                        weight: None,
                        volume: None,
                        description: None,
                        price: None,
                        scheduled_pickup: None,
                        scheduled_delivery: None,
                    },
                    user.id,
                )
                .await
                .unwrap();
            shipment_ids.push(extra.id);
        }
        for (n, shipment_id) in shipment_ids.iter().enumerate() {
            store
                .create_invoice(NewInvoice {
                    invoice_number: format!("INV-{n}"),
                    shipment_id: *shipment_id,
                    user_id: user.id,
                    amount: 100.0,
                    currency: "MAD".to_string(),
                    due_date: Utc::now().date_naive(),
                })
                .await
                .unwrap();
        }

        let filter = InvoiceFilter { user_id: Some(user.id), status: None };
        let page = store.list_invoices(&filter, 2, 2).await.unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].invoice_number, "INV-0");

        let dup = store
            .create_invoice(NewInvoice {
                invoice_number: "INV-9".to_string(),
                shipment_id: first.id,
                user_id: user.id,
                amount: 1.0,
                currency: "MAD".to_string(),
                due_date: Utc::now().date_naive(),
            })
            .await
            .unwrap_err();
        assert!(matches!(dup, AppError::Conflict(_)));
    }
}
