use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, PgPool};

use super::{RouteRef, Store};
use crate::error::{map_constraint, AppResult};
use crate::models::driver::{Driver, DriverChanges, DriverStatus, NewDriver};
use crate::models::invoice::{Invoice, InvoiceChanges, InvoiceFilter, NewInvoice};
use crate::models::location::{Location, LocationChanges, LocationFilter, NewLocation};
use crate::models::maintenance::{
    MaintenanceChanges, MaintenanceFilter, MaintenanceRecord, NewMaintenance, TruckServiceChange,
};
use crate::models::password_reset::{NewPasswordResetToken, PasswordResetToken};
use crate::models::route::{NewRoute, Route, RouteChanges, RouteFilter};
use crate::models::shipment::{
    NewShipment, NewTrackingEntry, Shipment, ShipmentChanges, ShipmentFilter, ShipmentStatus,
    TrackingEntry, EVENT_CREATED,
};
use crate::models::transaction::{NewTransaction, Transaction, TransactionFilter};
use crate::models::truck::{NewTruck, Truck, TruckChanges, TruckFilter};
use crate::models::user::{NewUser, ProfileChanges, User, UserChanges, UserFilter};
use crate::models::Page;

const DRIVER_COLUMNS: &str = "d.id, d.user_id, u.name, u.email, d.license_number, d.license_expiry_date, \
     d.phone_number, d.status, d.rating, d.created_at, d.updated_at";

const MAINTENANCE_COLUMNS: &str = "m.id, m.truck_id, t.license_plate, t.owner_id, m.maintenance_type, \
     m.service_type, m.description, m.scheduled_date, m.completed_date, m.cost, m.service_provider, \
     m.service_provider_contact, m.priority, m.status, m.notes, m.created_at, m.updated_at";

const MAINTENANCE_FILTER: &str = "($1::BIGINT IS NULL OR t.owner_id = $1) \
     AND ($2::BIGINT IS NULL OR m.truck_id = $2) \
     AND ($3::maintenance_status IS NULL OR m.status = $3) \
     AND ($4::maintenance_priority IS NULL OR m.priority = $4)";

const USER_FILTER: &str = "($1::user_role IS NULL OR role = $1) \
     AND ($2::BOOLEAN IS NULL OR is_active = $2) \
     AND ($3::TEXT IS NULL OR name ILIKE '%' || $3 || '%' OR email ILIKE '%' || $3 || '%')";

const TRANSACTION_FILTER: &str = "($1::BIGINT IS NULL OR user_id = $1) \
     AND ($2::BIGINT IS NULL OR invoice_id = $2) \
     AND ($3::transaction_kind IS NULL OR kind = $3) \
     AND ($4::transaction_status IS NULL OR status = $4)";

const ACTIVE_ROUTE: &str = "status IN ('PLANNED', 'IN_PROGRESS')";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

async fn apply_shipment_changes<'e, E: PgExecutor<'e>>(
    exec: E,
    id: i64,
    changes: ShipmentChanges,
) -> Result<Option<Shipment>, sqlx::Error> {
    sqlx::query_as::<_, Shipment>(
        r#"UPDATE shipments SET
            status = COALESCE($2, status),
            priority = COALESCE($3, priority),
            carrier_id = CASE WHEN $4::BOOLEAN THEN $5::BIGINT ELSE carrier_id END,
            weight = COALESCE($6, weight),
            volume = COALESCE($7, volume),
            description = COALESCE($8, description),
            price = COALESCE($9, price),
            scheduled_pickup = COALESCE($10, scheduled_pickup),
            scheduled_delivery = COALESCE($11, scheduled_delivery),
            actual_pickup = COALESCE($12, actual_pickup),
            actual_delivery = COALESCE($13, actual_delivery),
            updated_at = NOW()
        WHERE id = $1
        RETURNING *"#,
    )
    .bind(id)
    .bind(changes.status)
    .bind(changes.priority)
    .bind(changes.carrier_id.is_some())
    .bind(changes.carrier_id.flatten())
    .bind(changes.weight)
    .bind(changes.volume)
    .bind(changes.description)
    .bind(changes.price)
    .bind(changes.scheduled_pickup)
    .bind(changes.scheduled_delivery)
    .bind(changes.actual_pickup)
    .bind(changes.actual_delivery)
    .fetch_optional(exec)
    .await
}

async fn service_truck<'e, E: PgExecutor<'e>>(
    exec: E,
    truck_id: i64,
    change: TruckServiceChange,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"UPDATE trucks SET
            status = $2,
            last_maintenance_date = COALESCE($3, last_maintenance_date),
            updated_at = NOW()
        WHERE id = $1"#,
    )
    .bind(truck_id)
    .bind(change.status)
    .bind(change.serviced_on)
    .execute(exec)
    .await?;
    Ok(())
}

#[async_trait]
impl Store for PgStore {

    async fn create_user(&self, user: NewUser) -> AppResult<User> {
        sqlx::query_as::<_, User>(
            r#"INSERT INTO users (email, name, password_hash, role, phone, company)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *"#,
        )
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.password_hash)
        .bind(user.role)
        .bind(&user.phone)
        .bind(&user.company)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_constraint(e, "Email already registered"))
    }

    async fn register_user(&self, user: NewUser) -> AppResult<User> {
        let mut tx = self.pool.begin().await?;

        // Serializes concurrent sign-ups so exactly one of them sees an empty table.
        sqlx::query("LOCK TABLE users IN SHARE ROW EXCLUSIVE MODE")
            .execute(&mut *tx)
            .await?;

        let created = sqlx::query_as::<_, User>(
            r#"INSERT INTO users (email, name, password_hash, role, phone, company)
            VALUES ($1, $2, $3,
                CASE WHEN EXISTS (SELECT 1 FROM users) THEN $4 ELSE 'ADMIN'::user_role END,
                $5, $6)
            RETURNING *"#,
        )
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.password_hash)
        .bind(user.role)
        .bind(&user.phone)
        .bind(&user.company)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_constraint(e, "Email already registered"))?;

        tx.commit().await?;
        Ok(created)
    }

    async fn list_users(&self, filter: &UserFilter, limit: i64, offset: i64) -> AppResult<Page<User>> {
        let sql = format!("SELECT * FROM users WHERE {USER_FILTER} ORDER BY created_at DESC, id DESC LIMIT $4 OFFSET $5");
        let items = sqlx::query_as::<_, User>(&sql)
            .bind(filter.role)
            .bind(filter.is_active)
            .bind(&filter.search)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        let sql = format!("SELECT COUNT(*) FROM users WHERE {USER_FILTER}");
        let total = sqlx::query_scalar::<_, i64>(&sql)
            .bind(filter.role)
            .bind(filter.is_active)
            .bind(&filter.search)
            .fetch_one(&self.pool)
            .await?;

        Ok(Page { items, total })
    }

    async fn find_user(&self, id: i64) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn update_profile(&self, id: i64, changes: ProfileChanges) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"UPDATE users SET
                name = COALESCE($2, name),
                phone = COALESCE($3, phone),
                company = COALESCE($4, company),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *"#,
        )
        .bind(id)
        .bind(changes.name)
        .bind(changes.phone)
        .bind(changes.company)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn update_user(&self, id: i64, changes: UserChanges) -> AppResult<Option<User>> {
        sqlx::query_as::<_, User>(
            r#"UPDATE users SET
                email = COALESCE($2, email),
                name = COALESCE($3, name),
                phone = COALESCE($4, phone),
                company = COALESCE($5, company),
                role = COALESCE($6, role),
                is_active = COALESCE($7, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *"#,
        )
        .bind(id)
        .bind(changes.email)
        .bind(changes.name)
        .bind(changes.phone)
        .bind(changes.company)
        .bind(changes.role)
        .bind(changes.is_active)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_constraint(e, "Email already in use by another user"))
    }

    async fn replace_reset_token(&self, token: NewPasswordResetToken) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM password_reset_tokens WHERE user_id = $1")
            .bind(token.user_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"INSERT INTO password_reset_tokens (user_id, lookup_prefix, token_hash, expires_at)
            VALUES ($1, $2, $3, $4)"#,
        )
        .bind(token.user_id)
        .bind(&token.lookup_prefix)
        .bind(&token.token_hash)
        .bind(token.expires_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn active_reset_tokens(&self, lookup_prefix: &str, now: DateTime<Utc>) -> AppResult<Vec<PasswordResetToken>> {
        let tokens = sqlx::query_as::<_, PasswordResetToken>(
            "SELECT * FROM password_reset_tokens WHERE lookup_prefix = $1 AND expires_at > $2",
        )
        .bind(lookup_prefix)
        .bind(now)
        .fetch_all(&self.pool)
        .await?;
        Ok(tokens)
    }

    async fn redeem_reset_token(&self, id: i64, password_hash: &str) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;

        let Some(user_id) =
            sqlx::query_scalar::<_, i64>("DELETE FROM password_reset_tokens WHERE id = $1 RETURNING user_id")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
        else {
            return Ok(false);
        };

        let updated = sqlx::query(
            "UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1 AND is_active",
        )
        .bind(user_id)
        .bind(password_hash)
        .execute(&mut *tx)
        .await?;

        // Dropping the transaction rolls the token delete back.
        if updated.rows_affected() == 0 {
            return Ok(false);
        }
        tx.commit().await?;
        Ok(true)
    }

    async fn purge_expired_reset_tokens(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM password_reset_tokens WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn list_locations(&self, filter: &LocationFilter) -> AppResult<Vec<Location>> {
        let locations = sqlx::query_as::<_, Location>(
            r#"SELECT * FROM locations
            WHERE ($1::TEXT IS NULL OR city = $1)
              AND ($2::TEXT IS NULL OR name ILIKE '%' || $2 || '%' OR address ILIKE '%' || $2 || '%')
              AND ($3 OR is_active)
            ORDER BY name"#,
        )
        .bind(&filter.city)
        .bind(&filter.query)
        .bind(filter.include_inactive)
        .fetch_all(&self.pool)
        .await?;
        Ok(locations)
    }

    async fn find_location(&self, id: i64) -> AppResult<Option<Location>> {
        let location = sqlx::query_as::<_, Location>("SELECT * FROM locations WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(location)
    }

    async fn create_location(&self, location: NewLocation) -> AppResult<Location> {
        let created = sqlx::query_as::<_, Location>(
            r#"INSERT INTO locations (name, address, city, state, country, postal_code, latitude, longitude)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *"#,
        )
        .bind(location.name)
        .bind(location.address)
        .bind(location.city)
        .bind(location.state)
        .bind(location.country)
        .bind(location.postal_code)
        .bind(location.latitude)
        .bind(location.longitude)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn update_location(&self, id: i64, changes: LocationChanges) -> AppResult<Option<Location>> {
        let updated = sqlx::query_as::<_, Location>(
            r#"UPDATE locations SET
                name = COALESCE($2, name),
                address = COALESCE($3, address),
                city = COALESCE($4, city),
                state = COALESCE($5, state),
                country = COALESCE($6, country),
                postal_code = COALESCE($7, postal_code),
                latitude = COALESCE($8, latitude),
                longitude = COALESCE($9, longitude),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *"#,
        )
        .bind(id)
        .bind(changes.name)
        .bind(changes.address)
        .bind(changes.city)
        .bind(changes.state)
        .bind(changes.country)
        .bind(changes.postal_code)
        .bind(changes.latitude)
        .bind(changes.longitude)
        .fetch_optional(&self.pool)
        .await?;
        Ok(updated)
    }

    async fn deactivate_location(&self, id: i64) -> AppResult<Option<Location>> {
        let location = sqlx::query_as::<_, Location>(
            r#"UPDATE locations SET is_active = FALSE, updated_at = NOW()
            WHERE id = $1 AND is_active
            RETURNING *"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(location)
    }

    async fn location_has_active_shipments(&self, id: i64) -> AppResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"SELECT EXISTS(
                SELECT 1 FROM shipments
                WHERE (origin_id = $1 OR destination_id = $1)
                  AND status NOT IN ('DELIVERED', 'CANCELLED')
            )"#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn list_drivers(&self, status: Option<DriverStatus>) -> AppResult<Vec<Driver>> {
        let sql = format!(
            "SELECT {DRIVER_COLUMNS} FROM drivers d JOIN users u ON u.id = d.user_id \
             WHERE ($1::driver_status IS NULL AND d.status <> 'INACTIVE') OR d.status = $1 \
             ORDER BY d.created_at DESC"
        );
        let drivers = sqlx::query_as::<_, Driver>(&sql)
            .bind(status)
            .fetch_all(&self.pool)
            .await?;
        Ok(drivers)
    }

    async fn find_driver(&self, id: i64) -> AppResult<Option<Driver>> {
        let sql = format!("SELECT {DRIVER_COLUMNS} FROM drivers d JOIN users u ON u.id = d.user_id WHERE d.id = $1");
        let driver = sqlx::query_as::<_, Driver>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(driver)
    }

    async fn find_driver_by_license(&self, license_number: &str) -> AppResult<Option<Driver>> {
        let sql = format!(
            "SELECT {DRIVER_COLUMNS} FROM drivers d JOIN users u ON u.id = d.user_id WHERE d.license_number = $1"
        );
        let driver = sqlx::query_as::<_, Driver>(&sql)
            .bind(license_number)
            .fetch_optional(&self.pool)
            .await?;
        Ok(driver)
    }

    async fn find_driver_by_user(&self, user_id: i64) -> AppResult<Option<Driver>> {
        let sql = format!("SELECT {DRIVER_COLUMNS} FROM drivers d JOIN users u ON u.id = d.user_id WHERE d.user_id = $1");
        let driver = sqlx::query_as::<_, Driver>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(driver)
    }

    async fn create_driver(&self, driver: NewDriver) -> AppResult<Driver> {
        let sql = format!(
            "WITH d AS (
                INSERT INTO drivers (user_id, license_number, license_expiry_date, phone_number, status)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING *
            )
            SELECT {DRIVER_COLUMNS} FROM d JOIN users u ON u.id = d.user_id"
        );
        sqlx::query_as::<_, Driver>(&sql)
            .bind(driver.user_id)
            .bind(&driver.license_number)
            .bind(driver.license_expiry_date)
            .bind(&driver.phone_number)
            .bind(driver.status)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_constraint(e, "Driver with this license number already exists"))
    }

    async fn update_driver(&self, id: i64, changes: DriverChanges) -> AppResult<Option<Driver>> {
        let sql = format!(
            "WITH d AS (
                UPDATE drivers SET
                    license_number = COALESCE($2, license_number),
                    license_expiry_date = COALESCE($3, license_expiry_date),
                    phone_number = COALESCE($4, phone_number),
                    status = COALESCE($5, status),
                    rating = COALESCE($6, rating),
                    updated_at = NOW()
                WHERE id = $1
                RETURNING *
            )
            SELECT {DRIVER_COLUMNS} FROM d JOIN users u ON u.id = d.user_id"
        );
        sqlx::query_as::<_, Driver>(&sql)
            .bind(id)
            .bind(changes.license_number)
            .bind(changes.license_expiry_date)
            .bind(changes.phone_number)
            .bind(changes.status)
            .bind(changes.rating)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_constraint(e, "Driver with this license number already exists"))
    }

    async fn list_trucks(&self, filter: &TruckFilter) -> AppResult<Vec<Truck>> {
        let trucks = sqlx::query_as::<_, Truck>(
            r#"SELECT * FROM trucks
            WHERE ($1::truck_status IS NULL OR status = $1)
              AND ($2::BIGINT IS NULL OR driver_id = $2)
            ORDER BY created_at DESC"#,
        )
        .bind(filter.status)
        .bind(filter.driver_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(trucks)
    }

    async fn find_truck(&self, id: i64) -> AppResult<Option<Truck>> {
        let truck = sqlx::query_as::<_, Truck>("SELECT * FROM trucks WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(truck)
    }

    async fn find_truck_by_plate(&self, license_plate: &str) -> AppResult<Option<Truck>> {
        let truck = sqlx::query_as::<_, Truck>("SELECT * FROM trucks WHERE license_plate = $1")
            .bind(license_plate)
            .fetch_optional(&self.pool)
            .await?;
        Ok(truck)
    }

    async fn create_truck(&self, truck: NewTruck) -> AppResult<Truck> {
        sqlx::query_as::<_, Truck>(
            r#"INSERT INTO trucks
                (license_plate, make, model, year, capacity, fuel_type, current_location, driver_id, owner_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *"#,
        )
        .bind(&truck.license_plate)
        .bind(&truck.make)
        .bind(&truck.model)
        .bind(truck.year)
        .bind(truck.capacity)
        .bind(truck.fuel_type)
        .bind(&truck.current_location)
        .bind(truck.driver_id)
        .bind(truck.owner_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_constraint(e, "Truck with this license plate already exists"))
    }

    async fn update_truck(&self, id: i64, changes: TruckChanges) -> AppResult<Option<Truck>> {
        sqlx::query_as::<_, Truck>(
            r#"UPDATE trucks SET
                license_plate = COALESCE($2, license_plate),
                make = COALESCE($3, make),
                model = COALESCE($4, model),
                year = COALESCE($5, year),
                capacity = COALESCE($6, capacity),
                fuel_type = COALESCE($7, fuel_type),
                status = COALESCE($8, status),
                current_location = COALESCE($9, current_location),
                driver_id = CASE WHEN $10::BOOLEAN THEN $11::BIGINT ELSE driver_id END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *"#,
        )
        .bind(id)
        .bind(changes.license_plate)
        .bind(changes.make)
        .bind(changes.model)
        .bind(changes.year)
        .bind(changes.capacity)
        .bind(changes.fuel_type)
        .bind(changes.status)
        .bind(changes.current_location)
        .bind(changes.driver_id.is_some())
        .bind(changes.driver_id.flatten())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_constraint(e, "Truck with this license plate already exists"))
    }

    /// Maintenance rows go with the truck via `ON DELETE CASCADE`.
    async fn delete_truck(&self, id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM trucks WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_maintenance(
        &self,
        filter: &MaintenanceFilter,
        limit: i64,
        offset: i64,
    ) -> AppResult<Page<MaintenanceRecord>> {
        let sql = format!(
            "SELECT {MAINTENANCE_COLUMNS} FROM maintenance_records m JOIN trucks t ON t.id = m.truck_id \
             WHERE {MAINTENANCE_FILTER} \
             ORDER BY m.created_at DESC, m.id DESC LIMIT $5 OFFSET $6"
        );
        let items = sqlx::query_as::<_, MaintenanceRecord>(&sql)
            .bind(filter.owner_id)
            .bind(filter.truck_id)
            .bind(filter.status)
            .bind(filter.priority)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        let sql = format!(
            "SELECT COUNT(*) FROM maintenance_records m JOIN trucks t ON t.id = m.truck_id WHERE {MAINTENANCE_FILTER}"
        );
        let total = sqlx::query_scalar::<_, i64>(&sql)
            .bind(filter.owner_id)
            .bind(filter.truck_id)
            .bind(filter.status)
            .bind(filter.priority)
            .fetch_one(&self.pool)
            .await?;

        Ok(Page { items, total })
    }

    async fn find_maintenance(&self, id: i64) -> AppResult<Option<MaintenanceRecord>> {
        let sql = format!(
            "SELECT {MAINTENANCE_COLUMNS} FROM maintenance_records m JOIN trucks t ON t.id = m.truck_id WHERE m.id = $1"
        );
        let record = sqlx::query_as::<_, MaintenanceRecord>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(record)
    }

    async fn create_maintenance(
        &self,
        record: NewMaintenance,
        truck: Option<TruckServiceChange>,
    ) -> AppResult<MaintenanceRecord> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "WITH m AS (
                INSERT INTO maintenance_records (truck_id, maintenance_type, service_type, description,
                    scheduled_date, cost, service_provider, service_provider_contact, priority, notes)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                RETURNING *
            )
            SELECT {MAINTENANCE_COLUMNS} FROM m JOIN trucks t ON t.id = m.truck_id"
        );
        let created = sqlx::query_as::<_, MaintenanceRecord>(&sql)
            .bind(record.truck_id)
            .bind(&record.maintenance_type)
            .bind(&record.service_type)
            .bind(&record.description)
            .bind(record.scheduled_date)
            .bind(record.cost)
            .bind(&record.service_provider)
            .bind(&record.service_provider_contact)
            .bind(record.priority)
            .bind(&record.notes)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| map_constraint(e, "Maintenance record already exists"))?;

        if let Some(change) = truck {
            service_truck(&mut *tx, created.truck_id, change).await?;
        }

        tx.commit().await?;
        Ok(created)
    }

    async fn update_maintenance(
        &self,
        id: i64,
        changes: MaintenanceChanges,
        truck: Option<TruckServiceChange>,
    ) -> AppResult<Option<MaintenanceRecord>> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "WITH m AS (
                UPDATE maintenance_records SET
                    maintenance_type = COALESCE($2, maintenance_type),
                    service_type = COALESCE($3, service_type),
                    description = COALESCE($4, description),
                    scheduled_date = COALESCE($5, scheduled_date),
                    completed_date = COALESCE($6, completed_date),
                    cost = COALESCE($7, cost),
                    service_provider = COALESCE($8, service_provider),
                    service_provider_contact = COALESCE($9, service_provider_contact),
                    priority = COALESCE($10, priority),
                    status = COALESCE($11, status),
                    notes = COALESCE($12, notes),
                    updated_at = NOW()
                WHERE id = $1
                RETURNING *
            )
            SELECT {MAINTENANCE_COLUMNS} FROM m JOIN trucks t ON t.id = m.truck_id"
        );
        let updated = sqlx::query_as::<_, MaintenanceRecord>(&sql)
            .bind(id)
            .bind(changes.maintenance_type)
            .bind(changes.service_type)
            .bind(changes.description)
            .bind(changes.scheduled_date)
            .bind(changes.completed_date)
            .bind(changes.cost)
            .bind(changes.service_provider)
            .bind(changes.service_provider_contact)
            .bind(changes.priority)
            .bind(changes.status)
            .bind(changes.notes)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(updated) = updated else {
            return Ok(None);
        };
        if let Some(change) = truck {
            service_truck(&mut *tx, updated.truck_id, change).await?;
        }

        tx.commit().await?;
        Ok(Some(updated))
    }

    async fn delete_maintenance(&self, id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM maintenance_records WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_routes(&self, filter: &RouteFilter) -> AppResult<Vec<Route>> {
        let routes = sqlx::query_as::<_, Route>(
            r#"SELECT * FROM routes
            WHERE ($1::route_status IS NULL OR status = $1)
              AND ($2::BIGINT IS NULL OR shipment_id = $2)
            ORDER BY created_at DESC, id DESC"#,
        )
        .bind(filter.status)
        .bind(filter.shipment_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(routes)
    }

    async fn find_route(&self, id: i64) -> AppResult<Option<Route>> {
        let route = sqlx::query_as::<_, Route>("SELECT * FROM routes WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(route)
    }

    async fn latest_route(&self, shipment_id: i64) -> AppResult<Option<Route>> {
        let route = sqlx::query_as::<_, Route>(
            "SELECT * FROM routes WHERE shipment_id = $1 ORDER BY created_at DESC, id DESC LIMIT 1",
        )
        .bind(shipment_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(route)
    }

    async fn create_route(&self, route: NewRoute) -> AppResult<Route> {
        sqlx::query_as::<_, Route>(
            r#"INSERT INTO routes (shipment_id, truck_id, driver_id, status)
            VALUES ($1, $2, $3, $4)
            RETURNING *"#,
        )
        .bind(route.shipment_id)
        .bind(route.truck_id)
        .bind(route.driver_id)
        .bind(route.status)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_constraint(e, "Route already exists"))
    }

    async fn update_route(&self, id: i64, changes: RouteChanges) -> AppResult<Option<Route>> {
        sqlx::query_as::<_, Route>(
            r#"UPDATE routes SET
                truck_id = CASE WHEN $2::BOOLEAN THEN $3::BIGINT ELSE truck_id END,
                driver_id = CASE WHEN $4::BOOLEAN THEN $5::BIGINT ELSE driver_id END,
                status = COALESCE($6, status),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *"#,
        )
        .bind(id)
        .bind(changes.truck_id.is_some())
        .bind(changes.truck_id.flatten())
        .bind(changes.driver_id.is_some())
        .bind(changes.driver_id.flatten())
        .bind(changes.status)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_constraint(e, "Route already exists"))
    }

    async fn has_active_routes(&self, target: RouteRef) -> AppResult<bool> {
        let (column, id) = match target {
            RouteRef::Truck(id) => ("truck_id", id),
            RouteRef::Driver(id) => ("driver_id", id),
            RouteRef::Shipment(id) => ("shipment_id", id),
        };
        let sql = format!("SELECT EXISTS(SELECT 1 FROM routes WHERE {column} = $1 AND {ACTIVE_ROUTE})");
        let exists = sqlx::query_scalar::<_, bool>(&sql)
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn list_shipments(&self, filter: &ShipmentFilter) -> AppResult<Vec<Shipment>> {
        let shipments = sqlx::query_as::<_, Shipment>(
            r#"SELECT * FROM shipments
            WHERE ($1::shipment_status IS NULL OR status = $1)
              AND ($2::BIGINT IS NULL OR customer_id = $2)
              AND ($3::BIGINT IS NULL OR carrier_id = $3)
            ORDER BY created_at DESC, id DESC"#,
        )
        .bind(filter.status)
        .bind(filter.customer_id)
        .bind(filter.carrier_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(shipments)
    }

    async fn find_shipment(&self, id: i64) -> AppResult<Option<Shipment>> {
        let shipment = sqlx::query_as::<_, Shipment>("SELECT * FROM shipments WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(shipment)
    }

    async fn create_shipment(&self, shipment: NewShipment, created_by: i64) -> AppResult<Shipment> {
        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, Shipment>(
            r#"INSERT INTO shipments
                (tracking_number, customer_id, carrier_id, origin_id, destination_id, priority,
                 weight, volume, description, price, scheduled_pickup, scheduled_delivery)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *"#,
        )
        .bind(&shipment.tracking_number)
        .bind(shipment.customer_id)
        .bind(shipment.carrier_id)
        .bind(shipment.origin_id)
        .bind(shipment.destination_id)
        .bind(shipment.priority)
        .bind(shipment.weight)
        .bind(shipment.volume)
        .bind(&shipment.description)
        .bind(shipment.price)
        .bind(shipment.scheduled_pickup)
        .bind(shipment.scheduled_delivery)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_constraint(e, "Tracking number already exists"))?;

        sqlx::query(
            r#"INSERT INTO shipment_tracking (shipment_id, event, status, location_id, notes, updated_by)
            VALUES ($1, $2, $3, $4, $5, $6)"#,
        )
        .bind(created.id)
        .bind(EVENT_CREATED)
        .bind(ShipmentStatus::Pending)
        .bind(created.origin_id)
        .bind("Shipment has been created and is pending confirmation")
        .bind(created_by)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(created)
    }

    async fn update_shipment(&self, id: i64, changes: ShipmentChanges) -> AppResult<Option<Shipment>> {
        apply_shipment_changes(&self.pool, id, changes)
            .await
            .map_err(|e| map_constraint(e, "Shipment conflicts with an existing record"))
    }

    async fn delete_shipment(&self, id: i64) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM routes WHERE shipment_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM shipment_tracking WHERE shipment_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM shipments WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_tracking(&self, shipment_id: i64) -> AppResult<Vec<TrackingEntry>> {
        let entries = sqlx::query_as::<_, TrackingEntry>(
            "SELECT * FROM shipment_tracking WHERE shipment_id = $1 ORDER BY recorded_at DESC, id DESC",
        )
        .bind(shipment_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }

    async fn record_tracking(&self, entry: NewTrackingEntry, changes: ShipmentChanges) -> AppResult<TrackingEntry> {
        let mut tx = self.pool.begin().await?;

        let recorded = sqlx::query_as::<_, TrackingEntry>(
            r#"INSERT INTO shipment_tracking
                (shipment_id, event, status, location_id, latitude, longitude, notes, updated_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *"#,
        )
        .bind(entry.shipment_id)
        .bind(&entry.event)
        .bind(entry.status)
        .bind(entry.location_id)
        .bind(entry.latitude)
        .bind(entry.longitude)
        .bind(&entry.notes)
        .bind(entry.updated_by)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_constraint(e, "Tracking entry conflicts with an existing record"))?;

        apply_shipment_changes(&mut *tx, entry.shipment_id, changes).await?;

        tx.commit().await?;
        Ok(recorded)
    }

    async fn list_invoices(&self, filter: &InvoiceFilter, limit: i64, offset: i64) -> AppResult<Page<Invoice>> {
        let items = sqlx::query_as::<_, Invoice>(
            r#"SELECT * FROM invoices
            WHERE ($1::BIGINT IS NULL OR user_id = $1)
              AND ($2::invoice_status IS NULL OR status = $2)
            ORDER BY created_at DESC, id DESC
            LIMIT $3 OFFSET $4"#,
        )
        .bind(filter.user_id)
        .bind(filter.status)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(
            r#"SELECT COUNT(*) FROM invoices
            WHERE ($1::BIGINT IS NULL OR user_id = $1)
              AND ($2::invoice_status IS NULL OR status = $2)"#,
        )
        .bind(filter.user_id)
        .bind(filter.status)
        .fetch_one(&self.pool)
        .await?;

        Ok(Page { items, total })
    }

    async fn find_invoice(&self, id: i64) -> AppResult<Option<Invoice>> {
        let invoice = sqlx::query_as::<_, Invoice>("SELECT * FROM invoices WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(invoice)
    }

    async fn find_invoice_by_shipment(&self, shipment_id: i64) -> AppResult<Option<Invoice>> {
        let invoice = sqlx::query_as::<_, Invoice>("SELECT * FROM invoices WHERE shipment_id = $1")
            .bind(shipment_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(invoice)
    }

    async fn find_invoice_by_number(&self, invoice_number: &str) -> AppResult<Option<Invoice>> {
        let invoice = sqlx::query_as::<_, Invoice>("SELECT * FROM invoices WHERE invoice_number = $1")
            .bind(invoice_number)
            .fetch_optional(&self.pool)
            .await?;
        Ok(invoice)
    }

    async fn create_invoice(&self, invoice: NewInvoice) -> AppResult<Invoice> {
        sqlx::query_as::<_, Invoice>(
            r#"INSERT INTO invoices (invoice_number, shipment_id, user_id, amount, currency, due_date)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *"#,
        )
        .bind(&invoice.invoice_number)
        .bind(invoice.shipment_id)
        .bind(invoice.user_id)
        .bind(invoice.amount)
        .bind(&invoice.currency)
        .bind(invoice.due_date)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_constraint(e, "Invoice already exists"))
    }

    async fn update_invoice(&self, id: i64, changes: InvoiceChanges) -> AppResult<Option<Invoice>> {
        let invoice = sqlx::query_as::<_, Invoice>(
            r#"UPDATE invoices SET
                amount = COALESCE($2, amount),
                currency = COALESCE($3, currency),
                due_date = COALESCE($4, due_date),
                status = COALESCE($5, status),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *"#,
        )
        .bind(id)
        .bind(changes.amount)
        .bind(changes.currency)
        .bind(changes.due_date)
        .bind(changes.status)
        .fetch_optional(&self.pool)
        .await?;
        Ok(invoice)
    }

    async fn list_transactions(
        &self,
        filter: &TransactionFilter,
        limit: i64,
        offset: i64,
    ) -> AppResult<Page<Transaction>> {
        let sql = format!(
            "SELECT * FROM transactions WHERE {TRANSACTION_FILTER} ORDER BY created_at DESC, id DESC LIMIT $5 OFFSET $6"
        );
        let items = sqlx::query_as::<_, Transaction>(&sql)
            .bind(filter.user_id)
            .bind(filter.invoice_id)
            .bind(filter.kind)
            .bind(filter.status)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        let sql = format!("SELECT COUNT(*) FROM transactions WHERE {TRANSACTION_FILTER}");
        let total = sqlx::query_scalar::<_, i64>(&sql)
            .bind(filter.user_id)
            .bind(filter.invoice_id)
            .bind(filter.kind)
            .bind(filter.status)
            .fetch_one(&self.pool)
            .await?;

        Ok(Page { items, total })
    }

    async fn record_transaction(&self, transaction: NewTransaction) -> AppResult<Transaction> {
        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, Transaction>(
            r#"INSERT INTO transactions (invoice_id, user_id, amount, currency, kind, status, reference, description)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *"#,
        )
        .bind(transaction.invoice_id)
        .bind(transaction.user_id)
        .bind(transaction.amount)
        .bind(&transaction.currency)
        .bind(transaction.kind)
        .bind(transaction.status)
        .bind(&transaction.reference)
        .bind(&transaction.description)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_constraint(e, "Transaction already exists"))?;

        if let Some(invoice_id) = created.invoice_id {
            sqlx::query(
                r#"UPDATE invoices SET status = 'PAID', updated_at = NOW()
                WHERE id = $1
                  AND status IN ('PENDING', 'OVERDUE')
                  AND amount <= (
                      SELECT COALESCE(SUM(amount), 0) FROM transactions
                      WHERE invoice_id = $1 AND kind = 'PAYMENT' AND status = 'COMPLETED'
                  )"#,
            )
            .bind(invoice_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(created)
    }
}
