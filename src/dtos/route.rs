use serde::Deserialize;
use validator::Validate;

use super::double_option;
use crate::models::route::RouteStatus;

#[derive(Deserialize, Validate)]
pub struct CreateRouteRequest {
    pub shipment_id: i64,
    pub truck_id: Option<i64>,
    pub driver_id: Option<i64>,
    pub status: Option<RouteStatus>,
}

#[derive(Deserialize, Validate)]
pub struct UpdateRouteRequest {
    #[serde(default, deserialize_with = "double_option")]
    pub truck_id: Option<Option<i64>>,
    #[serde(default, deserialize_with = "double_option")]
    pub driver_id: Option<Option<i64>>,
    pub status: Option<RouteStatus>,
}

#[derive(Deserialize)]
pub struct RouteQuery {
    pub status: Option<RouteStatus>,
    pub shipment_id: Option<i64>,
}
