//! `car_server.proto`: infotainment (car-server) actions, data requests,
//! and response payloads. Trimmed to the charging/climate/drive surface.

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Void {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Action {
    #[prost(oneof = "action::ActionMsg", tags = "2")]
    pub action_msg: Option<action::ActionMsg>,
}

pub mod action {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum ActionMsg {
        #[prost(message, tag = "2")]
        VehicleAction(super::VehicleAction),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct VehicleAction {
    #[prost(
        oneof = "vehicle_action::VehicleActionMsg",
        tags = "1, 5, 6, 18, 40, 41"
    )]
    pub vehicle_action_msg: Option<vehicle_action::VehicleActionMsg>,
}

pub mod vehicle_action {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum VehicleActionMsg {
        #[prost(message, tag = "1")]
        GetVehicleData(super::GetVehicleData),
        #[prost(message, tag = "5")]
        ChargingSetLimitAction(super::ChargingSetLimitAction),
        #[prost(message, tag = "6")]
        ChargingStartStopAction(super::ChargingStartStopAction),
        #[prost(message, tag = "18")]
        SetChargingAmpsAction(super::SetChargingAmpsAction),
        #[prost(message, tag = "40")]
        ChargePortDoorOpen(super::ChargePortDoorOpen),
        #[prost(message, tag = "41")]
        ChargePortDoorClose(super::ChargePortDoorClose),
    }
}

/**
    Selects which state blocks the vehicle should return. Each present
    (empty) sub-message requests the corresponding block.
*/
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetVehicleData {
    #[prost(message, optional, tag = "2")]
    pub get_charge_state: Option<Void>,
    #[prost(message, optional, tag = "3")]
    pub get_climate_state: Option<Void>,
    #[prost(message, optional, tag = "4")]
    pub get_drive_state: Option<Void>,
    #[prost(message, optional, tag = "7")]
    pub get_closures_state: Option<Void>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ChargingSetLimitAction {
    #[prost(int32, tag = "1")]
    pub percent: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ChargingStartStopAction {
    #[prost(oneof = "charging_start_stop_action::ChargingAction", tags = "2, 3")]
    pub charging_action: Option<charging_start_stop_action::ChargingAction>,
}

pub mod charging_start_stop_action {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum ChargingAction {
        #[prost(message, tag = "2")]
        Start(super::Void),
        #[prost(message, tag = "3")]
        Stop(super::Void),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SetChargingAmpsAction {
    #[prost(int32, tag = "1")]
    pub charging_amps: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ChargePortDoorOpen {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ChargePortDoorClose {}

// ── Responses ─────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum OperationStatus {
    Ok = 0,
    Error = 1,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ResultReason {
    #[prost(oneof = "result_reason::Reason", tags = "1")]
    pub reason: Option<result_reason::Reason>,
}

pub mod result_reason {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Reason {
        #[prost(string, tag = "1")]
        PlainText(String),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ActionStatus {
    #[prost(enumeration = "OperationStatus", tag = "1")]
    pub result: i32,
    #[prost(message, optional, tag = "2")]
    pub result_reason: Option<ResultReason>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Response {
    #[prost(message, optional, tag = "1")]
    pub action_status: Option<ActionStatus>,
    #[prost(oneof = "response::ResponseMsg", tags = "2")]
    pub response_msg: Option<response::ResponseMsg>,
}

pub mod response {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum ResponseMsg {
        #[prost(message, tag = "2")]
        VehicleData(super::VehicleData),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct VehicleData {
    #[prost(message, optional, tag = "3")]
    pub charge_state: Option<ChargeState>,
    #[prost(message, optional, tag = "4")]
    pub climate_state: Option<ClimateState>,
    #[prost(message, optional, tag = "5")]
    pub drive_state: Option<DriveState>,
    #[prost(message, optional, tag = "6")]
    pub closures_state: Option<ClosuresState>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum ChargingState {
    Unknown = 0,
    Disconnected = 1,
    NoPower = 2,
    Starting = 3,
    Charging = 4,
    Complete = 5,
    Stopped = 6,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ChargeState {
    #[prost(float, optional, tag = "1")]
    pub battery_level: Option<f32>,
    #[prost(float, optional, tag = "2")]
    pub battery_range: Option<f32>,
    #[prost(enumeration = "ChargingState", optional, tag = "3")]
    pub charging_state: Option<i32>,
    #[prost(int32, optional, tag = "4")]
    pub charge_limit_soc: Option<i32>,
    #[prost(int32, optional, tag = "5")]
    pub charging_amps: Option<i32>,
    #[prost(int32, optional, tag = "6")]
    pub charger_actual_current: Option<i32>,
    #[prost(int32, optional, tag = "7")]
    pub charger_power: Option<i32>,
    #[prost(int32, optional, tag = "8")]
    pub minutes_to_full_charge: Option<i32>,
    #[prost(bool, optional, tag = "9")]
    pub charge_port_door_open: Option<bool>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ClimateState {
    #[prost(float, optional, tag = "1")]
    pub inside_temp_celsius: Option<f32>,
    #[prost(float, optional, tag = "2")]
    pub outside_temp_celsius: Option<f32>,
    #[prost(bool, optional, tag = "3")]
    pub is_climate_on: Option<bool>,
    #[prost(float, optional, tag = "4")]
    pub driver_temp_setting: Option<f32>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DriveState {
    #[prost(float, optional, tag = "1")]
    pub speed: Option<f32>,
    #[prost(int32, optional, tag = "2")]
    pub power: Option<i32>,
    #[prost(float, optional, tag = "3")]
    pub odometer_in_hundredths_of_a_mile: Option<f32>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ClosuresState {
    #[prost(bool, optional, tag = "1")]
    pub locked: Option<bool>,
    #[prost(bool, optional, tag = "2")]
    pub is_front_trunk_open: Option<bool>,
    #[prost(bool, optional, tag = "3")]
    pub is_rear_trunk_open: Option<bool>,
}
