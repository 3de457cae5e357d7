/*!
    Cached vehicle state and the event stream surfaced to the host.

    The cache exists so the command engine can answer "is the vehicle
    asleep" without a round trip; everything else is passed upward as
    events for the host to consume at its own pace.
*/

use tesla_ble_proto::carserver::{ChargeState, ChargingState, ClimateState, DriveState};
use tesla_ble_proto::universal::Domain;
use tesla_ble_proto::vcsec::{UserPresence, VehicleLockState, VehicleSleepStatus, VehicleStatus};

use crate::command::CommandHandle;
use crate::error::CommandFailure;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SleepState {
    #[default]
    Unknown,
    Awake,
    Asleep,
}

/// Charge data as reported by the car server, fields absent when the
/// vehicle did not include them.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChargeSummary {
    pub battery_level: Option<f32>,
    pub battery_range: Option<f32>,
    pub charging_state: Option<ChargingState>,
    pub charge_limit_soc: Option<i32>,
    pub charging_amps: Option<i32>,
    pub charger_actual_current: Option<i32>,
    pub charger_power: Option<i32>,
    pub minutes_to_full_charge: Option<i32>,
    pub charge_port_door_open: Option<bool>,
}

impl From<&ChargeState> for ChargeSummary {
    fn from(cs: &ChargeState) -> Self {
        Self {
            battery_level: cs.battery_level,
            battery_range: cs.battery_range,
            charging_state: cs
                .charging_state
                .and_then(|raw| ChargingState::try_from(raw).ok()),
            charge_limit_soc: cs.charge_limit_soc,
            charging_amps: cs.charging_amps,
            charger_actual_current: cs.charger_actual_current,
            charger_power: cs.charger_power,
            minutes_to_full_charge: cs.minutes_to_full_charge,
            charge_port_door_open: cs.charge_port_door_open,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClimateSummary {
    pub inside_temp_celsius: Option<f32>,
    pub outside_temp_celsius: Option<f32>,
    pub is_climate_on: Option<bool>,
    pub driver_temp_setting: Option<f32>,
}

impl From<&ClimateState> for ClimateSummary {
    fn from(cs: &ClimateState) -> Self {
        Self {
            inside_temp_celsius: cs.inside_temp_celsius,
            outside_temp_celsius: cs.outside_temp_celsius,
            is_climate_on: cs.is_climate_on,
            driver_temp_setting: cs.driver_temp_setting,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DriveSummary {
    pub speed: Option<f32>,
    pub power: Option<i32>,
    pub odometer_in_hundredths_of_a_mile: Option<f32>,
}

impl From<&DriveState> for DriveSummary {
    fn from(ds: &DriveState) -> Self {
        Self {
            speed: ds.speed,
            power: ds.power,
            odometer_in_hundredths_of_a_mile: ds.odometer_in_hundredths_of_a_mile,
        }
    }
}

/**
    Notifications surfaced to the host. Command events are delivered exactly
    once per enqueued command.
*/
#[derive(Debug, Clone, PartialEq)]
pub enum VehicleEvent {
    VehicleStatus {
        sleep_status: VehicleSleepStatus,
        lock_state: VehicleLockState,
        user_presence: UserPresence,
    },
    ChargeState(ChargeSummary),
    ClimateState(ClimateSummary),
    DriveState(DriveSummary),
    SessionEstablished {
        domain: Domain,
    },
    /// The whitelist-add message went out; the user must tap their key
    /// card on the center console for the vehicle to accept it.
    PairingRequestSent,
    CommandCompleted {
        handle: CommandHandle,
    },
    CommandFailed {
        handle: CommandHandle,
        failure: CommandFailure,
    },
}

#[derive(Debug, Default)]
pub struct VehicleStateCache {
    sleep: SleepState,
    lock_state: Option<VehicleLockState>,
    user_presence: Option<UserPresence>,
    charge: Option<ChargeSummary>,
}

impl VehicleStateCache {
    /// Only a positively reported ASLEEP counts; unknown is treated as
    /// awake so commands are not held hostage to a missing status.
    pub fn is_asleep(&self) -> bool {
        self.sleep == SleepState::Asleep
    }

    pub fn sleep(&self) -> SleepState {
        self.sleep
    }

    pub fn lock_state(&self) -> Option<VehicleLockState> {
        self.lock_state
    }

    pub fn charge(&self) -> Option<&ChargeSummary> {
        self.charge.as_ref()
    }

    pub fn mark_awake(&mut self) {
        self.sleep = SleepState::Awake;
    }

    /**
        Fold in a VCSEC vehicle status and return the event to emit.
        Detailed closure data implies the vehicle is awake even when the
        sleep field lags behind.
    */
    pub fn apply_vehicle_status(&mut self, status: &VehicleStatus) -> VehicleEvent {
        let sleep_status = VehicleSleepStatus::try_from(status.vehicle_sleep_status)
            .unwrap_or(VehicleSleepStatus::Unknown);
        self.sleep = match sleep_status {
            VehicleSleepStatus::Awake => SleepState::Awake,
            VehicleSleepStatus::Asleep => SleepState::Asleep,
            VehicleSleepStatus::Unknown if status.closure_statuses.is_some() => SleepState::Awake,
            VehicleSleepStatus::Unknown => self.sleep,
        };

        let lock_state = VehicleLockState::try_from(status.vehicle_lock_state)
            .unwrap_or(VehicleLockState::Unlocked);
        let user_presence =
            UserPresence::try_from(status.user_presence).unwrap_or(UserPresence::Unknown);
        self.lock_state = Some(lock_state);
        self.user_presence = Some(user_presence);

        VehicleEvent::VehicleStatus {
            sleep_status,
            lock_state,
            user_presence,
        }
    }

    pub fn apply_charge_state(&mut self, cs: &ChargeState) -> VehicleEvent {
        let summary = ChargeSummary::from(cs);
        self.charge = Some(summary.clone());
        VehicleEvent::ChargeState(summary)
    }

    /// Forget live state on disconnect; the vehicle may change while we
    /// are not listening.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
