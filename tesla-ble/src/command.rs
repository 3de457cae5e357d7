use tesla_ble_proto::keys::Role;
use tesla_ble_proto::universal::Domain;

/**
    Milliseconds elapsed between two host timestamps, treating `now < then`
    as a wraparound that just happened.
*/
pub fn time_since(now_ms: u32, then_ms: u32) -> u32 {
    now_ms.wrapping_sub(then_ms)
}

/// Opaque ticket identifying an enqueued command in completion events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandHandle(pub u64);

impl std::fmt::Display for CommandHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/**
    Which state blocks an infotainment data poll asks for.
*/
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DataRequest {
    pub charge_state: bool,
    pub climate_state: bool,
    pub drive_state: bool,
    pub closures_state: bool,
}

impl DataRequest {
    pub const CHARGE: Self = Self {
        charge_state: true,
        climate_state: false,
        drive_state: false,
        closures_state: false,
    };

    pub const ALL: Self = Self {
        charge_state: true,
        climate_state: true,
        drive_state: true,
        closures_state: true,
    };

    pub fn is_empty(&self) -> bool {
        !(self.charge_state || self.climate_state || self.drive_state || self.closures_state)
    }
}

/**
    What a queued command will do once its session prerequisites hold.
*/
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandKind {
    WakeVehicle,
    VcsecStatusPoll,
    InfotainmentPoll(DataRequest),
    SetChargingEnabled(bool),
    SetChargingAmps(i32),
    SetChargingLimit(i32),
    UnlockChargePort,
    StartPairing(Role),
}

impl CommandKind {
    /// The security domain whose session this command needs.
    pub fn domain(&self) -> Domain {
        match self {
            CommandKind::WakeVehicle | CommandKind::VcsecStatusPoll => Domain::VehicleSecurity,
            CommandKind::InfotainmentPoll(_)
            | CommandKind::SetChargingEnabled(_)
            | CommandKind::SetChargingAmps(_)
            | CommandKind::SetChargingLimit(_)
            | CommandKind::UnlockChargePort => Domain::Infotainment,
            // The whitelist add is accepted without any session; the card
            // tap is the authentication.
            CommandKind::StartPairing(_) => Domain::Broadcast,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            CommandKind::WakeVehicle => "wake vehicle",
            CommandKind::VcsecStatusPoll => "VCSEC status poll",
            CommandKind::InfotainmentPoll(_) => "infotainment data poll",
            CommandKind::SetChargingEnabled(true) => "start charging",
            CommandKind::SetChargingEnabled(false) => "stop charging",
            CommandKind::SetChargingAmps(_) => "set charging amps",
            CommandKind::SetChargingLimit(_) => "set charging limit",
            CommandKind::UnlockChargePort => "unlock charge port",
            CommandKind::StartPairing(_) => "start pairing",
        }
    }
}

/**
    Head-of-queue lifecycle states. Only the head command advances, which
    keeps counter assignment in transmit order.
*/
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandState {
    Idle,
    AwaitingVcsecAuth,
    AwaitingVcsecAuthResponse,
    AwaitingInfotainmentAuth,
    AwaitingInfotainmentAuthResponse,
    AwaitingWake,
    AwaitingWakeResponse,
    Ready,
    AwaitingResponse,
}

#[derive(Debug, Clone)]
pub struct Command {
    pub handle: CommandHandle,
    pub kind: CommandKind,
    pub domain: Domain,
    pub state: CommandState,
    /// Set when the command first reaches the head of the queue.
    pub started_at_ms: u32,
    pub last_tx_at_ms: u32,
    pub retry_count: u32,
    pub started: bool,
}

impl Command {
    pub fn new(handle: CommandHandle, kind: CommandKind) -> Self {
        let domain = kind.domain();
        Self {
            handle,
            kind,
            domain,
            state: CommandState::Idle,
            started_at_ms: 0,
            last_tx_at_ms: 0,
            retry_count: 0,
            started: false,
        }
    }

    /// Wake commands complete on a vehicle-status update instead of a
    /// command status.
    pub fn is_wake(&self) -> bool {
        matches!(self.kind, CommandKind::WakeVehicle)
    }
}
