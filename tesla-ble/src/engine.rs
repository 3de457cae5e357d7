/*!
    The single-threaded engine driving the whole client.

    `Vehicle` owns the identity, the per-domain sessions, the BLE framer,
    and a FIFO of commands of which only the head advances. The host wires
    it to a transport with three calls: `on_bytes_received` for notify
    payloads, `take_next_chunk` to drain writes, and `tick` from its main
    loop with a monotonic millisecond clock. Nothing here blocks and no
    wall clock is read.
*/

use std::collections::VecDeque;

use tracing::{debug, info, trace, warn};

use tesla_ble_proto::universal::{
    Domain, MessageFault, OperationStatus, RoutableMessage, routable_message,
};
use tesla_ble_proto::{carserver, keys, vcsec};

use crate::codec;
use crate::command::{Command, CommandHandle, CommandKind, CommandState, DataRequest, time_since};
use crate::constants::{
    COMMAND_TIMEOUT_MS, MAX_CHARGING_AMPS, MAX_CHARGING_LIMIT, MAX_LATENCY_MS, MAX_QUEUE_SIZE,
    MAX_RETRIES, MIN_CHARGING_AMPS, MIN_CHARGING_LIMIT, STORAGE_KEY_PRIVATE_KEY,
    STORAGE_KEY_SESSION_INFOTAINMENT, STORAGE_KEY_SESSION_VCSEC,
};
use crate::error::{ClientResult, CommandFailure, CryptoError, ProtocolError};
use crate::framing::Framer;
use crate::identity::{LocalIdentity, vin_advertisement_name};
use crate::session::SessionRegistry;
use crate::state::{VehicleEvent, VehicleStateCache};
use crate::storage::Storage;

fn storage_key_for(domain: Domain) -> Option<&'static str> {
    match domain {
        Domain::VehicleSecurity => Some(STORAGE_KEY_SESSION_VCSEC),
        Domain::Infotainment => Some(STORAGE_KEY_SESSION_INFOTAINMENT),
        Domain::Broadcast => None,
    }
}

pub struct Vehicle<S: Storage> {
    identity: LocalIdentity,
    sessions: SessionRegistry,
    framer: Framer,
    queue: VecDeque<Command>,
    responses: VecDeque<RoutableMessage>,
    events: VecDeque<VehicleEvent>,
    state: VehicleStateCache,
    storage: S,
    vin: Option<String>,
    connected: bool,
    next_handle: u64,
    /// Request uuid of the last transmitted request; mismatched responses
    /// are stale and dropped.
    pending_uuid: Option<[u8; 16]>,
}

impl<S: Storage> Vehicle<S> {
    /**
        Construct the engine, restoring the private key and any stored
        sessions. A missing or unreadable key is replaced with a fresh one
        and persisted immediately.
    */
    pub fn new(mut storage: S) -> Self {
        let identity = match storage
            .load(STORAGE_KEY_PRIVATE_KEY)
            .and_then(|bytes| String::from_utf8(bytes).ok())
            .and_then(|pem| LocalIdentity::from_pem(&pem).ok())
        {
            Some(identity) => {
                debug!(key_id = %hex::encode(identity.key_id()), "loaded private key");
                identity
            }
            None => {
                info!("no usable private key in storage, generating a new one");
                let identity = LocalIdentity::generate();
                match identity.to_pem() {
                    Ok(pem) => storage.save(STORAGE_KEY_PRIVATE_KEY, pem.as_bytes()),
                    Err(e) => warn!(error = %e, "could not persist new private key"),
                }
                identity
            }
        };

        let mut sessions = SessionRegistry::new();
        for domain in [Domain::VehicleSecurity, Domain::Infotainment] {
            let Some(key) = storage_key_for(domain) else {
                continue;
            };
            let Some(bytes) = storage.load(key) else {
                continue;
            };
            match codec::parse_session_info(&bytes) {
                Ok(info) => {
                    match sessions.apply_session_info(domain, identity.secret(), &info, 0) {
                        Ok(_) => debug!(?domain, "restored stored session"),
                        Err(e) => warn!(?domain, error = %e, "stored session unusable"),
                    }
                }
                Err(e) => warn!(?domain, error = %e, "stored session info corrupt"),
            }
        }

        Self {
            identity,
            sessions,
            framer: Framer::new(),
            queue: VecDeque::new(),
            responses: VecDeque::new(),
            events: VecDeque::new(),
            state: VehicleStateCache::default(),
            storage,
            vin: None,
            connected: false,
            next_handle: 0,
            pending_uuid: None,
        }
    }

    // ── Configuration and introspection ───────────────────────────────

    pub fn set_vin(&mut self, vin: &str) {
        self.vin = Some(vin.to_owned());
    }

    /// BLE local name the configured vehicle advertises.
    pub fn advertisement_name(&self) -> Option<String> {
        self.vin.as_deref().map(vin_advertisement_name)
    }

    pub fn identity(&self) -> &LocalIdentity {
        &self.identity
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn state(&self) -> &VehicleStateCache {
        &self.state
    }

    pub fn queued_commands(&self) -> usize {
        self.queue.len()
    }

    /**
        Throw away both sessions and the stored key material, then start
        over with a fresh keypair. The vehicle must be re-paired.
    */
    pub fn regenerate_key(&mut self) {
        info!("regenerating private key");
        self.sessions.invalidate(Domain::VehicleSecurity);
        self.sessions.invalidate(Domain::Infotainment);
        self.storage.remove(STORAGE_KEY_SESSION_VCSEC);
        self.storage.remove(STORAGE_KEY_SESSION_INFOTAINMENT);

        let identity = LocalIdentity::generate();
        match identity.to_pem() {
            Ok(pem) => self.storage.save(STORAGE_KEY_PRIVATE_KEY, pem.as_bytes()),
            Err(e) => warn!(error = %e, "could not persist regenerated key"),
        }
        self.identity = identity;
    }

    // ── Command API ───────────────────────────────────────────────────

    pub fn wake_vehicle(&mut self) -> Result<CommandHandle, CommandFailure> {
        self.enqueue(CommandKind::WakeVehicle)
    }

    pub fn poll_vcsec_status(&mut self) -> Result<CommandHandle, CommandFailure> {
        self.enqueue(CommandKind::VcsecStatusPoll)
    }

    pub fn poll_infotainment(
        &mut self,
        request: DataRequest,
    ) -> Result<CommandHandle, CommandFailure> {
        if request.is_empty() {
            return Err(CommandFailure::InvalidParameter("empty data request"));
        }
        self.enqueue(CommandKind::InfotainmentPoll(request))
    }

    pub fn set_charging_enabled(&mut self, enable: bool) -> Result<CommandHandle, CommandFailure> {
        self.enqueue(CommandKind::SetChargingEnabled(enable))
    }

    pub fn set_charging_amps(&mut self, amps: i32) -> Result<CommandHandle, CommandFailure> {
        if !(MIN_CHARGING_AMPS..=MAX_CHARGING_AMPS).contains(&amps) {
            return Err(CommandFailure::InvalidParameter("charging amps"));
        }
        self.enqueue(CommandKind::SetChargingAmps(amps))
    }

    pub fn set_charging_limit(&mut self, percent: i32) -> Result<CommandHandle, CommandFailure> {
        if !(MIN_CHARGING_LIMIT..=MAX_CHARGING_LIMIT).contains(&percent) {
            return Err(CommandFailure::InvalidParameter("charging limit"));
        }
        self.enqueue(CommandKind::SetChargingLimit(percent))
    }

    pub fn unlock_charge_port(&mut self) -> Result<CommandHandle, CommandFailure> {
        self.enqueue(CommandKind::UnlockChargePort)
    }

    pub fn start_pairing(&mut self, role: keys::Role) -> Result<CommandHandle, CommandFailure> {
        self.enqueue(CommandKind::StartPairing(role))
    }

    fn enqueue(&mut self, kind: CommandKind) -> Result<CommandHandle, CommandFailure> {
        if self.queue.len() >= MAX_QUEUE_SIZE {
            warn!(name = kind.name(), "command queue full, rejecting");
            return Err(CommandFailure::QueueFull);
        }
        if kind.domain() != Domain::Broadcast && self.vin.is_none() {
            return Err(CommandFailure::InvalidParameter("VIN not configured"));
        }

        self.next_handle += 1;
        let handle = CommandHandle(self.next_handle);
        debug!(name = kind.name(), %handle, "command enqueued");
        self.queue.push_back(Command::new(handle, kind));
        Ok(handle)
    }

    /// Fail every queued command and drop pending writes.
    pub fn cancel_all(&mut self) {
        while let Some(cmd) = self.queue.pop_front() {
            self.events.push_back(VehicleEvent::CommandFailed {
                handle: cmd.handle,
                failure: CommandFailure::Cancelled,
            });
        }
        self.pending_uuid = None;
        self.framer.clear();
    }

    // ── Transport hooks ───────────────────────────────────────────────

    pub fn on_connected(&mut self) {
        debug!("transport connected");
        self.connected = true;
    }

    /**
        Transport gone: in-flight commands can never resolve, so they fail
        now. Sessions survive; the vehicle has not forgotten us.
    */
    pub fn on_disconnected(&mut self) {
        debug!("transport disconnected");
        self.connected = false;
        self.cancel_all();
        self.responses.clear();
        self.state.reset();
    }

    pub fn on_bytes_received(&mut self, chunk: &[u8], now_ms: u32) {
        if let Some(message) = self.framer.push_chunk(chunk, now_ms) {
            match codec::parse_routable_message(&message) {
                Ok(parsed) => {
                    trace!(len = message.len(), "message reassembled");
                    self.responses.push_back(parsed);
                }
                Err(e) => warn!(error = %e, "dropping undecodable message"),
            }
        }
    }

    /// One ≤20-byte chunk for the transport to write, if any is queued.
    pub fn take_next_chunk(&mut self) -> Option<Vec<u8>> {
        self.framer.take_next_chunk()
    }

    pub fn poll_event(&mut self) -> Option<VehicleEvent> {
        self.events.pop_front()
    }

    /**
        Drive the engine: dispatch one queued response, then advance the
        head command's state machine against the supplied clock. Commands
        wait in the queue while the transport is down.
    */
    pub fn tick(&mut self, now_ms: u32) {
        if let Some(message) = self.responses.pop_front() {
            self.handle_response(&message, now_ms);
        }
        if self.connected {
            self.process_queue(now_ms);
        }
    }

    // ── Inbound dispatch ──────────────────────────────────────────────

    fn handle_response(&mut self, message: &RoutableMessage, now_ms: u32) {
        if !codec::validate_response(message) {
            trace!("dropping structurally invalid message");
            return;
        }
        let Some(from) = message
            .from_destination
            .as_ref()
            .and_then(|d| d.as_domain())
        else {
            trace!("dropping message from non-domain source");
            return;
        };

        if message.request_uuid.len() == 16
            && let Some(pending) = &self.pending_uuid
            && message.request_uuid != pending
        {
            trace!("dropping response for a request no longer in flight");
            return;
        }

        if let Some(routable_message::Payload::SessionInfo(bytes)) = &message.payload {
            self.handle_session_info(from, bytes, now_ms);
            return;
        }

        if let Some(status) = &message.signed_message_status
            && status.operation_status == OperationStatus::Error as i32
        {
            let fault = MessageFault::try_from(status.signed_message_fault)
                .unwrap_or(MessageFault::None);
            warn!(?from, ?fault, "vehicle rejected the signed message");
            // Stale counters or epochs are unrecoverable without a fresh
            // handshake; the next command re-authenticates.
            self.sessions.invalidate(from);
            self.fail_head_if(
                |cmd| cmd.state != CommandState::Idle,
                CommandFailure::VehicleFault(fault),
            );
            return;
        }

        match from {
            Domain::VehicleSecurity => self.handle_vcsec_response(message, now_ms),
            Domain::Infotainment => self.handle_infotainment_response(message, now_ms),
            Domain::Broadcast => trace!("ignoring broadcast-sourced message"),
        }
    }

    fn handle_session_info(&mut self, domain: Domain, bytes: &[u8], now_ms: u32) {
        let info = match codec::parse_session_info(bytes) {
            Ok(info) => info,
            Err(e) => {
                warn!(?domain, error = %e, "undecodable session info");
                self.finish_auth(domain, Err(CommandFailure::AuthenticationFailed), now_ms);
                return;
            }
        };

        if info.status() == tesla_ble_proto::signatures::SessionInfoStatus::KeyNotOnWhitelist {
            warn!(?domain, "vehicle does not know this key, pair it first");
            self.finish_auth(domain, Err(CommandFailure::KeyNotOnWhitelist), now_ms);
            return;
        }

        match self
            .sessions
            .apply_session_info(domain, self.identity.secret(), &info, now_ms)
        {
            Ok(_) => {
                if let Some(key) = storage_key_for(domain) {
                    self.storage.save(key, bytes);
                }
                self.events
                    .push_back(VehicleEvent::SessionEstablished { domain });
                self.finish_auth(domain, Ok(()), now_ms);
            }
            Err(e) => {
                warn!(?domain, error = %e, "session info not applied");
                self.finish_auth(domain, Err(CommandFailure::AuthenticationFailed), now_ms);
            }
        }
    }

    /// Route an accepted or failed handshake into the head command's FSM.
    fn finish_auth(
        &mut self,
        domain: Domain,
        result: Result<(), CommandFailure>,
        now_ms: u32,
    ) {
        let Some(head) = self.queue.front_mut() else {
            return;
        };
        let waiting_on = match head.state {
            CommandState::AwaitingVcsecAuth | CommandState::AwaitingVcsecAuthResponse => {
                Domain::VehicleSecurity
            }
            CommandState::AwaitingInfotainmentAuth
            | CommandState::AwaitingInfotainmentAuthResponse => Domain::Infotainment,
            _ => return,
        };
        if waiting_on != domain {
            return;
        }

        match result {
            Ok(()) => {
                head.state = match (domain, head.domain) {
                    (Domain::VehicleSecurity, Domain::Infotainment) => {
                        CommandState::AwaitingInfotainmentAuth
                    }
                    _ => CommandState::Ready,
                };
                head.last_tx_at_ms = fire_immediately(now_ms);
                debug!(name = head.kind.name(), ?domain, "authentication complete");
            }
            Err(failure) => self.fail_head(failure),
        }
    }

    fn handle_vcsec_response(&mut self, message: &RoutableMessage, now_ms: u32) {
        let vin = self.vin.clone().unwrap_or_default();
        let payload = match codec::decrypt_response_payload(
            &self.sessions,
            &vin,
            Domain::VehicleSecurity,
            message,
        ) {
            Ok(payload) => payload,
            Err(e) => {
                self.handle_decrypt_failure(Domain::VehicleSecurity, e);
                return;
            }
        };

        if payload.is_empty() {
            // Ack-only reply.
            self.complete_head_if(
                |cmd| {
                    cmd.domain == Domain::VehicleSecurity
                        && cmd.state == CommandState::AwaitingResponse
                },
                now_ms,
            );
            return;
        }

        let parsed = match codec::parse_from_vcsec(&payload) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(error = %e, "undecodable VCSEC payload");
                return;
            }
        };

        use vcsec::from_vcsec_message::SubMessage;
        match parsed.sub_message {
            Some(SubMessage::VehicleStatus(status)) => {
                let event = self.state.apply_vehicle_status(&status);
                self.events.push_back(event);
                self.advance_on_vehicle_status(now_ms);
            }
            Some(SubMessage::CommandStatus(status)) => {
                match vcsec::OperationStatus::try_from(status.operation_status) {
                    Ok(vcsec::OperationStatus::Ok) => {
                        self.complete_head_if(
                            |cmd| cmd.state == CommandState::AwaitingResponse,
                            now_ms,
                        );
                    }
                    Ok(vcsec::OperationStatus::Wait) => {
                        debug!("vehicle asks us to wait");
                    }
                    _ => {
                        self.fail_head_if(
                            |cmd| cmd.state == CommandState::AwaitingResponse,
                            CommandFailure::VehicleError,
                        );
                    }
                }
            }
            Some(SubMessage::WhitelistInfo(_)) | Some(SubMessage::WhitelistEntryInfo(_)) => {
                self.complete_head_if(
                    |cmd| {
                        matches!(cmd.kind, CommandKind::StartPairing(_))
                            && cmd.state == CommandState::AwaitingResponse
                    },
                    now_ms,
                );
            }
            Some(SubMessage::NominalError(err)) => {
                warn!(code = err.generic_error, "vehicle reported a nominal error");
                self.fail_head_if(
                    |cmd| cmd.state == CommandState::AwaitingResponse,
                    CommandFailure::VehicleError,
                );
            }
            None => debug!("VCSEC message with no known submessage"),
        }
    }

    /// A vehicle status update doubles as the completion signal for wake
    /// sequences and VCSEC status polls.
    fn advance_on_vehicle_status(&mut self, now_ms: u32) {
        let asleep = self.state.is_asleep();
        let Some(head) = self.queue.front_mut() else {
            return;
        };

        match head.state {
            CommandState::AwaitingWakeResponse if !asleep => {
                debug!(name = head.kind.name(), "vehicle is awake, resuming");
                match head.domain {
                    Domain::Infotainment => {
                        head.state = CommandState::AwaitingInfotainmentAuth;
                    }
                    _ => head.state = CommandState::Ready,
                }
                head.last_tx_at_ms = fire_immediately(now_ms);
            }
            CommandState::AwaitingResponse if head.domain == Domain::VehicleSecurity => {
                if head.is_wake() {
                    if !asleep {
                        self.complete_head(now_ms);
                    }
                    // Still asleep: keep waiting for a status that says
                    // otherwise, or for the retry timer.
                } else {
                    self.complete_head(now_ms);
                }
            }
            _ => {}
        }
    }

    fn handle_infotainment_response(&mut self, message: &RoutableMessage, now_ms: u32) {
        let vin = self.vin.clone().unwrap_or_default();
        let payload = match codec::decrypt_response_payload(
            &self.sessions,
            &vin,
            Domain::Infotainment,
            message,
        ) {
            Ok(payload) => payload,
            Err(e) => {
                self.handle_decrypt_failure(Domain::Infotainment, e);
                return;
            }
        };

        if payload.is_empty() {
            self.complete_head_if(
                |cmd| {
                    cmd.domain == Domain::Infotainment
                        && cmd.state == CommandState::AwaitingResponse
                },
                now_ms,
            );
            return;
        }

        let response = match codec::parse_carserver_response(&payload) {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "undecodable car-server payload");
                return;
            }
        };

        if let Some(carserver::response::ResponseMsg::VehicleData(data)) = &response.response_msg {
            if let Some(charge) = &data.charge_state {
                let event = self.state.apply_charge_state(charge);
                self.events.push_back(event);
            }
            if let Some(climate) = &data.climate_state {
                self.events
                    .push_back(VehicleEvent::ClimateState(climate.into()));
            }
            if let Some(drive) = &data.drive_state {
                self.events.push_back(VehicleEvent::DriveState(drive.into()));
            }
        }

        match &response.action_status {
            Some(status) => match carserver::OperationStatus::try_from(status.result) {
                Ok(carserver::OperationStatus::Ok) => {
                    self.complete_head_if(
                        |cmd| {
                            cmd.domain == Domain::Infotainment
                                && cmd.state == CommandState::AwaitingResponse
                        },
                        now_ms,
                    );
                }
                _ => {
                    warn!("car server rejected the action");
                    self.fail_head_if(
                        |cmd| cmd.domain == Domain::Infotainment,
                        CommandFailure::VehicleError,
                    );
                }
            },
            // A bare data payload is itself the success signal.
            None => {
                self.complete_head_if(
                    |cmd| {
                        cmd.domain == Domain::Infotainment
                            && cmd.state == CommandState::AwaitingResponse
                    },
                    now_ms,
                );
            }
        }
    }

    fn handle_decrypt_failure(&mut self, domain: Domain, error: ProtocolError) {
        warn!(?domain, error = %error, "could not recover response payload");
        if matches!(error, ProtocolError::Crypto(CryptoError::AuthFailure)) {
            // A reply that fails authentication means our session view is
            // wrong; force a fresh handshake.
            self.sessions.invalidate(domain);
            self.fail_head_if(
                |cmd| cmd.domain == domain,
                CommandFailure::AuthenticationFailed,
            );
        }
    }

    // ── Head-of-queue state machine ───────────────────────────────────

    fn process_queue(&mut self, now_ms: u32) {
        let Some(head) = self.queue.front_mut() else {
            return;
        };
        if !head.started {
            head.started = true;
            head.started_at_ms = now_ms;
            head.last_tx_at_ms = fire_immediately(now_ms);
        }

        if time_since(now_ms, head.started_at_ms) > COMMAND_TIMEOUT_MS {
            warn!(name = head.kind.name(), "command deadline exceeded");
            self.fail_head(CommandFailure::Timeout);
            return;
        }

        match head.state {
            CommandState::Idle => self.process_idle(now_ms),
            CommandState::Ready => self.process_ready(now_ms),
            CommandState::AwaitingResponse => {
                if time_since(now_ms, head.last_tx_at_ms) > MAX_LATENCY_MS {
                    debug!(name = head.kind.name(), "response timeout, will retry");
                    head.state = CommandState::Ready;
                }
            }
            _ => self.process_waiting(now_ms),
        }
    }

    fn process_idle(&mut self, now_ms: u32) {
        let Some(head) = self.queue.front_mut() else {
                return;
            };
        trace!(name = head.kind.name(), "preparing command");
        match head.domain {
            Domain::Broadcast => {
                head.state = CommandState::Ready;
                head.last_tx_at_ms = fire_immediately(now_ms);
            }
            Domain::VehicleSecurity => self.start_vcsec_auth(now_ms),
            Domain::Infotainment => self.start_infotainment_auth(now_ms),
        }
    }

    fn process_waiting(&mut self, now_ms: u32) {
        let Some(head) = self.queue.front_mut() else {
                return;
            };
        if time_since(now_ms, head.last_tx_at_ms) <= MAX_LATENCY_MS {
            return;
        }

        match head.state {
            CommandState::AwaitingVcsecAuth => self.start_vcsec_auth(now_ms),
            CommandState::AwaitingVcsecAuthResponse => {
                debug!(name = head.kind.name(), "VCSEC handshake timed out, retrying");
                head.state = CommandState::AwaitingVcsecAuth;
                head.last_tx_at_ms = fire_immediately(now_ms);
            }
            CommandState::AwaitingInfotainmentAuth => self.start_infotainment_auth(now_ms),
            CommandState::AwaitingInfotainmentAuthResponse => {
                debug!(
                    name = head.kind.name(),
                    "infotainment handshake timed out, retrying"
                );
                head.state = CommandState::AwaitingInfotainmentAuth;
                head.last_tx_at_ms = fire_immediately(now_ms);
            }
            CommandState::AwaitingWake => self.start_wake(now_ms),
            CommandState::AwaitingWakeResponse => {
                if !self.state.is_asleep() {
                    match head.domain {
                        Domain::Infotainment => {
                            head.state = CommandState::AwaitingInfotainmentAuth;
                        }
                        _ => head.state = CommandState::Ready,
                    }
                    head.last_tx_at_ms = fire_immediately(now_ms);
                } else if head.retry_count >= MAX_RETRIES {
                    self.fail_head(CommandFailure::RetriesExhausted);
                } else {
                    head.retry_count += 1;
                    head.state = CommandState::AwaitingWake;
                    head.last_tx_at_ms = fire_immediately(now_ms);
                }
            }
            _ => {}
        }
    }

    fn start_vcsec_auth(&mut self, now_ms: u32) {
        if self.sessions.is_authenticated(Domain::VehicleSecurity) {
            let Some(head) = self.queue.front_mut() else {
                return;
            };
            head.state = match head.domain {
                Domain::Infotainment => CommandState::AwaitingInfotainmentAuth,
                _ => CommandState::Ready,
            };
            head.last_tx_at_ms = fire_immediately(now_ms);
            return;
        }

        let built = codec::build_session_info_request(&self.identity, Domain::VehicleSecurity);
        match self.framer.enqueue_message(&built.bytes) {
            Ok(()) => {
                self.pending_uuid = Some(built.request_uuid);
                let Some(head) = self.queue.front_mut() else {
                return;
            };
                debug!(name = head.kind.name(), "requesting VCSEC session info");
                head.state = CommandState::AwaitingVcsecAuthResponse;
                head.last_tx_at_ms = now_ms;
            }
            Err(e) => self.fail_head(CommandFailure::Build(e.to_string())),
        }
    }

    fn start_infotainment_auth(&mut self, now_ms: u32) {
        // Infotainment only answers when the vehicle is awake, and waking
        // requires a VCSEC session, so order is: VCSEC auth, wake, then
        // the infotainment handshake.
        if !self.sessions.is_authenticated(Domain::VehicleSecurity) {
            let Some(head) = self.queue.front_mut() else {
                return;
            };
            debug!(name = head.kind.name(), "VCSEC auth required first");
            head.state = CommandState::AwaitingVcsecAuth;
            head.last_tx_at_ms = fire_immediately(now_ms);
            return;
        }

        if self.state.is_asleep() {
            let Some(head) = self.queue.front_mut() else {
                return;
            };
            debug!(name = head.kind.name(), "vehicle is asleep, waking it");
            head.state = CommandState::AwaitingWake;
            head.last_tx_at_ms = fire_immediately(now_ms);
            return;
        }

        if self.sessions.is_authenticated(Domain::Infotainment) {
            let Some(head) = self.queue.front_mut() else {
                return;
            };
            head.state = CommandState::Ready;
            head.last_tx_at_ms = fire_immediately(now_ms);
            return;
        }

        let built = codec::build_session_info_request(&self.identity, Domain::Infotainment);
        match self.framer.enqueue_message(&built.bytes) {
            Ok(()) => {
                self.pending_uuid = Some(built.request_uuid);
                let Some(head) = self.queue.front_mut() else {
                return;
            };
                debug!(
                    name = head.kind.name(),
                    "requesting infotainment session info"
                );
                head.state = CommandState::AwaitingInfotainmentAuthResponse;
                head.last_tx_at_ms = now_ms;
            }
            Err(e) => self.fail_head(CommandFailure::Build(e.to_string())),
        }
    }

    /// Send the RKE wake action on behalf of the head command without
    /// disturbing the queue.
    fn start_wake(&mut self, now_ms: u32) {
        let Some(vin) = self.vin.clone() else {
            self.fail_head(CommandFailure::Build("VIN not configured".into()));
            return;
        };
        let payload = codec::vcsec_action_payload(vcsec::RkeAction::WakeVehicle);
        match codec::build_signed_message(
            &self.identity,
            &mut self.sessions,
            &vin,
            Domain::VehicleSecurity,
            &payload,
            now_ms,
        ) {
            Ok(built) => match self.framer.enqueue_message(&built.bytes) {
                Ok(()) => {
                    self.pending_uuid = Some(built.request_uuid);
                    let Some(head) = self.queue.front_mut() else {
                return;
            };
                    debug!(name = head.kind.name(), "wake action sent");
                    head.state = CommandState::AwaitingWakeResponse;
                    head.last_tx_at_ms = now_ms;
                }
                Err(e) => self.fail_head(CommandFailure::Build(e.to_string())),
            },
            Err(ProtocolError::SessionNotReady(_)) => {
                // The VCSEC session evaporated; run the handshake again.
                let Some(head) = self.queue.front_mut() else {
                return;
            };
                head.state = CommandState::AwaitingVcsecAuth;
                head.last_tx_at_ms = fire_immediately(now_ms);
            }
            Err(e) => self.fail_head(CommandFailure::Build(e.to_string())),
        }
    }

    fn process_ready(&mut self, now_ms: u32) {
        let Some(head) = self.queue.front_mut() else {
                return;
            };
        if time_since(now_ms, head.last_tx_at_ms) <= MAX_LATENCY_MS {
            return;
        }
        if head.retry_count >= MAX_RETRIES {
            warn!(name = head.kind.name(), "retry budget exhausted");
            self.fail_head(CommandFailure::RetriesExhausted);
            return;
        }

        let kind = head.kind.clone();
        let domain = head.domain;
        match self.build_outbound(&kind, domain, now_ms) {
            Ok((bytes, uuid)) => match self.framer.enqueue_message(&bytes) {
                Ok(()) => {
                    self.pending_uuid = uuid;
                    let Some(head) = self.queue.front_mut() else {
                return;
            };
                    head.last_tx_at_ms = now_ms;
                    head.retry_count += 1;
                    head.state = CommandState::AwaitingResponse;
                    debug!(
                        name = kind.name(),
                        attempt = head.retry_count,
                        max = MAX_RETRIES,
                        "command transmitted"
                    );
                    if matches!(kind, CommandKind::StartPairing(_)) {
                        info!("pairing request sent, tap the key card on the reader");
                        self.events.push_back(VehicleEvent::PairingRequestSent);
                    }
                }
                Err(e) => {
                    warn!(name = kind.name(), error = %e, "transmit failed");
                    let Some(head) = self.queue.front_mut() else {
                return;
            };
                    head.retry_count += 1;
                    head.last_tx_at_ms = now_ms;
                }
            },
            Err(ProtocolError::SessionNotReady(_)) => {
                // Session lost between auth and send; restart the flow.
                let Some(head) = self.queue.front_mut() else {
                return;
            };
                head.state = CommandState::Idle;
                head.last_tx_at_ms = fire_immediately(now_ms);
            }
            Err(e) => self.fail_head(CommandFailure::Build(e.to_string())),
        }
    }

    /// Serialize the head command into a transmit-ready envelope.
    fn build_outbound(
        &mut self,
        kind: &CommandKind,
        domain: Domain,
        now_ms: u32,
    ) -> ClientResult<(Vec<u8>, Option<[u8; 16]>)> {
        if let CommandKind::StartPairing(role) = kind {
            return Ok((codec::build_pairing_message(&self.identity, *role), None));
        }

        let vin = self.vin.as_deref().ok_or(ProtocolError::MissingVin)?;
        let payload = match kind {
            CommandKind::WakeVehicle => {
                codec::vcsec_action_payload(vcsec::RkeAction::WakeVehicle)
            }
            CommandKind::VcsecStatusPoll => codec::vcsec_information_request_payload(
                &self.identity,
                vcsec::InformationRequestType::GetStatus,
            ),
            CommandKind::InfotainmentPoll(request) => {
                codec::carserver_vehicle_data_payload(request)
            }
            CommandKind::SetChargingEnabled(enable) => {
                codec::carserver_charging_start_stop_payload(*enable)
            }
            CommandKind::SetChargingAmps(amps) => codec::carserver_charging_amps_payload(*amps),
            CommandKind::SetChargingLimit(percent) => {
                codec::carserver_charging_limit_payload(*percent)
            }
            CommandKind::UnlockChargePort => codec::carserver_charge_port_door_open_payload(),
            CommandKind::StartPairing(_) => unreachable!("handled above"),
        };

        let built = codec::build_signed_message(
            &self.identity,
            &mut self.sessions,
            vin,
            domain,
            &payload,
            now_ms,
        )?;
        Ok((built.bytes, Some(built.request_uuid)))
    }

    // ── Command resolution ────────────────────────────────────────────

    fn complete_head(&mut self, now_ms: u32) {
        if let Some(cmd) = self.queue.pop_front() {
            info!(
                name = cmd.kind.name(),
                elapsed_ms = time_since(now_ms, cmd.started_at_ms),
                "command completed"
            );
            if cmd.is_wake() {
                // Queued infotainment work can proceed without waiting for
                // the next status poll.
                self.state.mark_awake();
            }
            self.pending_uuid = None;
            self.events.push_back(VehicleEvent::CommandCompleted {
                handle: cmd.handle,
            });
        }
    }

    fn complete_head_if(&mut self, predicate: impl Fn(&Command) -> bool, now_ms: u32) {
        if self.queue.front().is_some_and(&predicate) {
            self.complete_head(now_ms);
        }
    }

    fn fail_head(&mut self, failure: CommandFailure) {
        if let Some(cmd) = self.queue.pop_front() {
            warn!(name = cmd.kind.name(), %failure, "command failed");
            self.pending_uuid = None;
            self.events.push_back(VehicleEvent::CommandFailed {
                handle: cmd.handle,
                failure,
            });
        }
    }

    fn fail_head_if(&mut self, predicate: impl Fn(&Command) -> bool, failure: CommandFailure) {
        if self.queue.front().is_some_and(&predicate) {
            self.fail_head(failure);
        }
    }
}

/// A `last_tx` value that makes the next latency check fire at once.
fn fire_immediately(now_ms: u32) -> u32 {
    now_ms.wrapping_sub(MAX_LATENCY_MS + 1)
}
