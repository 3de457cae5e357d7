/*!
    Per-domain session state and the registry that owns it.

    The vehicle's advertised `SessionInfo` is authoritative for anti-replay
    state: a new epoch replaces everything, an equal-or-higher counter is a
    routine update, and a lower counter within the same epoch is force
    accepted (the vehicle cannot be argued with, only resynchronized).
*/

use p256::SecretKey;
use tracing::{debug, warn};

use tesla_ble_proto::signatures::SessionInfo;
use tesla_ble_proto::universal::Domain;

use crate::command::time_since;
use crate::constants::LATENCY_BUDGET_S;
use crate::crypto::{self, SESSION_KEY_LEN};
use crate::error::{ClientResult, ProtocolError};

/**
    How an accepted `SessionInfo` changed the stored session.
*/
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionUpdate {
    /// Counter moved forward (or stayed) within the current epoch.
    Applied,
    /// The epoch changed; all fields were replaced and counters restarted.
    EpochReset,
    /// The vehicle's counter was behind ours; its value was force accepted.
    CounterForced,
}

/**
    Authentication state for one security domain.
*/
#[derive(Debug, Clone, Default)]
pub struct Session {
    peer_public_key: Vec<u8>,
    session_key: Option<[u8; SESSION_KEY_LEN]>,
    counter: u32,
    epoch: Vec<u8>,
    /// Vehicle-local seconds reported in the last accepted session info.
    clock_time: u32,
    /// Host milliseconds when that info was accepted.
    updated_at_ms: u32,
    is_valid: bool,
}

impl Session {
    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    pub fn counter(&self) -> u32 {
        self.counter
    }

    pub fn epoch(&self) -> &[u8] {
        &self.epoch
    }

    pub fn peer_public_key(&self) -> &[u8] {
        &self.peer_public_key
    }

    pub fn session_key(&self) -> Option<&[u8; SESSION_KEY_LEN]> {
        self.session_key.as_ref()
    }

    /// Advance and return the outbound counter. Called exactly once per
    /// signed message, at build time.
    pub fn next_counter(&mut self) -> u32 {
        self.counter += 1;
        self.counter
    }

    /// Current vehicle-local time in seconds, projected from the clock
    /// captured with the last session info.
    pub fn vehicle_time_s(&self, now_ms: u32) -> u32 {
        self.clock_time
            .wrapping_add(time_since(now_ms, self.updated_at_ms) / 1000)
    }

    /// Expiry stamp for a message built now.
    pub fn expires_at(&self, now_ms: u32) -> u32 {
        self.vehicle_time_s(now_ms).wrapping_add(LATENCY_BUDGET_S)
    }

    fn absorb(&mut self, local: &SecretKey, info: &SessionInfo) -> ClientResult<()> {
        if !info.public_key.is_empty() {
            self.session_key = Some(crypto::ecdh_session_key(local, &info.public_key)?);
            self.peer_public_key = info.public_key.clone();
        }
        self.counter = info.counter;
        self.epoch = info.epoch.clone();
        self.clock_time = info.clock_time;
        // A session without a key cannot sign anything, whatever the
        // vehicle says about counters.
        self.is_valid = self.session_key.is_some();
        Ok(())
    }
}

/**
    Owns one `Session` per authenticated domain. BROADCAST traffic is
    unauthenticated and reads a permanently blank session.
*/
#[derive(Debug, Default)]
pub struct SessionRegistry {
    vcsec: Session,
    infotainment: Session,
    broadcast: Session,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(&self, domain: Domain) -> &Session {
        match domain {
            Domain::VehicleSecurity => &self.vcsec,
            Domain::Infotainment => &self.infotainment,
            Domain::Broadcast => &self.broadcast,
        }
    }

    pub fn session_mut(&mut self, domain: Domain) -> &mut Session {
        match domain {
            Domain::VehicleSecurity => &mut self.vcsec,
            Domain::Infotainment => &mut self.infotainment,
            Domain::Broadcast => &mut self.broadcast,
        }
    }

    pub fn is_authenticated(&self, domain: Domain) -> bool {
        match domain {
            Domain::Broadcast => true,
            _ => self.session(domain).is_valid(),
        }
    }

    /**
        Apply vehicle session info, following the replace/update/force rules.
        Fails only when the peer key cannot be loaded or no key is available
        at all; counter disagreements never fail.
    */
    pub fn apply_session_info(
        &mut self,
        domain: Domain,
        local: &SecretKey,
        info: &SessionInfo,
        now_ms: u32,
    ) -> ClientResult<SessionUpdate> {
        let session = self.session_mut(domain);
        let stored_counter = session.counter;

        let update = if session.epoch != info.epoch {
            SessionUpdate::EpochReset
        } else if info.counter >= stored_counter {
            SessionUpdate::Applied
        } else {
            warn!(
                ?domain,
                stored = stored_counter,
                received = info.counter,
                "vehicle counter moved backwards, accepting its value"
            );
            SessionUpdate::CounterForced
        };

        session.absorb(local, info)?;
        session.updated_at_ms = now_ms;
        if !session.is_valid {
            return Err(ProtocolError::SessionNotReady(domain));
        }

        debug!(
            ?domain,
            ?update,
            counter = info.counter,
            clock_time = info.clock_time,
            "session info applied"
        );
        Ok(update)
    }

    /**
        Drop validity but keep counters and the peer key, so the session can
        resume after a fresh info exchange.
    */
    pub fn invalidate(&mut self, domain: Domain) {
        if domain == Domain::Broadcast {
            return;
        }
        debug!(?domain, "session invalidated");
        self.session_mut(domain).is_valid = false;
    }
}
