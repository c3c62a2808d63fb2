//! The teleport state machine and its request queue.

use std::time::Instant;

use glam::{DVec3, Vec3};
use tracing::{debug, error, info, warn};
use vantage_config::TeleportConfig;
use vantage_math::{REGION_WIDTH_METERS, RegionContext, RegionHandle};

use crate::error::TeleportError;
use crate::event::{RefreshKind, TeleportEffect, TeleportEvent};
use crate::link::SessionLink;
use crate::payload::{LandmarkId, LureId, QueuedRequest, TeleportFlags, TeleportPayload};
use crate::state::TeleportState;

/// Agent state read by the sequencer during a call.
#[derive(Debug, Clone, Copy)]
pub struct TeleportContext<'a> {
    pub region: Option<&'a RegionContext>,
    pub position_global: DVec3,
    /// Current camera view direction.
    pub camera_at: Vec3,
    pub sitting: bool,
    pub draw_distance: f32,
    /// Worn attachments; each one extends the teleport expiry.
    pub attachments: u32,
}

/// Where a teleport started from.
#[derive(Debug, Clone, PartialEq)]
pub struct DepartureSnapshot {
    pub position_global: DVec3,
    pub region: RegionHandle,
    /// e.g. `Ahern (128, 128, 22)`.
    pub location: String,
}

/// Serializes teleport requests for one agent.
pub struct TeleportSequencer {
    config: TeleportConfig,
    state: TeleportState,
    departure: Option<DepartureSnapshot>,
    /// Same as the departure region until a cross-region hop is confirmed.
    arrival_region: Option<RegionHandle>,
    /// Requested destination, kept until the server commits to it.
    destination: Option<(RegionHandle, DVec3)>,
    queued: Option<QueuedRequest>,
    sent: Option<TeleportPayload>,
    keeps_look_at: bool,
    /// State the timer runs for, and the first frame it was seen in.
    timer: Option<(TeleportState, Instant)>,
    events: Vec<TeleportEvent>,
}

impl TeleportSequencer {
    pub fn new(config: &TeleportConfig) -> Self {
        Self {
            config: config.clone(),
            state: TeleportState::None,
            departure: None,
            arrival_region: None,
            destination: None,
            queued: None,
            sent: None,
            keeps_look_at: false,
            timer: None,
            events: Vec::new(),
        }
    }

    pub fn set_config(&mut self, config: &TeleportConfig) {
        self.config = config.clone();
    }

    pub fn state(&self) -> TeleportState {
        self.state
    }

    pub fn departure(&self) -> Option<&DepartureSnapshot> {
        self.departure.as_ref()
    }

    pub fn arrival_region(&self) -> Option<RegionHandle> {
        self.arrival_region
    }

    /// Destination region and position of a remote teleport, until the
    /// server starts moving the agent.
    pub fn destination(&self) -> Option<(RegionHandle, DVec3)> {
        self.destination
    }

    pub fn queued(&self) -> Option<&QueuedRequest> {
        self.queued.as_ref()
    }

    /// The current teleport keeps the camera direction on arrival.
    pub fn keeps_look_at(&self) -> bool {
        self.keeps_look_at
    }

    pub fn drain_events(&mut self) -> Vec<TeleportEvent> {
        std::mem::take(&mut self.events)
    }

    // ── Requests ───────────────────────────────────────────────────

    /// Accept a teleport toward `destination_global` without sending anything.
    ///
    /// A zero destination means "unknown" (home, lures) and is never local.
    /// The departure snapshot is taken here and kept for the whole session.
    pub fn begin(
        &mut self,
        ctx: &TeleportContext<'_>,
        link: &dyn SessionLink,
        destination_global: DVec3,
    ) -> Result<TeleportState, TeleportError> {
        if self.state.is_active() {
            warn!(target: "teleport", state = %self.state, "teleport requested while already teleporting");
            return Err(TeleportError::AlreadyActive(self.state));
        }
        if !destination_global.is_finite() {
            error!(target: "teleport", destination = ?destination_global, "rejecting non-finite teleport destination");
            return Err(TeleportError::NonFinite);
        }
        let Some(region) = ctx.region else {
            warn!(target: "teleport", "current region undefined");
            return Err(TeleportError::NoRegion);
        };

        if ctx.sitting {
            self.push(TeleportEffect::StandUp);
        }
        self.push(TeleportEffect::CloseLandFloater);
        self.push(TeleportEffect::DeselectLand);
        self.push(TeleportEffect::ResetView { change_camera: false });

        let destination_region = RegionHandle::from_global(destination_global);
        let is_local = destination_global != DVec3::ZERO && destination_region == region.handle;
        debug!(
            target: "teleport",
            current = %region.handle,
            destination = %destination_region,
            is_local,
            "classified teleport"
        );

        self.departure = Some(DepartureSnapshot {
            position_global: ctx.position_global,
            region: region.handle,
            location: region.location_string(region.global_to_local(ctx.position_global)),
        });
        self.arrival_region = Some(region.handle);

        let next = if is_local {
            TeleportState::Local
        } else if self.config.race_workaround && link.is_poll_in_flight(region.handle) {
            info!(target: "teleport", "queuing teleport request until the region event poll settles");
            TeleportState::Queued
        } else {
            TeleportState::Start
        };
        if !is_local {
            self.destination = Some((destination_region, destination_global));
        }
        self.set_state(ctx, next, None);
        Ok(next)
    }

    /// Teleport to a global position, facing one meter toward the region
    /// center.
    pub fn teleport_via_location(
        &mut self,
        ctx: &TeleportContext<'_>,
        link: &mut dyn SessionLink,
        position_global: DVec3,
        now: Instant,
    ) -> Result<TeleportState, TeleportError> {
        let region = RegionHandle::from_global(position_global);
        let position_local = (position_global - region.origin_global()).as_vec3();
        let width = ctx
            .region
            .filter(|r| r.handle == region)
            .map_or(REGION_WIDTH_METERS, |r| r.width);
        let mut look_at = position_local;
        look_at.x += if look_at.x < width * 0.5 { 1.0 } else { -1.0 };
        self.request_location(ctx, link, position_global, region, position_local, look_at, now)
    }

    /// Teleport to a global position, keeping the current camera direction.
    pub fn teleport_via_location_look_at(
        &mut self,
        ctx: &TeleportContext<'_>,
        link: &mut dyn SessionLink,
        position_global: DVec3,
        now: Instant,
    ) -> Result<TeleportState, TeleportError> {
        let region = RegionHandle::from_global(position_global);
        let position_local = (position_global - region.origin_global()).as_vec3();
        self.request_location(ctx, link, position_global, region, position_local, Vec3::ZERO, now)
    }

    /// Teleport to a landmark, or home when `landmark` is `None`.
    /// `destination_global` is the landmark position when it is known.
    pub fn teleport_via_landmark(
        &mut self,
        ctx: &TeleportContext<'_>,
        link: &mut dyn SessionLink,
        landmark: Option<LandmarkId>,
        destination_global: Option<DVec3>,
        now: Instant,
    ) -> Result<TeleportState, TeleportError> {
        let destination = landmark.and(destination_global).unwrap_or(DVec3::ZERO);
        let state = self.begin(ctx, link, destination)?;
        self.enqueue(ctx, link, state, TeleportPayload::Landmark { landmark }, now);
        Ok(self.state)
    }

    /// Accept a teleport offer.
    pub fn teleport_via_lure(
        &mut self,
        ctx: &TeleportContext<'_>,
        link: &mut dyn SessionLink,
        lure: LureId,
        godlike: bool,
        now: Instant,
    ) -> Result<TeleportState, TeleportError> {
        let state = self.begin(ctx, link, DVec3::ZERO)?;
        let flags = TeleportFlags::for_lure(godlike);
        self.enqueue(ctx, link, state, TeleportPayload::Lure { lure, flags }, now);
        Ok(self.state)
    }

    #[allow(clippy::too_many_arguments)]
    fn request_location(
        &mut self,
        ctx: &TeleportContext<'_>,
        link: &mut dyn SessionLink,
        position_global: DVec3,
        region: RegionHandle,
        position_local: Vec3,
        look_at: Vec3,
        now: Instant,
    ) -> Result<TeleportState, TeleportError> {
        let state = self.begin(ctx, link, position_global)?;
        info!(target: "teleport", region = %region, ?position_local, "teleport location request");

        self.keeps_look_at = look_at == Vec3::ZERO;
        let look_at = if self.keeps_look_at {
            self.push(TeleportEffect::DetachCameraFocus);
            ctx.camera_at
        } else {
            look_at
        };
        let payload = TeleportPayload::Location {
            region,
            position_local,
            look_at,
        };
        self.enqueue(ctx, link, state, payload, now);
        Ok(self.state)
    }

    fn enqueue(
        &mut self,
        ctx: &TeleportContext<'_>,
        link: &mut dyn SessionLink,
        state: TeleportState,
        payload: TeleportPayload,
        now: Instant,
    ) {
        self.queued = Some(QueuedRequest {
            payload,
            expires_at: now + self.config.queue_expiry(),
        });
        if state != TeleportState::Queued {
            self.fire(ctx, link);
        }
    }

    /// Send a queued request once the region event poll is no longer in
    /// flight, or once the queue guard has expired. Call every frame.
    pub fn fire_queued(&mut self, ctx: &TeleportContext<'_>, link: &mut dyn SessionLink, now: Instant) -> bool {
        if self.state != TeleportState::Queued {
            return false;
        }
        let Some(queued) = &self.queued else {
            return false;
        };

        let guard_clear = !self.config.race_workaround
            || ctx
                .region
                .is_none_or(|region| !link.is_poll_in_flight(region.handle));
        if guard_clear {
            self.fire(ctx, link)
        } else if queued.is_expired(now) {
            debug!(target: "teleport", "queue guard expired, firing anyway");
            self.fire(ctx, link)
        } else {
            false
        }
    }

    fn fire(&mut self, ctx: &TeleportContext<'_>, link: &mut dyn SessionLink) -> bool {
        let Some(request) = self.queued.take() else {
            return false;
        };

        // Going home: point the camera the right way on arrival.
        if request.payload == (TeleportPayload::Landmark { landmark: None }) {
            self.push(TeleportEffect::ResetView { change_camera: true });
        }
        debug!(target: "teleport", kind = request.payload.kind(), "sending teleport request");
        link.send_teleport_request(&request.payload);
        self.sent = Some(request.payload);

        if self.state != TeleportState::Local {
            self.set_state(ctx, TeleportState::Start, None);
        }
        info!(target: "teleport", "teleport request sent");
        true
    }

    // ── Timers ─────────────────────────────────────────────────────

    /// Advance time-driven transitions. Call every frame.
    ///
    /// Arrival and same-region teleports complete on their own after a short
    /// delay; the network messages for them only finish early. A teleport the
    /// server committed to but never finished is abandoned after the expiry.
    /// Start and Queued are left alone: those are covered by the queue guard
    /// and by the server's reply to the request.
    pub fn update(&mut self, ctx: &TeleportContext<'_>, now: Instant) {
        let entered = match self.timer {
            Some((state, entered)) if state == self.state => entered,
            _ => self.timer.insert((self.state, now)).1,
        };
        let elapsed = now.saturating_duration_since(entered);

        match self.state {
            TeleportState::Arriving if elapsed >= self.config.arrival_delay() => {
                debug!(target: "teleport", "arrival delay elapsed");
                self.set_state(ctx, TeleportState::None, None);
            }
            TeleportState::Local if elapsed >= self.config.local_delay() => {
                debug!(target: "teleport", "local teleport delay elapsed");
                self.set_state(ctx, TeleportState::None, None);
            }
            TeleportState::Requested | TeleportState::Moving | TeleportState::StartArrival
                if elapsed >= self.config.teleport_expiry(ctx.attachments) =>
            {
                warn!(target: "teleport", state = %self.state, ?elapsed, "teleport expired");
                self.set_state(ctx, TeleportState::None, Some("teleport timed out"));
            }
            _ => {}
        }
    }

    // ── Network progress ───────────────────────────────────────────

    /// The server acknowledged the request.
    pub fn on_request_acknowledged(&mut self, ctx: &TeleportContext<'_>) {
        if self.state == TeleportState::Start {
            self.set_state(ctx, TeleportState::Requested, None);
        } else {
            debug!(target: "teleport", state = %self.state, "ignoring teleport acknowledgement");
        }
    }

    /// The destination accepted the agent and the handoff has begun.
    pub fn on_teleport_finish(&mut self, ctx: &TeleportContext<'_>, region: RegionHandle) {
        match self.state {
            TeleportState::Start | TeleportState::Requested => {
                debug!(target: "teleport", destination = %region, "destination committed");
                self.set_state(ctx, TeleportState::Moving, None);
            }
            state => warn!(target: "teleport", %state, "unexpected teleport finish"),
        }
    }

    /// The agent's authoritative region changed to `ctx.region`.
    pub fn on_region_attached(&mut self, ctx: &TeleportContext<'_>, previous: Option<RegionHandle>) {
        let Some(region) = ctx.region else {
            return;
        };

        match self.state {
            TeleportState::Moving => {
                self.arrival_region = Some(region.handle);
                let departed_from = self.departure.as_ref().map(|d| d.region);
                if departed_from == Some(region.handle) {
                    debug!(target: "teleport", region = %region.handle, "re-attached to departure region");
                    self.set_state(ctx, TeleportState::None, None);
                    return;
                }
                self.set_state(ctx, TeleportState::StartArrival, None);
                self.push(TeleportEffect::ScheduleVisibilityRefresh(RefreshKind::Teleport));
                self.set_state(ctx, TeleportState::Arriving, None);
            }
            TeleportState::None => {
                if previous.is_some_and(|p| p != region.handle) {
                    self.push(TeleportEffect::ScheduleVisibilityRefresh(RefreshKind::BorderCrossing));
                }
            }
            state => {
                debug!(target: "teleport", %state, region = %region.handle, "region attached mid-teleport");
            }
        }
    }

    /// Agent movement into the destination completed.
    pub fn on_arrival_complete(&mut self, ctx: &TeleportContext<'_>) {
        match self.state {
            TeleportState::StartArrival | TeleportState::Arriving => {
                self.set_state(ctx, TeleportState::None, None);
            }
            state => debug!(target: "teleport", %state, "ignoring arrival completion"),
        }
    }

    /// The server finished a same-region relocation.
    pub fn on_local_complete(&mut self, ctx: &TeleportContext<'_>) {
        match self.state {
            TeleportState::Local | TeleportState::Start | TeleportState::Requested => {
                self.set_state(ctx, TeleportState::None, None);
            }
            state => debug!(target: "teleport", %state, "ignoring local teleport completion"),
        }
    }

    /// The server refused the teleport, e.g. for a missing destination.
    pub fn on_failed(&mut self, ctx: &TeleportContext<'_>, reason: &str) {
        if !self.state.is_active() {
            return;
        }
        let reason = if reason.is_empty() { "teleport failed" } else { reason };
        warn!(target: "teleport", state = %self.state, reason, "teleport failed");
        self.set_state(ctx, TeleportState::None, Some(reason));
    }

    /// Abandon a teleport the destination has not committed to yet.
    pub fn cancel(
        &mut self,
        ctx: &TeleportContext<'_>,
        link: &mut dyn SessionLink,
        reason: &str,
    ) -> Result<(), TeleportError> {
        if !self.state.is_cancellable() || self.sent.as_ref().is_some_and(TeleportPayload::disables_cancel) {
            return Err(TeleportError::NotCancellable(self.state));
        }
        if self.sent.is_some() {
            link.send_teleport_cancel();
        }
        let reason = if reason.is_empty() { "cancelled" } else { reason };
        info!(target: "teleport", state = %self.state, reason, "teleport cancelled");
        self.set_state(ctx, TeleportState::None, Some(reason));
        Ok(())
    }

    // ── Transitions ────────────────────────────────────────────────

    fn push(&mut self, effect: TeleportEffect) {
        self.events.push(TeleportEvent::Effect(effect));
    }

    fn set_state(&mut self, ctx: &TeleportContext<'_>, state: TeleportState, reason: Option<&str>) {
        let from = self.state;
        if from == state {
            return;
        }
        self.state = state;
        self.timer = None;
        debug!(target: "teleport", %from, to = %state, reason, "teleport state changed");
        self.events.push(TeleportEvent::StateChanged {
            from,
            to: state,
            reason: reason.map(str::to_owned),
        });

        match state {
            TeleportState::None => {
                self.push(TeleportEffect::HideProgress);
                self.on_none_entered(ctx, reason);
                self.keeps_look_at = false;
                self.queued = None;
                self.sent = None;
                self.destination = None;
            }
            TeleportState::Start | TeleportState::Queued => {
                self.push(TeleportEffect::ShowProgress);
            }
            TeleportState::Requested => {}
            TeleportState::Moving => {
                self.destination = None;
            }
            TeleportState::StartArrival => {
                let crossed = self.arrival_region != self.departure.as_ref().map(|d| d.region);
                if crossed {
                    if self.config.delay_mesh_fetches {
                        self.push(TeleportEffect::DelayMeshFetches);
                    }
                    if self.config.clear_stale_fetches {
                        self.push(TeleportEffect::ClearStaleFetches);
                    }
                    self.push(TeleportEffect::ResetLowMemory);
                }
            }
            TeleportState::Arriving => {
                self.destination = None;
                self.push(TeleportEffect::ResetView { change_camera: true });
                self.push(TeleportEffect::ParcelArrival {
                    position_global: ctx.position_global,
                });
                self.push(TeleportEffect::ClearKeyboardFocus);
            }
            TeleportState::Local => {
                self.destination = None;
                self.push(TeleportEffect::ClearKeyboardFocus);
            }
        }
    }

    /// A successful hop that stayed in one region may still leave stale
    /// objects: refresh when it was longer than the draw distance, or when
    /// it measured zero (the position of a same-region landmark teleport
    /// arrives later).
    fn on_none_entered(&mut self, ctx: &TeleportContext<'_>, reason: Option<&str>) {
        let Some(departure) = self.departure.take() else {
            return;
        };
        if reason.is_some() || self.arrival_region != Some(departure.region) {
            return;
        }

        let distance_squared = departure.position_global.distance_squared(ctx.position_global);
        let draw_distance = f64::from(ctx.draw_distance);
        debug!(target: "teleport", distance = distance_squared.sqrt(), "same-region teleport distance");
        if distance_squared > draw_distance * draw_distance || distance_squared == 0.0 {
            self.push(TeleportEffect::ScheduleVisibilityRefresh(RefreshKind::Teleport));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::time::Duration;
    use uuid::Uuid;

    #[derive(Default)]
    struct FakeLink {
        in_flight: bool,
        sent: Vec<TeleportPayload>,
        cancels: usize,
    }

    impl SessionLink for FakeLink {
        fn send_teleport_request(&mut self, payload: &TeleportPayload) {
            self.sent.push(payload.clone());
        }

        fn send_teleport_cancel(&mut self) {
            self.cancels += 1;
        }

        fn is_poll_in_flight(&self, _region: RegionHandle) -> bool {
            self.in_flight
        }
    }

    const FRAME: Duration = Duration::from_millis(16);

    fn home_region() -> RegionContext {
        RegionContext::new(RegionHandle::from_origin(256_000, 256_000), "Ahern")
    }

    fn ctx(region: &RegionContext) -> TeleportContext<'_> {
        TeleportContext {
            region: Some(region),
            position_global: DVec3::new(256_128.0, 256_128.0, 22.0),
            camera_at: Vec3::X,
            sitting: false,
            draw_distance: 128.0,
            attachments: 0,
        }
    }

    fn remote_target() -> DVec3 {
        DVec3::new(256_522.0, 256_030.0, 40.0)
    }

    fn sequencer() -> TeleportSequencer {
        TeleportSequencer::new(&TeleportConfig::default())
    }

    fn states(events: &[TeleportEvent]) -> Vec<TeleportState> {
        events
            .iter()
            .filter_map(|e| match e {
                TeleportEvent::StateChanged { to, .. } => Some(*to),
                TeleportEvent::Effect(_) => None,
            })
            .collect()
    }

    fn has_effect(events: &[TeleportEvent], effect: &TeleportEffect) -> bool {
        events.iter().any(|e| matches!(e, TeleportEvent::Effect(x) if x == effect))
    }

    fn refresh_scheduled(events: &[TeleportEvent]) -> bool {
        has_effect(events, &TeleportEffect::ScheduleVisibilityRefresh(RefreshKind::Teleport))
    }

    #[test]
    fn test_remote_request_starts_and_sends() {
        let region = home_region();
        let mut link = FakeLink::default();
        let mut tp = sequencer();
        let state = tp
            .teleport_via_location(&ctx(&region), &mut link, remote_target(), Instant::now())
            .unwrap();

        assert_eq!(state, TeleportState::Start);
        assert_eq!(link.sent.len(), 1);
        assert!(tp.queued().is_none());
        let (handle, _) = tp.destination().unwrap();
        assert_eq!(handle, RegionHandle::from_origin(256_512, 256_000));
        let departure = tp.departure().unwrap();
        assert_eq!(departure.region, region.handle);
        assert_eq!(departure.location, "Ahern (128, 128, 22)");
        assert!(has_effect(&tp.drain_events(), &TeleportEffect::ShowProgress));
    }

    #[test]
    fn test_location_look_at_points_toward_center() {
        let region = home_region();
        let mut link = FakeLink::default();
        let mut tp = sequencer();
        tp.teleport_via_location(&ctx(&region), &mut link, remote_target(), Instant::now())
            .unwrap();
        let TeleportPayload::Location {
            position_local,
            look_at,
            ..
        } = &link.sent[0]
        else {
            panic!("expected a location payload");
        };
        assert_eq!(*position_local, Vec3::new(10.0, 30.0, 40.0));
        assert_eq!(*look_at, Vec3::new(11.0, 30.0, 40.0));
        assert!(!tp.keeps_look_at());
    }

    #[test]
    fn test_look_at_request_keeps_camera_direction() {
        let region = home_region();
        let mut link = FakeLink::default();
        let mut tp = sequencer();
        let mut c = ctx(&region);
        c.camera_at = Vec3::Y;
        tp.teleport_via_location_look_at(&c, &mut link, remote_target(), Instant::now())
            .unwrap();

        assert!(tp.keeps_look_at());
        assert!(matches!(&link.sent[0], TeleportPayload::Location { look_at, .. } if *look_at == Vec3::Y));
        assert!(has_effect(&tp.drain_events(), &TeleportEffect::DetachCameraFocus));
    }

    #[test]
    fn test_in_flight_poll_queues_until_it_settles() {
        let region = home_region();
        let c = ctx(&region);
        let mut link = FakeLink {
            in_flight: true,
            ..Default::default()
        };
        let mut tp = sequencer();
        let now = Instant::now();
        let state = tp.teleport_via_location(&c, &mut link, remote_target(), now).unwrap();

        assert_eq!(state, TeleportState::Queued);
        assert!(link.sent.is_empty());
        assert!(!tp.fire_queued(&c, &mut link, now + FRAME));
        assert_eq!(tp.state(), TeleportState::Queued);

        link.in_flight = false;
        assert!(tp.fire_queued(&c, &mut link, now + FRAME * 2));
        assert_eq!(tp.state(), TeleportState::Start);
        assert_eq!(link.sent.len(), 1);
    }

    #[test]
    fn test_queued_request_fires_on_expiry() {
        let region = home_region();
        let c = ctx(&region);
        let mut link = FakeLink {
            in_flight: true,
            ..Default::default()
        };
        let mut tp = sequencer();
        let start = Instant::now();
        tp.teleport_via_landmark(&c, &mut link, Some(LandmarkId(Uuid::new_v4())), None, start)
            .unwrap();
        assert_eq!(tp.state(), TeleportState::Queued);

        // 2 * 500 ms + 500 ms slack.
        let expiry = TeleportConfig::default().queue_expiry();
        let max_frames = expiry.as_millis() / FRAME.as_millis() + 2;
        let mut now = start;
        let mut frames = 0;
        while tp.state() == TeleportState::Queued {
            now += FRAME;
            frames += 1;
            tp.fire_queued(&c, &mut link, now);
            assert!(frames <= max_frames, "queued request never fired");
        }
        assert_eq!(tp.state(), TeleportState::Start);
        assert!(now - start >= expiry);
    }

    #[test]
    fn test_race_workaround_disabled_never_queues() {
        let region = home_region();
        let mut link = FakeLink {
            in_flight: true,
            ..Default::default()
        };
        let mut tp = TeleportSequencer::new(&TeleportConfig {
            race_workaround: false,
            ..Default::default()
        });
        let state = tp
            .teleport_via_location(&ctx(&region), &mut link, remote_target(), Instant::now())
            .unwrap();
        assert_eq!(state, TeleportState::Start);
    }

    #[test]
    fn test_local_request_skips_moving() {
        let region = home_region();
        let mut c = ctx(&region);
        let mut link = FakeLink::default();
        let mut tp = sequencer();
        let target = DVec3::new(256_160.0, 256_100.0, 22.0);
        let state = tp.teleport_via_location(&c, &mut link, target, Instant::now()).unwrap();

        assert_eq!(state, TeleportState::Local);
        assert_eq!(link.sent.len(), 1);
        assert!(tp.destination().is_none());

        c.position_global = target;
        tp.on_local_complete(&c);
        let events = tp.drain_events();
        assert_eq!(tp.state(), TeleportState::None);
        assert_eq!(states(&events), vec![TeleportState::Local, TeleportState::None]);
        assert!(!refresh_scheduled(&events));
    }

    #[test]
    fn test_same_region_landmark_without_movement_refreshes() {
        let region = home_region();
        let c = ctx(&region);
        let mut link = FakeLink::default();
        let mut tp = sequencer();
        let landmark = Some(LandmarkId(Uuid::new_v4()));
        let target = DVec3::new(256_010.0, 256_010.0, 30.0);
        tp.teleport_via_landmark(&c, &mut link, landmark, Some(target), Instant::now())
            .unwrap();
        assert_eq!(tp.state(), TeleportState::Local);

        // The agent position has not been updated yet: zero distance.
        tp.on_local_complete(&c);
        assert!(refresh_scheduled(&tp.drain_events()));
    }

    #[test]
    fn test_long_local_jump_refreshes() {
        let region = home_region();
        let mut c = ctx(&region);
        c.draw_distance = 64.0;
        let mut link = FakeLink::default();
        let mut tp = sequencer();
        let target = DVec3::new(256_250.0, 256_250.0, 22.0);
        tp.teleport_via_location(&c, &mut link, target, Instant::now()).unwrap();

        c.position_global = target;
        tp.on_local_complete(&c);
        assert!(refresh_scheduled(&tp.drain_events()));
    }

    #[test]
    fn test_second_begin_leaves_session_untouched() {
        let region = home_region();
        let c = ctx(&region);
        let mut link = FakeLink::default();
        let mut tp = sequencer();
        let now = Instant::now();
        tp.teleport_via_location(&c, &mut link, remote_target(), now).unwrap();
        let departure = tp.departure().cloned();
        let destination = tp.destination();

        let mut moved = c;
        moved.position_global = DVec3::new(256_050.0, 256_050.0, 50.0);
        let result = tp.teleport_via_lure(&moved, &mut link, LureId(Uuid::new_v4()), false, now);

        assert_eq!(result, Err(TeleportError::AlreadyActive(TeleportState::Start)));
        assert_eq!(tp.state(), TeleportState::Start);
        assert_eq!(tp.departure().cloned(), departure);
        assert_eq!(tp.destination(), destination);
        assert_eq!(link.sent.len(), 1);
    }

    #[test]
    fn test_begin_without_region_rejected() {
        let link = FakeLink::default();
        let mut tp = sequencer();
        let c = TeleportContext {
            region: None,
            position_global: DVec3::ZERO,
            camera_at: Vec3::X,
            sitting: false,
            draw_distance: 128.0,
            attachments: 0,
        };
        assert_eq!(tp.begin(&c, &link, remote_target()), Err(TeleportError::NoRegion));
        assert_eq!(tp.state(), TeleportState::None);
        assert!(tp.drain_events().is_empty());
    }

    #[test]
    fn test_non_finite_destination_rejected() {
        let region = home_region();
        let link = FakeLink::default();
        let mut tp = sequencer();
        let target = DVec3::new(f64::NAN, 0.0, 0.0);
        assert_eq!(tp.begin(&ctx(&region), &link, target), Err(TeleportError::NonFinite));
        assert!(tp.departure().is_none());
    }

    #[test]
    fn test_sitting_agent_stands_before_teleport() {
        let region = home_region();
        let mut c = ctx(&region);
        c.sitting = true;
        let link = FakeLink::default();
        let mut tp = sequencer();
        tp.begin(&c, &link, remote_target()).unwrap();
        assert!(has_effect(&tp.drain_events(), &TeleportEffect::StandUp));
    }

    #[test]
    fn test_remote_lifecycle() {
        let home = home_region();
        let away = RegionContext::new(RegionHandle::from_origin(256_512, 256_000), "Bonifacio");
        let mut link = FakeLink::default();
        let mut tp = sequencer();
        tp.teleport_via_location(&ctx(&home), &mut link, remote_target(), Instant::now())
            .unwrap();

        tp.on_request_acknowledged(&ctx(&home));
        assert_eq!(tp.state(), TeleportState::Requested);
        tp.on_teleport_finish(&ctx(&home), away.handle);
        assert_eq!(tp.state(), TeleportState::Moving);
        assert!(tp.destination().is_none());

        let mut arrived = ctx(&away);
        arrived.position_global = remote_target();
        tp.on_region_attached(&arrived, Some(home.handle));
        assert_eq!(tp.state(), TeleportState::Arriving);
        assert_eq!(tp.arrival_region(), Some(away.handle));

        tp.on_arrival_complete(&arrived);
        assert_eq!(tp.state(), TeleportState::None);
        assert!(tp.departure().is_none());

        let events = tp.drain_events();
        assert_eq!(
            states(&events),
            vec![
                TeleportState::Start,
                TeleportState::Requested,
                TeleportState::Moving,
                TeleportState::StartArrival,
                TeleportState::Arriving,
                TeleportState::None,
            ]
        );
        assert!(has_effect(&events, &TeleportEffect::ClearStaleFetches));
        assert!(has_effect(&events, &TeleportEffect::DelayMeshFetches));
        assert!(refresh_scheduled(&events));
        assert!(has_effect(&events, &TeleportEffect::ResetView { change_camera: true }));
        assert!(has_effect(
            &events,
            &TeleportEffect::ParcelArrival {
                position_global: remote_target()
            }
        ));
        assert!(has_effect(&events, &TeleportEffect::HideProgress));
    }

    #[test]
    fn test_reattach_to_departure_region_skips_arrival() {
        let home = home_region();
        let c = ctx(&home);
        let mut link = FakeLink::default();
        let mut tp = sequencer();
        tp.teleport_via_lure(&c, &mut link, LureId(Uuid::new_v4()), false, Instant::now())
            .unwrap();
        tp.on_teleport_finish(&c, home.handle);

        let mut moved = c;
        moved.position_global += DVec3::new(10.0, 0.0, 0.0);
        tp.on_region_attached(&moved, Some(home.handle));

        let events = tp.drain_events();
        assert_eq!(tp.state(), TeleportState::None);
        assert!(!states(&events).contains(&TeleportState::StartArrival));
        assert!(!has_effect(&events, &TeleportEffect::ClearStaleFetches));
        assert!(!refresh_scheduled(&events));
    }

    #[test]
    fn test_border_crossing_schedules_refresh() {
        let home = home_region();
        let away = RegionContext::new(RegionHandle::from_origin(256_256, 256_000), "Morris");
        let mut tp = sequencer();
        tp.on_region_attached(&ctx(&away), Some(home.handle));
        assert_eq!(
            tp.drain_events(),
            vec![TeleportEvent::Effect(TeleportEffect::ScheduleVisibilityRefresh(
                RefreshKind::BorderCrossing
            ))]
        );

        tp.on_region_attached(&ctx(&away), Some(away.handle));
        assert!(tp.drain_events().is_empty());
    }

    #[test]
    fn test_cancel_after_send_notifies_server() {
        let region = home_region();
        let c = ctx(&region);
        let mut link = FakeLink::default();
        let mut tp = sequencer();
        tp.teleport_via_location(&c, &mut link, remote_target(), Instant::now())
            .unwrap();
        tp.drain_events();

        tp.cancel(&c, &mut link, "user cancelled").unwrap();
        assert_eq!(link.cancels, 1);
        assert_eq!(tp.state(), TeleportState::None);
        let events = tp.drain_events();
        assert_eq!(
            events[0],
            TeleportEvent::StateChanged {
                from: TeleportState::Start,
                to: TeleportState::None,
                reason: Some("user cancelled".to_string()),
            }
        );
        assert!(!refresh_scheduled(&events));
    }

    #[test]
    fn test_cancel_queued_request_sends_nothing() {
        let region = home_region();
        let c = ctx(&region);
        let mut link = FakeLink {
            in_flight: true,
            ..Default::default()
        };
        let mut tp = sequencer();
        tp.teleport_via_location(&c, &mut link, remote_target(), Instant::now())
            .unwrap();
        tp.cancel(&c, &mut link, "").unwrap();

        assert_eq!(link.cancels, 0);
        assert!(link.sent.is_empty());
        assert!(tp.queued().is_none());
        assert!(!tp.fire_queued(&c, &mut link, Instant::now() + Duration::from_secs(10)));
    }

    #[test]
    fn test_cannot_cancel_once_moving() {
        let region = home_region();
        let c = ctx(&region);
        let mut link = FakeLink::default();
        let mut tp = sequencer();
        tp.teleport_via_location(&c, &mut link, remote_target(), Instant::now())
            .unwrap();
        tp.on_teleport_finish(&c, RegionHandle::from_global(remote_target()));

        assert_eq!(
            tp.cancel(&c, &mut link, "too late"),
            Err(TeleportError::NotCancellable(TeleportState::Moving))
        );
        assert_eq!(tp.state(), TeleportState::Moving);
        assert_eq!(link.cancels, 0);
    }

    #[test]
    fn test_godlike_lure_cannot_be_cancelled() {
        let region = home_region();
        let c = ctx(&region);
        let mut link = FakeLink::default();
        let mut tp = sequencer();
        tp.teleport_via_lure(&c, &mut link, LureId(Uuid::new_v4()), true, Instant::now())
            .unwrap();
        assert!(tp.cancel(&c, &mut link, "no").is_err());
        assert_eq!(tp.state(), TeleportState::Start);
    }

    #[test]
    fn test_failure_carries_reason() {
        let region = home_region();
        let c = ctx(&region);
        let mut link = FakeLink::default();
        let mut tp = sequencer();
        tp.teleport_via_location(&c, &mut link, remote_target(), Instant::now())
            .unwrap();
        tp.drain_events();

        tp.on_failed(&c, "");
        let events = tp.drain_events();
        assert_eq!(tp.state(), TeleportState::None);
        assert!(matches!(
            &events[0],
            TeleportEvent::StateChanged { to: TeleportState::None, reason: Some(r), .. } if !r.is_empty()
        ));
        assert!(!refresh_scheduled(&events));
    }

    #[test]
    fn test_teleport_home_resets_view_before_sending() {
        let region = home_region();
        let mut link = FakeLink::default();
        let mut tp = sequencer();
        tp.teleport_via_landmark(&ctx(&region), &mut link, None, None, Instant::now())
            .unwrap();
        assert_eq!(tp.state(), TeleportState::Start);
        assert_eq!(link.sent, vec![TeleportPayload::Landmark { landmark: None }]);
        assert!(has_effect(&tp.drain_events(), &TeleportEffect::ResetView { change_camera: true }));
    }

    #[test]
    fn test_stray_callbacks_are_ignored() {
        let region = home_region();
        let c = ctx(&region);
        let mut tp = sequencer();
        tp.on_request_acknowledged(&c);
        tp.on_teleport_finish(&c, region.handle);
        tp.on_arrival_complete(&c);
        tp.on_local_complete(&c);
        tp.on_failed(&c, "nothing to fail");
        assert_eq!(tp.state(), TeleportState::None);
        assert!(tp.drain_events().is_empty());
    }

    #[test]
    fn test_local_completes_after_delay() {
        let region = home_region();
        let c = ctx(&region);
        let mut link = FakeLink::default();
        let mut tp = sequencer();
        let start = Instant::now();
        let target = DVec3::new(256_160.0, 256_100.0, 22.0);
        tp.teleport_via_location(&c, &mut link, target, start).unwrap();

        tp.update(&c, start);
        tp.update(&c, start + Duration::from_millis(900));
        assert_eq!(tp.state(), TeleportState::Local);

        tp.update(&c, start + Duration::from_millis(1000));
        assert_eq!(tp.state(), TeleportState::None);
        let events = tp.drain_events();
        assert!(events.iter().all(|e| !matches!(
            e,
            TeleportEvent::StateChanged { reason: Some(_), .. }
        )));
    }

    #[test]
    fn test_arriving_completes_after_delay() {
        let home = home_region();
        let away = RegionContext::new(RegionHandle::from_origin(256_512, 256_000), "Bonifacio");
        let mut link = FakeLink::default();
        let mut tp = sequencer();
        let start = Instant::now();
        tp.teleport_via_location(&ctx(&home), &mut link, remote_target(), start)
            .unwrap();
        tp.on_teleport_finish(&ctx(&home), away.handle);
        let arrived = ctx(&away);
        tp.on_region_attached(&arrived, Some(home.handle));
        assert_eq!(tp.state(), TeleportState::Arriving);

        let mut now = start;
        while now < start + Duration::from_millis(1900) {
            tp.update(&arrived, now);
            now += FRAME;
        }
        assert_eq!(tp.state(), TeleportState::Arriving);

        tp.update(&arrived, start + Duration::from_millis(2000));
        assert_eq!(tp.state(), TeleportState::None);
        assert!(tp.departure().is_none());
    }

    #[test]
    fn test_stalled_teleport_expires() {
        let home = home_region();
        let away = RegionHandle::from_origin(256_512, 256_000);
        let c = ctx(&home);
        let mut link = FakeLink::default();
        let mut tp = sequencer();
        let start = Instant::now();
        tp.teleport_via_location(&c, &mut link, remote_target(), start)
            .unwrap();
        tp.on_teleport_finish(&c, away);
        assert_eq!(tp.state(), TeleportState::Moving);
        tp.drain_events();

        tp.update(&c, start);
        tp.update(&c, start + Duration::from_millis(14_900));
        assert_eq!(tp.state(), TeleportState::Moving);

        tp.update(&c, start + Duration::from_secs(15));
        assert_eq!(tp.state(), TeleportState::None);
        let events = tp.drain_events();
        assert!(events.iter().any(|e| matches!(
            e,
            TeleportEvent::StateChanged { to: TeleportState::None, reason: Some(r), .. } if !r.is_empty()
        )));

        tp.teleport_via_location(&c, &mut link, remote_target(), start + Duration::from_secs(16))
            .unwrap();
        assert_eq!(tp.state(), TeleportState::Start);
    }

    #[test]
    fn test_attachments_extend_expiry() {
        let home = home_region();
        let mut c = ctx(&home);
        c.attachments = 2;
        let mut link = FakeLink::default();
        let mut tp = sequencer();
        let start = Instant::now();
        tp.teleport_via_location(&c, &mut link, remote_target(), start)
            .unwrap();
        tp.on_request_acknowledged(&c);
        assert_eq!(tp.state(), TeleportState::Requested);

        tp.update(&c, start);
        tp.update(&c, start + Duration::from_secs(20));
        assert_eq!(tp.state(), TeleportState::Requested);
        tp.update(&c, start + Duration::from_secs(21));
        assert_eq!(tp.state(), TeleportState::None);
    }

    #[test]
    fn test_start_and_queued_never_expire() {
        let region = home_region();
        let c = ctx(&region);
        let mut link = FakeLink {
            in_flight: true,
            ..Default::default()
        };
        let mut tp = sequencer();
        let start = Instant::now();
        tp.teleport_via_location(&c, &mut link, remote_target(), start)
            .unwrap();
        assert_eq!(tp.state(), TeleportState::Queued);

        tp.update(&c, start);
        tp.update(&c, start + Duration::from_secs(600));
        assert_eq!(tp.state(), TeleportState::Queued);
    }

    proptest! {
        #[test]
        fn begin_never_clobbers_active_session(
            x in 0.0f64..1_000_000.0,
            y in 0.0f64..1_000_000.0,
            z in 0.0f64..4096.0,
            in_flight: bool,
        ) {
            let region = home_region();
            let c = ctx(&region);
            let mut link = FakeLink { in_flight, ..Default::default() };
            let mut tp = sequencer();
            tp.teleport_via_location(&c, &mut link, remote_target(), Instant::now()).unwrap();
            let state = tp.state();
            let departure = tp.departure().cloned();

            let result = tp.begin(&c, &link, DVec3::new(x, y, z));
            prop_assert_eq!(result, Err(TeleportError::AlreadyActive(state)));
            prop_assert_eq!(tp.state(), state);
            prop_assert_eq!(tp.departure().cloned(), departure);
        }
    }
}
