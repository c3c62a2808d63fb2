//! The agent: ties the spatial frame, camera controller and teleport
//! sequencer together and routes their side effects.

use std::collections::HashSet;
use std::time::Instant;

use crossbeam_channel::Receiver;
use glam::{DVec3, Vec3};
use tracing::{debug, error, info, warn};
use vantage_camera::{
    AvatarPose, CameraContext, CameraController, CameraEvent, CameraMode, CameraPose, FollowCamera,
    InputSnapshot, ObjectId, RenderCamera, SceneView, SitCamera, clamp_pitch,
};
use vantage_config::Config;
use vantage_math::{RegionContext, RegionHandle, SpatialFrame};
use vantage_teleport::{
    LandmarkId, LureId, RefreshKind, SessionLink, TeleportContext, TeleportEffect, TeleportEvent,
    TeleportSequencer, TeleportState,
};

use crate::error::{PositionError, SettingsError};
use crate::event::AgentEvent;
use crate::input::{CameraKey, InputAccumulator, MovementDeltas};
use crate::network::NetworkEvent;
use crate::settings::{HomePosition, SettingsStore};

/// External systems the agent reads or drives during a call.
pub struct Collaborators<'a> {
    pub scene: &'a dyn SceneView,
    pub follow: &'a mut dyn FollowCamera,
    pub link: &'a mut dyn SessionLink,
    pub render: &'a mut dyn RenderCamera,
}

/// A teleport as requested by the UI.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TeleportRequest {
    /// Arrive facing the region center.
    Location(DVec3),
    /// Arrive facing the way the camera looks now.
    LocationLookAt(DVec3),
    /// `None` is home. The position is the landmark's, when known.
    Landmark {
        landmark: Option<LandmarkId>,
        position_global: Option<DVec3>,
    },
    Lure { lure: LureId, godlike: bool },
}

pub struct Agent {
    config: Config,
    frame: SpatialFrame,
    avatar: AvatarPose,
    region: Option<RegionContext>,
    regions_visited: HashSet<RegionHandle>,
    attachments: u32,
    camera: CameraController,
    teleport: TeleportSequencer,
    input: InputAccumulator,
    network: Receiver<NetworkEvent>,
    settings: Box<dyn SettingsStore>,
    pending_refresh: Option<RefreshKind>,
    events: Vec<AgentEvent>,
}

fn teleport_context<'a>(
    region: Option<&'a RegionContext>,
    avatar: &AvatarPose,
    camera: &CameraController,
    draw_distance: f32,
    attachments: u32,
) -> TeleportContext<'a> {
    let pose = camera.pose();
    let camera_at = (pose.focus_global - pose.position_global)
        .as_vec3()
        .normalize_or(Vec3::X);
    TeleportContext {
        region,
        position_global: avatar.position_global,
        camera_at,
        sitting: avatar.sitting,
        draw_distance,
        attachments,
    }
}

impl Agent {
    pub fn new(config: &Config, network: Receiver<NetworkEvent>, settings: Box<dyn SettingsStore>) -> Self {
        Self {
            config: config.clone(),
            frame: SpatialFrame::new(),
            avatar: AvatarPose::default(),
            region: None,
            regions_visited: HashSet::new(),
            attachments: 0,
            camera: CameraController::new(&config.camera, config.render.draw_distance),
            teleport: TeleportSequencer::new(&config.teleport),
            input: InputAccumulator::default(),
            network,
            settings,
            pending_refresh: None,
            events: Vec::new(),
        }
    }

    /// Apply a reloaded configuration.
    pub fn set_config(&mut self, config: &Config) {
        self.camera.set_config(&config.camera);
        self.camera.set_draw_distance(config.render.draw_distance);
        self.teleport.set_config(&config.teleport);
        self.config = config.clone();
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn camera(&self) -> &CameraController {
        &self.camera
    }

    pub fn camera_mode(&self) -> CameraMode {
        self.camera.mode()
    }

    pub fn teleport(&self) -> &TeleportSequencer {
        &self.teleport
    }

    pub fn teleport_state(&self) -> TeleportState {
        self.teleport.state()
    }

    pub fn frame(&self) -> &SpatialFrame {
        &self.frame
    }

    pub fn avatar(&self) -> &AvatarPose {
        &self.avatar
    }

    /// Mutable avatar state the simulation owns: velocity, sitting, flight.
    pub fn avatar_mut(&mut self) -> &mut AvatarPose {
        &mut self.avatar
    }

    pub fn region(&self) -> Option<&RegionContext> {
        self.region.as_ref()
    }

    pub fn regions_visited(&self) -> &HashSet<RegionHandle> {
        &self.regions_visited
    }

    pub fn position_global(&self) -> DVec3 {
        self.avatar.position_global
    }

    /// Position relative to the current region's origin.
    pub fn position_agent(&self) -> Vec3 {
        self.frame.origin()
    }

    /// "Region (x, y, z)" for the avatar's current position.
    pub fn location_string(&self) -> Option<String> {
        let region = self.region.as_ref()?;
        Some(region.location_string(region.global_to_local(self.avatar.position_global)))
    }

    pub fn drain_events(&mut self) -> Vec<AgentEvent> {
        std::mem::take(&mut self.events)
    }

    /// The pending visibility refresh, if a teleport or border crossing
    /// scheduled one.
    pub fn take_visibility_refresh(&mut self) -> Option<RefreshKind> {
        self.pending_refresh.take()
    }

    // ── Position ───────────────────────────────────────────────────

    /// Place the avatar at a region-local position.
    pub fn set_position_agent(&mut self, position: Vec3) -> Result<(), PositionError> {
        let global = match &self.region {
            Some(region) => region.local_to_global(position),
            None => position.as_dvec3(),
        };
        self.set_position_global(global)
    }

    pub fn set_position_global(&mut self, position: DVec3) -> Result<(), PositionError> {
        if !position.is_finite() {
            error!(target: "agent", ?position, "rejecting non-finite agent position");
            return Err(PositionError::NonFinite(position));
        }
        self.avatar.position_global = position;
        let local = match &self.region {
            Some(region) => region.global_to_local(position),
            None => position.as_vec3(),
        };
        self.frame.set_origin(local);
        Ok(())
    }

    /// Number of worn attachments; a teleport waits longer for heavier avatars.
    pub fn set_attachment_count(&mut self, count: u32) {
        self.attachments = count;
    }

    /// Turn the avatar to look along `look_at`, keeping it upright.
    pub fn reset_axes(&mut self, look_at: Vec3) {
        if !self.frame.look_along(look_at, Vec3::Z) {
            debug!(target: "agent", ?look_at, "ignoring degenerate look direction");
        }
    }

    /// Attach to a new authoritative region.
    pub fn set_region(&mut self, region: RegionContext, collab: &mut Collaborators<'_>) {
        let previous = self.region.as_ref().map(|r| r.handle);
        if previous != Some(region.handle) {
            info!(target: "agent", region = %region.handle, name = %region.name, "entered region");
            self.events.push(AgentEvent::RegionChanged {
                from: previous,
                to: region.handle,
            });
        }
        self.regions_visited.insert(region.handle);
        self.frame
            .set_origin(region.global_to_local(self.avatar.position_global));
        self.region = Some(region);

        let ctx = teleport_context(
            self.region.as_ref(),
            &self.avatar,
            &self.camera,
            self.config.render.draw_distance,
            self.attachments,
        );
        self.teleport.on_region_attached(&ctx, previous);
        self.dispatch_teleport_events(collab);
    }

    // ── Home ───────────────────────────────────────────────────────

    pub fn set_home_position(&mut self, region: RegionHandle, position_local: Vec3) -> Result<(), SettingsError> {
        let home = HomePosition { region, position_local };
        home.save(self.settings.as_mut())?;
        info!(target: "agent", region = %region, ?position_local, "home position set");
        Ok(())
    }

    /// The stored home position. A corrupt setting reads as unset.
    pub fn home_position(&self) -> Option<HomePosition> {
        match HomePosition::load(self.settings.as_ref()) {
            Ok(home) => home,
            Err(e) => {
                warn!(target: "agent", error = %e, "ignoring stored home position");
                None
            }
        }
    }

    pub fn home_position_global(&self) -> Option<DVec3> {
        self.home_position().map(|home| home.position_global())
    }

    // ── Input ──────────────────────────────────────────────────────

    pub fn move_at(&mut self, amount: f32) {
        self.input.move_at(amount);
    }

    pub fn move_left(&mut self, amount: f32) {
        self.input.move_left(amount);
    }

    pub fn move_up(&mut self, amount: f32) {
        self.input.move_up(amount);
    }

    pub fn move_yaw(&mut self, radians: f32) {
        self.input.move_yaw(radians);
    }

    pub fn move_pitch(&mut self, radians: f32) {
        self.input.move_pitch(radians);
    }

    pub fn camera_key(&mut self, key: CameraKey, amount: f32) {
        self.input.camera_key(key, amount);
    }

    // ── Teleports ──────────────────────────────────────────────────

    /// Start a teleport. Returns `false` when the request was rejected,
    /// e.g. because another teleport is in progress.
    pub fn request_teleport(&mut self, request: TeleportRequest, collab: &mut Collaborators<'_>, now: Instant) -> bool {
        let ctx = teleport_context(
            self.region.as_ref(),
            &self.avatar,
            &self.camera,
            self.config.render.draw_distance,
            self.attachments,
        );
        let link = &mut *collab.link;
        let result = match request {
            TeleportRequest::Location(position) => self.teleport.teleport_via_location(&ctx, link, position, now),
            TeleportRequest::LocationLookAt(position) => {
                self.teleport.teleport_via_location_look_at(&ctx, link, position, now)
            }
            TeleportRequest::Landmark {
                landmark,
                position_global,
            } => self
                .teleport
                .teleport_via_landmark(&ctx, link, landmark, position_global, now),
            TeleportRequest::Lure { lure, godlike } => self.teleport.teleport_via_lure(&ctx, link, lure, godlike, now),
        };

        match result {
            Ok(state) => {
                debug!(target: "agent", ?request, %state, "teleport accepted");
                self.dispatch_teleport_events(collab);
                true
            }
            Err(e) => {
                warn!(target: "agent", error = %e, "teleport request rejected");
                false
            }
        }
    }

    pub fn teleport_home(&mut self, collab: &mut Collaborators<'_>, now: Instant) -> bool {
        self.request_teleport(
            TeleportRequest::Landmark {
                landmark: None,
                position_global: None,
            },
            collab,
            now,
        )
    }

    pub fn cancel_teleport(&mut self, reason: &str, collab: &mut Collaborators<'_>) -> bool {
        let ctx = teleport_context(
            self.region.as_ref(),
            &self.avatar,
            &self.camera,
            self.config.render.draw_distance,
            self.attachments,
        );
        match self.teleport.cancel(&ctx, &mut *collab.link, reason) {
            Ok(()) => {
                self.dispatch_teleport_events(collab);
                true
            }
            Err(e) => {
                debug!(target: "agent", error = %e, "cancel refused");
                false
            }
        }
    }

    // ── Camera ─────────────────────────────────────────────────────

    pub fn focus_on_object(&mut self, id: ObjectId, offset: Vec3, collab: &mut Collaborators<'_>) -> bool {
        self.with_camera(collab, |camera, ctx| camera.focus_on_object(ctx, id, offset))
    }

    pub fn clear_focus(&mut self, collab: &mut Collaborators<'_>) {
        self.with_camera(collab, |camera, ctx| camera.clear_focus(ctx));
    }

    pub fn camera_zoom_fraction(&mut self, collab: &mut Collaborators<'_>) -> f32 {
        self.with_camera(collab, |camera, ctx| camera.camera_zoom_fraction(ctx))
    }

    pub fn set_camera_zoom_fraction(&mut self, fraction: f32, collab: &mut Collaborators<'_>) {
        self.with_camera(collab, |camera, ctx| camera.set_camera_zoom_fraction(ctx, fraction));
    }

    pub fn handle_scroll_wheel(&mut self, clicks: i32, collab: &mut Collaborators<'_>) {
        self.with_camera(collab, |camera, ctx| camera.handle_scroll_wheel(ctx, clicks));
    }

    pub fn enter_mouselook(&mut self, animate: bool, collab: &mut Collaborators<'_>) -> bool {
        self.with_camera(collab, |camera, ctx| camera.enter_mouselook(ctx, animate))
    }

    pub fn enter_default(&mut self, animate: bool, collab: &mut Collaborators<'_>) -> bool {
        self.with_camera(collab, |camera, ctx| camera.enter_default(ctx, animate))
    }

    pub fn enter_customize_avatar(&mut self, collab: &mut Collaborators<'_>) -> bool {
        self.with_camera(collab, |camera, ctx| camera.enter_customize_avatar(ctx))
    }

    pub fn reset_view(&mut self, collab: &mut Collaborators<'_>) {
        self.with_camera(collab, |camera, ctx| camera.reset_view(ctx, true, false));
    }

    pub fn on_app_focus_gained(&mut self, collab: &mut Collaborators<'_>) {
        self.with_camera(collab, |camera, ctx| camera.on_app_focus_gained(ctx));
    }

    pub fn set_sit_camera(&mut self, sit_camera: Option<SitCamera>, collab: &mut Collaborators<'_>) {
        self.with_camera(collab, |camera, ctx| camera.set_sit_camera(ctx, sit_camera));
    }

    // ── Frame ──────────────────────────────────────────────────────

    /// Advance one frame: apply network events and accumulated input, fire
    /// any queued teleport, then solve and render the camera.
    pub fn tick(&mut self, dt: f32, now: Instant, collab: &mut Collaborators<'_>) -> CameraPose {
        self.process_network_events(collab);

        let (movement, camera_input) = self.input.take();
        self.apply_movement(movement, collab);

        let ctx = teleport_context(
            self.region.as_ref(),
            &self.avatar,
            &self.camera,
            self.config.render.draw_distance,
            self.attachments,
        );
        self.teleport.fire_queued(&ctx, &mut *collab.link, now);
        self.teleport.update(&ctx, now);
        self.dispatch_teleport_events(collab);

        let pose = self.update_camera(&camera_input, dt, collab);
        self.forward_camera_events();
        pose
    }

    fn update_camera(&mut self, input: &InputSnapshot, dt: f32, collab: &mut Collaborators<'_>) -> CameraPose {
        let mut ctx = CameraContext {
            frame: &mut self.frame,
            avatar: &self.avatar,
            region: self.region.as_ref(),
            scene: collab.scene,
            follow: &mut *collab.follow,
        };
        self.camera.update(&mut ctx, input, dt, &mut *collab.render)
    }

    fn apply_movement(&mut self, movement: MovementDeltas, collab: &mut Collaborators<'_>) {
        if movement.is_zero() {
            return;
        }

        // Walking off brings a detached camera back to the avatar.
        if movement.translates() && !self.camera.focus().on_avatar && self.camera.mode() != CameraMode::Mouselook {
            self.with_camera(collab, |camera, ctx| camera.reset_view(ctx, true, false));
        }
        if movement.yaw != 0.0 {
            self.frame.rotate(movement.yaw, Vec3::Z);
        }
        if movement.pitch != 0.0 {
            let pitch = clamp_pitch(&self.frame, self.avatar.sitting, movement.pitch);
            self.frame.pitch(pitch);
        }
        self.events.push(AgentEvent::Movement(movement));
    }

    fn process_network_events(&mut self, collab: &mut Collaborators<'_>) {
        while let Ok(event) = self.network.try_recv() {
            self.handle_network_event(event, collab);
        }
    }

    fn handle_network_event(&mut self, event: NetworkEvent, collab: &mut Collaborators<'_>) {
        debug!(target: "agent", ?event, "network event");
        let position = match &event {
            NetworkEvent::TeleportLocal {
                position_global: Some(position),
            }
            | NetworkEvent::MovementComplete {
                position_global: position,
            }
            | NetworkEvent::AgentPosition {
                position_global: position,
            } => Some(*position),
            _ => None,
        };
        if let Some(position) = position
            && let Err(e) = self.set_position_global(position)
        {
            // A teleport in progress still advances.
            debug!(target: "agent", error = %e, "ignoring network position");
        }

        let ctx = teleport_context(
            self.region.as_ref(),
            &self.avatar,
            &self.camera,
            self.config.render.draw_distance,
            self.attachments,
        );
        match event {
            NetworkEvent::RegionAttached(region) => {
                self.set_region(region, collab);
                return;
            }
            NetworkEvent::TeleportStarted => self.teleport.on_request_acknowledged(&ctx),
            NetworkEvent::TeleportFinished { region } => self.teleport.on_teleport_finish(&ctx, region),
            NetworkEvent::TeleportLocal { .. } => self.teleport.on_local_complete(&ctx),
            NetworkEvent::TeleportFailed { reason } => self.teleport.on_failed(&ctx, &reason),
            NetworkEvent::MovementComplete { .. } => self.teleport.on_arrival_complete(&ctx),
            NetworkEvent::AgentPosition { .. } => {}
        }
        self.dispatch_teleport_events(collab);
    }

    // ── Effects ────────────────────────────────────────────────────

    fn dispatch_teleport_events(&mut self, collab: &mut Collaborators<'_>) {
        for event in self.teleport.drain_events() {
            match event {
                TeleportEvent::StateChanged { from, to, reason } => {
                    self.events
                        .push(AgentEvent::TeleportStateChanged { from, to, reason });
                }
                TeleportEvent::Effect(effect) => {
                    self.apply_teleport_effect(&effect, collab);
                    self.events.push(AgentEvent::Teleport(effect));
                }
            }
        }
    }

    /// Effects that touch state the agent owns are applied here; all of
    /// them are still forwarded to the host.
    fn apply_teleport_effect(&mut self, effect: &TeleportEffect, collab: &mut Collaborators<'_>) {
        match *effect {
            TeleportEffect::ResetView { change_camera } => {
                self.with_camera(collab, |camera, ctx| camera.reset_view(ctx, change_camera, change_camera));
            }
            TeleportEffect::DetachCameraFocus => {
                self.with_camera(collab, |camera, ctx| camera.set_focus_on_avatar(ctx, false, false));
            }
            TeleportEffect::ScheduleVisibilityRefresh(kind) => {
                self.pending_refresh = Some(kind);
            }
            _ => {}
        }
    }

    fn with_camera<R>(
        &mut self,
        collab: &mut Collaborators<'_>,
        f: impl FnOnce(&mut CameraController, &mut CameraContext<'_>) -> R,
    ) -> R {
        let result = {
            let mut ctx = CameraContext {
                frame: &mut self.frame,
                avatar: &self.avatar,
                region: self.region.as_ref(),
                scene: collab.scene,
                follow: &mut *collab.follow,
            };
            f(&mut self.camera, &mut ctx)
        };
        self.forward_camera_events();
        result
    }

    fn forward_camera_events(&mut self) {
        for event in self.camera.drain_events() {
            self.events.push(match event {
                CameraEvent::ModeChanged { from, to } => AgentEvent::CameraModeChanged { from, to },
                CameraEvent::Effect(effect) => AgentEvent::Camera(effect),
            });
        }
    }
}
