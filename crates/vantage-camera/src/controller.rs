//! Camera controller: the mode state machine and the per-avatar camera state
//! carried between frames.

use glam::{DVec3, Vec3};
use tracing::{debug, info, warn};
use vantage_config::CameraConfig;
use vantage_math::{RegionContext, SpatialFrame};

use crate::collide::CollidePlane;
use crate::effects::{CameraEffect, CameraEvent, Toolset};
use crate::focus::FocusTarget;
use crate::follow::FollowCamera;
use crate::limits::{
    DistanceBounds, DistanceQuery, FocusKind, INITIAL_ZOOM_FRACTION, MIN_CAMERA_DISTANCE,
    clamp_camera_distance,
};
use crate::mode::CameraMode;
use crate::scene::{AvatarPose, ObjectId, SceneObject, SceneView};
use crate::smoothing::CameraSmoother;
use crate::solver::{
    CameraDamping, CameraOffsets, FollowView, PoseInputs, SitCameraView, body_rotation,
    mouselook_position,
};
use crate::transition::CameraAnimation;

/// Extra time for the customize animation to settle before the UI switches.
const CUSTOMIZE_AVATAR_CAMERA_ANIM_SLOP: f32 = 0.2;

const ANIM_METERS_PER_SECOND: f64 = 10.0;
const MIN_ANIM_SECONDS: f64 = 0.5;
const MAX_ANIM_SECONDS: f64 = 10.0;
const ANIM_EPSILON_SQUARED: f64 = 0.0001;

/// Collaborators the controller reads or drives during a call.
pub struct CameraContext<'a> {
    pub frame: &'a mut SpatialFrame,
    pub avatar: &'a AvatarPose,
    pub region: Option<&'a RegionContext>,
    pub scene: &'a dyn SceneView,
    pub follow: &'a mut dyn FollowCamera,
}

/// Final camera pose of the last update.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraPose {
    pub position_global: DVec3,
    pub focus_global: DVec3,
    pub up: Vec3,
    pub fov_radians: f32,
}

/// Camera placement requested by the object the avatar sits on, in the
/// seat's frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SitCamera {
    pub seat: ObjectId,
    pub camera: Vec3,
    pub focus: Vec3,
}

/// An exclusive input device (e.g. a 3D mouse) that drives the camera itself.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ExternalOverride {
    /// Mode changes are still allowed because they only change distance.
    pub permits_distance_changes: bool,
}

/// Distance limits imposed from outside, e.g. by a script.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DistanceConstraint {
    pub min: Option<f32>,
    /// A maximum of zero or less forces first person.
    pub max: Option<f32>,
}

/// Zoom settings saved on entering first person and restored on leaving it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ZoomState {
    pub zoom_fraction: f32,
    pub focus_offset_target: DVec3,
}

/// Per-avatar camera controller.
pub struct CameraController {
    pub(crate) config: CameraConfig,
    pub(crate) draw_distance: f32,
    pub(crate) offsets: CameraOffsets,

    pub(crate) mode: CameraMode,
    pub(crate) last_mode: CameraMode,
    pub(crate) animation: Option<CameraAnimation>,

    pub(crate) focus: FocusTarget,
    /// Animated focus actually used last frame.
    pub(crate) focus_global: DVec3,
    pub(crate) camera_focus_offset: DVec3,
    pub(crate) camera_focus_offset_target: DVec3,
    /// Camera target before the FOV push-back.
    pub(crate) virtual_position_global: DVec3,

    pub(crate) zoom_fraction: f32,
    pub(crate) mouselook_restore: Option<ZoomState>,
    pub(crate) damping: CameraDamping,
    pub(crate) fov_zoom_factor: f32,
    pub(crate) current_fov_zoom_factor: f32,
    pub(crate) smoother: CameraSmoother,

    pub(crate) collide_plane: Option<CollidePlane>,
    pub(crate) sit_camera: Option<SitCamera>,
    pub(crate) external_override: Option<ExternalOverride>,
    pub(crate) distance_constraint: DistanceConstraint,

    pub(crate) views_pushed: bool,
    pub(crate) customize_anim: bool,
    pub(crate) show_avatar: bool,
    pub(crate) hit_limit: bool,
    pub(crate) pose: CameraPose,
    pub(crate) events: Vec<CameraEvent>,
}

impl CameraController {
    #[must_use]
    pub fn new(config: &CameraConfig, draw_distance: f32) -> Self {
        Self {
            config: config.clone(),
            draw_distance,
            offsets: CameraOffsets::from_config(config),
            mode: CameraMode::ThirdPerson,
            last_mode: CameraMode::ThirdPerson,
            animation: None,
            focus: FocusTarget::default(),
            focus_global: DVec3::ZERO,
            camera_focus_offset: DVec3::ZERO,
            camera_focus_offset_target: DVec3::ZERO,
            virtual_position_global: DVec3::ZERO,
            zoom_fraction: INITIAL_ZOOM_FRACTION,
            mouselook_restore: None,
            damping: CameraDamping::default(),
            fov_zoom_factor: 0.0,
            current_fov_zoom_factor: 0.0,
            smoother: CameraSmoother::default(),
            collide_plane: None,
            sit_camera: None,
            external_override: None,
            distance_constraint: DistanceConstraint::default(),
            views_pushed: false,
            customize_anim: false,
            show_avatar: true,
            hit_limit: false,
            pose: CameraPose {
                position_global: DVec3::ZERO,
                focus_global: DVec3::ZERO,
                up: Vec3::Z,
                fov_radians: config.default_fov_radians,
            },
            events: Vec::new(),
        }
    }

    /// Apply reloaded tunables. Mode and focus are left alone.
    pub fn set_config(&mut self, config: &CameraConfig) {
        self.config = config.clone();
        self.offsets = CameraOffsets::from_config(config);
    }

    pub fn config(&self) -> &CameraConfig {
        &self.config
    }

    pub fn set_draw_distance(&mut self, draw_distance: f32) {
        self.draw_distance = draw_distance;
    }

    // ── Accessors ──────────────────────────────────────────────────

    pub fn mode(&self) -> CameraMode {
        self.mode
    }

    pub fn last_mode(&self) -> CameraMode {
        self.last_mode
    }

    /// Mode that governs the up vector: the previous mode until an animation
    /// into the current one finishes.
    pub fn effective_mode(&self) -> CameraMode {
        if self.animation.is_some() {
            self.last_mode
        } else {
            self.mode
        }
    }

    pub fn is_animating(&self) -> bool {
        self.animation.is_some()
    }

    pub fn pose(&self) -> &CameraPose {
        &self.pose
    }

    pub fn focus(&self) -> &FocusTarget {
        &self.focus
    }

    pub fn zoom_state(&self) -> ZoomState {
        ZoomState {
            zoom_fraction: self.zoom_fraction,
            focus_offset_target: self.camera_focus_offset_target,
        }
    }

    pub fn damping(&self) -> &CameraDamping {
        &self.damping
    }

    pub fn fov_zoom_factor(&self) -> f32 {
        self.fov_zoom_factor
    }

    pub fn current_fov_zoom_factor(&self) -> f32 {
        self.current_fov_zoom_factor
    }

    pub fn show_avatar(&self) -> bool {
        self.show_avatar
    }

    pub fn hit_limit(&self) -> bool {
        self.hit_limit
    }

    pub fn sit_camera(&self) -> Option<&SitCamera> {
        self.sit_camera.as_ref()
    }

    /// Take queued mode changes and side effects, oldest first.
    pub fn drain_events(&mut self) -> Vec<CameraEvent> {
        std::mem::take(&mut self.events)
    }

    // ── Collaborator settings ──────────────────────────────────────

    pub fn set_collide_plane(&mut self, plane: Option<CollidePlane>) {
        self.collide_plane = plane;
    }

    pub fn set_external_override(&mut self, external: Option<ExternalOverride>) {
        self.external_override = external;
    }

    pub fn set_distance_constraint(&mut self, constraint: DistanceConstraint) {
        self.distance_constraint = constraint;
    }

    /// Use the seat's camera placement while sitting on `seat`. Ignored when
    /// the seat does not exist.
    pub fn set_sit_camera(&mut self, ctx: &CameraContext<'_>, sit_camera: Option<SitCamera>) {
        match sit_camera {
            Some(sit) if ctx.scene.object(sit.seat).is_none() => {
                warn!(target: "camera", seat = %sit.seat, "sit camera seat not found");
            }
            other => self.sit_camera = other,
        }
    }

    /// Switch between the rear and front third-person offsets.
    pub fn set_front_view(&mut self, front_view: bool) {
        self.config.front_view = front_view;
        self.offsets = CameraOffsets::from_config(&self.config);
    }

    // ── Mode transitions ───────────────────────────────────────────

    /// Mode changes are refused while an exclusive override drives the camera.
    fn entry_blocked(&self) -> bool {
        self.external_override
            .is_some_and(|o| !o.permits_distance_changes)
    }

    pub fn enter_mouselook(&mut self, ctx: &mut CameraContext<'_>, animate: bool) -> bool {
        if self.entry_blocked() {
            return false;
        }

        self.push(CameraEffect::CloseMenus);
        self.push(CameraEffect::ResumeAvatar);
        self.push(CameraEffect::SetToolset(Toolset::Mouselook));
        self.push(CameraEffect::CloseBuildTools);
        self.setup_camera_view(true);
        self.push(CameraEffect::StopIdleMotions);
        self.push(CameraEffect::Deselect);
        self.push(CameraEffect::HidePointer);
        self.push(CameraEffect::CenterPointer);

        if self.mode != CameraMode::Mouselook {
            self.push(CameraEffect::ClearKeyboardFocus);
            self.mouselook_restore = Some(self.zoom_state());
            self.switch_mode(CameraMode::Mouselook);
            if animate {
                self.start_animation();
            } else {
                self.animation = None;
                self.end_animation_update_ui(ctx);
            }
        }
        true
    }

    pub fn enter_third_person(&mut self, ctx: &mut CameraContext<'_>, animate: bool) -> bool {
        if self.entry_blocked() {
            return false;
        }

        let restore = if self.mode == CameraMode::Mouselook {
            self.mouselook_restore.take()
        } else {
            None
        };
        self.zoom_fraction = restore.map_or(INITIAL_ZOOM_FRACTION, |r| r.zoom_fraction);

        self.push(CameraEffect::StartIdleMotions);
        self.push(CameraEffect::ResumeAvatar);

        let mut animate = animate;
        if self.mode != CameraMode::ThirdPerson {
            self.push(CameraEffect::SetToolset(Toolset::Basic));
            self.push(CameraEffect::CloseBuildTools);
            self.damping.lag = Vec3::ZERO;
            if self.mode == CameraMode::Mouselook {
                self.damping.current_distance = MIN_CAMERA_DISTANCE;
                self.damping.target_distance = MIN_CAMERA_DISTANCE;
                if let Some(restore) = restore {
                    self.camera_focus_offset_target = restore.focus_offset_target;
                }
                animate = false;
            }
            self.switch_mode(CameraMode::ThirdPerson);
        }

        level_frame(ctx.frame);

        if animate {
            self.start_animation();
        } else {
            self.animation = None;
            self.end_animation_update_ui(ctx);
        }
        true
    }

    pub fn enter_follow(&mut self, ctx: &mut CameraContext<'_>, animate: bool) -> bool {
        if self.entry_blocked() {
            return false;
        }
        if self.mode == CameraMode::Follow {
            return true;
        }

        let animate = animate && self.mode != CameraMode::Mouselook;
        self.switch_mode(CameraMode::Follow);
        ctx.follow
            .reset(self.pose.position_global, self.focus_global, Vec3::Z);

        self.push(CameraEffect::SetToolset(Toolset::Basic));
        self.push(CameraEffect::StartIdleMotions);
        self.push(CameraEffect::CloseBuildTools);
        self.push(CameraEffect::ResumeAvatar);

        if animate {
            self.start_animation();
        } else {
            self.animation = None;
            self.end_animation_update_ui(ctx);
        }
        true
    }

    pub fn enter_customize_avatar(&mut self, ctx: &mut CameraContext<'_>) -> bool {
        if self.entry_blocked() {
            return false;
        }

        let animate = self.config.appearance_animation;
        if animate && ctx.avatar.sitting {
            self.push(CameraEffect::StandUp);
        }
        self.push(CameraEffect::CloseBuildTools);
        self.push(CameraEffect::SetToolset(Toolset::FaceEdit));

        if self.mode != CameraMode::CustomizeAvatar {
            self.start_animation();
            self.setup_camera_view(true);
            self.switch_mode(CameraMode::CustomizeAvatar);
            self.push(CameraEffect::ClearKeyboardFocus);

            if animate {
                level_frame(ctx.frame);
                self.push(CameraEffect::StartCustomizeAnimation);
                self.customize_anim = true;
                let duration = self.config.zoom_time_secs + CUSTOMIZE_AVATAR_CAMERA_ANIM_SLOP;
                if let Some(animation) = self.animation.as_mut() {
                    animation.set_duration(duration);
                }
            }
            self.set_focus_global(ctx, DVec3::ZERO, None);
        }
        true
    }

    /// Follow when a follow camera is active, otherwise third person.
    pub fn enter_default(&mut self, ctx: &mut CameraContext<'_>, animate: bool) -> bool {
        if self.entry_blocked() {
            return false;
        }
        if ctx.follow.is_active() {
            self.enter_follow(ctx, animate)
        } else {
            self.enter_third_person(ctx, animate)
        }
    }

    /// Apply the UI side effects of leaving the last mode and entering the
    /// current one. Runs when a mode animation finishes, or immediately for
    /// unanimated switches.
    pub fn end_animation_update_ui(&mut self, ctx: &mut CameraContext<'_>) {
        if self.mode == self.last_mode {
            return;
        }

        match self.last_mode {
            CameraMode::Mouselook => {
                self.push(CameraEffect::ShowPointer);
                self.push(CameraEffect::ShowMenus);
                self.push(CameraEffect::SetToolset(Toolset::Basic));
                if self.views_pushed {
                    self.views_pushed = false;
                    self.push(CameraEffect::PopFloaters);
                }
                self.push(CameraEffect::ClearLookAt);
                self.push(CameraEffect::SwapWeaponAnimations { aimed: false });
            }
            CameraMode::CustomizeAvatar => {
                self.push(CameraEffect::SetToolset(Toolset::Basic));
                self.push(CameraEffect::ShowMiniMap);
                if self.customize_anim {
                    self.customize_anim = false;
                    self.push(CameraEffect::StopCustomizeAnimation);
                }
                self.push(CameraEffect::ClearLookAt);
            }
            CameraMode::ThirdPerson | CameraMode::Follow => {}
        }

        match self.mode {
            CameraMode::Mouselook => {
                self.push(CameraEffect::HideMenus);
                self.damping.lag = Vec3::ZERO;
                self.push(CameraEffect::ClearKeyboardFocus);
                self.push(CameraEffect::SetToolset(Toolset::Mouselook));
                self.views_pushed = true;
                self.push(CameraEffect::PushFloaters);
                self.push(CameraEffect::SwapWeaponAnimations { aimed: true });

                // A seated avatar takes over the direction the camera was facing.
                if ctx.avatar.sitting {
                    let at = self.camera_at_axis();
                    let at = match ctx.avatar.parent_rotation {
                        Some(parent) => parent.inverse() * at,
                        None => at,
                    };
                    ctx.frame.look_along(at, Vec3::Z);
                }
            }
            CameraMode::CustomizeAvatar => {
                self.push(CameraEffect::SetToolset(Toolset::FaceEdit));
                self.push(CameraEffect::HideMiniMap);
                self.push(CameraEffect::PauseAvatar);
            }
            CameraMode::ThirdPerson | CameraMode::Follow => {}
        }

        self.push(CameraEffect::UpdateAttachmentVisibility(self.mode));
        self.last_mode = self.mode;
    }

    /// First person is dropped when the application loses and regains focus.
    pub fn on_app_focus_gained(&mut self, ctx: &mut CameraContext<'_>) {
        if self.mode == CameraMode::Mouselook {
            self.enter_default(ctx, true);
        }
    }

    /// Return to the default view: menus closed, optionally back to the
    /// default mode and refocused on the avatar.
    pub fn reset_view(&mut self, ctx: &mut CameraContext<'_>, reset_camera: bool, change_camera: bool) {
        let was_customizing = self.mode == CameraMode::CustomizeAvatar;
        self.push(CameraEffect::CloseMenus);

        if change_camera {
            self.enter_default(ctx, true);
            self.push(CameraEffect::ShowPointer);
            self.push(CameraEffect::SetToolset(Toolset::Basic));
            self.push(CameraEffect::CloseBuildTools);
        }

        if reset_camera && (!was_customizing || self.config.appearance_animation) {
            if self.mode == CameraMode::ThirdPerson {
                level_frame(ctx.frame);
            }
            self.set_focus_on_avatar(ctx, true, true);
            self.fov_zoom_factor = 0.0;
        }
        self.hit_limit = false;
    }

    /// Level the avatar and drop any FOV push-back.
    pub fn reset_camera(&mut self, ctx: &mut CameraContext<'_>) {
        level_frame(ctx.frame);
        self.fov_zoom_factor = 0.0;
    }

    // ── Focus ──────────────────────────────────────────────────────

    /// Focus on a point, optionally bound to an object. A zero point focuses
    /// on the avatar's head.
    pub fn set_focus_global(&mut self, ctx: &mut CameraContext<'_>, focus: DVec3, object: Option<ObjectId>) {
        let object = object
            .and_then(|id| ctx.scene.object(id))
            .map(|o| attachment_owner(ctx.scene, o));
        let old_target = self.focus.target_global;

        if focus == DVec3::ZERO {
            let head = mouselook_position(ctx.frame, ctx.avatar);
            self.focus.target_global = head;
            self.camera_focus_offset_target = self.pose.position_global - head;
            self.camera_focus_offset = self.camera_focus_offset_target;
            self.push(CameraEffect::ClearLookAt);
        } else if old_target != focus {
            self.focus.target_global = focus;
            if object.is_none() {
                self.fov_zoom_factor = 0.0;
            }
            self.camera_focus_offset_target = self.virtual_position_global - focus;
            self.start_animation();
        } else {
            let scale = 1.0 + f64::from(self.fov_zoom_factor);
            self.camera_focus_offset_target = (self.pose.position_global - focus) / scale;
            self.camera_focus_offset = self.camera_focus_offset_target;
        }

        self.bind_focus_object(object.as_ref());
    }

    /// Place the camera and focus explicitly, e.g. for a scripted move.
    /// The animation takes longer for longer focus jumps.
    pub fn set_camera_pos_and_focus_global(
        &mut self,
        ctx: &mut CameraContext<'_>,
        camera: DVec3,
        focus: DVec3,
        object: Option<ObjectId>,
    ) {
        let old_focus = if self.focus.target_global == DVec3::ZERO {
            focus
        } else {
            self.focus.target_global
        };
        let delta_squared = (old_focus - focus).length_squared();
        if delta_squared > ANIM_EPSILON_SQUARED {
            self.start_animation();
            let duration = (delta_squared.sqrt() / ANIM_METERS_PER_SECOND)
                .clamp(MIN_ANIM_SECONDS, MAX_ANIM_SECONDS);
            if let Some(animation) = self.animation.as_mut() {
                animation.set_duration(duration as f32);
            }
        }

        let object = object
            .and_then(|id| ctx.scene.object(id))
            .map(|o| attachment_owner(ctx.scene, o));
        self.focus.on_avatar = false;
        self.focus.target_global = focus;
        self.camera_focus_offset_target = camera - focus;
        self.camera_focus_offset = self.camera_focus_offset_target;
        self.bind_focus_object(object.as_ref());
    }

    /// Lock or unlock the focus from the avatar.
    pub fn set_focus_on_avatar(&mut self, ctx: &mut CameraContext<'_>, on_avatar: bool, animate: bool) {
        if on_avatar != self.focus.on_avatar {
            if animate {
                self.start_animation();
            } else {
                self.animation = None;
            }
        }

        if on_avatar && !self.focus.on_avatar {
            self.set_focus_global(ctx, DVec3::ZERO, None);
            self.fov_zoom_factor = 0.0;
            if self.mode == CameraMode::ThirdPerson {
                self.face_camera_direction(ctx);
            }
        } else if !on_avatar && self.focus.on_avatar {
            let rotation = body_rotation(ctx.frame, ctx.avatar);
            let target = ctx.avatar.position_global + (rotation * self.offsets.focus).as_dvec3();
            self.set_focus_global(ctx, target, None);
        }
        self.focus.on_avatar = on_avatar;
    }

    /// Focus on a point within an object. Attachments focus on their wearer.
    /// Returns `false` when the object does not exist.
    pub fn focus_on_object(&mut self, ctx: &mut CameraContext<'_>, id: ObjectId, local_offset: Vec3) -> bool {
        let Some(object) = ctx.scene.object(id) else {
            warn!(target: "camera", object = %id, "focus object not found");
            return false;
        };
        let object = attachment_owner(ctx.scene, object);
        debug!(target: "camera", object = %object.id, "focusing on object");

        self.set_focus_on_avatar(ctx, false, true);
        let target = object.position_global + (object.rotation * local_offset).as_dvec3();
        self.set_focus_global(ctx, target, Some(object.id));
        true
    }

    /// Drop any focus object and return the focus to the avatar.
    pub fn clear_focus(&mut self, ctx: &mut CameraContext<'_>) {
        if self.focus.object().is_some() {
            self.start_animation();
            self.focus.clear_object();
        }
        self.set_focus_on_avatar(ctx, true, true);
    }

    // ── Internal helpers ───────────────────────────────────────────

    pub(crate) fn push(&mut self, effect: CameraEffect) {
        self.events.push(CameraEvent::Effect(effect));
    }

    pub(crate) fn switch_mode(&mut self, mode: CameraMode) {
        info!(target: "camera", from = %self.mode, to = %mode, "camera mode changed");
        self.events.push(CameraEvent::ModeChanged { from: self.mode, to: mode });
        self.last_mode = self.mode;
        self.mode = mode;
    }

    pub(crate) fn start_animation(&mut self) {
        self.animation = Some(CameraAnimation::new(
            self.pose.position_global,
            self.focus_global,
            self.config.zoom_time_secs,
        ));
    }

    /// The front view is only kept for plain third person.
    pub(crate) fn setup_camera_view(&mut self, reset: bool) {
        if self.config.front_view
            && (reset || matches!(self.mode, CameraMode::CustomizeAvatar | CameraMode::Mouselook))
        {
            self.set_front_view(false);
        }
    }

    fn bind_focus_object(&mut self, object: Option<&SceneObject>) {
        match object {
            Some(object) => {
                if self.focus.object() != Some(object.id) {
                    self.start_animation();
                }
                self.focus.bind(object);
            }
            None => self.focus.clear_object(),
        }
    }

    /// Turn the avatar to face where the camera looks.
    fn face_camera_direction(&mut self, ctx: &mut CameraContext<'_>) {
        let at = if self.config.reset_view_rotates_avatar {
            self.camera_at_axis()
        } else {
            ctx.frame.at_axis()
        };
        let flat = Vec3::new(at.x, at.y, 0.0);
        let flat = match ctx.avatar.parent_rotation {
            Some(parent) if ctx.avatar.sitting => parent.inverse() * flat,
            _ => flat,
        };
        ctx.frame.look_along(flat, Vec3::Z);
    }

    pub(crate) fn camera_at_axis(&self) -> Vec3 {
        (self.pose.focus_global - self.pose.position_global)
            .as_vec3()
            .normalize_or(Vec3::X)
    }

    /// Camera at/left/up axes from the last pose, Z-up.
    pub(crate) fn camera_axes(&self) -> (Vec3, Vec3, Vec3) {
        let at = self.camera_at_axis();
        let left = Vec3::Z.cross(at).normalize_or(Vec3::Y);
        let up = at.cross(left);
        (at, left, up)
    }

    /// The bound focus object, if it still exists.
    pub(crate) fn resolve_focus_object(&self, ctx: &CameraContext<'_>) -> Option<SceneObject> {
        self.focus.object().and_then(|id| ctx.scene.object(id))
    }

    pub(crate) fn focus_kind(&self, focus_object: Option<&SceneObject>) -> FocusKind {
        match focus_object {
            Some(o) if o.is_avatar => FocusKind::Avatar,
            Some(_) => FocusKind::Object,
            None if self.focus.on_avatar => FocusKind::Avatar,
            None => FocusKind::Land,
        }
    }

    /// Current distance bounds, including any external constraint.
    pub(crate) fn distance_bounds(&self, ctx: &CameraContext<'_>, focus_object: Option<&SceneObject>) -> DistanceBounds {
        let query = DistanceQuery {
            mode: self.mode,
            focus: self.focus_kind(focus_object),
            sit_camera: self.sit_camera.is_some() && ctx.avatar.sitting,
            constraints_disabled: self.config.disable_constraints,
            draw_distance: self.draw_distance,
            region_width: ctx.region.map_or(vantage_math::REGION_WIDTH_METERS, |r| r.width),
        };
        clamp_camera_distance(&query)
            .constrain(self.distance_constraint.min, self.distance_constraint.max)
    }

    pub(crate) fn sit_camera_view(&self, ctx: &CameraContext<'_>) -> Option<SitCameraView> {
        if !ctx.avatar.sitting {
            return None;
        }
        let sit = self.sit_camera?;
        let seat = ctx.scene.object(sit.seat)?;
        Some(SitCameraView {
            seat_position_global: seat.position_global,
            seat_rotation: seat.rotation,
            camera: sit.camera,
            focus: sit.focus,
        })
    }

    pub(crate) fn pose_inputs<'a>(
        &'a self,
        ctx: &'a CameraContext<'_>,
        focus_object: Option<&'a SceneObject>,
        dt: f32,
    ) -> PoseInputs<'a> {
        let follow = ctx.follow.is_active().then(|| FollowView {
            position_global: ctx.follow.simulated_position(),
            focus_global: ctx.follow.simulated_focus(),
        });
        PoseInputs {
            mode: self.mode,
            frame: &*ctx.frame,
            avatar: ctx.avatar,
            region: ctx.region,
            scene: ctx.scene,
            focus: &self.focus,
            focus_object,
            sit_camera: self.sit_camera_view(ctx),
            follow,
            offsets: self.offsets,
            zoom_fraction: self.zoom_fraction,
            camera_focus_offset: self.camera_focus_offset,
            collide_plane: self.collide_plane,
            ignore_collisions: self.config.ignore_collisions,
            constraints_disabled: self.config.disable_constraints,
            animating: self.animation.is_some(),
            draw_distance: self.draw_distance,
            dynamic_strength: self.config.dynamic_strength,
            near_clip: self.config.near_clip,
            dt,
        }
    }
}

/// Remove pitch and roll, keeping the heading.
pub(crate) fn level_frame(frame: &mut SpatialFrame) {
    let at = frame.at_axis();
    let flat = Vec3::new(at.x, at.y, 0.0);
    if !frame.look_along(flat, Vec3::Z) {
        // Looking straight up or down: fall back to the left axis for heading.
        let left = frame.left_axis();
        frame.look_along(Vec3::new(left.y, -left.x, 0.0), Vec3::Z);
    }
}

/// Attachments are focused through the avatar wearing them.
fn attachment_owner(scene: &dyn SceneView, object: SceneObject) -> SceneObject {
    match object.attached_to.and_then(|owner| scene.object(owner)) {
        Some(owner) => owner,
        None => object,
    }
}
