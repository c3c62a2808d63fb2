//! The per-frame camera update.

use std::f32::consts::FRAC_PI_2;

use glam::{DVec3, Vec3};
use tracing::{debug, warn};
use vantage_math::{RegionContext, interpolant};

use crate::controller::{CameraContext, CameraController, CameraPose};
use crate::input::InputSnapshot;
use crate::mode::CameraMode;
use crate::scene::{RenderCamera, SceneObject};
use crate::smoothing::SmoothingSpace;
use crate::solver::{
    FOV_ZOOM_HALF_LIFE, body_rotation, compute_camera_target, compute_focus_target,
    compute_fov_zoom_factor,
};

/// Keyboard orbit speed, radians per second.
const ORBIT_RATE: f32 = FRAC_PI_2;
/// Keyboard pan speed, meters per second.
const PAN_RATE: f32 = 5.0;
const CAMERA_FOCUS_HALF_LIFE: f32 = 0.0;

impl CameraController {
    /// Advance the camera by `dt` seconds and push the result to `render`.
    ///
    /// Order: keyboard input, mode resolution, target pose, animation,
    /// smoothing, FOV, final distance clamp.
    pub fn update(
        &mut self,
        ctx: &mut CameraContext<'_>,
        input: &InputSnapshot,
        dt: f32,
        render: &mut dyn RenderCamera,
    ) -> CameraPose {
        self.validate_focus_object(ctx);
        self.validate_sit_camera(ctx);

        if self.mode == CameraMode::ThirdPerson
            && self.last_mode == CameraMode::ThirdPerson
            && self.focus.on_avatar
            && ctx.follow.is_active()
        {
            self.enter_follow(ctx, true);
        }
        self.apply_distance_constraint(ctx);
        self.apply_keyboard(ctx, input, dt);

        let t = f64::from(interpolant(CAMERA_FOCUS_HALF_LIFE, dt));
        self.camera_focus_offset = self.camera_focus_offset.lerp(self.camera_focus_offset_target, t);

        if self.mode == CameraMode::Follow {
            if ctx.follow.is_active() {
                let rotation = body_rotation(ctx.frame, ctx.avatar);
                ctx.follow.update(ctx.avatar.position_global, rotation, dt);
            } else {
                self.enter_third_person(ctx, true);
            }
        }

        let focus_object = self.track_focus_object(ctx);
        let up = self.up_vector(ctx);

        let (target, focus_target, fov_zoom_factor) = {
            let inputs = self.pose_inputs(ctx, focus_object.as_ref(), dt);
            let target = compute_camera_target(&inputs, self.damping);
            let focus_target = compute_focus_target(&inputs);
            let fov = compute_fov_zoom_factor(&inputs, self.pose.position_global, self.fov_zoom_factor);
            (target, focus_target, fov)
        };
        self.damping = target.damping;
        self.hit_limit = target.hit_limit;
        self.virtual_position_global = target.position;
        self.fov_zoom_factor = fov_zoom_factor;
        let focus_is_computed = self.mode == CameraMode::Mouselook
            || (self.mode == CameraMode::Follow && self.focus.on_avatar)
            || (!self.focus.on_avatar && focus_object.is_some());
        if focus_is_computed {
            self.focus.target_global = focus_target;
        }

        let push_back = 1.0 + f64::from(self.fov_zoom_factor);
        let camera_target = focus_target + (target.position - focus_target) * push_back;

        let (camera, focus) = self.animate(ctx, camera_target, focus_target, dt);
        self.focus_global = focus;

        let space = (self.mode == CameraMode::ThirdPerson && self.last_mode == CameraMode::ThirdPerson)
            .then(|| {
                if self.focus.on_avatar && focus_object.is_none() {
                    SmoothingSpace::Agent
                } else {
                    SmoothingSpace::Global
                }
            });
        let camera = self.smoother.apply(
            camera,
            ctx.avatar.position_global,
            space,
            self.config.position_smoothing,
            dt,
        );

        let t = interpolant(FOV_ZOOM_HALF_LIFE, dt);
        self.current_fov_zoom_factor += (self.fov_zoom_factor - self.current_fov_zoom_factor) * t;
        let fov_radians = self.config.default_fov_radians / (1.0 + self.current_fov_zoom_factor);

        let camera = self.final_clamp(ctx, camera, focus, focus_object.as_ref());

        let origin = ctx.region.map_or(DVec3::ZERO, RegionContext::origin_global);
        render.update_location((camera - origin).as_vec3(), up, (focus - origin).as_vec3());
        render.set_view(fov_radians);

        self.pose = CameraPose {
            position_global: camera,
            focus_global: focus,
            up,
            fov_radians,
        };
        self.pose
    }

    /// Drop a focus object that no longer exists.
    fn validate_focus_object(&mut self, ctx: &CameraContext<'_>) {
        if let Some(id) = self.focus.object()
            && ctx.scene.object(id).is_none()
        {
            warn!(target: "camera", object = %id, "focus object vanished, clearing");
            self.focus.clear_object();
            self.fov_zoom_factor = 0.0;
        }
    }

    fn validate_sit_camera(&mut self, ctx: &CameraContext<'_>) {
        if let Some(sit) = self.sit_camera
            && ctx.scene.object(sit.seat).is_none()
        {
            debug!(target: "camera", seat = %sit.seat, "sit camera seat vanished");
            self.sit_camera = None;
        }
    }

    /// A zero maximum forces first person; a positive minimum forbids it.
    fn apply_distance_constraint(&mut self, ctx: &mut CameraContext<'_>) {
        let constraint = self.distance_constraint;
        if self.mode != CameraMode::Mouselook && constraint.max.is_some_and(|m| m <= 0.0) {
            self.enter_mouselook(ctx, false);
        } else if self.mode == CameraMode::Mouselook && constraint.min.is_some_and(|m| m > 0.0) {
            self.enter_default(ctx, true);
        }
    }

    fn apply_keyboard(&mut self, ctx: &mut CameraContext<'_>, input: &InputSnapshot, dt: f32) {
        if input.is_idle() {
            return;
        }
        let orbit = ORBIT_RATE * dt;
        let pan = PAN_RATE * dt;

        let over = input.orbit_up - input.orbit_down;
        if over != 0.0 {
            self.orbit_over(ctx, over * orbit);
        }
        let around = input.orbit_left - input.orbit_right;
        if around != 0.0 {
            self.orbit_around(ctx, around * orbit);
        }
        let orbit_in = input.orbit_in - input.orbit_out;
        if orbit_in != 0.0 {
            let distance = (self.pose.position_global - self.pose.focus_global).length() as f32;
            self.orbit_in(ctx, orbit_in * distance * dt);
        }

        let pan_in = input.pan_in - input.pan_out;
        if pan_in != 0.0 {
            self.pan_in(ctx, pan_in * pan);
        }
        let pan_left = input.pan_left - input.pan_right;
        if pan_left != 0.0 {
            self.pan_left(ctx, pan_left * pan);
        }
        let pan_up = input.pan_up - input.pan_down;
        if pan_up != 0.0 {
            self.pan_up(ctx, pan_up * pan);
        }
    }

    /// Keep the focus inside the bound object as it moves.
    fn track_focus_object(&mut self, ctx: &CameraContext<'_>) -> Option<SceneObject> {
        let object = self.resolve_focus_object(ctx)?;
        self.focus.follow_object(&object, self.config.track_focus_object);
        Some(object)
    }

    fn up_vector(&self, ctx: &CameraContext<'_>) -> Vec3 {
        match self.effective_mode() {
            CameraMode::Mouselook if ctx.avatar.sitting => body_rotation(ctx.frame, ctx.avatar) * Vec3::Z,
            CameraMode::Follow if self.focus.on_avatar && ctx.follow.is_active() => ctx.follow.up_vector(),
            _ => Vec3::Z,
        }
    }

    fn animate(
        &mut self,
        ctx: &mut CameraContext<'_>,
        camera_target: DVec3,
        focus_target: DVec3,
        dt: f32,
    ) -> (DVec3, DVec3) {
        let Some(animation) = self.animation.as_mut() else {
            self.show_avatar = self.mode != CameraMode::Mouselook;
            return (camera_target, focus_target);
        };
        animation.advance(dt);
        let sample = animation.sample(
            camera_target,
            focus_target,
            self.last_mode == CameraMode::Mouselook,
            self.mode == CameraMode::Mouselook,
        );
        self.show_avatar = sample.show_avatar;
        if sample.finished {
            self.animation = None;
            self.end_animation_update_ui(ctx);
        }
        (sample.camera, sample.focus)
    }

    /// Pull the camera back inside the distance bounds around the focus.
    fn final_clamp(
        &mut self,
        ctx: &CameraContext<'_>,
        camera: DVec3,
        focus: DVec3,
        focus_object: Option<&SceneObject>,
    ) -> DVec3 {
        if self.mode == CameraMode::Mouselook || self.sit_camera_view(ctx).is_some() {
            return camera;
        }
        let bounds = self.distance_bounds(ctx, focus_object);
        let offset = camera - focus;
        let clamped = bounds.clamp_offset(offset, DVec3::NEG_X);
        if clamped == offset {
            return camera;
        }
        let camera = focus + clamped;
        self.smoother.reset_to(camera, ctx.avatar.position_global);
        camera
    }
}
