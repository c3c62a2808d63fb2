//! Timeline of user actions the simulation replays.

use std::time::Instant;

use glam::{DVec3, Vec3};
use tracing::{info, warn};
use uuid::Uuid;
use vantage_agent::{Agent, CameraKey, TeleportRequest};
use vantage_camera::FollowParams;
use vantage_teleport::{LandmarkId, LureId};

use crate::world::SimWorld;

#[derive(Debug, Clone, Copy)]
enum Action {
    Key(CameraKey),
    Walk,
    Turn(f32),
    FocusKiosk,
    RemoveKiosk,
    ClearFocus,
    Mouselook,
    Scroll(i32),
    DefaultView,
    FollowOn,
    FollowOff,
    Teleport(TeleportRequest),
    Home,
    Cancel,
    SetHome,
    Customize,
}

/// An action held for `[start, end)` frames.
struct Step {
    start: u32,
    end: u32,
    action: Action,
}

pub struct Script {
    steps: Vec<Step>,
}

impl Script {
    /// A tour of camera modes and every kind of teleport.
    pub fn standard() -> Self {
        let mut script = Self { steps: Vec::new() };
        script
            .hold(0, 30, Action::Key(CameraKey::OrbitLeft))
            .hold(30, 60, Action::Walk)
            .hold(60, 70, Action::Turn(0.05))
            .at(80, Action::FocusKiosk)
            .hold(90, 110, Action::Key(CameraKey::OrbitIn))
            .at(120, Action::RemoveKiosk)
            .at(130, Action::ClearFocus)
            .at(150, Action::Mouselook)
            .at(180, Action::Scroll(3))
            .at(200, Action::DefaultView)
            .at(210, Action::FollowOn)
            .at(260, Action::FollowOff)
            .at(270, Action::Teleport(TeleportRequest::Location(DVec3::new(256_180.0, 256_100.0, 22.0))))
            .at(300, Action::Teleport(TeleportRequest::Location(DVec3::new(256_600.0, 256_100.0, 30.0))))
            .at(301, Action::Teleport(TeleportRequest::LocationLookAt(DVec3::new(256_700.0, 256_100.0, 30.0))))
            .at(
                360,
                Action::Teleport(TeleportRequest::Landmark {
                    landmark: Some(LandmarkId(Uuid::new_v4())),
                    position_global: None,
                }),
            )
            .at(
                400,
                Action::Teleport(TeleportRequest::Lure {
                    lure: LureId(Uuid::new_v4()),
                    godlike: false,
                }),
            )
            .at(402, Action::Cancel)
            .at(430, Action::Home)
            .at(500, Action::SetHome)
            .at(520, Action::Customize)
            .at(560, Action::DefaultView);
        script
    }

    fn at(&mut self, frame: u32, action: Action) -> &mut Self {
        self.hold(frame, frame + 1, action)
    }

    fn hold(&mut self, start: u32, end: u32, action: Action) -> &mut Self {
        self.steps.push(Step { start, end, action });
        self
    }

    pub fn run_frame(&mut self, frame: u32, agent: &mut Agent, world: &mut SimWorld, now: Instant) {
        for step in self.steps.iter().filter(|s| (s.start..s.end).contains(&frame)) {
            if step.start == frame {
                info!(frame, action = ?step.action, "script");
            }
            perform(step.action, agent, world, now);
        }
    }
}

fn perform(action: Action, agent: &mut Agent, world: &mut SimWorld, now: Instant) {
    match action {
        Action::Key(key) => agent.camera_key(key, 1.0),
        Action::Walk => agent.move_at(1.0),
        Action::Turn(radians) => agent.move_yaw(radians),
        Action::FocusKiosk => {
            let kiosk = world.kiosk;
            world.with(agent, |agent, collab| agent.focus_on_object(kiosk, Vec3::new(0.0, 0.0, 1.0), collab));
        }
        Action::RemoveKiosk => world.scene.remove(world.kiosk),
        Action::ClearFocus => world.with(agent, |agent, collab| agent.clear_focus(collab)),
        Action::Mouselook => {
            world.with(agent, |agent, collab| agent.enter_mouselook(true, collab));
        }
        Action::Scroll(clicks) => world.with(agent, |agent, collab| agent.handle_scroll_wheel(clicks, collab)),
        Action::DefaultView => {
            world.with(agent, |agent, collab| agent.enter_default(true, collab));
        }
        Action::FollowOn => world.follow.activate(FollowParams::default()),
        Action::FollowOff => world.follow.deactivate(),
        Action::Teleport(request) => {
            let accepted = world.with(agent, |agent, collab| agent.request_teleport(request, collab, now));
            info!(accepted, state = %agent.teleport_state(), "teleport requested");
        }
        Action::Home => {
            world.with(agent, |agent, collab| agent.teleport_home(collab, now));
        }
        Action::Cancel => {
            let cancelled = world.with(agent, |agent, collab| agent.cancel_teleport("changed my mind", collab));
            info!(cancelled, "cancel requested");
        }
        Action::SetHome => {
            if let Some(region) = agent.region().map(|r| r.handle) {
                let local = agent.position_agent();
                if let Err(e) = agent.set_home_position(region, local) {
                    warn!("failed to store home position: {e}");
                }
            }
        }
        Action::Customize => {
            world.with(agent, |agent, collab| agent.enter_customize_avatar(collab));
        }
    }
}
