//! In-process collaborators: terrain, a simulated region server and a
//! render sink that only records what it is told.

use std::collections::{HashMap, VecDeque};
use std::time::Instant;

use crossbeam_channel::Sender;
use glam::{DVec3, Vec3};
use tracing::{debug, info, trace, warn};
use vantage_agent::{Agent, Collaborators, NetworkEvent};
use vantage_camera::{CameraPose, ObjectId, RenderCamera, SceneObject, SceneView, SmoothFollowCamera};
use vantage_math::{RegionContext, RegionHandle};
use vantage_teleport::{SessionLink, TeleportPayload};

/// Frames per region event poll cycle, and how many of them the poll is
/// outstanding for.
const POLL_PERIOD: u32 = 40;
const POLL_BUSY: u32 = 30;

const HOME_POSITION_LOCAL: Vec3 = Vec3::new(128.0, 128.0, 25.0);
const LURE_POSITION_LOCAL: Vec3 = Vec3::new(128.0, 64.0, 30.0);

pub fn home_region() -> RegionContext {
    RegionContext::new(RegionHandle::from_origin(256_000, 256_000), "Ahern")
}

fn known_regions() -> HashMap<RegionHandle, RegionContext> {
    [
        home_region(),
        RegionContext::new(RegionHandle::from_origin(256_512, 256_000), "Morris"),
        RegionContext::new(RegionHandle::from_origin(255_744, 256_256), "Babbage"),
    ]
    .into_iter()
    .map(|region| (region.handle, region))
    .collect()
}

pub fn lure_region() -> RegionHandle {
    RegionHandle::from_origin(255_744, 256_256)
}

/// Gently rolling terrain around 20 m.
#[derive(Default)]
pub struct SimScene {
    objects: Vec<SceneObject>,
}

impl SimScene {
    pub fn add(&mut self, object: SceneObject) {
        self.objects.push(object);
    }

    pub fn remove(&mut self, id: ObjectId) {
        self.objects.retain(|o| o.id != id);
    }
}

impl SceneView for SimScene {
    fn object(&self, id: ObjectId) -> Option<SceneObject> {
        self.objects.iter().find(|o| o.id == id).cloned()
    }

    fn land_height_global(&self, position: DVec3) -> f64 {
        20.0 + 2.0 * (position.x * 0.05).sin() * (position.y * 0.05).cos()
    }
}

/// Region server stand-in. Requests are answered a few frames later through
/// the agent's network channel, and the event poll is outstanding for most
/// of each cycle.
pub struct SimServer {
    sender: Sender<NetworkEvent>,
    regions: HashMap<RegionHandle, RegionContext>,
    current: RegionHandle,
    frame: u32,
    pending: VecDeque<(u32, NetworkEvent)>,
    requests: usize,
}

impl SimServer {
    pub fn new(sender: Sender<NetworkEvent>) -> Self {
        Self {
            sender,
            regions: known_regions(),
            current: home_region().handle,
            frame: 0,
            pending: VecDeque::new(),
            requests: 0,
        }
    }

    pub fn requests(&self) -> usize {
        self.requests
    }

    /// Deliver everything due by `frame`.
    pub fn advance(&mut self, frame: u32) {
        self.frame = frame;
        while let Some((due, _)) = self.pending.front() {
            if *due > frame {
                break;
            }
            let Some((_, event)) = self.pending.pop_front() else {
                break;
            };
            if self.sender.send(event).is_err() {
                warn!("agent network channel closed");
                self.pending.clear();
                return;
            }
        }
    }

    fn schedule(&mut self, delay: u32, event: NetworkEvent) {
        self.pending.push_back((self.frame + delay, event));
    }

    fn region(&self, handle: RegionHandle) -> RegionContext {
        self.regions
            .get(&handle)
            .cloned()
            .unwrap_or_else(|| RegionContext::new(handle, format!("Region {handle}")))
    }

    fn relocate(&mut self, handle: RegionHandle, position_local: Vec3) {
        let region = self.region(handle);
        let position_global = region.local_to_global(position_local);

        self.schedule(2, NetworkEvent::TeleportStarted);
        if handle == self.current {
            self.schedule(4, NetworkEvent::TeleportLocal {
                position_global: Some(position_global),
            });
            return;
        }

        self.current = handle;
        self.schedule(6, NetworkEvent::TeleportFinished { region: handle });
        self.schedule(10, NetworkEvent::AgentPosition { position_global });
        self.schedule(12, NetworkEvent::RegionAttached(region));
        self.schedule(16, NetworkEvent::MovementComplete { position_global });
    }
}

impl SessionLink for SimServer {
    fn send_teleport_request(&mut self, payload: &TeleportPayload) {
        self.requests += 1;
        info!(kind = payload.kind(), "server received teleport request");
        match payload {
            TeleportPayload::Location {
                region,
                position_local,
                ..
            } if *region == self.current => {
                let position_global = self.region(*region).local_to_global(*position_local);
                self.schedule(3, NetworkEvent::TeleportLocal {
                    position_global: Some(position_global),
                });
            }
            TeleportPayload::Location {
                region,
                position_local,
                ..
            } => self.relocate(*region, *position_local),
            TeleportPayload::Landmark { landmark: None } => {
                self.relocate(home_region().handle, HOME_POSITION_LOCAL);
            }
            TeleportPayload::Landmark { landmark: Some(_) } => {
                self.schedule(2, NetworkEvent::TeleportStarted);
                self.schedule(5, NetworkEvent::TeleportFailed {
                    reason: "Could not find landmark".to_string(),
                });
            }
            TeleportPayload::Lure { .. } => self.relocate(lure_region(), LURE_POSITION_LOCAL),
        }
    }

    fn send_teleport_cancel(&mut self) {
        debug!(dropped = self.pending.len(), "server received teleport cancel");
        self.pending.clear();
    }

    fn is_poll_in_flight(&self, _region: RegionHandle) -> bool {
        self.frame % POLL_PERIOD < POLL_BUSY
    }
}

/// Render sink that keeps the last pose it was given.
#[derive(Default)]
pub struct LogRender {
    pub position: Vec3,
    pub focus: Vec3,
    pub fov_radians: f32,
}

impl RenderCamera for LogRender {
    fn update_location(&mut self, position_agent: Vec3, _up: Vec3, focus_agent: Vec3) {
        self.position = position_agent;
        self.focus = focus_agent;
        trace!(target: "camera", position = ?position_agent, focus = ?focus_agent, "render");
    }

    fn set_view(&mut self, fov_radians: f32) {
        self.fov_radians = fov_radians;
    }
}

pub struct SimWorld {
    pub scene: SimScene,
    pub follow: SmoothFollowCamera,
    pub server: SimServer,
    pub render: LogRender,
    pub kiosk: ObjectId,
}

impl SimWorld {
    pub fn new(sender: Sender<NetworkEvent>) -> Self {
        let kiosk = ObjectId::new_v4();
        let mut scene = SimScene::default();
        scene.add(SceneObject {
            scale: Vec3::new(2.0, 2.0, 3.0),
            ..SceneObject::new(kiosk, DVec3::new(256_140.0, 256_132.0, 21.5))
        });
        Self {
            scene,
            follow: SmoothFollowCamera::new(),
            server: SimServer::new(sender),
            render: LogRender::default(),
            kiosk,
        }
    }

    /// Log the agent into `region`.
    pub fn spawn(&mut self, agent: &mut Agent, region: RegionContext) {
        let position = region.local_to_global(HOME_POSITION_LOCAL);
        if let Err(e) = agent.set_position_global(position) {
            warn!("spawn position rejected: {e}");
        }
        self.with(agent, |agent, collab| agent.set_region(region, collab));
    }

    pub fn advance(&mut self, frame: u32) {
        self.server.advance(frame);
    }

    pub fn tick(&mut self, agent: &mut Agent, dt: f32, now: Instant) -> CameraPose {
        self.with(agent, |agent, collab| agent.tick(dt, now, collab))
    }

    pub fn with<R>(&mut self, agent: &mut Agent, f: impl FnOnce(&mut Agent, &mut Collaborators<'_>) -> R) -> R {
        let mut collab = Collaborators {
            scene: &self.scene,
            follow: &mut self.follow,
            link: &mut self.server,
            render: &mut self.render,
        };
        f(agent, &mut collab)
    }
}

#[cfg(test)]
mod tests {
    use vantage_agent::network_channel;

    use super::*;

    #[test]
    fn test_same_region_location_answers_local() {
        let (sender, receiver) = network_channel();
        let mut server = SimServer::new(sender);
        server.send_teleport_request(&TeleportPayload::Location {
            region: home_region().handle,
            position_local: Vec3::new(10.0, 10.0, 22.0),
            look_at: Vec3::X,
        });
        server.advance(2);
        assert!(receiver.try_recv().is_err());
        server.advance(3);
        assert_eq!(
            receiver.try_recv().unwrap(),
            NetworkEvent::TeleportLocal {
                position_global: Some(DVec3::new(256_010.0, 256_010.0, 22.0)),
            }
        );
    }

    #[test]
    fn test_lure_moves_to_lure_region() {
        let (sender, receiver) = network_channel();
        let mut server = SimServer::new(sender);
        server.send_teleport_request(&TeleportPayload::Lure {
            lure: vantage_teleport::LureId(uuid::Uuid::new_v4()),
            flags: vantage_teleport::TeleportFlags::for_lure(false),
        });
        server.advance(100);
        let events: Vec<_> = receiver.try_iter().collect();
        assert_eq!(events.first(), Some(&NetworkEvent::TeleportStarted));
        assert!(events.contains(&NetworkEvent::TeleportFinished { region: lure_region() }));
        assert!(matches!(events.last(), Some(NetworkEvent::MovementComplete { .. })));
    }

    #[test]
    fn test_cancel_drops_pending_replies() {
        let (sender, receiver) = network_channel();
        let mut server = SimServer::new(sender);
        server.send_teleport_request(&TeleportPayload::Landmark { landmark: None });
        server.send_teleport_cancel();
        server.advance(100);
        assert!(receiver.try_recv().is_err());
    }

    #[test]
    fn test_poll_is_mostly_in_flight() {
        let (sender, _receiver) = network_channel();
        let mut server = SimServer::new(sender);
        server.advance(0);
        assert!(server.is_poll_in_flight(home_region().handle));
        server.advance(POLL_BUSY);
        assert!(!server.is_poll_in_flight(home_region().handle));
    }
}
