//! Headless driver for the agent camera and teleport sequencer.
//!
//! Loads `config.ron`, applies command-line overrides, then runs a scripted
//! session against an in-process simulated region server and logs
//! everything the agent reports.
//!
//! Run with: `cargo run -p vantage-sim -- --frames 600`

mod script;
mod world;

use std::time::{Duration, Instant};

use clap::Parser;
use tracing::{info, warn};
use vantage_agent::{Agent, MemorySettings, network_channel};
use vantage_config::{CliArgs, Config};

use crate::script::Script;
use crate::world::{SimWorld, home_region};

const FRAME_DT: f32 = 1.0 / 30.0;
const DEFAULT_FRAMES: u32 = 600;

fn main() {
    let args = CliArgs::parse();

    let config_dir = args.config.clone().or_else(|| Config::default_dir().ok());
    let (mut config, load_error) = match config_dir.as_deref().map(Config::load_or_create) {
        Some(Ok(config)) => (config, None),
        Some(Err(e)) => (Config::default(), Some(e)),
        None => (Config::default(), None),
    };
    config.apply_cli_overrides(&args);

    let log_dir = config_dir.as_ref().map(|dir| dir.join("logs"));
    vantage_log::init_logging(log_dir.as_deref(), cfg!(debug_assertions), Some(&config));
    if let Some(e) = load_error {
        warn!("using default config: {e}");
    }

    info!("Vantage agent simulation");
    info!(
        "draw distance {:.0} m | poll margin {} ms | race workaround {}",
        config.render.draw_distance, config.teleport.poll_margin_ms, config.teleport.race_workaround,
    );

    let frames = args.frames.unwrap_or(DEFAULT_FRAMES);
    run(&config, frames);
}

fn run(config: &Config, frames: u32) {
    let (sender, receiver) = network_channel();
    let mut agent = Agent::new(config, receiver, Box::new(MemorySettings::default()));
    let mut world = SimWorld::new(sender);
    let mut script = Script::standard();

    world.spawn(&mut agent, home_region());
    let start = Instant::now();

    for frame in 0..frames {
        let now = start + Duration::from_secs_f32(frame as f32 * FRAME_DT);
        world.advance(frame);
        script.run_frame(frame, &mut agent, &mut world, now);

        let pose = world.tick(&mut agent, FRAME_DT, now);
        if let Some(kind) = agent.take_visibility_refresh() {
            info!(target: "agent", ?kind, "visibility refresh");
        }
        for event in agent.drain_events() {
            info!(target: "agent", frame, ?event, "event");
        }
        if frame % 60 == 0 {
            info!(
                target: "camera",
                frame,
                mode = ?agent.camera_mode(),
                position = ?pose.position_global,
                focus = ?pose.focus_global,
                "camera"
            );
        }
    }

    info!(
        "finished after {frames} frames in {} | regions visited: {} | teleport requests: {}",
        agent.location_string().unwrap_or_else(|| "nowhere".to_string()),
        agent.regions_visited().len(),
        world.server.requests(),
    );
    info!(
        "last render: position {:?} focus {:?} fov {:.3}",
        world.render.position, world.render.focus, world.render.fov_radians,
    );
    if let Some(home) = agent.home_position_global() {
        info!("home set to {home:?}");
    }
}
