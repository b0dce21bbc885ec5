//! Tether - Headless replication demo
//!
//! Runs a server and one client in a single process over the loopback transport and
//! drives the client's character with scripted input.

mod settings;

use anyhow::Result;
use glam::{Vec2, Vec3};
use tether_core::TickClock;
use tether_game::{
    ActorKind, ClientSession, InputAction, InputState, Scene, ServerSession,
};
use tether_net::LoopbackHub;
use tether_physics::PhysicsWorld;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use settings::Settings;

fn world(settings: &Settings) -> Scene {
    let mut scene = Scene::new(PhysicsWorld::with_config(settings.physics()));
    scene.physics.create_ground(0.0);
    scene
}

/// Input for one tick: walk forward, lock on, dodge, then crouch
fn scripted_input(tick: u64, tick_rate: u32, input: &mut InputState) {
    let at = |seconds: f32| (seconds * tick_rate as f32) as u64;
    if tick == 0 {
        input.set_move_axis(Vec2::new(0.0, 1.0));
    } else if tick == at(1.0) {
        input.set_move_axis(Vec2::ZERO);
        input.press(InputAction::TargetLock);
    } else if tick == at(1.1) {
        input.release(InputAction::TargetLock);
    } else if tick == at(2.0) {
        input.press(InputAction::SprintDodge);
    } else if tick == at(2.1) {
        input.release(InputAction::SprintDodge);
    } else if tick == at(3.0) {
        input.press(InputAction::Crouch);
    } else if tick == at(3.1) {
        input.release(InputAction::Crouch);
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    info!("Starting Tether demo...");
    let settings = Settings::load();
    if Settings::path().is_some_and(|path| !path.exists()) {
        if let Err(e) = settings.save() {
            warn!("Failed to write default settings: {}", e);
        }
    }

    let mut hub = LoopbackHub::new();
    let mut server = ServerSession::new(world(&settings), settings.character.clone());
    hub.connect(server.peer());
    server.spawn_actor(
        &mut hub,
        "target dummy",
        ActorKind::TargetDummy,
        settings.world.dummy_position,
    );
    server.spawn_actor(
        &mut hub,
        "grapple point",
        ActorKind::GrapplePoint {
            landing_offset: Vec3::new(0.0, 1.0, 0.0),
        },
        settings.world.grapple_position,
    );

    let mut client = ClientSession::new(server.peer(), world(&settings), settings.character.clone());
    hub.connect(client.peer());
    let player = server.add_player(&mut hub, client.peer(), "player", Vec3::ZERO)?;

    let mut clock = TickClock::new(settings.clock.clone());
    let dt = clock.tick_delta();
    let tick_rate = clock.config.tick_rate.max(1);
    let mut input = InputState::new();

    while clock.elapsed < f64::from(settings.world.demo_seconds) {
        let first = clock.tick;
        let ticks = clock.advance(dt);
        for tick in first..first + u64::from(ticks) {
            scripted_input(tick, tick_rate, &mut input);
            server.tick(&mut hub, dt);
            client.tick(&mut hub, &input, dt);
            input.clear_frame();

            if tick % u64::from(tick_rate) == 0 {
                if let Some(character) = client.local_character() {
                    info!(
                        "t={:.1}s pos={:.2} locked={:?} sprinting={} dodging={} crouching={} montage={:?}",
                        tick as f32 * dt,
                        character.position(),
                        character.state.locked_on_target(),
                        character.state.is_sprinting(),
                        character.state.is_dodging(),
                        character.state.is_crouching(),
                        character.montages.current(),
                    );
                }
            }
        }
    }

    if let Some(character) = server.character(player) {
        info!(
            "Server view of {}: locked={:?} lockable={:?} stance={:?}",
            player,
            character.state.locked_on_target(),
            character.state.lockable_targets(),
            character.state.movement_stance(),
        );
    }
    info!("Routed {} bytes", hub.bytes_sent);
    Ok(())
}
