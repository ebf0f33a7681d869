//! # Isoview Demo
//!
//! Headless fly-through over generated terrain. Drives the engine the way a
//! renderer would: one `Scene::tick` per frame, then reads each camera's
//! finished depth list.
//!
//! Usage: `isoview [config.toml] [ticks] [--split]`

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

mod perf;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use glam::Vec3;
use isoview_common::EntityId;
use isoview_render::{Entity, RenderConfig, Scene};
use isoview_world::{InMemoryStore, LoadMode, MaterialTable, WorldGenerator};
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::perf::PerfMetrics;

const DEFAULT_TICKS: u64 = 600;
const CROWD: usize = 200;
const SEED: u32 = 7;
const PAN_SMOOTHING: f32 = 0.2;

struct Args {
    config: Option<PathBuf>,
    ticks: u64,
    split: bool,
}

fn parse_args() -> Result<Args> {
    let mut args = Args {
        config: None,
        ticks: DEFAULT_TICKS,
        split: false,
    };
    for arg in std::env::args().skip(1) {
        if arg == "--split" {
            args.split = true;
        } else if let Ok(ticks) = arg.parse::<u64>() {
            args.ticks = ticks;
        } else if args.config.is_none() {
            args.config = Some(PathBuf::from(arg));
        } else {
            anyhow::bail!("unexpected argument: {arg}");
        }
    }
    Ok(args)
}

/// Wandering crowd standing on the terrain.
struct Crowd {
    entities: Vec<Entity>,
    rng: fastrand::Rng,
}

impl Crowd {
    fn scatter(generator: &WorldGenerator, count: usize) -> Self {
        let mut rng = fastrand::Rng::with_seed(u64::from(SEED));
        let entities = (0..count)
            .map(|i| {
                let x = rng.f32() * 96.0 - 16.0;
                let y = rng.f32() * 96.0 - 16.0;
                let z = generator.surface_height(x.floor() as i32, y.floor() as i32) as f32;
                Entity::new(EntityId::from_raw(i as u64 + 1), Vec3::new(x, y, z))
            })
            .collect();
        Self { entities, rng }
    }

    fn wander(&mut self, generator: &WorldGenerator) {
        for entity in &mut self.entities {
            let step = Vec3::new(self.rng.f32() - 0.5, self.rng.f32() - 0.5, 0.0) * 0.2;
            let mut next = entity.position + step;
            next.z = generator.surface_height(next.x.floor() as i32, next.y.floor() as i32) as f32;
            entity.position = next;
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("isoview=info".parse()?))
        .init();

    info!("Isoview demo starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let args = parse_args().context("parsing arguments")?;
    let config = match &args.config {
        Some(path) => RenderConfig::load_from(path),
        None => RenderConfig::default(),
    };

    let generator = WorldGenerator::with_seed(SEED);
    let store = Arc::new(InMemoryStore::new(
        config.chunk_dims,
        generator.clone(),
        LoadMode::Immediate,
    ));
    let mut scene = Scene::new(config, store, Arc::new(MaterialTable::default()));

    let primary = scene
        .add_camera(1280, 720)
        .context("no camera slot for the primary view")?;
    let secondary = if args.split {
        let id = scene
            .add_camera(640, 720)
            .context("no camera slot for the split view")?;
        if let Some(camera) = scene.camera_mut(id) {
            camera.set_zoom(2.0);
            camera.set_z_limit(Some(8));
        }
        Some(id)
    } else {
        None
    };

    let mut crowd = Crowd::scatter(&generator, CROWD);
    let mut perf = PerfMetrics::default();
    let projection = scene.config().projection;

    for tick in 0..args.ticks {
        let t = tick as f32 * 0.05;
        let target = Vec3::new(32.0 + t * 4.0, 32.0 + (t * 0.5).sin() * 24.0, 0.0);
        if let Some(camera) = scene.camera_mut(primary) {
            camera.pan_toward(target, &projection, PAN_SMOOTHING);
        }
        if let Some(camera) = secondary.and_then(|id| scene.camera_mut(id)) {
            camera.pan_toward(target + Vec3::new(4.0, 4.0, 0.0), &projection, PAN_SMOOTHING);
        }
        crowd.wander(&generator);

        let start = Instant::now();
        let report = scene.tick(crowd.entities.as_slice());
        perf.record(start.elapsed(), &report);

        if let Some(e) = &report.stale_window {
            warn!("Tick {}: stale window ({e})", report.tick);
        }
        if let Some(e) = &report.clipped_views {
            debug!("Tick {}: {e}", report.tick);
        }
        for (id, stats) in &report.frames {
            debug!(
                "Tick {} camera {}: {} items, {} roots, {} fallback",
                report.tick,
                id.slot(),
                stats.emitted,
                stats.roots,
                stats.fallback
            );
        }
        if report.tick % 60 == 0 {
            info!("{}", perf.summary());
        }
    }

    info!("Final: {}", perf.summary());
    info!("Isoview demo shutdown complete");
    Ok(())
}
