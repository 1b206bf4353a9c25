// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

// Governor Sandbox
// Scripted demo: six objects on a grid, memory pressure from pads.

mod scene;
mod timeline;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use lodgov_control::{GovernorContext, Settings, TickOutcome};
use lodgov_core::NativeCounter;
use lodgov_infra::{CounterBehavior, HostMemoryCounter, SimulatedVramDevice, VendorCounter};

use scene::Scene;
use timeline::{Action, Timeline};

/// Which memory counter backs native telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum CounterChoice {
    /// Simulated device exposing GL_NVX_gpu_memory_info.
    SimulatedNvx,
    /// Simulated device exposing GL_ATI_meminfo.
    SimulatedAti,
    /// Simulated NVX device whose counter never moves.
    Frozen,
    /// Available host memory via sysinfo.
    Host,
    /// No counter, synthetic telemetry from the start.
    None,
}

#[derive(Debug, Parser)]
#[command(name = "governor-sandbox", about = "Drive the LOD governor through a scripted session")]
struct Args {
    /// RON settings file; defaults are used when absent.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Memory counter backing native telemetry.
    #[arg(long, value_enum, default_value_t = CounterChoice::SimulatedNvx)]
    counter: CounterChoice,

    /// Dedicated memory of the simulated device, in MB.
    #[arg(long, default_value_t = 2048)]
    vram_mb: u64,

    /// Length of the session in simulated seconds.
    #[arg(long, default_value_t = 12.0)]
    seconds: f64,

    /// Fixed-step frame rate.
    #[arg(long, default_value_t = 60)]
    fps: u32,

    /// Sleep between frames instead of running as fast as possible.
    #[arg(long)]
    realtime: bool,
}

/// The harness side of allocations: pads committed on the simulated device.
struct PadPool {
    device: Option<Arc<SimulatedVramDevice>>,
    pad_mb: u32,
    live: Vec<u32>,
}

impl PadPool {
    fn allocate(&mut self, ctx: &mut GovernorContext) {
        if let Some(device) = &self.device {
            device.commit(u64::from(self.pad_mb));
        }
        self.live.push(self.pad_mb);
        let verdict = ctx.on_allocation_event();
        log::info!(
            "Sandbox: allocated pad #{} ({} MB), watchdog {:?}",
            self.live.len(),
            self.pad_mb,
            verdict
        );
    }

    fn free(&mut self, ctx: &mut GovernorContext) {
        let Some(size_mb) = self.live.pop() else {
            log::info!("Sandbox: no pad to free");
            return;
        };
        if let Some(device) = &self.device {
            device.release(u64::from(size_mb));
        }
        ctx.on_free_event(size_mb);
        log::info!("Sandbox: freed pad ({} left)", self.live.len());
    }

    fn free_all(&mut self, ctx: &mut GovernorContext) {
        self.live.clear();
        if let Some(device) = &self.device {
            device.release_all();
        }
        ctx.reset_allocations();
    }
}

fn build_counter(
    args: &Args,
) -> (Option<Arc<dyn NativeCounter>>, Option<Arc<SimulatedVramDevice>>) {
    let simulated = |device: SimulatedVramDevice| {
        let device = Arc::new(device);
        let counter = VendorCounter::detect(device.clone())
            .map(|counter| Arc::new(counter) as Arc<dyn NativeCounter>);
        (counter, Some(device))
    };

    match args.counter {
        CounterChoice::SimulatedNvx => simulated(SimulatedVramDevice::nvx(args.vram_mb)),
        CounterChoice::SimulatedAti => simulated(SimulatedVramDevice::ati(args.vram_mb)),
        CounterChoice::Frozen => {
            let device = SimulatedVramDevice::nvx(args.vram_mb);
            device.set_behavior(CounterBehavior::Frozen);
            simulated(device)
        }
        CounterChoice::Host => {
            let counter: Arc<dyn NativeCounter> = Arc::new(HostMemoryCounter::new());
            (Some(counter), None)
        }
        CounterChoice::None => (None, None),
    }
}

fn apply(action: Action, ctx: &mut GovernorContext, pads: &mut PadPool, settings: &Settings) {
    let nudge_step = settings.governor.nudge_step;
    let target_step = i64::from(settings.governor.target_step_mb);
    match action {
        Action::AllocatePad => pads.allocate(ctx),
        Action::FreePad => pads.free(ctx),
        Action::NudgeUp => {
            let nudge = ctx.nudge(nudge_step);
            log::info!("Sandbox: nudge {:+.3}", nudge);
        }
        Action::NudgeDown => {
            let nudge = ctx.nudge(-nudge_step);
            log::info!("Sandbox: nudge {:+.3}", nudge);
        }
        Action::Reset => {
            pads.free_all(ctx);
            ctx.reset();
            log::info!("Sandbox: pads freed, governor reset");
        }
        Action::ToggleTelemetry => {
            let mode = ctx.toggle_telemetry();
            log::info!("Sandbox: telemetry now {:?}", mode);
        }
        Action::RaiseTarget => {
            ctx.adjust_target(target_step);
        }
        Action::LowerTarget => {
            ctx.adjust_target(-target_step);
        }
        Action::ToggleGovernor => {
            let enabled = !ctx.governor().is_enabled();
            ctx.set_enabled(enabled);
        }
    }
}

fn run(args: &Args) -> Result<()> {
    let settings = match &args.config {
        Some(path) => Settings::load(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => Settings::default(),
    };

    let (counter, device) = build_counter(args);
    if let Some(counter) = &counter {
        log::info!("Sandbox: native counter {}", counter.label());
    } else {
        log::info!("Sandbox: no native counter, synthetic telemetry");
    }

    let mut ctx = GovernorContext::new(&settings, counter).context("building governor")?;
    let mut scene = Scene::demo(&mut ctx).context("spawning demo objects")?;
    let mut pads = PadPool {
        device,
        pad_mb: ctx.telemetry().allocation_block_mb(),
        live: Vec::new(),
    };
    let mut timeline = Timeline::demo();

    let fps = args.fps.max(1);
    let step = Duration::from_secs_f64(1.0 / f64::from(fps));
    let frames = (args.seconds.max(0.0) * f64::from(fps)).round() as u64;
    let mut evaluations = 0u64;

    for frame in 0..frames {
        let now = step.mul_f64(frame as f64);
        for action in timeline.due(now) {
            apply(action, &mut ctx, &mut pads, &settings);
        }

        if let TickOutcome::Evaluated(report) = ctx.frame(now) {
            evaluations += 1;
            log::trace!("Sandbox: {:?}", report);
        }
        scene.render(&ctx);

        if args.realtime {
            std::thread::sleep(step);
        }
    }

    if !timeline.is_empty() {
        log::warn!("Sandbox: session ended before the script finished");
    }
    log::info!("Sandbox: {} frames, {} evaluations", frames, evaluations);
    log::info!("Sandbox: {}", ctx.snapshot());
    Ok(())
}

fn main() -> Result<()> {
    use env_logger::{Builder, Env};

    Builder::from_env(Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    run(&args)
}
