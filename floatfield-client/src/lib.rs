//! Headless driver for the float field simulation.
//!
//! Runs a scripted scenario frame by frame and produces one [`FrameReport`]
//! per step, without any browser involved.

use std::path::Path;

use anyhow::{Context, Result};
use floatfield_core::{validate_viewport, ElementHandle, RenderTarget, Simulation, Vector2D};
use floatfield_shared::{ElementOffset, FrameReport, Position, SimulationSettings, TimedInput};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Upper bound on reports allocated up front by [`run_scenario`].
const MAX_PREALLOCATED_REPORTS: usize = 1024;

/// Size of the simulated screen.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 720.0,
        }
    }
}

/// A reproducible run: where the elements start, how the cursor moves and
/// how many frames to step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Scenario {
    pub viewport: Viewport,
    pub settings: SimulationSettings,
    /// Base centers of the tracked elements, registered in order.
    pub elements: Vec<Position>,
    pub frames: u64,
    /// Inputs tagged with frame `k` are applied right before the `k`-th step
    /// (counting from zero).
    pub inputs: Vec<TimedInput>,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            viewport: Viewport::default(),
            settings: SimulationSettings::default(),
            elements: Vec::new(),
            frames: 120,
            inputs: Vec::new(),
        }
    }
}

impl Scenario {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse scenario")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("Invalid scenario {}", path.display()))
    }

    /// Replaces the element list with `count` randomly placed elements.
    pub fn place_random_elements(&mut self, count: usize, seed: u64) -> Result<()> {
        self.elements = random_layout(count, self.viewport, seed)?;
        Ok(())
    }
}

/// Scatters `count` element centers over the viewport, reproducibly for a
/// given seed. Fails on a negative or non-finite viewport.
pub fn random_layout(count: usize, viewport: Viewport, seed: u64) -> Result<Vec<Position>> {
    validate_viewport(viewport.width, viewport.height).context("Invalid viewport")?;

    let mut rng = StdRng::seed_from_u64(seed);
    let layout = (0..count)
        .map(|_| {
            Position::new(
                rng.gen_range(0.0..viewport.width.max(1.0)),
                rng.gen_range(0.0..viewport.height.max(1.0)),
            )
        })
        .collect();
    Ok(layout)
}

/// Collects rendered offsets into report rows.
struct ReportCollector<'a> {
    offsets: &'a mut Vec<ElementOffset>,
}

impl RenderTarget for ReportCollector<'_> {
    type Error = std::convert::Infallible;

    fn apply(&mut self, handle: ElementHandle, offset: Vector2D) -> Result<(), Self::Error> {
        self.offsets.push(ElementOffset {
            handle: handle.to_bits(),
            x: offset.x,
            y: offset.y,
        });
        Ok(())
    }
}

/// Steps a [`Scenario`] one frame at a time.
pub struct Runner {
    simulation: Simulation,
    inputs: Vec<TimedInput>,
    next_input: usize,
    frames: u64,
}

impl Runner {
    pub fn new(scenario: &Scenario) -> Result<Self> {
        let config = scenario
            .settings
            .to_config()
            .context("Invalid simulation settings")?;
        let mut simulation =
            Simulation::new(config, scenario.viewport.width, scenario.viewport.height)
                .context("Failed to start simulation")?;

        for position in &scenario.elements {
            simulation
                .track((*position).into())
                .context("Simulation stopped while placing elements")?;
        }

        // Stable sort keeps same-frame inputs in file order.
        let mut inputs = scenario.inputs.clone();
        inputs.sort_by_key(|input| input.frame);
        if let Some(late) = inputs.iter().find(|input| input.frame >= scenario.frames) {
            log::warn!(
                "Input at frame {} is past the last frame ({}) and will be ignored",
                late.frame,
                scenario.frames
            );
        }

        log::info!(
            "Running {} elements for {} frames ({} scripted inputs)",
            simulation.registry().len(),
            scenario.frames,
            inputs.len()
        );

        Ok(Self {
            simulation,
            inputs,
            next_input: 0,
            frames: scenario.frames,
        })
    }

    pub fn simulation(&self) -> &Simulation {
        &self.simulation
    }

    pub fn is_finished(&self) -> bool {
        self.simulation.frame() >= self.frames || !self.simulation.is_running()
    }

    /// Applies due inputs, steps once and reports the result. `None` once the
    /// scenario is exhausted.
    pub fn next_frame(&mut self) -> Option<FrameReport> {
        if self.is_finished() {
            return None;
        }

        let current = self.simulation.frame();
        while let Some(input) = self.inputs.get(self.next_input) {
            if input.frame > current {
                break;
            }
            log::debug!("frame {}: {:?}", current, input.event);
            self.simulation.input_mut().apply(input.event.into());
            self.next_input += 1;
        }

        self.simulation.step();

        let mut offsets = Vec::with_capacity(self.simulation.registry().len());
        let rendered = self.simulation.render(&mut ReportCollector {
            offsets: &mut offsets,
        });
        if let Err(never) = rendered {
            match never {}
        }

        Some(FrameReport {
            frame: self.simulation.frame(),
            cursor: self.simulation.input().current_cursor().into(),
            offsets,
        })
    }
}

/// Runs a scenario to completion.
pub fn run_scenario(scenario: &Scenario) -> Result<Vec<FrameReport>> {
    let mut runner = Runner::new(scenario)?;
    let mut reports = Vec::with_capacity(report_capacity(scenario.frames));
    while let Some(report) = runner.next_frame() {
        reports.push(report);
    }
    Ok(reports)
}

fn report_capacity(frames: u64) -> usize {
    usize::try_from(frames)
        .unwrap_or(usize::MAX)
        .min(MAX_PREALLOCATED_REPORTS)
}
