//! The run: render every payload, then deliver them one device at a time.

use std::time::Instant;

use log::info;

use crate::aggregate::{Aggregator, Mode, Payload};
use crate::circuit::{CircuitPlan, Endpoint, Side};
use crate::error::Result;
use crate::preflight::Preflight;
use crate::render::BlockRenderer;
use crate::sink::{Connector, Delivery, Sink};
use crate::template::Template;

/// One device and the circuit end it hosts.
#[derive(Debug, Clone)]
pub struct Target {
    pub host: String,
    pub local: Endpoint,
    pub remote: Endpoint,
}

impl Target {
    pub fn side(&self) -> Side {
        self.local.side
    }
}

/// Everything a run needs, fixed before any output is produced.
#[derive(Debug)]
pub struct RunPlan {
    pub mode: Mode,
    pub plan: CircuitPlan,
    /// The template rendered for this run.
    pub template: Template,
    /// `template` is an undo template: in deprovision mode its rendering is
    /// used as is instead of being negated.
    pub undo: bool,
    pub aggregator: Aggregator,
    /// Targets in delivery order, A first.
    pub targets: Vec<Target>,
    pub preflight: bool,
}

impl RunPlan {
    /// Render the payload of every target.
    ///
    /// Nothing is written or sent until all of them render, so a template
    /// problem never leaves one device configured and the other not.
    pub fn payloads(&self) -> Result<Vec<(&Target, Payload)>> {
        let renderer = BlockRenderer::new(&self.template, &self.plan)?;

        self.targets
            .iter()
            .map(|target| {
                let blocks = renderer.render_all(&target.local, &target.remote)?;
                let payload = match self.mode {
                    Mode::Deprovision if self.undo => self.aggregator.aggregate_undo(&blocks),
                    mode => self.aggregator.aggregate(mode, &blocks),
                };
                Ok((target, payload))
            })
            .collect()
    }

    fn preflight_for(&self, target: &Target) -> Option<Preflight> {
        (self.preflight && self.mode == Mode::Provision)
            .then(|| Preflight::for_endpoint(&self.plan, &target.local))
    }
}

/// Run the plan against `sink`. The first failure ends the run; later
/// targets are not contacted.
///
/// Every target is checked for id collisions before any target is
/// configured.
pub async fn execute<C: Connector>(run: &RunPlan, sink: &Sink<C>) -> Result<Vec<Delivery>> {
    let devices: Vec<(&str, Side)> = run
        .targets
        .iter()
        .map(|target| (target.host.as_str(), target.side()))
        .collect();
    sink.prepare(&devices, run.mode)?;

    let start = Instant::now();
    let payloads = run.payloads()?;
    info!(
        "Rendered {} circuit(s) for {} device(s) in {:?}",
        run.plan.range().len(),
        payloads.len(),
        start.elapsed()
    );

    for target in &run.targets {
        if let Some(check) = run.preflight_for(target) {
            sink.preflight(&target.host, &check).await?;
        }
    }

    let mut deliveries = Vec::with_capacity(payloads.len());
    for (target, payload) in &payloads {
        info!(
            "{} side {} ({}): {} block(s)",
            run.mode,
            target.side(),
            target.host,
            payload.len()
        );
        let delivery = sink.deliver(&target.host, target.side(), payload).await?;
        deliveries.push(delivery);
    }

    Ok(deliveries)
}
