//! # l2vpn-scale
//!
//! Bulk-generates templated L2VPN pseudowire configuration for a pair of
//! Cisco IOS-XE routers and either writes it to files or applies it over SSH.
//! Built for scale-testing software loads in a lab.
//!
//! A run is one linear pipeline:
//!
//! 1. [`circuit`] derives N circuit identifiers from `(start, count)`.
//! 2. [`render`] fills the operator's [`template`] once per circuit and side.
//! 3. [`aggregate`] joins the blocks into a payload, negating them for
//!    deprovision.
//! 4. [`sink`] writes the payload to a file (dry run) or hands it to a
//!    [`driver`] session on the device.
//!
//! ## Example
//!
//! ```rust,no_run
//! use l2vpn_scale::aggregate::{Aggregator, Mode};
//! use l2vpn_scale::circuit::{CircuitParams, CircuitPlan, CircuitRange, Endpoint, Side};
//! use l2vpn_scale::render::BlockRenderer;
//! use l2vpn_scale::template::Template;
//!
//! # fn main() -> Result<(), l2vpn_scale::Error> {
//! let template = Template::load("templates/l2vpn.j2".as_ref())?;
//! let plan = CircuitPlan::new(CircuitRange::new(1, 3)?, CircuitParams::default())?;
//! let a = Endpoint { side: Side::A, interface: "Gi0/0/1".into(), loopback: "192.0.2.1".parse().unwrap() };
//! let z = Endpoint { side: Side::Z, interface: "Gi0/0/1".into(), loopback: "192.0.2.2".parse().unwrap() };
//!
//! let blocks = BlockRenderer::new(&template, &plan)?.render_all(&a, &z)?;
//! let payload = Aggregator::default().aggregate(Mode::Deprovision, &blocks);
//! print!("{}", payload.text());
//! # Ok(())
//! # }
//! ```

pub mod aggregate;
pub mod channel;
pub mod circuit;
pub mod cli;
pub mod config;
pub mod driver;
pub mod error;
pub mod pipeline;
pub mod platform;
pub mod preflight;
pub mod render;
pub mod sink;
pub mod template;
pub mod transport;

pub use driver::{Driver, DriverBuilder, GenericDriver, Response};
pub use error::{Error, ErrorKind, Result};
pub use pipeline::{RunPlan, Target, execute};
pub use sink::{Connector, Delivery, Sink, SshConnector};
