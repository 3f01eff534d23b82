//! Collision check against a device's running configuration.
//!
//! Identifiers are planned from `--start` and `--sla-base` alone. Before
//! pushing, the device is asked which EFP service instances exist on the
//! target interface and which IP SLA operations exist globally; any overlap
//! with the plan stops the run.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use log::{debug, info};
use regex::Regex;

use crate::circuit::{CircuitPlan, Endpoint};
use crate::driver::Driver;
use crate::error::{ArgumentError, Error, Result};

static SERVICE_INSTANCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]+service instance (\d+) ethernet").expect("service instance pattern is valid")
});

static IP_SLA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^ip sla (\d+)").expect("ip sla pattern is valid"));

/// Command listing the service instances on `interface`.
pub fn service_instance_command(interface: &str) -> String {
    format!("show running-config interface {interface} | include service instance")
}

/// Command listing IP SLA operations.
pub const IP_SLA_COMMAND: &str = "show running-config | include ^ip sla [0-9]";

/// Planned ids for one device.
#[derive(Debug, Clone)]
pub struct Preflight {
    interface: String,
    service_instances: BTreeSet<u32>,
    ip_slas: BTreeSet<u32>,
}

impl Preflight {
    /// Ids `plan` will create on `local`.
    pub fn for_endpoint(plan: &CircuitPlan, local: &Endpoint) -> Self {
        let mut service_instances = BTreeSet::new();
        let mut ip_slas = BTreeSet::new();
        for id in plan.range().iter() {
            service_instances.insert(id.get());
            let (slm, dmm) = plan.sla_ids(id);
            ip_slas.extend([slm, dmm]);
        }

        Self {
            interface: local.interface.clone(),
            service_instances,
            ip_slas,
        }
    }

    /// Query `driver` and fail if any planned id is already configured.
    pub async fn run<D: Driver>(&self, driver: &mut D, host: &str) -> Result<()> {
        let efp_output = driver
            .send_command(&service_instance_command(&self.interface))
            .await
            .and_then(|r| r.into_result())
            .map_err(|e| Error::device(host, e))?;
        let sla_output = driver
            .send_command(IP_SLA_COMMAND)
            .await
            .and_then(|r| r.into_result())
            .map_err(|e| Error::device(host, e))?;

        let report = self.collisions(&efp_output.result, &sla_output.result);
        match report {
            Some(collisions) => Err(ArgumentError::PreflightCollision {
                host: host.to_string(),
                collisions,
            }
            .into()),
            None => {
                info!("Preflight on {host}: no planned ids in use");
                Ok(())
            }
        }
    }

    /// Describe planned ids found in the two show outputs.
    pub fn collisions(&self, service_instance_output: &str, ip_sla_output: &str) -> Option<String> {
        let existing_efps = parse_ids(&SERVICE_INSTANCE, service_instance_output);
        let existing_slas = parse_ids(&IP_SLA, ip_sla_output);
        debug!(
            "{} service instance(s) on {}, {} IP SLA operation(s) configured",
            existing_efps.len(),
            self.interface,
            existing_slas.len()
        );

        let efps: Vec<u32> = self.service_instances.intersection(&existing_efps).copied().collect();
        let slas: Vec<u32> = self.ip_slas.intersection(&existing_slas).copied().collect();

        let mut parts = Vec::new();
        if !efps.is_empty() {
            parts.push(format!(
                "service instance(s) {} on {}",
                join(&efps),
                self.interface
            ));
        }
        if !slas.is_empty() {
            parts.push(format!("IP SLA operation(s) {}", join(&slas)));
        }

        (!parts.is_empty()).then(|| parts.join(" and "))
    }
}

fn parse_ids(pattern: &Regex, output: &str) -> BTreeSet<u32> {
    pattern
        .captures_iter(output)
        .filter_map(|caps| caps.get(1)?.as_str().parse().ok())
        .collect()
}

fn join(ids: &[u32]) -> String {
    ids.iter().map(u32::to_string).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use super::*;
    use crate::circuit::{CircuitParams, CircuitRange, Side};

    fn preflight(start: u32, count: u32, sla_base: u32) -> Preflight {
        let params = CircuitParams {
            sla_base,
            ..Default::default()
        };
        let plan = CircuitPlan::new(CircuitRange::new(start, count).unwrap(), params).unwrap();
        let local = Endpoint {
            side: Side::A,
            interface: "Gi0/0/1".to_string(),
            loopback: Ipv4Addr::new(192, 0, 2, 1),
        };
        Preflight::for_endpoint(&plan, &local)
    }

    #[test]
    fn test_commands() {
        assert_eq!(
            service_instance_command("Gi0/0/1"),
            "show running-config interface Gi0/0/1 | include service instance"
        );
    }

    #[test]
    fn test_no_collisions() {
        let check = preflight(10, 2, 100);
        let efps = " service instance 1 ethernet EVC-0001\n service instance 2 ethernet\n";
        let slas = "ip sla 1\nip sla 2\nip sla schedule 1 life forever\n";
        assert_eq!(check.collisions(efps, slas), None);
        assert_eq!(check.collisions("", ""), None);
    }

    #[test]
    fn test_collisions_reported() {
        let check = preflight(1, 3, 1);
        let efps = " service instance 2 ethernet EVC-0002\n service instance 40 ethernet\n";
        let slas = "ip sla 5\nip sla 6\nip sla 99\n";

        assert_eq!(
            check.collisions(efps, slas).unwrap(),
            "service instance(s) 2 on Gi0/0/1 and IP SLA operation(s) 5, 6"
        );
    }

    #[test]
    fn test_schedule_lines_not_counted() {
        let check = preflight(1, 1, 1);
        assert_eq!(check.collisions("", "ip sla schedule 1 life forever\n"), None);
    }

    #[test]
    fn test_unindented_service_instance_ignored() {
        let check = preflight(1, 1, 1);
        assert_eq!(check.collisions("service instance 1 ethernet\n", ""), None);
    }
}
