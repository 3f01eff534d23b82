//! End-to-end runs against in-memory devices.

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use l2vpn_scale::aggregate::{Aggregator, Mode};
use l2vpn_scale::circuit::{CircuitParams, CircuitPlan, CircuitRange, Endpoint, Side};
use l2vpn_scale::config::Credentials;
use l2vpn_scale::error::{
    ArgumentError, ConfigError, DeviceError, DeviceResult, DriverError, Error, ErrorKind,
};
use l2vpn_scale::sink::OutputPath;
use l2vpn_scale::template::Template;
use l2vpn_scale::{Connector, Delivery, Driver, Response, RunPlan, Sink, Target, execute};

/// Everything every fake device saw, in order.
#[derive(Debug, Default)]
struct Wire(Mutex<Vec<(String, String)>>);

impl Wire {
    fn record(&self, host: &str, event: &str) {
        self.0.lock().unwrap().push((host.to_string(), event.to_string()));
    }

    fn events(&self, host: &str) -> Vec<String> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .filter(|(h, _)| h == host)
            .map(|(_, e)| e.clone())
            .collect()
    }

    fn hosts(&self) -> Vec<String> {
        let mut hosts: Vec<String> = Vec::new();
        for (host, _) in self.0.lock().unwrap().iter() {
            if !hosts.contains(host) {
                hosts.push(host.clone());
            }
        }
        hosts
    }
}

struct FakeDevice {
    host: String,
    wire: Arc<Wire>,
    reject_containing: Option<String>,
    show_output: String,
}

impl Driver for FakeDevice {
    async fn open(&mut self) -> DeviceResult<()> {
        self.wire.record(&self.host, "open");
        Ok(())
    }

    async fn close(&mut self) -> DeviceResult<()> {
        self.wire.record(&self.host, "close");
        Ok(())
    }

    async fn send_command(&mut self, command: &str) -> DeviceResult<Response> {
        self.wire.record(&self.host, command);
        Ok(Response::new(command, self.show_output.clone(), "pe#", Duration::ZERO))
    }

    async fn send_config(&mut self, commands: &[&str]) -> DeviceResult<Vec<Response>> {
        let mut responses = Vec::new();
        for command in commands {
            self.wire.record(&self.host, command);
            let rejected = self
                .reject_containing
                .as_deref()
                .is_some_and(|needle| command.contains(needle));
            if rejected {
                return Err(DriverError::CommandRejected {
                    command: command.to_string(),
                    output: "% Invalid input detected at '^' marker.".to_string(),
                }
                .into());
            }
            responses.push(Response::new(*command, "", "pe(config)#", Duration::ZERO));
        }
        Ok(responses)
    }

    fn is_open(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone)]
struct FakeLab {
    wire: Arc<Wire>,
    reject: Option<(String, String)>,
    /// `show` output per host; hosts not listed have nothing configured.
    show_output: HashMap<String, String>,
}

impl FakeLab {
    fn new() -> Self {
        Self {
            wire: Arc::new(Wire::default()),
            reject: None,
            show_output: HashMap::new(),
        }
    }
}

impl Connector for FakeLab {
    type Session = FakeDevice;

    fn driver(&self, host: &str) -> DeviceResult<FakeDevice> {
        let reject_containing = self
            .reject
            .as_ref()
            .filter(|(h, _)| h == host)
            .map(|(_, needle)| needle.clone());
        Ok(FakeDevice {
            host: host.to_string(),
            wire: self.wire.clone(),
            reject_containing,
            show_output: self.show_output.get(host).cloned().unwrap_or_default(),
        })
    }
}

fn template_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("templates").join(name)
}

fn endpoints() -> (Endpoint, Endpoint) {
    (
        Endpoint {
            side: Side::A,
            interface: "GigabitEthernet0/0/1".to_string(),
            loopback: Ipv4Addr::new(10, 255, 0, 1),
        },
        Endpoint {
            side: Side::Z,
            interface: "GigabitEthernet0/0/2".to_string(),
            loopback: Ipv4Addr::new(10, 255, 0, 2),
        },
    )
}

fn run_plan(mode: Mode, count: u32, both_sides: bool) -> RunPlan {
    let (a, z) = endpoints();
    let mut targets = vec![Target {
        host: "pe-a".to_string(),
        local: a.clone(),
        remote: z.clone(),
    }];
    if both_sides {
        targets.push(Target {
            host: "pe-z".to_string(),
            local: z,
            remote: a,
        });
    }

    RunPlan {
        mode,
        plan: CircuitPlan::new(CircuitRange::new(1, count).unwrap(), CircuitParams::default())
            .unwrap(),
        template: Template::load(&template_path("l2vpn.j2")).unwrap(),
        undo: false,
        aggregator: Aggregator::default(),
        targets,
        preflight: false,
    }
}

fn config_lines(events: &[String]) -> Vec<&str> {
    events
        .iter()
        .map(String::as_str)
        .filter(|e| *e != "open" && *e != "close")
        .collect()
}

#[tokio::test]
async fn dry_run_writes_three_blocks_without_connecting() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out.cfg");
    let lab = FakeLab::new();
    let sink: Sink<FakeLab> = Sink::dry_run(OutputPath::new(out.display().to_string()));

    let deliveries = execute(&run_plan(Mode::Provision, 3, false), &sink)
        .await
        .unwrap();

    assert_eq!(
        deliveries,
        vec![Delivery::Written {
            host: "pe-a".to_string(),
            path: out.clone(),
        }]
    );
    let text = std::fs::read_to_string(&out).unwrap();
    for id in 1..=3 {
        assert!(text.contains(&format!("service instance {id} ethernet EVC-000{id}")));
        assert!(text.contains(&format!("xconnect 10.255.0.2 500000{id} encapsulation mpls")));
    }
    assert_eq!(text.matches("ethernet evc EVC-").count(), 3);
    assert!(lab.wire.hosts().is_empty());
}

#[tokio::test]
async fn dry_run_single_path_for_two_devices_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out.cfg");
    let sink: Sink<FakeLab> = Sink::dry_run(OutputPath::new(out.display().to_string()));

    let err = execute(&run_plan(Mode::Provision, 1, true), &sink)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Argument(ArgumentError::OutputPathClash { .. })));
    assert!(!out.exists());
}

#[tokio::test]
async fn zero_circuits_is_not_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let template = dir.path().join("{side}.cfg").display().to_string();
    let sink: Sink<FakeLab> = Sink::dry_run(OutputPath::new(template));

    execute(&run_plan(Mode::Provision, 0, true), &sink)
        .await
        .unwrap();
    assert_eq!(std::fs::read_to_string(dir.path().join("a.cfg")).unwrap(), "");
    assert_eq!(std::fs::read_to_string(dir.path().join("z.cfg")).unwrap(), "");
}

#[tokio::test]
async fn provision_applies_a_then_z() {
    let lab = FakeLab::new();
    let sink = Sink::live(|| Ok(lab.clone())).unwrap();

    let deliveries = execute(&run_plan(Mode::Provision, 2, true), &sink)
        .await
        .unwrap();

    assert_eq!(lab.wire.hosts(), vec!["pe-a", "pe-z"]);
    assert!(matches!(deliveries[0], Delivery::Applied { ref host, .. } if host == "pe-a"));

    let z_events = lab.wire.events("pe-z");
    assert_eq!(z_events.first().map(String::as_str), Some("open"));
    assert_eq!(z_events.last().map(String::as_str), Some("close"));
    assert!(z_events.iter().any(|e| e == "  xconnect 10.255.0.1 5000002 encapsulation mpls"));
    assert!(z_events.iter().any(|e| e == "  cfm mep domain OPERATOR mpid 2"));
}

#[tokio::test]
async fn deprovision_sends_two_negated_blocks() {
    let lab = FakeLab::new();
    let sink = Sink::live(|| Ok(lab.clone())).unwrap();
    let run = run_plan(Mode::Deprovision, 2, false);

    execute(&run, &sink).await.unwrap();

    let provision_plan = run_plan(Mode::Provision, 2, false);
    let provision = provision_plan.payloads().unwrap();
    let aggregator = Aggregator::default();
    let expected: Vec<String> = provision[0]
        .1
        .blocks()
        .flat_map(|block| {
            aggregator
                .negate_block(block)
                .lines()
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .collect();

    let events = lab.wire.events("pe-a");
    assert_eq!(config_lines(&events), expected);
    assert_eq!(expected.iter().filter(|l| l.starts_with("no ethernet evc")).count(), 2);
    assert_eq!(expected[0], "no ip sla schedule 2 life forever start-time now");
}

#[tokio::test]
async fn rejection_on_a_stops_before_z() {
    let mut lab = FakeLab::new();
    lab.reject = Some(("pe-a".to_string(), "encapsulation dot1q 2".to_string()));
    let sink = Sink::live(|| Ok(lab.clone())).unwrap();

    let err = execute(&run_plan(Mode::Provision, 3, true), &sink)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Device);
    assert_eq!(err.kind().exit_code(), 5);
    match err {
        Error::Device {
            host,
            source: DeviceError::Driver(DriverError::CommandRejected { command, output }),
        } => {
            assert_eq!(host, "pe-a");
            assert_eq!(command.trim(), "encapsulation dot1q 2");
            assert!(output.contains("% Invalid input"));
        }
        other => panic!("unexpected {other:?}"),
    }

    assert_eq!(lab.wire.hosts(), vec!["pe-a"]);
    assert_eq!(lab.wire.events("pe-a").last().map(String::as_str), Some("close"));
}

#[test]
fn missing_credentials_fail_before_any_session() {
    let lab = FakeLab::new();

    let result: l2vpn_scale::Result<Sink<FakeLab>> = Sink::live(|| {
        Credentials::from_lookup(|var| (var == "username").then(|| "lab".to_string()))?;
        Ok(lab.clone())
    });

    let err = result.unwrap_err();
    assert!(matches!(err, Error::Config(ConfigError::MissingCredential { var: "password" })));
    assert_eq!(err.kind().exit_code(), 3);
    assert!(lab.wire.hosts().is_empty());
}

#[tokio::test]
async fn preflight_collision_blocks_provision() {
    let mut lab = FakeLab::new();
    for host in ["pe-a", "pe-z"] {
        lab.show_output.insert(
            host.to_string(),
            " service instance 2 ethernet EVC-0002\nip sla 3\n".to_string(),
        );
    }
    let sink = Sink::live(|| Ok(lab.clone())).unwrap();

    let mut run = run_plan(Mode::Provision, 2, true);
    run.preflight = true;

    let err = execute(&run, &sink).await.unwrap_err();
    match err {
        Error::Argument(ArgumentError::PreflightCollision { ref host, ref collisions }) => {
            assert_eq!(host, "pe-a");
            assert!(collisions.contains("service instance(s) 2"));
            assert!(collisions.contains("IP SLA operation(s) 3"));
        }
        ref other => panic!("unexpected {other:?}"),
    }
    assert_eq!(err.kind().exit_code(), 2);

    let events = lab.wire.events("pe-a");
    assert_eq!(
        events,
        vec![
            "open",
            "show running-config interface GigabitEthernet0/0/1 | include service instance",
            "show running-config | include ^ip sla [0-9]",
            "close",
        ]
    );
    assert!(lab.wire.events("pe-z").is_empty());
}

#[tokio::test]
async fn preflight_checks_every_device_before_configuring_any() {
    let mut lab = FakeLab::new();
    lab.show_output.insert(
        "pe-z".to_string(),
        " service instance 2 ethernet EVC-0002\n".to_string(),
    );
    let sink = Sink::live(|| Ok(lab.clone())).unwrap();

    let mut run = run_plan(Mode::Provision, 2, true);
    run.preflight = true;

    let err = execute(&run, &sink).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Argument(ArgumentError::PreflightCollision { ref host, .. }) if host == "pe-z"
    ));

    let show_session = |interface: &str| {
        vec![
            "open".to_string(),
            format!("show running-config interface {interface} | include service instance"),
            "show running-config | include ^ip sla [0-9]".to_string(),
            "close".to_string(),
        ]
    };
    assert_eq!(lab.wire.events("pe-a"), show_session("GigabitEthernet0/0/1"));
    assert_eq!(lab.wire.events("pe-z"), show_session("GigabitEthernet0/0/2"));
}

#[tokio::test]
async fn preflight_passes_then_configures_both_devices() {
    let lab = FakeLab::new();
    let sink = Sink::live(|| Ok(lab.clone())).unwrap();

    let mut run = run_plan(Mode::Provision, 1, true);
    run.preflight = true;

    execute(&run, &sink).await.unwrap();

    assert_eq!(lab.wire.hosts(), vec!["pe-a", "pe-z"]);
    for host in ["pe-a", "pe-z"] {
        let events = lab.wire.events(host);
        let opens = events.iter().filter(|e| *e == "open").count();
        assert_eq!(opens, 2, "{host}: one check session and one config session");
        assert!(events.iter().any(|e| e.starts_with("ethernet evc EVC-0001")));
    }
}
