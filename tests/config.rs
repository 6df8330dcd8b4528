//! Config text to a running engine.

mod common;

use std::fs;
use std::path::PathBuf;

use common::udp_to;
use diffserv_shaper::config::{generic, vendor};
use diffserv_shaper::{ConfigError, DispatchEngine, Policy};

fn scratch_file(name: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("diffserv-{}-{name}", std::process::id()));
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn generic_two_class_priorities() {
    let params = generic::parse("2\n0\n1\n").unwrap();
    let engine = DispatchEngine::<Vec<u8>>::from_params(Policy::Spq, &params).unwrap();

    assert_eq!(engine.n_traffic_classes(), 2);
    let priorities: Vec<_> = engine.traffic_classes().iter().map(|c| c.priority()).collect();
    assert_eq!(priorities, [0, 1]);
    assert!(engine.traffic_class(2).is_none());
}

#[test]
fn generic_quanta_build_drr_engine() {
    let path = scratch_file("quanta.conf", "# three weighted classes\n3\n1500 3000\n4500\n");
    let params = generic::load(&path).unwrap();
    fs::remove_file(&path).ok();

    let mut engine = DispatchEngine::from_params(Policy::Drr, &params).unwrap();
    assert_eq!(engine.policy_name(), "drr");
    let quanta: Vec<_> = engine.traffic_classes().iter().map(|c| c.quantum()).collect();
    assert_eq!(quanta, [1500, 3000, 4500]);

    engine.enqueue(udp_to(80, 200)).unwrap();
    assert_eq!(engine.dequeue().map(|p| p.pkt_len), Some(200));
}

#[test]
fn generic_rejects_short_and_zero_configs() {
    assert!(matches!(
        generic::parse("3\n0\n1\n"),
        Err(ConfigError::MissingParameter { expected: 3, found: 2 })
    ));
    assert!(matches!(generic::parse(""), Err(ConfigError::MissingClassCount)));

    let params = generic::parse("0\n").unwrap();
    for policy in [Policy::Spq, Policy::Drr] {
        assert!(matches!(
            DispatchEngine::<Vec<u8>>::from_params(policy, &params),
            Err(ConfigError::NoClasses)
        ));
    }

    let params = generic::parse("2\n1500\n0\n").unwrap();
    assert!(matches!(
        DispatchEngine::<Vec<u8>>::from_params(Policy::Drr, &params),
        Err(ConfigError::ZeroQuantum { index: 1 })
    ));
}

#[test]
fn vendor_loader_builds_four_priority_queues() {
    let path = scratch_file(
        "switch.cfg",
        "mls qos\n\
         interface GigabitEthernet1/0/1\n \
         mls qos trust dscp\n \
         priority-queue out\n\
         mls qos map dscp-queue 46 to 1\n",
    );
    let params = vendor::load(&path).unwrap();
    fs::remove_file(&path).ok();

    let engine = DispatchEngine::<Vec<u8>>::from_params(Policy::Spq, &params).unwrap();
    assert_eq!(engine.n_traffic_classes(), vendor::QUEUE_COUNT);
    assert_eq!(engine.traffic_class(0).map(|c| c.priority()), Some(0));
}

#[test]
fn vendor_loader_fails_without_each_directive() {
    let lines = [
        "mls qos",
        "priority-queue out",
        "mls qos trust dscp",
        "mls qos map dscp-queue 46 to 1",
    ];
    for skip in 0..lines.len() {
        let text: Vec<_> = lines
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != skip)
            .map(|(_, l)| *l)
            .collect();
        let path = scratch_file(&format!("missing-{skip}.cfg"), &text.join("\n"));
        let result = vendor::load(&path);
        fs::remove_file(&path).ok();

        assert!(
            matches!(result, Err(ConfigError::MissingDirective(_))),
            "dropping {:?} should fail, got {result:?}",
            lines[skip]
        );
    }
}

#[test]
fn vendor_loader_accepts_priority_map_without_queue_map() {
    let base = "mls qos\nmls qos trust dscp\npriority-queue out\n";

    let path = scratch_file("priority-only.cfg", &format!("{base}mls qos map dscp-priority 46 to 2\n"));
    let result = vendor::load(&path);
    fs::remove_file(&path).ok();
    // priority 2 lands on queue 2 % 3 + 1 = 3
    assert_eq!(result.unwrap().values(), [0, 3, 3, 2]);

    let path = scratch_file("no-map.cfg", base);
    let result = vendor::load(&path);
    fs::remove_file(&path).ok();
    assert!(matches!(result, Err(ConfigError::MissingDirective(_))));
}

#[test]
fn missing_file_is_an_io_error() {
    assert!(matches!(
        generic::load("/nonexistent/diffserv/classes.conf"),
        Err(ConfigError::Io { .. })
    ));
}
