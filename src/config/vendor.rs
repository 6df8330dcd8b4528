//! Switch-style QoS configuration (a subset of the `mls qos` CLI).
//!
//! ```text
//! ! egress policy
//! mls qos
//! interface GigabitEthernet1/0/1
//!  mls qos trust dscp
//!  priority-queue out
//! mls qos map dscp-queue 46 to 0
//! mls qos map dscp-queue 26 28 to 1
//! ```
//!
//! The result is always four queues. Queue 0 is the expedite queue with
//! priority 0; the other three are ranked from the DSCP maps with a simple
//! modulo rule, not the RFC 2474 class selectors.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::{debug, info, warn};

use super::{ClassParams, ConfigError, read_file};

pub const QUEUE_COUNT: usize = 4;
pub const MAX_DSCP: u8 = 63;
pub const MAX_QUEUE: u8 = 3;
const LOWEST_PRIORITY: u32 = 3;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VendorConfig {
    pub interface: Option<String>,
    pub qos_enabled: bool,
    pub priority_queue_enabled: bool,
    pub trust_dscp: bool,
    pub dscp_queue: BTreeMap<u8, u8>,
    pub dscp_priority: BTreeMap<u8, u32>,
}

impl VendorConfig {
    fn check(&self) -> Result<(), ConfigError> {
        if !self.qos_enabled {
            return Err(ConfigError::MissingDirective("mls qos"));
        }
        if !self.priority_queue_enabled {
            return Err(ConfigError::MissingDirective("priority-queue out"));
        }
        if !self.trust_dscp {
            return Err(ConfigError::MissingDirective("mls qos trust dscp"));
        }
        if self.dscp_queue.is_empty() && self.dscp_priority.is_empty() {
            return Err(ConfigError::MissingDirective("mls qos map dscp-queue"));
        }
        Ok(())
    }

    /// Validates the required directives and derives the four queue
    /// priorities.
    pub fn class_params(&self) -> Result<ClassParams, ConfigError> {
        self.check()?;

        let mut priorities = vec![LOWEST_PRIORITY; QUEUE_COUNT];
        priorities[0] = 0;

        if !self.dscp_priority.is_empty() {
            // priority p lands on queue p % 3 + 1; each queue keeps its best
            for &p in self.dscp_priority.values() {
                let queue = (p % (QUEUE_COUNT as u32 - 1)) as usize + 1;
                if p < priorities[queue] {
                    priorities[queue] = p;
                }
            }
        } else {
            for (&dscp, &queue) in &self.dscp_queue {
                let queue = queue as usize;
                if (1..QUEUE_COUNT).contains(&queue) {
                    priorities[queue] = priorities[queue].min(dscp as u32 % 3 + 1);
                }
            }
        }

        for (queue, priority) in priorities.iter().enumerate() {
            info!(queue, priority, "derived queue priority");
        }
        Ok(ClassParams::new(priorities))
    }
}

struct Parser {
    config: VendorConfig,
    line: usize,
}

impl Parser {
    fn syntax(&self, reason: impl Into<String>) -> ConfigError {
        ConfigError::Syntax {
            line: self.line,
            reason: reason.into(),
        }
    }

    fn parse_line(&mut self, tokens: &[&str]) -> Result<(), ConfigError> {
        match tokens {
            [] => Ok(()),
            ["interface", name, ..] => {
                debug!(interface = *name, "selected interface");
                self.config.interface = Some(name.to_string());
                Ok(())
            }
            ["interface"] => Err(self.syntax("interface needs a name")),
            ["priority-queue", "out", ..] => {
                self.config.priority_queue_enabled = true;
                Ok(())
            }
            ["priority-queue", mode, ..] => {
                Err(self.syntax(format!("unknown priority-queue mode {mode:?}")))
            }
            ["priority-queue"] => Err(self.syntax("priority-queue needs a direction")),
            ["mls", "qos"] => {
                self.config.qos_enabled = true;
                Ok(())
            }
            ["mls", "qos", "trust", kind, ..] => {
                if *kind == "dscp" {
                    self.config.trust_dscp = true;
                } else {
                    warn!(line = self.line, kind = *kind, "ignoring unsupported trust type");
                }
                Ok(())
            }
            ["mls", "qos", "trust"] => Err(self.syntax("mls qos trust needs a type")),
            ["mls", "qos", "map", rest @ ..] => self.parse_map(rest),
            _ => {
                warn!(line = self.line, command = %tokens.join(" "), "ignoring unknown command");
                Ok(())
            }
        }
    }

    // `<kind> <v1> [v2...] to <target>`
    fn parse_map(&mut self, tokens: &[&str]) -> Result<(), ConfigError> {
        let Some((&kind, rest)) = tokens.split_first() else {
            return Err(self.syntax("mls qos map needs a map type"));
        };
        if kind != "dscp-queue" && kind != "dscp-priority" {
            warn!(line = self.line, kind, "ignoring unsupported map type");
            return Ok(());
        }

        let to = rest
            .iter()
            .position(|t| *t == "to")
            .ok_or_else(|| self.syntax(format!("{kind} map is missing 'to'")))?;
        let (values, target) = (&rest[..to], &rest[to + 1..]);

        if values.is_empty() {
            return Err(self.syntax(format!("{kind} map lists no DSCP values")));
        }
        let target = match target {
            [target] => *target,
            [] => return Err(self.syntax(format!("{kind} map is missing its target"))),
            _ => return Err(self.syntax(format!("{kind} map has trailing tokens"))),
        };

        let mut dscps = Vec::with_capacity(values.len());
        for v in values {
            let dscp = v
                .parse::<u8>()
                .ok()
                .filter(|d| *d <= MAX_DSCP)
                .ok_or_else(|| self.syntax(format!("invalid DSCP value {v:?}")))?;
            dscps.push(dscp);
        }

        if kind == "dscp-queue" {
            let queue = target
                .parse::<u8>()
                .ok()
                .filter(|q| *q <= MAX_QUEUE)
                .ok_or_else(|| self.syntax(format!("invalid queue {target:?}")))?;
            for dscp in dscps {
                debug!(dscp, queue, "mapped dscp to queue");
                self.config.dscp_queue.insert(dscp, queue);
            }
        } else {
            let priority = target
                .parse::<u32>()
                .map_err(|_| self.syntax(format!("invalid priority {target:?}")))?;
            for dscp in dscps {
                debug!(dscp, priority, "mapped dscp to priority");
                self.config.dscp_priority.insert(dscp, priority);
            }
        }
        Ok(())
    }
}

/// Parses the command text. Unknown commands are skipped with a warning;
/// malformed known commands fail with their line number.
pub fn parse(text: &str) -> Result<VendorConfig, ConfigError> {
    let mut parser = Parser {
        config: VendorConfig::default(),
        line: 0,
    };

    for (i, raw) in text.lines().enumerate() {
        parser.line = i + 1;
        let line = raw.trim();
        if line.starts_with('#') || line.starts_with('!') {
            continue;
        }
        let tokens: Vec<&str> = line.split_whitespace().collect();
        parser.parse_line(&tokens)?;
    }

    Ok(parser.config)
}

pub fn load(path: impl AsRef<Path>) -> Result<ClassParams, ConfigError> {
    let path = path.as_ref();
    let params = parse(&read_file(path)?)?.class_params()?;
    info!(path = %path.display(), queues = params.count(), "loaded vendor configuration");
    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "\
! switch egress
mls qos
interface GigabitEthernet1/0/1
 mls qos trust dscp
 priority-queue out
";

    fn with(extra: &str) -> String {
        format!("{BASE}{extra}\n")
    }

    #[test]
    fn parses_directives() {
        let cfg = parse(&with("mls qos map dscp-queue 10 20 to 2")).unwrap();
        assert!(cfg.qos_enabled && cfg.priority_queue_enabled && cfg.trust_dscp);
        assert_eq!(cfg.interface.as_deref(), Some("GigabitEthernet1/0/1"));
        assert_eq!(cfg.dscp_queue.get(&10), Some(&2));
        assert_eq!(cfg.dscp_queue.get(&20), Some(&2));
    }

    #[test]
    fn queue_map_derivation() {
        // 46 % 3 + 1 = 2, 26 % 3 + 1 = 3, 28 % 3 + 1 = 2
        let cfg = parse(&with(
            "mls qos map dscp-queue 46 to 1\nmls qos map dscp-queue 26 28 to 2\nmls qos map dscp-queue 8 to 0",
        ))
        .unwrap();
        assert_eq!(cfg.class_params().unwrap().values(), [0, 2, 2, 3]);
    }

    #[test]
    fn priority_map_takes_precedence() {
        // priorities 1 -> queue 2, 2 -> queue 3, 0 -> queue 1, 5 ignored (>= 3)
        let cfg = parse(&with(
            "mls qos map dscp-queue 46 to 1\nmls qos map dscp-priority 46 to 1\nmls qos map dscp-priority 26 to 2\nmls qos map dscp-priority 10 to 0\nmls qos map dscp-priority 0 to 5",
        ))
        .unwrap();
        assert_eq!(cfg.class_params().unwrap().values(), [0, 0, 1, 2]);
    }

    #[test]
    fn priority_map_alone_is_enough() {
        // 0 -> queue 1, 1 -> queue 2, queue 3 keeps the lowest priority
        let cfg = parse(&with(
            "mls qos map dscp-priority 46 to 0\nmls qos map dscp-priority 26 to 1",
        ))
        .unwrap();
        assert!(cfg.dscp_queue.is_empty());
        assert_eq!(cfg.class_params().unwrap().values(), [0, 0, 1, 3]);
    }

    #[test]
    fn no_dscp_map_fails() {
        let cfg = parse(&with("mls qos map cos-dscp 0 8 16 24 32 40 48 56")).unwrap();
        match cfg.class_params() {
            Err(ConfigError::MissingDirective(d)) => assert_eq!(d, "mls qos map dscp-queue"),
            other => panic!("expected missing dscp map, got {other:?}"),
        }
    }

    #[test]
    fn missing_directives_fail() {
        let map = "mls qos map dscp-queue 46 to 1\n";
        for (text, missing) in [
            ("interface x\nmls qos trust dscp\npriority-queue out\n", "mls qos"),
            ("mls qos\nmls qos trust dscp\n", "priority-queue out"),
            ("mls qos\npriority-queue out\n", "mls qos trust dscp"),
        ] {
            let cfg = parse(&format!("{text}{map}")).unwrap();
            match cfg.class_params() {
                Err(ConfigError::MissingDirective(d)) => assert_eq!(d, missing),
                other => panic!("expected missing {missing}, got {other:?}"),
            }
        }

        let cfg = parse(BASE).unwrap();
        assert!(matches!(
            cfg.class_params(),
            Err(ConfigError::MissingDirective(_))
        ));
    }

    #[test]
    fn unknown_commands_are_ignored() {
        let cfg = parse(&with(
            "hostname sw1\nmls qos map cos-dscp 0 8 16 24 32 40 48 56\nmls qos trust cos\nmls qos rewrite ip dscp\nend",
        ))
        .unwrap();
        assert!(cfg.trust_dscp);
        assert!(cfg.dscp_queue.is_empty());
    }

    #[test]
    fn malformed_commands_fail_with_line() {
        let cases = [
            "mls qos map dscp-queue 64 to 1",
            "mls qos map dscp-queue 10 to 4",
            "mls qos map dscp-queue 10 1",
            "mls qos map dscp-queue 10 to",
            "mls qos map dscp-queue to 1",
            "mls qos map dscp-queue ten to 1",
            "mls qos map dscp-priority 10 to high",
            "priority-queue in",
            "interface",
            "mls qos trust",
        ];
        for case in cases {
            match parse(&with(case)) {
                Err(ConfigError::Syntax { line, .. }) => assert_eq!(line, 6, "{case}"),
                other => panic!("{case}: expected syntax error, got {other:?}"),
            }
        }
    }
}
