use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use clap::{ArgGroup, Parser};
use nfq::{Queue, Verdict};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use diffserv_shaper::config::{generic, vendor};
use diffserv_shaper::token_bucket::{TokenBucket, TokenBucketLimiter, Unlimited};
use diffserv_shaper::{DispatchEngine, Filter, Packet, Policy, monitor::Monitor};

mod nfq_message;

use nfq_message::NfqMessage;

const BATCH_LIMIT: usize = 10000;
const QUEUE_MAX_LEN: u32 = 10000;

/// DiffServ egress shaper over NFQUEUE.
#[derive(Debug, Parser)]
#[command(version, about)]
#[command(group(ArgGroup::new("source").required(true).args(["config", "vendor"])))]
struct Args {
    /// Scheduling policy.
    #[arg(long, default_value = "spq")]
    policy: Policy,

    /// Class count followed by one priority (spq) or quantum (drr) per class.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Switch-style `mls qos` configuration; implies spq.
    #[arg(long)]
    vendor: Option<PathBuf>,

    /// `<class>:<expr>`, e.g. `1:proto=udp,dport=5060`. Repeatable.
    #[arg(long = "filter", value_name = "CLASS:EXPR")]
    filters: Vec<String>,

    /// NFQUEUE numbers to read from.
    #[arg(long = "nfqueue", default_value = "0")]
    nfqueues: Vec<u16>,

    #[arg(long)]
    class_capacity: Option<usize>,

    #[arg(long, default_value_t = diffserv_shaper::engine::DEFAULT_MAX_PACKETS)]
    max_packets: usize,

    /// Egress rate; unpaced when absent.
    #[arg(long)]
    rate_kbit: Option<u64>,

    #[arg(long, default_value_t = 64 * 1024)]
    burst_bytes: usize,

    #[arg(long, default_value_t = 5)]
    report_secs: u64,
}

fn parse_class_filter(arg: &str) -> Result<(usize, Filter)> {
    let (class, expr) = arg
        .split_once(':')
        .ok_or_else(|| anyhow!("filter {arg:?} is not <class>:<expr>"))?;
    let class = class
        .trim()
        .parse()
        .with_context(|| format!("invalid class index in filter {arg:?}"))?;
    let filter = expr
        .parse()
        .with_context(|| format!("invalid filter expression in {arg:?}"))?;
    Ok((class, filter))
}

fn build_engine(args: &Args) -> Result<DispatchEngine<NfqMessage>> {
    let (policy, params) = match (&args.config, &args.vendor) {
        (_, Some(path)) => {
            if args.policy != Policy::Spq {
                bail!("--vendor only supports the spq policy");
            }
            let params = vendor::load(path)
                .with_context(|| format!("loading vendor config {}", path.display()))?;
            (Policy::Spq, params)
        }
        (Some(path), None) => {
            let params = generic::load(path)
                .with_context(|| format!("loading config {}", path.display()))?;
            (args.policy, params)
        }
        (None, None) => bail!("one of --config or --vendor is required"),
    };

    let mut engine = DispatchEngine::from_params(policy, &params)
        .context("building dispatch engine")?
        .with_max_packets(args.max_packets);

    if let Some(capacity) = args.class_capacity {
        engine.set_class_capacity(capacity);
    }

    for arg in &args.filters {
        let (class, filter) = parse_class_filter(arg)?;
        if !engine.add_filter(class, filter) {
            bail!(
                "filter {arg:?} names class {class}, but only {} classes exist",
                engine.n_traffic_classes()
            );
        }
    }

    Ok(engine)
}

fn make_queue(queue_num: u16) -> Result<Queue, std::io::Error> {
    let mut q = Queue::open()?;
    q.bind(queue_num)?;
    q.set_copy_range(queue_num, 0xFFFF)?;
    q.set_queue_max_len(queue_num, QUEUE_MAX_LEN)?;
    q.set_nonblocking(true);
    Ok(q)
}

fn release(queues: &mut [Queue], msg: NfqMessage, verdict: Verdict) {
    let idx = msg.queue_idx();
    if let Err(e) = queues[idx].verdict(msg.with_verdict(verdict)) {
        error!(queue = idx, error = %e, "failed to set verdict");
    }
}

// Largest head across classes, so a granted spend covers whichever packet the
// scheduler picks.
fn next_cost(engine: &DispatchEngine<NfqMessage>) -> Option<usize> {
    engine
        .traffic_classes()
        .iter()
        .filter_map(|c| c.peek())
        .map(|p| p.len())
        .max()
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let mut engine = build_engine(&args)?;

    let mut limiter: Box<dyn TokenBucketLimiter> = match args.rate_kbit {
        Some(rate) => {
            info!(rate_kbit = rate, burst = args.burst_bytes, "pacing egress");
            Box::new(TokenBucket::from_kbit(rate, args.burst_bytes))
        }
        None => Box::new(Unlimited),
    };
    let mut monitor = Monitor::new(
        engine.policy_name(),
        Duration::from_secs(args.report_secs),
    );

    let mut queues = args
        .nfqueues
        .iter()
        .map(|&n| make_queue(n).with_context(|| format!("failed to bind NFQUEUE {n}")))
        .collect::<Result<Vec<_>>>()?;

    info!(
        policy = engine.policy_name(),
        classes = engine.n_traffic_classes(),
        queues = ?args.nfqueues,
        "shaper running"
    );

    loop {
        let mut working = false;

        let mut packet_count = 0;
        while packet_count < BATCH_LIMIT {
            let mut no_packet = true;
            for i in 0..queues.len() {
                let Ok(msg) = queues[i].recv() else {
                    continue;
                };
                working = true;
                no_packet = false;
                packet_count += 1;

                if let Err(dropped) = engine.enqueue(Packet::new(NfqMessage::new(msg, i))) {
                    debug!(queue = i, len = dropped.pkt_len, "dropping packet");
                    release(&mut queues, dropped.into_inner(), Verdict::Drop);
                }
            }
            if no_packet {
                break;
            }
        }

        while let Some(cost) = next_cost(&engine) {
            if !limiter.can_spend(cost) {
                break;
            }
            // DRR may need a few rounds of deficit before a large head fits
            working = true;
            let Some(packet) = engine.dequeue() else {
                break;
            };
            if !limiter.consume(packet.pkt_len) {
                warn!(len = packet.pkt_len, "released packet beyond pacing budget");
            }
            release(&mut queues, packet.into_inner(), Verdict::Accept);
        }

        monitor.maybe_report(&engine);

        if !working {
            std::thread::sleep(Duration::from_micros(100));
        }
    }
}
