use anyhow::{Context, Result, bail};
use chrono::Local;
use wfq_sim::config::{Discipline, FlowId};
use wfq_sim::{Departure, DrainPolicy, IdlePolicy, Scenario, Simulation};

struct Args {
    scenario: Option<String>,
    discipline: Option<Discipline>,
    drain: Option<DrainPolicy>,
    idle: Option<IdlePolicy>,
}

fn parse_args() -> Result<Args> {
    let mut out = Args {
        scenario: None,
        discipline: None,
        drain: None,
        idle: None,
    };

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        let mut value = |flag: &str| args.next().with_context(|| format!("Missing {flag} value"));
        match arg.as_str() {
            "--scenario" => out.scenario = Some(value("--scenario")?),
            "--discipline" => out.discipline = Some(value("--discipline")?.parse()?),
            "--drain" => out.drain = Some(value("--drain")?.parse()?),
            "--idle" => out.idle = Some(value("--idle")?.parse()?),
            "-h" | "--help" => {
                println!(
                    "usage: wfq-sim [--scenario PATH] [--discipline wfq|fifo] \
                     [--drain batch|per-packet] [--idle tick|next-arrival]"
                );
                std::process::exit(0);
            }
            other => bail!("Unknown argument {other}"),
        }
    }
    Ok(out)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(true)
        .compact()
        .init();

    let args = parse_args()?;

    let mut scenario = match &args.scenario {
        Some(path) => {
            Scenario::load(path).with_context(|| format!("loading scenario {path}"))?
        }
        None => Scenario::sample(),
    };
    if let Some(d) = args.discipline {
        scenario.scheduler.discipline = d;
    }
    if let Some(d) = args.drain {
        scenario.scheduler.drain = d;
    }
    if let Some(i) = args.idle {
        scenario.scheduler.idle = i;
    }

    let (mut sim, rejected) = Simulation::from_scenario(&scenario)?;
    if !rejected.is_empty() {
        println!("{} packet(s) rejected at admission:", rejected.len());
        for r in &rejected {
            println!("  packet {}: {}", r.index, r.error);
        }
    }

    let log = sim.run();
    print_log(&log, sim.monitor().name());
    print_flows(&sim);
    Ok(())
}

fn print_log(log: &[Departure<usize, FlowId>], name: &str) {
    let now_str = Local::now().format("%H:%M:%S").to_string();

    println!("\n[{}] departure log: {}", now_str, name);
    println!("---------------------------------------------------------------------------");
    println!(
        "{:<10} {:<10} {:<10} {:<10} {:<10} {:<10} {:<15}",
        "Time", "Flow ID", "Size", "Weight", "Priority", "Scheduled", "Finish Time"
    );
    println!("---------------------------------------------------------------------------");
    for d in log {
        println!(
            "{:<10.2} {:<10} {:<10} {:<10} {:<10} {:<10} {:<15.2}",
            d.time,
            d.flow,
            d.size,
            d.weight,
            d.priority(),
            if d.scheduled { "YES" } else { "NO" },
            d.finish_time
        );
    }
}

fn print_flows(sim: &Simulation<usize, FlowId>) {
    let monitor = sim.monitor();

    println!("---------------------------------------------------------------------------");
    println!(
        "{:<8} | {:<8} | {:<8} | {:<10} | {:<8} | {:<10}",
        "Flow", "Weight", "Packets", "Bytes", "Share", "Mean wait"
    );
    println!("---------------------------------------------------------------------------");
    for flow in monitor.report() {
        let weight = sim
            .assigner()
            .weight(&flow.flow)
            .map(|w| w.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<8} | {:<8} | {:<8} | {:<10} | {:<8.3} | {:<10.2}",
            flow.flow,
            weight,
            flow.stats.departed,
            flow.stats.served_bytes,
            flow.share,
            flow.stats.mean_wait()
        );
    }
    println!("---------------------------------------------------------------------------");
    println!(
        "{:<8} | idle steps {} | busy steps {} | clock {:.2}",
        "TOTAL",
        monitor.idle_steps(),
        monitor.busy_steps(),
        sim.now()
    );
    println!("===========================================================================\n");
}
