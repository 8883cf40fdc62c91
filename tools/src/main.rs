//! desk-runner: headless runner for the SAR case desk.
//!
//! Usage:
//!   desk-runner --db desk.db --dataset data/demo_cases.json
//!   desk-runner --config data/desk.json --dataset data/demo_cases.json --ipc-mode

use anyhow::Result;
use sar_desk_core::{
    case::CaseStatus,
    config::DeskConfig,
    desk::Desk,
    error::{DeskError, DeskResult},
    ingest::{ingest_dataset, Dataset},
};
use serde::Serialize;
use std::env;
use std::io::{self, BufRead, Write};

const RUNNER_ACTOR: &str = "desk-runner";

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    ActiveCases,
    CaseDetail {
        case_id: String,
    },
    Escalate {
        case_id: String,
        actor: String,
    },
    Submit {
        case_id: String,
        actor: String,
    },
    Advance {
        case_id: String,
        status: CaseStatus,
        actor: String,
    },
    Assign {
        case_id: String,
        assignee: String,
        actor: String,
    },
    Metrics,
    Report {
        case_id: String,
    },
    Audit {
        case_id: Option<String>,
        #[serde(default = "default_audit_limit")]
        limit: usize,
    },
    Health,
    Quit,
}

fn default_audit_limit() -> usize {
    50
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let config_path = flag_value(&args, "--config");
    let dataset_path = flag_value(&args, "--dataset");

    let mut config = match config_path {
        Some(path) => DeskConfig::load(path)?,
        None => DeskConfig::default(),
    };
    if let Some(db) = flag_value(&args, "--db") {
        config.store.path = db.to_string();
    }

    if !ipc_mode {
        println!("SAR Case Desk: desk-runner");
        println!("  db:        {}", config.store.path);
        println!("  pool:      {}", config.store.pool_size);
        println!("  filing:    {:?}", config.filing.policy);
        println!("  dataset:   {}", dataset_path.unwrap_or("(none)"));
        println!();
    }

    let desk = Desk::build(&config)?;

    if let Some(path) = dataset_path {
        let dataset = Dataset::load(path)?;
        let summary = ingest_dataset(&desk, &dataset, RUNNER_ACTOR)?;
        if !ipc_mode {
            println!(
                "Ingested {} customers, {} transactions, {} cases",
                summary.customers, summary.transactions, summary.cases
            );
            println!();
        }
    }

    if ipc_mode {
        run_ipc_loop(&desk)?;
    } else {
        print_summary(&desk)?;
    }

    desk.close();
    Ok(())
}

fn run_ipc_loop(desk: &Desk) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }
        if buffer.trim().is_empty() {
            continue;
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                let err_json = serde_json::json!({ "ok": false, "status": 400, "error": e.to_string() });
                writeln!(stdout, "{}", err_json)?;
                stdout.flush()?;
                continue;
            }
        };

        if matches!(cmd, IpcCommand::Quit) {
            break;
        }
        let response = match handle_command(desk, cmd) {
            Ok(data) => serde_json::json!({ "ok": true, "data": data }),
            Err(e) => {
                log::warn!("Command failed: {e}");
                serde_json::json!({ "ok": false, "status": e.status_code(), "error": e.to_string() })
            }
        };
        writeln!(stdout, "{}", response)?;
        stdout.flush()?;
    }
    Ok(())
}

fn handle_command(desk: &Desk, cmd: IpcCommand) -> DeskResult<serde_json::Value> {
    match cmd {
        IpcCommand::ActiveCases => to_value(desk.store.get_active_cases()?),
        IpcCommand::CaseDetail { case_id } => to_value(desk.store.get_case_detail(&case_id)?),
        IpcCommand::Escalate { case_id, actor } => {
            to_value(desk.lifecycle.escalate(&case_id, &actor)?)
        }
        IpcCommand::Submit { case_id, actor } => {
            to_value(desk.lifecycle.submit_sar(&case_id, &actor)?)
        }
        IpcCommand::Advance {
            case_id,
            status,
            actor,
        } => to_value(desk.lifecycle.advance(&case_id, status, &actor)?),
        IpcCommand::Assign {
            case_id,
            assignee,
            actor,
        } => to_value(desk.lifecycle.assign(&case_id, &assignee, &actor)?),
        IpcCommand::Metrics => to_value(desk.metrics.snapshot()?),
        IpcCommand::Report { case_id } => to_value(desk.reports.generate(&case_id)?),
        IpcCommand::Audit { case_id, limit } => match case_id {
            Some(id) => to_value(desk.ledger.entries_for_case(&id)?),
            None => to_value(desk.ledger.recent_entries(limit)?),
        },
        IpcCommand::Health => {
            desk.store.health_check()?;
            Ok(serde_json::json!({ "pool_size": desk.store.pool_size() }))
        }
        IpcCommand::Quit => Ok(serde_json::Value::Null),
    }
}

fn to_value<T: Serialize>(value: T) -> DeskResult<serde_json::Value> {
    serde_json::to_value(value).map_err(DeskError::from)
}

fn print_summary(desk: &Desk) -> Result<()> {
    let metrics = desk.metrics.snapshot()?;
    let active = desk.store.get_active_cases()?;

    println!("=== DASHBOARD ===");
    println!("  open cases:       {}", metrics.open_cases);
    println!("  high risk alerts: {}", metrics.high_risk_alerts);
    println!("  SARs filed:       {}", metrics.sars_filed);
    match metrics.avg_resolution_days {
        Some(days) => println!(
            "  avg resolution:   {days:.1} days ({} cases)",
            metrics.resolution_sample
        ),
        None => println!("  avg resolution:   n/a"),
    }

    println!();
    println!("=== ACTIVE CASES ===");
    if active.is_empty() {
        println!("  (No active cases)");
    }
    for case in &active {
        println!(
            "  {} | {} | {} | risk {} | {}",
            case.id,
            case.opened_at.format("%Y-%m-%d"),
            case.customer_name,
            case.risk_score,
            case.status
        );
    }
    Ok(())
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}
