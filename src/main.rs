use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use axum_prometheus::PrometheusMetricLayer;
use billing_engine::config::AppConfig;
use billing_engine::engine::{
    engine_router, ComplianceService, ComplianceStatus, DeletionPolicy, EnginePolicy,
    MemoryFulfillments, MemorySchedules, Period, PeriodStatusView, PropertyId, Schedule,
    ScheduleRegistry, StandardScheduleBlueprint,
};
use billing_engine::error::AppError;
use billing_engine::ingest::{FulfillmentCsvImporter, ImportSummary};
use billing_engine::telemetry;
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
struct AppState {
    readiness: Arc<AtomicBool>,
    metrics: PrometheusHandle,
}

#[derive(Parser, Debug)]
#[command(
    name = "Billing Schedule Engine",
    about = "Run the billing schedule compliance engine or render a property report from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Inspect schedule compliance for demos and spot checks
    Status {
        #[command(subcommand)]
        command: StatusCommand,
    },
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    port: Option<u16>,
}

#[derive(Subcommand, Debug)]
enum StatusCommand {
    /// Render a compliance report for a standard demo property
    Report(StatusReportArgs),
}

#[derive(Args, Debug)]
struct StatusReportArgs {
    /// Property identifier used for the seeded demo configuration
    #[arg(long, default_value = "prop-demo")]
    property: String,
    /// Period to evaluate (YYYY-MM)
    #[arg(long, value_parser = parse_period)]
    period: Period,
    /// Evaluation date for the report (defaults to today)
    #[arg(long, value_parser = parse_date)]
    today: Option<NaiveDate>,
    /// Optional fulfillment CSV export to hydrate bill arrivals; rows
    /// reference the seeded ids in creation order (sch-000001 onward)
    #[arg(long)]
    fulfillments_csv: Option<PathBuf>,
    /// Include the configured schedule definitions in the output
    #[arg(long)]
    list_schedules: bool,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run_cli().await {
        eprintln!("application error: {err}");
        std::process::exit(1);
    }
}

async fn run_cli() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => run_server(args).await,
        Command::Status {
            command: StatusCommand::Report(args),
        } => run_status_report(args),
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

fn parse_period(raw: &str) -> Result<Period, String> {
    Period::parse(raw).ok_or_else(|| format!("failed to parse '{raw}' as YYYY-MM"))
}

async fn run_server(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let state = AppState {
        readiness: readiness_flag.clone(),
        metrics: prometheus_handle,
    };

    let schedules = Arc::new(MemorySchedules::default());
    let fulfillments = Arc::new(MemoryFulfillments::default());
    let registry = Arc::new(ScheduleRegistry::new(
        schedules.clone(),
        config.engine.deletion,
    ));
    let compliance = Arc::new(ComplianceService::new(
        schedules,
        fulfillments,
        config.engine.policy,
    ));

    let ops = Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .with_state(state);

    let app = engine_router(registry, compliance)
        .merge(ops)
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "billing schedule engine ready");

    axum::serve(listener, app).await?;
    Ok(())
}

type DemoService = ComplianceService<MemorySchedules, MemoryFulfillments>;

fn build_demo_engine(
    property_id: &PropertyId,
    today: NaiveDate,
) -> Result<(DemoService, Vec<Schedule>), AppError> {
    let schedules = Arc::new(MemorySchedules::default());
    let fulfillments = Arc::new(MemoryFulfillments::default());
    let registry = ScheduleRegistry::new(schedules.clone(), DeletionPolicy::Restrict);

    let seeded = StandardScheduleBlueprint::standard(property_id).seed(&registry, today)?;

    let service = ComplianceService::new(schedules, fulfillments, EnginePolicy::default());

    Ok((service, seeded))
}

fn run_status_report(args: StatusReportArgs) -> Result<(), AppError> {
    let StatusReportArgs {
        property,
        period,
        today,
        fulfillments_csv,
        list_schedules,
    } = args;

    let today = today.unwrap_or_else(|| Local::now().date_naive());
    let property_id = PropertyId(property);
    let (service, seeded) = build_demo_engine(&property_id, today)?;

    let imported = match fulfillments_csv {
        Some(path) => {
            let events = FulfillmentCsvImporter::from_path(path)?;
            let summary = FulfillmentCsvImporter::replay(events, &service)?;
            Some(summary)
        }
        None => None,
    };

    let statuses = service.status_for_property(&property_id, period, today)?;

    render_status_report(
        &property_id,
        period,
        today,
        &statuses,
        imported.as_ref(),
        list_schedules.then_some(&seeded),
    );

    Ok(())
}

fn render_status_report(
    property_id: &PropertyId,
    period: Period,
    today: NaiveDate,
    statuses: &[PeriodStatusView],
    imported: Option<&ImportSummary>,
    seeded: Option<&Vec<Schedule>>,
) {
    println!("Billing compliance report");
    println!(
        "Property {} | period {} (evaluated {})",
        property_id, period, today
    );

    match imported {
        Some(summary) => {
            println!(
                "Data source: fulfillment CSV import ({} applied, {} skipped)",
                summary.applied, summary.skipped_rows
            );
            if !summary.unknown_schedules.is_empty() {
                println!(
                    "Unknown schedule ids in export: {}",
                    summary
                        .unknown_schedules
                        .iter()
                        .map(|id| id.0.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                );
            }
        }
        None => println!("Data source: standard blueprint (no fulfillment data provided)"),
    }

    println!("\nSchedule status");
    for view in statuses {
        let category = match view.bill_type {
            Some(bill_type) => format!("{} ({})", view.schedule_type_label, bill_type.label()),
            None => view.schedule_type_label.to_string(),
        };
        let lateness = match view.days_late {
            Some(days) => format!(" ({days} days late)"),
            None => String::new(),
        };
        println!(
            "- {} | {} | expected {} | {}{}",
            view.schedule_id, category, view.expected_date, view.status_label, lateness
        );
    }

    let blocked: Vec<&PeriodStatusView> = statuses
        .iter()
        .filter(|view| view.status == ComplianceStatus::Blocked)
        .collect();
    if blocked.is_empty() {
        println!("\nBlocked outputs: none");
    } else {
        println!("\nBlocked outputs");
        for view in blocked {
            println!(
                "- {} waiting on {}",
                view.schedule_id,
                view.blocking_schedule_ids
                    .iter()
                    .map(|id| id.0.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
    }

    let late_or_missed = statuses
        .iter()
        .filter(|view| {
            matches!(
                view.status,
                ComplianceStatus::Late | ComplianceStatus::Missed
            )
        })
        .count();
    println!("\nLate or missed: {late_or_missed}");

    if let Some(schedules) = seeded {
        println!("\nConfigured schedules");
        for schedule in schedules {
            println!(
                "- {} | {} | {} | active {}",
                schedule.id,
                schedule.schedule_type.label(),
                schedule.frequency.label(),
                schedule.is_active
            );
        }
    }
}

async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn readiness_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

async fn metrics_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
