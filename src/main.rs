use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use axum_prometheus::PrometheusMetricLayer;
use chrono::{Duration, Utc};
use clap::{Args, Parser, Subcommand};
use leadmarkt::config::AppConfig;
use leadmarkt::error::AppError;
use leadmarkt::infra::InMemoryBackend;
use leadmarkt::routing::{
    routing_router, AssignedBy, IndustryId, Lead, LeadId, LeadRoutingService, LeadStatus, Partner,
    PartnerId, PaymentMethod, PaymentMethodKind, PaymentMethodStatus, PerformanceStats,
    RoutingError, Subscription, SubscriptionStatus,
};
use leadmarkt::telemetry;
use metrics_exporter_prometheus::PrometheusHandle;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;
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
    name = "Leadmarkt Router",
    about = "Run the lead routing service or demo it from the command line",
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
    /// Lead routing demos against seeded in-memory stores
    Route {
        #[command(subcommand)]
        command: RouteCommand,
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
enum RouteCommand {
    /// Score the seeded partners for a demo lead and commit the assignment
    Demo(RouteDemoArgs),
}

#[derive(Args, Debug)]
struct RouteDemoArgs {
    /// Mark the demo lead urgent to show the fast-responder bonus
    #[arg(long)]
    urgent: bool,
    /// Number of recommendations to print
    #[arg(long, default_value_t = 5)]
    top: usize,
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
        Command::Route {
            command: RouteCommand::Demo(args),
        } => run_route_demo(args),
    }
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

    let backend = InMemoryBackend::new();
    let service = Arc::new(LeadRoutingService::new(backend.stores()));

    let app = Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .with_state(state)
        .merge(routing_router(service))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "lead routing service ready");

    axum::serve(listener, app).await?;
    Ok(())
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

fn run_route_demo(args: RouteDemoArgs) -> Result<(), AppError> {
    let backend = InMemoryBackend::new();
    let lead_id = seed_demo_data(&backend, args.urgent);
    let service = LeadRoutingService::new(backend.stores());

    println!("Lead routing demo");

    match service.recommendations(&lead_id, args.top) {
        Ok(list) => {
            println!(
                "\nTop {} of {} candidate(s) for lead {}",
                list.recommendations.len(),
                list.total_candidates,
                lead_id.0
            );
            for entry in &list.recommendations {
                println!(
                    "- {} ({}): score {:.2} | branch {:.0} region {:.0} wait {:.1} perf {:.1} capacity {:.1}",
                    entry.partner_id.0,
                    entry.company_name.as_deref().unwrap_or("?"),
                    entry.score,
                    entry.factors.branch_match,
                    entry.factors.region_match,
                    entry.factors.wait_time,
                    entry.factors.performance,
                    entry.factors.capacity,
                );
            }
        }
        Err(error) => println!("no recommendations: {error}"),
    }

    match service.assign(&lead_id, AssignedBy::Auto, None) {
        Ok(outcome) => {
            println!(
                "\nAssigned lead {} to {} (score {:.2})",
                outcome.lead.id.0, outcome.assigned_to.0, outcome.score.total
            );
            println!("Billing: {:?}", outcome.billing);
        }
        Err(RoutingError::NoEligiblePartner { candidates_tried }) => {
            println!("\nNo eligible partner ({candidates_tried} candidate(s) tried)");
        }
        Err(error) => println!("\nassignment failed: {error}"),
    }

    for entry in backend.audit.assignment_entries() {
        println!(
            "Audit: lead {} -> {} by {} at {}",
            entry.lead_id.0,
            entry.assigned_to.0,
            entry.assigned_by.label(),
            entry.logged_at
        );
    }

    Ok(())
}

/// Seed two industries, three partners, and one open lead. Partner profiles
/// differ in branch, region, capacity, and billing setup so the demo shows
/// the scoring spread and the eligibility gate at work.
fn seed_demo_data(backend: &InMemoryBackend, urgent: bool) -> LeadId {
    let now = Utc::now();
    let painters = IndustryId("schilders".to_string());
    let roofers = IndustryId("dakdekkers".to_string());

    backend
        .industries
        .insert(painters.clone(), "Schilders", Some(dec!(12.50)));
    backend
        .industries
        .insert(roofers.clone(), "Dakdekkers", Some(dec!(17.50)));

    type DemoPartner = (
        &'static str,
        &'static str,
        &'static str,
        Vec<String>,
        Decimal,
        PaymentMethodKind,
        PerformanceStats,
    );

    let partners: [DemoPartner; 3] = [
        (
            "p-utrecht",
            "Schildersbedrijf Van Dijk",
            "Schilders",
            vec!["Utrecht".to_string()],
            dec!(250.00),
            PaymentMethodKind::CreditCard,
            PerformanceStats {
                open_leads_count: Some(2),
                last_lead_assigned_at: Some(now - Duration::hours(20)),
                avg_first_response_time_minutes_30d: Some(25.0),
                pct_contacted_within_1h_30d: Some(85.0),
                pct_contacted_within_24h_30d: Some(100.0),
                ai_trust_score: Some(88.0),
                deal_rate_30d: Some(45.0),
                pct_leads_min_2_attempts_30d: Some(75.0),
                avg_contact_attempts_per_lead_30d: Some(2.4),
                avg_customer_rating_30d: Some(4.6),
                num_ratings_30d: Some(12),
                avg_deal_value_30d: Some(3200.0),
                consistency_score: Some(80.0),
                ..PerformanceStats::default()
            },
        ),
        (
            "p-gelderland",
            "Verfmeesters Arnhem",
            "Schilders",
            vec!["Gelderland".to_string()],
            dec!(40.00),
            PaymentMethodKind::Sepa,
            PerformanceStats {
                open_leads_count: Some(4),
                last_lead_assigned_at: Some(now - Duration::hours(3)),
                avg_first_response_time_minutes_30d: Some(95.0),
                pct_contacted_within_1h_30d: Some(40.0),
                pct_contacted_within_24h_30d: Some(90.0),
                ai_trust_score: Some(70.0),
                deal_rate_30d: Some(30.0),
                avg_customer_rating_30d: Some(4.1),
                num_ratings_30d: Some(4),
                ..PerformanceStats::default()
            },
        ),
        (
            "p-dakdekker",
            "Dakwerken De Boer",
            "Dakdekkers",
            vec!["Utrecht".to_string()],
            dec!(120.00),
            PaymentMethodKind::Sepa,
            PerformanceStats::default(),
        ),
    ];

    for (id, company, branch, regions, balance, method, stats) in partners {
        let partner_id = PartnerId(id.to_string());
        backend.partners.insert(Partner {
            id: partner_id.clone(),
            company_name: Some(company.to_string()),
            primary_branch: Some(branch.to_string()),
            regions,
            lead_industries: vec!["Schilders".to_string(), "Dakdekkers".to_string()],
            lead_locations: Vec::new(),
            max_open_leads: Some(5),
            is_active_for_routing: true,
            routing_priority: 0,
            created_at: Some(now - Duration::days(120)),
        });
        backend
            .partners
            .enable_industries(&partner_id, vec![painters.clone(), roofers.clone()]);
        backend.quota.set_subscriptions(
            partner_id.clone(),
            vec![Subscription {
                leads_per_month: Some(20),
                status: SubscriptionStatus::Active,
                is_paused: false,
            }],
        );
        backend.payments.set_methods(
            partner_id.clone(),
            vec![PaymentMethod {
                kind: method,
                status: PaymentMethodStatus::Active,
                is_default: true,
            }],
        );
        backend.payments.set_balance(partner_id.clone(), balance);
        backend.stats.insert(partner_id, stats);
    }

    let lead_id = LeadId("lead-demo-1".to_string());
    backend.leads.insert(Lead {
        id: lead_id.clone(),
        name: "Familie Jansen".to_string(),
        email: Some("jansen@example.nl".to_string()),
        phone: Some("+31612345678".to_string()),
        industry: Some(painters),
        province: Some("Utrecht".to_string()),
        postcode: Some("3511AB".to_string()),
        is_urgent: urgent,
        status: LeadStatus::New,
        assigned_to: None,
        assigned_by: None,
        assignment_score: None,
        assignment_factors: None,
        price_at_purchase: None,
        created_at: now,
        assigned_at: None,
        accepted_at: None,
        approved_at: None,
    });

    lead_id
}
