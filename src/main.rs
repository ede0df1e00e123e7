use std::sync::Arc;

use chrono::{DateTime, Local, Utc};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use planner::config::Config;
use planner::models::*;
use planner::planning::{
    generator_from_config, Orchestrator, PlanOutcome, PlanRequest, StdinChannel, TracingProgress,
};
use planner::{api, db, mcp};

#[derive(Parser)]
#[command(name = "planner")]
#[command(about = "Turn goals into ordered task plans and track their progress")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Port for HTTP API
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },
    /// Start MCP server via stdio
    Mcp,
    /// Create a plan interactively
    New {
        /// Plan title
        title: String,
        /// What the plan should achieve
        #[arg(short, long)]
        goal: String,
        /// Plan category
        #[arg(short, long, default_value = "project")]
        category: String,
        #[arg(short, long)]
        description: Option<String>,
        /// Extra context for task generation
        #[arg(long)]
        context: Option<String>,
    },
    /// List plans
    List {
        /// Include completed plans
        #[arg(short, long)]
        all: bool,
        #[arg(short, long, default_value = "1")]
        page: u32,
    },
    /// Show a plan and its tasks
    Show {
        plan_id: i64,
        /// Include soft-deleted tasks
        #[arg(long)]
        deleted: bool,
    },
}

fn init_tracing(stderr: bool) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG")
            .unwrap_or_else(|_| "planner=debug,planner_core=debug,tower_http=debug".into()),
    );
    let registry = tracing_subscriber::registry().with(filter);
    // stdout carries the MCP protocol and interactive prompts
    if stderr {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn open_database(config: &Config) -> anyhow::Result<db::Database> {
    let db = match &config.database_path {
        Some(path) => db::Database::open(path)?,
        None => db::Database::open_default()?,
    };
    db.migrate()?;
    Ok(db)
}

fn orchestrator(config: &Config) -> anyhow::Result<Arc<Orchestrator>> {
    let db = open_database(config)?;
    Ok(Arc::new(Orchestrator::new(
        Arc::new(db),
        generator_from_config(&config.llm, &config.workflow),
        Arc::new(TracingProgress),
        config.workflow.clone(),
    )))
}

fn local_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

fn print_plan(plan: &Plan) {
    println!("#{} {} [{}] ({})", plan.id, plan.title, plan.category.as_str(), plan.status.as_str());
    println!("Goal: {}", plan.goal);
    println!("Created {}", local_time(plan.created_at));
    if let Some(completed_at) = plan.completed_at {
        println!("Completed {}", local_time(completed_at));
    }
    if let Some(description) = &plan.description {
        println!("{}", description);
    }
    for task in &plan.tasks {
        println!(
            "  {:>3}. [{}] {} ({}, id {})",
            task.sequence_index + 1,
            task.status.as_str(),
            task.title,
            task.priority.as_str(),
            task.id
        );
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let interactive = matches!(cli.command, Some(Commands::Mcp) | Some(Commands::New { .. }));
    init_tracing(interactive);

    let config = Config::from_env();

    match cli.command.unwrap_or(Commands::Serve { port: 3000 }) {
        Commands::Serve { port } => {
            tracing::info!("Starting planner server on port {}", port);

            let app = api::create_router(orchestrator(&config)?);

            let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
            tracing::info!("Planner server listening on http://127.0.0.1:{}", port);

            axum::serve(listener, app).await?;
        }
        Commands::Mcp => {
            mcp::run_stdio_server(orchestrator(&config)?, &config.llm).await?;
        }
        Commands::New {
            title,
            goal,
            category,
            description,
            context,
        } => {
            let request = PlanRequest {
                title,
                goal,
                category,
                description,
                additional_context: context,
            };
            match orchestrator(&config)?
                .new_plan(request, &StdinChannel::new())
                .await?
            {
                PlanOutcome::Committed { plan, notices } => {
                    for notice in notices {
                        println!("note: {}", notice);
                    }
                    print_plan(&plan);
                }
                PlanOutcome::Cancelled { message } => println!("{}", message),
            }
        }
        Commands::List { all, page } => {
            let db = open_database(&config)?;
            let page = db.list_plans(&PlanListQuery {
                include_completed: all,
                page,
                ..Default::default()
            })?;
            for plan in &page.plans {
                println!(
                    "#{:<4} {:<40} {:>3}/{:<3} {:>5.1}%  {}",
                    plan.id,
                    plan.title,
                    plan.completed_tasks,
                    plan.total_tasks,
                    plan.progress_percent,
                    plan.status.as_str()
                );
            }
            println!(
                "page {}/{} ({} plans)",
                page.page,
                page.total_pages.max(1),
                page.total_count
            );
        }
        Commands::Show { plan_id, deleted } => {
            let db = open_database(&config)?;
            let plan = if deleted {
                db.get_plan_with_deleted(plan_id)?
            } else {
                db.get_plan(plan_id)?
            };
            print_plan(&plan);
        }
    }

    Ok(())
}
