use std::sync::Arc;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use client_core::{
    branding::ThemeDocument,
    collections::{parse_status_filter, ScenarioSortField},
    demo::demo_exercises,
    launch::{default_checklist, StaticCheckRunner},
    orchestration::deploy_request,
    teams::reset_team_dashboard,
    BrandingStore, CollectionQuery, LaunchController, ScenarioCatalog, ScipContext,
    SortDirection,
};
use shared::domain::{ExerciseId, OrganizationId, TeamId};
use storage::SqliteStore;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const DEFAULT_EXERCISE: &str = "demo-exercise";

#[derive(Parser, Debug)]
#[command(name = "scip-operator", about = "SCIP exercise operator console")]
struct Cli {
    /// Overrides the configured database url.
    #[arg(long)]
    database_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Lists scenarios from the demo catalog.
    Scenarios {
        #[arg(long, default_value = "")]
        search: String,
        #[arg(long, default_value = "all")]
        status: String,
        #[arg(long, default_value = "name")]
        sort: String,
        #[arg(long)]
        desc: bool,
    },
    /// Summarises the demo exercises.
    Exercises,
    Teams {
        #[arg(long, default_value = DEFAULT_EXERCISE)]
        exercise: String,
        #[command(subcommand)]
        action: TeamsAction,
    },
    /// Runs the pre-launch checklist with a static runner.
    Checklist {
        #[arg(long, default_value = DEFAULT_EXERCISE)]
        exercise: String,
        /// Check ids to report as failed.
        #[arg(long = "fail")]
        fail: Vec<String>,
    },
    Deploy {
        exercise_id: String,
        /// Comma separated team ids; defaults to every configured team.
        #[arg(long, value_delimiter = ',')]
        teams: Vec<String>,
    },
    Undeploy {
        exercise_id: String,
    },
    Dashboards,
    Login {
        email: String,
        password: String,
    },
    Whoami,
    Logout,
    Branding {
        org_id: String,
    },
}

#[derive(Subcommand, Debug)]
enum TeamsAction {
    List,
    Add { name: String },
    Remove { team_id: String },
    Reset,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut settings = client_core::load_settings();
    if let Some(database_url) = cli.database_url {
        settings.database_url = database_url;
    }
    let database_url = client_core::prepare_database_url(&settings.database_url)?;
    let store = SqliteStore::new(&database_url).await.map_err(|err| {
        error!("operator: failed to open store database_url={database_url} error={err:#}");
        err
    })?;
    let ctx = ScipContext::new(settings, Arc::new(store))?;
    ctx.restore_session().await?;

    match cli.command {
        Command::Scenarios {
            search,
            status,
            sort,
            desc,
        } => {
            let sort: ScenarioSortField = sort.parse()?;
            let direction = if desc {
                SortDirection::Descending
            } else {
                SortDirection::Ascending
            };
            let query = CollectionQuery::new(sort)
                .with_search(search)
                .with_status(parse_status_filter(&status)?)
                .with_direction(direction);
            let catalog = ScenarioCatalog::demo();
            for scenario in catalog.query(&query) {
                println!(
                    "{:<14} {:<10} {:<8} {:<12} {:>4}m  {}",
                    scenario.id,
                    scenario.scenario_type,
                    scenario.status,
                    scenario.difficulty,
                    scenario.duration,
                    scenario.name
                );
            }
        }
        Command::Exercises => {
            let exercises = demo_exercises();
            let stats = client_core::collections::exercise_stats(&exercises);
            println!(
                "total={} running={} ready={} configured={} completed={} participants={}",
                stats.total,
                stats.running,
                stats.ready,
                stats.configured,
                stats.completed,
                stats.active_participants
            );
            for exercise in exercises {
                println!("{:<12} {:<10} {}", exercise.id, exercise.status, exercise.name);
            }
        }
        Command::Teams { exercise, action } => {
            let organization_id = organization_id(&ctx).await;
            let manager = ctx.team_manager(ExerciseId::new(exercise), organization_id);
            let teams = match action {
                TeamsAction::List => manager.load().await?,
                TeamsAction::Add { name } => {
                    let team = manager.add_team(&name).await?;
                    info!("operator: added team={} color={}", team.team_id, team.color);
                    manager.load().await?
                }
                TeamsAction::Remove { team_id } => {
                    manager.remove_team(&TeamId::new(team_id)).await?
                }
                TeamsAction::Reset => {
                    reset_team_dashboard(ctx.store.as_ref()).await?;
                    manager.reset().await?
                }
            };
            for team in teams {
                println!("{:<8} {:<8} {}", team.team_id, team.color, team.team_name);
            }
        }
        Command::Checklist { exercise, fail } => {
            let runner = fail.into_iter().fold(StaticCheckRunner::new(), |runner, id| {
                runner.with_failure(id, "reported failing by operator")
            });
            let controller = LaunchController::new(
                ExerciseId::new(exercise),
                default_checklist(),
                Arc::new(runner),
                ctx.settings.countdown_seconds,
            );
            for item in controller.run_all_checks().await? {
                let marker = if item.required { "required" } else { "advisory" };
                println!(
                    "{:<18} {:<8} {:<8} {}",
                    item.id,
                    format!("{:?}", item.state),
                    marker,
                    item.message.unwrap_or_default()
                );
            }
            if controller.can_launch().await {
                let status = controller.mark_ready().await?;
                println!("launch gate open, status={status}");
            } else {
                println!("launch gate closed");
            }
            controller.shutdown().await;
        }
        Command::Deploy { exercise_id, teams } => {
            let exercise_id = ExerciseId::new(exercise_id);
            let organization_id = organization_id(&ctx).await;
            let configured = ctx
                .team_manager(exercise_id.clone(), organization_id.clone())
                .load()
                .await?;
            let selected: Vec<_> = if teams.is_empty() {
                configured
            } else {
                configured
                    .into_iter()
                    .filter(|team| teams.iter().any(|id| id == team.team_id.as_str()))
                    .collect()
            };
            if selected.is_empty() {
                return Err(anyhow!("no configured teams match {teams:?}"));
            }
            let request = deploy_request(exercise_id, organization_id, &selected);
            let response = ctx.orchestration.deploy_dashboards(&request).await?;
            print_json(&response)?;
        }
        Command::Undeploy { exercise_id } => {
            let response = ctx
                .orchestration
                .remove_dashboards(&ExerciseId::new(exercise_id))
                .await?;
            println!("removed {} dashboards", response.removed);
        }
        Command::Dashboards => {
            let dashboards = ctx.orchestration.list_dashboards().await?;
            print_json(&dashboards)?;
        }
        Command::Login { email, password } => {
            let user = ctx.auth.login(&email, &password).await?;
            println!("logged in as {} ({})", user.email, user.role);
        }
        Command::Whoami => {
            if !ctx.auth.check_auth_status().await {
                println!("not logged in");
                return Ok(());
            }
            let state = ctx.auth.state().await;
            if let Some(user) = state.user {
                println!("{} <{}> role={}", user.name, user.email, user.role);
            }
            if let Some(organization) = state.organization {
                println!("organization {} ({})", organization.name, organization.id);
            }
        }
        Command::Logout => {
            ctx.auth.logout().await;
            println!("logged out");
        }
        Command::Branding { org_id } => {
            let branding = BrandingStore::new(ctx.api.clone(), ThemeDocument::default());
            branding.load_branding(&OrganizationId::new(org_id)).await;
            let css = branding.inspect(|doc| doc.to_css()).await;
            println!("{css}");
        }
    }

    ctx.notifications.shutdown();
    Ok(())
}

async fn organization_id(ctx: &ScipContext) -> OrganizationId {
    ctx.auth
        .state()
        .await
        .organization
        .map(|organization| organization.id)
        .unwrap_or_else(|| OrganizationId::new("demo-org"))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
