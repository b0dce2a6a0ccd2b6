//! gradkg: curriculum knowledge graph server and batch pipeline.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

mod commands;
mod routes;
mod state;

use gradkg_core::{DataPaths, GradKgConfig, MajorType};
use gradkg_resolve::{GraduationQuery, GraduationResolver};
use gradkg_store::GraphStore;
use state::AppState;

fn resolve_data_dir() -> PathBuf {
    std::env::var("GRADKG_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let exe_dir = std::env::current_exe()
                .ok()
                .and_then(|p| p.parent().map(|p| p.to_path_buf()));
            if let Some(dir) = exe_dir {
                let parent_data = dir.join("../data");
                if parent_data.exists() {
                    return parent_data;
                }
            }
            PathBuf::from("data")
        })
}

fn open_store(paths: &DataPaths) -> anyhow::Result<GraphStore> {
    GraphStore::open(&paths.graph).map_err(|e| anyhow::anyhow!("Failed to open store: {}", e))
}

fn required_arg<'a>(args: &'a [String], idx: usize, usage: &str) -> anyhow::Result<&'a Path> {
    args.get(idx)
        .map(Path::new)
        .ok_or_else(|| anyhow::anyhow!("Usage: gradkg {}", usage))
}

fn print_help() {
    println!("gradkg: curriculum knowledge graph for graduation checks and regulation chat");
    println!();
    println!("Usage: gradkg [command]");
    println!();
    println!("Commands:");
    println!("  (none)                              Start the server");
    println!("  build-subjects <chunks.json>        Merge subject nodes");
    println!("  build-requirements <chunks.json>    Merge requirement nodes");
    println!("  build-includes <chunks.json>        Merge INCLUDES edges");
    println!("  build-substitutes <chunks.json>     Resolve SUBSTITUTES edges against the store");
    println!("  upload                              Replace the graph with the built artifacts");
    println!("  append                              Add new subjects and substitution edges");
    println!("  import-passages <passages.json>     Index regulation passages");
    println!("  check <year> <dept> <type> [course,...]  Run a graduation check");
    println!("  help                                Show this help message");
}

/// Run a CLI subcommand. Returns `false` when the command is unknown.
fn run_command(args: &[String], config: &GradKgConfig) -> anyhow::Result<bool> {
    let paths = &config.data_paths;
    let report = match args[1].as_str() {
        "build-subjects" => {
            commands::build_subjects(paths, required_arg(args, 2, "build-subjects <chunks.json>")?)?
        }
        "build-requirements" => commands::build_requirements(
            paths,
            required_arg(args, 2, "build-requirements <chunks.json>")?,
        )?,
        "build-includes" => {
            commands::build_includes(paths, required_arg(args, 2, "build-includes <chunks.json>")?)?
        }
        "build-substitutes" => {
            let chunks = required_arg(args, 2, "build-substitutes <chunks.json>")?;
            commands::build_substitutes(paths, &open_store(paths)?, chunks)?
        }
        "upload" => commands::upload(paths, &open_store(paths)?)?,
        "append" => commands::append(paths, &open_store(paths)?)?,
        "import-passages" => {
            let file = required_arg(args, 2, "import-passages <passages.json>")?;
            commands::import_passages(&open_store(paths)?, file)?
        }
        "check" => {
            if args.len() < 5 {
                anyhow::bail!("Usage: gradkg check <year> <department> <major-type> [course,...]");
            }
            let major_type: MajorType = args[4].parse()?;
            let query = GraduationQuery {
                year: args[2].parse()?,
                department: args[3].clone(),
                major_type,
                taken: gradkg_resolve::parse_taken_courses(&args[5..].join(",")),
            };
            let report = GraduationResolver::check(&open_store(paths)?, &query)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            return Ok(true);
        }
        _ => return Ok(false),
    };
    commands::print_report(&report);
    Ok(true)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();

    if matches!(args.get(1).map(String::as_str), Some("--help" | "-h" | "help")) {
        print_help();
        return Ok(());
    }

    let data_dir = resolve_data_dir();
    info!("Data directory: {}", data_dir.display());
    let config = GradKgConfig::from_env(&data_dir)?;

    // Handle CLI subcommands
    if args.len() > 1 {
        if !run_command(&args, &config)? {
            eprintln!("Unknown command: {}. Use 'gradkg help' for usage.", args[1]);
            std::process::exit(1);
        }
        return Ok(());
    }

    // Normal server startup
    let port = config.port;
    let store = open_store(&config.data_paths)?;
    let state = Arc::new(AppState::new(config, store));

    let app = routes::build_router(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("gradkg server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
