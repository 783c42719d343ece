//! Student activity report from the command line.
//!
//! Loads a directory snapshot (JSON) and an optional YAML configuration,
//! runs one request as the given viewer and prints the result as JSON.
//!
//! ## Usage
//!
//! ```bash
//! # First report page of a course, as a teacher
//! student-activity --snapshot school.json --viewer <UUID> report --course <UUID>
//!
//! # Posts one user wrote in one forum
//! student-activity --snapshot school.json --viewer <UUID> \
//!     count --user <UUID> --course <UUID> --forum <UUID>
//!
//! # Debug logging, as JSON lines on stderr
//! RUST_LOG=student_activity=debug student-activity --json-logs ...
//! ```

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use student_activity::config::StudentActivityConfig;
use student_activity::infra::storage::DirectorySnapshot;
use student_activity::{PostCountRequest, ReportRequest, StudentActivity, ViewerContext};
use student_activity_sdk::{SortDirection, SortField};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "student-activity", version, about = "Forum activity of course participants")]
struct Cli {
    /// Directory snapshot (JSON).
    #[arg(long, value_name = "FILE")]
    snapshot: PathBuf,

    /// YAML configuration file; `STUDENT_ACTIVITY__*` variables override it.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Acting user. Omit for an anonymous viewer.
    #[arg(long, value_name = "UUID")]
    viewer: Option<Uuid>,

    /// The viewer uses the guest account.
    #[arg(long, requires = "viewer")]
    guest: bool,

    /// Evaluation instant (RFC 3339). Defaults to now.
    #[arg(long, value_parser = parse_instant)]
    at: Option<OffsetDateTime>,

    /// Log as JSON lines.
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// One page of the course report.
    Report {
        #[arg(long)]
        course: Uuid,
        #[arg(long)]
        group: Option<Uuid>,
        #[arg(long)]
        forum: Option<Uuid>,
        /// firstname, lastname, email or lastaccess.
        #[arg(long, default_value = "lastname", value_parser = parse_sort)]
        sort: SortField,
        /// asc; anything else sorts descending.
        #[arg(long, default_value = "asc")]
        dir: String,
        /// Zero-based page index.
        #[arg(long, default_value_t = 0)]
        page: u32,
        #[arg(long)]
        per_page: Option<u32>,
    },
    /// Posts one user wrote in a course.
    Count {
        #[arg(long)]
        user: Uuid,
        #[arg(long)]
        course: Uuid,
        #[arg(long)]
        forum: Option<Uuid>,
        /// Only posts that started a discussion.
        #[arg(long)]
        discussions_only: bool,
        /// Fail instead of printing 0 when access is denied.
        #[arg(long)]
        require_access: bool,
    },
}

#[derive(Serialize)]
struct CountOutput {
    user_id: Uuid,
    course_id: Uuid,
    posts: u64,
}

fn parse_instant(s: &str) -> Result<OffsetDateTime, String> {
    OffsetDateTime::parse(s, &Rfc3339).map_err(|e| format!("not an RFC 3339 timestamp: {e}"))
}

fn parse_sort(s: &str) -> Result<SortField, String> {
    SortField::parse(s).ok_or_else(|| format!("unknown sort column: {s}"))
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_snapshot(path: &Path) -> Result<DirectorySnapshot> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading snapshot {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing snapshot {}", path.display()))
}

fn viewer_of(cli: &Cli) -> ViewerContext {
    match cli.viewer {
        Some(id) => ViewerContext::builder()
            .subject_id(id)
            .logged_in(true)
            .guest(cli.guest)
            .build(),
        None => ViewerContext::anonymous(),
    }
}

async fn run(cli: Cli, out: &mut impl Write) -> Result<()> {
    let cfg = StudentActivityConfig::load(cli.config.as_deref()).context("loading configuration")?;
    let snapshot = load_snapshot(&cli.snapshot)?;
    let module = StudentActivity::from_snapshot(snapshot, &cfg)?;
    let client = module.client();

    let viewer = viewer_of(&cli);
    let at = cli.at.unwrap_or_else(OffsetDateTime::now_utc);
    debug!(viewer = %viewer.subject_id(), %at, "running request");

    match cli.command {
        Command::Report {
            course,
            group,
            forum,
            sort,
            dir,
            page,
            per_page,
        } => {
            let request = ReportRequest {
                course_id: course,
                group_id: group,
                forum_id: forum,
                sort,
                direction: SortDirection::parse(&dir),
                page,
                per_page,
                at,
            };
            let report = client.build_report(&viewer, request).await?;
            info!(rows = report.rows.len(), total = report.paging.total, "{}", report.heading.title());
            serde_json::to_writer_pretty(&mut *out, &report)?;
        }
        Command::Count {
            user,
            course,
            forum,
            discussions_only,
            require_access,
        } => {
            let request = PostCountRequest {
                target_id: user,
                course_id: course,
                forum_id: forum,
                discussions_only,
                require_access,
                at,
            };
            let posts = client.count_posts(&viewer, request).await?;
            serde_json::to_writer_pretty(
                &mut *out,
                &CountOutput {
                    user_id: user,
                    course_id: course,
                    posts,
                },
            )?;
        }
    }
    writeln!(out)?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);
    run(cli, &mut std::io::stdout().lock()).await
}
