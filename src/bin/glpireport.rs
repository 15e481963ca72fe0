use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use glpireport::{
    BucketKey, FileSource, Granularity, Report, ReportConfig, ReportFilter, Reporter, RowField,
    SortDirection, TeamSelector, TicketField,
};

#[derive(Parser)]
#[command(name = "glpireport", about = "Team and period reports over GLPI exports")]
struct Cli {
    /// Directory holding groups.json, tickets.json and tasks.json
    #[arg(long, default_value = ".")]
    data: PathBuf,

    /// Config file (default: <config dir>/glpireport/config.json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Increase logging verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Per-member counts, team rollups, status breakdown and series
    Report {
        /// Team name or group id (default: all teams)
        #[arg(long)]
        team: Option<String>,
        /// Bucketing: all, weekly, monthly, yearly
        #[arg(long, default_value = "all")]
        by: String,
        /// Bucket to restrict to: week number, month name or year
        #[arg(long)]
        value: Option<String>,
        /// Year for weekly and monthly buckets
        #[arg(long)]
        year: Option<i32>,
        /// Range start (YYYY-MM-DD), inclusive
        #[arg(long, requires = "to")]
        from: Option<String>,
        /// Range end (YYYY-MM-DD), inclusive
        #[arg(long, requires = "from")]
        to: Option<String>,
        /// Sort rows by: name, team, open, closed, total, tasks, hours
        #[arg(long)]
        sort: Option<String>,
        /// Sort descending
        #[arg(long)]
        desc: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the bucket grid for a granularity
    Buckets {
        #[arg(long, default_value = "weekly")]
        by: String,
        #[arg(long)]
        year: Option<i32>,
    },
    /// List tickets with task notes and man-hours
    Tickets {
        #[arg(long)]
        team: Option<String>,
        /// Sort by: id, title, team, assignee, opened, resolved, hours
        #[arg(long)]
        sort: Option<String>,
        #[arg(long)]
        desc: bool,
        #[arg(long)]
        json: bool,
    },
    /// Tasks of one week by day and team
    Board {
        #[arg(long)]
        year: i32,
        #[arg(long)]
        week: u8,
        #[arg(long)]
        team: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Show what was loaded from the data directory
    Status,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Get a config value
    Get { key: String },
    /// Set a config value
    Set { key: String, value: String },
    /// List all config values
    List,
    /// Print the config file path
    Path,
}

fn direction(desc: bool) -> SortDirection {
    if desc {
        SortDirection::Descending
    } else {
        SortDirection::Ascending
    }
}

fn team_filter(team: Option<&str>) -> ReportFilter {
    ReportFilter::new().team(team.map(TeamSelector::parse).unwrap_or_default())
}

fn parse_date(s: &str) -> anyhow::Result<chrono::NaiveDate> {
    chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("invalid date '{s}', expected YYYY-MM-DD"))
}

fn build_filter(
    team: Option<&str>,
    by: &str,
    value: Option<&str>,
    year: Option<i32>,
    from: Option<&str>,
    to: Option<&str>,
) -> anyhow::Result<ReportFilter> {
    let granularity: Granularity = by.parse()?;
    let mut filter = team_filter(team).granularity(granularity);
    if let Some(value) = value {
        filter = filter.bucket(BucketKey::parse(granularity, value)?);
    }
    if let Some(year) = year {
        filter = filter.year(year);
    }
    if let (Some(from), Some(to)) = (from, to) {
        filter = filter.between(parse_date(from)?, parse_date(to)?);
    }
    Ok(filter)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let config_path = match cli.config {
        Some(path) => path,
        None => ReportConfig::default_path()?,
    };

    let open = || -> anyhow::Result<Reporter<FileSource>> {
        let config = ReportConfig::load_or_default(&config_path)?;
        let source = FileSource::new(&cli.data)?;
        Ok(Reporter::open(source, config)?)
    };

    match cli.command {
        Commands::Report {
            team,
            by,
            value,
            year,
            from,
            to,
            sort,
            desc,
            json,
        } => {
            let filter = build_filter(
                team.as_deref(),
                &by,
                value.as_deref(),
                year,
                from.as_deref(),
                to.as_deref(),
            )?;
            let mut report = open()?.report(&filter);
            if let Some(field) = sort {
                let field: RowField = field.parse()?;
                report.rows = glpireport::sort_rows(&report.rows, field, direction(desc));
            }
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
        }
        Commands::Buckets { by, year } => {
            let granularity: Granularity = by.parse()?;
            let config = ReportConfig::load_or_default(&config_path)?;
            let year = year.unwrap_or_else(|| config.reference_year());
            for key in glpireport::buckets_for(granularity, year, config.yearly_window) {
                println!("{key}");
            }
        }
        Commands::Tickets {
            team,
            sort,
            desc,
            json,
        } => {
            let mut lines = open()?.tickets(&team_filter(team.as_deref()));
            if let Some(field) = sort {
                let field: TicketField = field.parse()?;
                lines = glpireport::sort_lines(&lines, field, direction(desc));
            }
            if json {
                println!("{}", serde_json::to_string_pretty(&lines)?);
            } else {
                println!("{} tickets", lines.len());
                for line in &lines {
                    println!(
                        "  #{} [{}] {} ({} / {}) opened {} {:.2}h",
                        line.id,
                        line.status,
                        line.title,
                        line.team,
                        line.assigned_to,
                        line.opened_at,
                        line.man_hours
                    );
                    for note in &line.task_notes {
                        println!("      - {note}");
                    }
                }
            }
        }
        Commands::Board {
            year,
            week,
            team,
            json,
        } => {
            let board = open()?.board(&team_filter(team.as_deref()), year, week)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&board)?);
            } else {
                println!("Week {} of {}", board.week, board.year);
                for day in &board.days {
                    println!("\n{} {}", day.weekday, day.date);
                    for column in &day.teams {
                        if column.entries.is_empty() {
                            println!("  {}: no tasks", column.team);
                            continue;
                        }
                        println!("  {}:", column.team);
                        for entry in &column.entries {
                            println!(
                                "    #{} {} {:.2}h {}",
                                entry.ticket_id, entry.member, entry.hours, entry.content
                            );
                        }
                    }
                }
            }
        }
        Commands::Status => {
            let reporter = open()?;
            println!("Data: {}", cli.data.display());
            for load in reporter.status() {
                println!(
                    "  {:<14} {:?}: {} loaded, {} skipped",
                    load.source, load.status, load.items_loaded, load.items_skipped
                );
            }
            let dataset = reporter.dataset();
            println!("  Teams:   {}", dataset.roster.teams.len());
            println!("  Members: {}", dataset.roster.members().len());
        }
        Commands::Config { action } => handle_config(&config_path, action)?,
    }

    Ok(())
}

fn print_report(report: &Report) {
    let scope = report.team.as_deref().unwrap_or("All teams");
    println!("{scope} ({})", report.filter.granularity);
    println!(
        "  {:<24} {:<16} {:>6} {:>6} {:>6} {:>6} {:>9}",
        "Name", "Team", "Open", "Closed", "Total", "Tasks", "Hours"
    );
    for row in &report.rows {
        println!(
            "  {:<24} {:<16} {:>6} {:>6} {:>6} {:>6} {:>9.2}",
            row.name,
            row.team,
            row.counts.open,
            row.counts.closed,
            row.counts.total,
            row.counts.tasks,
            row.counts.man_hours
        );
    }
    let t = &report.totals;
    println!(
        "  {:<24} {:<16} {:>6} {:>6} {:>6} {:>6} {:>9.2}",
        "Total", "", t.open, t.closed, t.total, t.tasks, t.man_hours
    );

    let s = &report.status;
    println!(
        "\nStatus: new {} / assigned {} / planned {} / pending {} / solved {} / closed {} (not solved {})",
        s.new, s.assigned, s.planned, s.pending, s.solved, s.closed, s.not_solved
    );
    if report.undated > 0 {
        println!("Undated records: {}", report.undated);
    }

    println!("\nSeries ({}):", report.series.granularity);
    for point in &report.series.points {
        println!(
            "  {:<12} open {:>4}  closed {:>4}  tasks {:>4}  {:>8.2}h",
            point.label, point.counts.open, point.counts.closed, point.counts.tasks, point.counts.man_hours
        );
    }
}

fn handle_config(path: &std::path::Path, action: ConfigAction) -> anyhow::Result<()> {
    match action {
        ConfigAction::Get { key } => {
            let config = ReportConfig::load_or_default(path)?;
            let value = config.get(&key)?;
            if value.is_empty() {
                println!("{key} is not set");
            } else {
                println!("{key} = {value}");
            }
        }
        ConfigAction::Set { key, value } => {
            let mut config = ReportConfig::load_or_default(path)?;
            config.set(&key, &value)?;
            config.save(path)?;
            println!("Config updated.");
        }
        ConfigAction::List => {
            let config = ReportConfig::load_or_default(path)?;
            for (k, v) in config.entries() {
                println!("{k} = {v}");
            }
        }
        ConfigAction::Path => println!("{}", path.display()),
    }
    Ok(())
}
