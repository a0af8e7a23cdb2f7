use civic_core::city::{CityProfile, ModuleSelection};
use civic_core::config::StorageConfig;
use civic_core::engagement::issues::{
    Issue, IssueCategory, IssueQuery, IssueService, IssueSort, IssueStats, NewIssue, RequestKind,
};
use civic_core::error::AppError;
use civic_core::store::Database;
use clap::Args;
use std::path::PathBuf;
use tracing::info;

#[derive(Args, Debug)]
pub(crate) struct InitArgs {
    /// Name of the city this deployment serves
    #[arg(long)]
    pub(crate) city: String,
    /// Replace an existing city profile
    #[arg(long)]
    pub(crate) force: bool,
}

#[derive(Args, Debug)]
pub(crate) struct ConfigureArgs {
    /// `all` or a comma separated list: issues,voting,alerts,budget,council
    #[arg(long)]
    pub(crate) modules: String,
}

#[derive(Args, Debug)]
pub(crate) struct IssueReportArgs {
    pub(crate) title: String,
    /// One of infrastructure, safety, environment, community, transit
    pub(crate) category: String,
    /// Address or "lat,lon"
    pub(crate) location: String,
    /// File as a permit application instead of an issue report
    #[arg(long)]
    pub(crate) permit: bool,
    #[arg(long)]
    pub(crate) description: Option<String>,
}

#[derive(Args, Debug)]
pub(crate) struct IssueListArgs {
    #[arg(long)]
    pub(crate) category: Option<IssueCategory>,
    /// `votes` (default) or `recent`
    #[arg(long, default_value = "votes")]
    pub(crate) sort: IssueSort,
}

#[derive(Args, Debug)]
pub(crate) struct IssueExportArgs {
    /// Write the export to this file instead of stdout
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
}

pub(crate) async fn run_init(
    storage: &StorageConfig,
    args: InitArgs,
) -> Result<CityProfile, AppError> {
    let profile = CityProfile::init(&storage.data_dir, &args.city, args.force)?;
    Database::connect(&storage.database_url()).await?;

    println!("✓ Initialized {} ({})", profile.city, profile.slug);
    println!("  Data directory: {}", storage.data_dir.display());
    println!("  Next: blackroad-citizen-app configure --modules all");
    Ok(profile)
}

pub(crate) fn run_configure(
    storage: &StorageConfig,
    args: ConfigureArgs,
) -> Result<CityProfile, AppError> {
    let selection = ModuleSelection::parse(&args.modules)?;
    let mut profile = CityProfile::load(&storage.data_dir)?;
    profile.configure(selection);
    profile.save(&storage.data_dir)?;

    info!(city = %profile.city, modules = ?profile.module_labels(), "modules configured");
    println!(
        "✓ {} modules enabled: {}",
        profile.city,
        profile.module_labels().join(", ")
    );
    Ok(profile)
}

async fn issue_service(storage: &StorageConfig) -> Result<IssueService, AppError> {
    std::fs::create_dir_all(&storage.data_dir)?;
    let database = Database::connect(&storage.database_url()).await?;
    Ok(IssueService::new(database))
}

pub(crate) async fn run_issue_report(
    storage: &StorageConfig,
    args: IssueReportArgs,
) -> Result<(), AppError> {
    let service = issue_service(storage).await?;
    let kind = if args.permit {
        RequestKind::Permit
    } else {
        RequestKind::Report
    };
    let issue = service
        .report(
            NewIssue {
                title: args.title,
                category: args.category,
                location: args.location,
                kind,
                description: args.description,
            },
            None,
        )
        .await?;

    println!("✓ Issue reported: {}", issue.id);
    Ok(())
}

pub(crate) async fn run_issue_list(
    storage: &StorageConfig,
    args: IssueListArgs,
) -> Result<(), AppError> {
    let service = issue_service(storage).await?;
    let issues = service
        .list(&IssueQuery {
            category: args.category,
            status: None,
            sort: args.sort,
        })
        .await?;

    print!("{}", render_issue_list(&issues));
    Ok(())
}

pub(crate) async fn run_issue_stats(storage: &StorageConfig) -> Result<(), AppError> {
    let service = issue_service(storage).await?;
    let stats = service.stats().await?;
    print!("{}", render_stats(&stats));
    Ok(())
}

pub(crate) async fn run_issue_export(
    storage: &StorageConfig,
    args: IssueExportArgs,
) -> Result<(), AppError> {
    let service = issue_service(storage).await?;
    let payload = service.export_json().await?;

    match args.output {
        Some(path) => {
            std::fs::write(&path, payload)?;
            println!("✓ Export written to {}", path.display());
        }
        None => println!("{payload}"),
    }
    Ok(())
}

pub(crate) fn render_issue_list(issues: &[Issue]) -> String {
    let rows = issues.iter().map(|issue| {
        let title: String = issue.title.chars().take(40).collect();
        format!(
            "  [{:12}] {:40} | Votes: {:3} | {}\n",
            issue.category.label(),
            title,
            issue.votes,
            issue.status
        )
    });
    std::iter::once(format!("\nFound {} issues:\n\n", issues.len()))
        .chain(rows)
        .collect()
}

pub(crate) fn render_stats(stats: &IssueStats) -> String {
    let mut lines = vec![
        String::new(),
        "Stats:".to_string(),
        format!("  Total Issues: {}", stats.total_issues),
        format!("  Avg Votes: {}", stats.average_votes),
        "  By Category:".to_string(),
    ];
    lines.extend(
        stats
            .by_category
            .iter()
            .map(|(category, count)| format!("    {:15}: {count}", category.label())),
    );
    lines.push("  By Status:".to_string());
    lines.extend(
        stats
            .by_status
            .iter()
            .map(|(status, count)| format!("    {:15}: {count}", status.label())),
    );
    lines.push(String::new());
    lines.join("\n")
}
