mod config;
mod crawl;
mod db;
mod error;
mod extractor;
mod fetcher;
mod merger;
mod models;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::Config;
use crawl::Crawler;
use db::{Catalog, Database};
use models::{Job, JobQuery};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "jobboard")]
#[command(about = "Crawl job listings into a local catalog and browse them")]
struct Cli {
    /// Path to the catalog database (overrides JOBBOARD_DB)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the catalog
    Init,

    /// Crawl search results and save new listings
    Crawl {
        /// Search keyword
        #[arg(short, long, default_value = "백엔드")]
        keyword: String,

        /// Number of result pages to crawl
        #[arg(short, long, default_value = "5")]
        pages: u32,

        /// Pause between page requests in milliseconds (overrides JOBBOARD_DELAY_MS)
        #[arg(long)]
        delay_ms: Option<u64>,

        /// Show what would be saved without touching the catalog
        #[arg(long)]
        dry_run: bool,
    },

    /// Browse saved jobs
    Jobs {
        #[command(subcommand)]
        command: JobCommands,
    },

    /// Browse companies
    Companies {
        #[command(subcommand)]
        command: CompanyCommands,
    },
}

#[derive(Subcommand)]
enum JobCommands {
    /// List jobs, newest first
    List {
        /// Case-insensitive search on title
        #[arg(short, long)]
        search: Option<String>,

        /// Filter by location (exact match)
        #[arg(short, long)]
        location: Option<String>,

        /// Filter by experience level (exact match)
        #[arg(short, long)]
        experience: Option<String>,

        /// Page number
        #[arg(long, default_value = "1")]
        page: u32,

        /// Jobs per page
        #[arg(long, default_value = "20")]
        limit: u32,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show job details (counts as a view)
    Show {
        /// Job ID
        id: i64,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum CompanyCommands {
    /// List all companies
    List,

    /// Show a company and its jobs
    Show {
        /// Company name (exact)
        name: String,
    },
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();
    let mut config = Config::from_env().context("Failed to load configuration")?;
    if let Some(path) = cli.db {
        config.db_path = path;
    }

    match cli.command {
        Commands::Init => {
            let db = Database::open(&config.db_path)?;
            db.init()?;
            println!("Catalog initialized at {}", db.path().display());
        }

        Commands::Crawl {
            keyword,
            pages,
            delay_ms,
            dry_run,
        } => {
            if let Some(ms) = delay_ms {
                config.request_delay = Duration::from_millis(ms);
            }
            let crawler = Crawler::from_config(&config)?;

            if dry_run {
                let (report, candidates) = crawler.preview(&keyword, pages);
                for c in &candidates {
                    println!(
                        "[DRY RUN] Would save: {} at {} ({})",
                        c.title,
                        if c.company_name.is_empty() { "Unknown" } else { c.company_name.as_str() },
                        c.link
                    );
                }
                println!("\nKeyword: {}", report.keyword);
                println!("Pages fetched: {}/{}", report.pages_fetched, report.pages_requested);
                println!("Listings found: {}", report.candidates);
                println!("\n(Dry run - nothing was saved)");
                return Ok(());
            }

            let db = Database::open(&config.db_path)?;
            db.init()?;
            tracing::info!(path = %db.path().display(), "connected to catalog");

            let report = crawler.run(&keyword, pages, &db);

            println!("\nResults:");
            println!("  Keyword:           {}", report.keyword);
            println!("  Pages fetched:     {}/{}", report.pages_fetched, report.pages_requested);
            if !report.failed_pages.is_empty() {
                println!("  Failed pages:      {:?}", report.failed_pages);
            }
            println!("  Listings found:    {}", report.candidates);
            println!("  Companies added:   {}", report.companies_created);
            println!("  Jobs added:        {}", report.jobs_created);
            println!("  Jobs skipped:      {}", report.jobs_skipped);
            if report.errors > 0 {
                println!("  Errors:            {}", report.errors);
            }
        }

        Commands::Jobs { command } => {
            let db = Database::open(&config.db_path)?;
            db.ensure_initialized()?;
            match command {
                JobCommands::List {
                    search,
                    location,
                    experience,
                    page,
                    limit,
                    json,
                } => {
                    let result = db.list_jobs(&JobQuery {
                        search,
                        location,
                        experience_level: experience,
                        page,
                        limit,
                    })?;

                    if json {
                        println!("{}", serde_json::to_string_pretty(&result)?);
                    } else if result.jobs.is_empty() {
                        println!("No jobs found.");
                    } else {
                        print_job_table(&result.jobs);
                        println!(
                            "\nPage {}/{} ({} jobs)",
                            result.current_page, result.total_pages, result.total_items
                        );
                    }
                }

                JobCommands::Show { id, json } => match db.view_job(id)? {
                    Some(job) if json => println!("{}", serde_json::to_string_pretty(&job)?),
                    Some(job) => print_job(&job),
                    None => println!("Job #{} not found.", id),
                },
            }
        }

        Commands::Companies { command } => {
            let db = Database::open(&config.db_path)?;
            db.ensure_initialized()?;
            match command {
                CompanyCommands::List => {
                    let companies = db.list_companies()?;
                    if companies.is_empty() {
                        println!("No companies found.");
                    } else {
                        println!("{:<6} {:<30} {:<30}", "ID", "NAME", "WEBSITE");
                        println!("{}", "-".repeat(68));
                        for company in companies {
                            println!(
                                "{:<6} {:<30} {:<30}",
                                company.id,
                                truncate(&company.name, 28),
                                truncate(&company.website.unwrap_or_default(), 28)
                            );
                        }
                    }
                }

                CompanyCommands::Show { name } => match db.find_company_by_name(&name)? {
                    Some(company) => {
                        println!("Company #{}", company.id);
                        println!("Name: {}", company.name);
                        if let Some(industry) = &company.industry {
                            println!("Industry: {}", industry);
                        }
                        if let Some(location) = &company.location {
                            println!("Location: {}", location);
                        }
                        if let Some(website) = &company.website {
                            println!("Website: {}", website);
                        }
                        let jobs = db.list_jobs_for_company(company.id)?;
                        if !jobs.is_empty() {
                            println!("\nJobs ({}):", jobs.len());
                            for job in jobs {
                                println!("  #{} - {} ({})", job.id, job.title, job.deadline);
                            }
                        }
                    }
                    None => println!("Company '{}' not found.", name),
                },
            }
        }
    }

    Ok(())
}

fn print_job_table(jobs: &[Job]) {
    println!(
        "{:<6} {:<30} {:<20} {:<14} {:<12} {:>6}",
        "ID", "TITLE", "COMPANY", "LOCATION", "EXPERIENCE", "VIEWS"
    );
    println!("{}", "-".repeat(93));
    for job in jobs {
        println!(
            "{:<6} {:<30} {:<20} {:<14} {:<12} {:>6}",
            job.id,
            truncate(&job.title, 28),
            truncate(job.company_name.as_deref().unwrap_or(""), 18),
            truncate(&job.location, 12),
            truncate(&job.experience_level, 10),
            job.views
        );
    }
}

fn print_job(job: &Job) {
    println!("Job #{}", job.id);
    println!("Title: {}", job.title);
    if let Some(company) = &job.company_name {
        println!("Company: {}", company);
    }
    for (label, value) in [
        ("Location", &job.location),
        ("Experience", &job.experience_level),
        ("Education", &job.education),
        ("Employment", &job.employment_type),
        ("Deadline", &job.deadline),
        ("Sector", &job.sector),
        ("Salary", &job.salary),
    ] {
        if !value.is_empty() {
            println!("{}: {}", label, value);
        }
    }
    println!("Link: {}", job.link);
    println!("Posted: {}", job.posted_at.format("%Y-%m-%d %H:%M:%S"));
    println!("Views: {}", job.views);
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
