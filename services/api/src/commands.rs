use crate::infra::{parse_date, parse_local_instant};
use chrono::{DateTime, Local, NaiveDate, Utc};
use clap::Args;
use invite_portal::backend::{HttpBackend, InvitationBackend};
use invite_portal::config::AppConfig;
use invite_portal::error::AppError;
use invite_portal::workflows::admin::{
    export_bytes, export_filename, AdminError, BucketCount, DashboardStats, Share,
};
use invite_portal::workflows::intake::{CaptchaGuard, CaptchaRenderer};
use invite_portal::workflows::window::WindowStatus;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct CaptchaSampleArgs {
    /// Destination for the PNG
    #[arg(long)]
    pub(crate) out: PathBuf,
    /// Seed for a reproducible challenge
    #[arg(long)]
    pub(crate) seed: Option<u64>,
}

#[derive(Args, Debug)]
pub(crate) struct AdminExportArgs {
    /// Operator password for the issuing backend
    #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
    pub(crate) password: String,
    /// Output path (defaults to export_users_<date>.csv)
    #[arg(long)]
    pub(crate) out: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct AdminStatsArgs {
    /// Operator password for the issuing backend
    #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
    pub(crate) password: String,
    /// Date counted as "today" (defaults to the local date)
    #[arg(long, value_parser = parse_date)]
    pub(crate) today: Option<NaiveDate>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct WindowStatusArgs {
    /// Evaluate at this instant instead of now
    #[arg(long, value_parser = parse_local_instant)]
    pub(crate) at: Option<DateTime<Local>>,
}

pub(crate) fn run_captcha_sample(args: CaptchaSampleArgs) -> Result<(), AppError> {
    let mut guard = match args.seed {
        Some(seed) => CaptchaGuard::with_rng(StdRng::seed_from_u64(seed)),
        None => CaptchaGuard::new(),
    };
    let png = guard.render_png(&CaptchaRenderer::default())?;
    std::fs::write(&args.out, png)?;

    let challenge = guard.challenge();
    println!("Challenge written to {}", args.out.display());
    println!("  Expression: {}", challenge.text());
    println!("  Answer:     {}", challenge.answer());
    Ok(())
}

pub(crate) async fn run_admin_export(args: AdminExportArgs) -> Result<(), AppError> {
    let backend = connect()?;
    let records = backend.fetch_admin_data(&args.password).await?;
    let bytes = export_bytes(&records).map_err(AdminError::from)?;

    let out = args
        .out
        .unwrap_or_else(|| PathBuf::from(export_filename(Utc::now().date_naive())));
    std::fs::write(&out, bytes)?;
    println!("Exported {} records to {}", records.len(), out.display());
    Ok(())
}

pub(crate) async fn run_admin_stats(args: AdminStatsArgs) -> Result<(), AppError> {
    let backend = connect()?;
    let records = backend.fetch_admin_data(&args.password).await?;
    let today = args.today.unwrap_or_else(|| Local::now().date_naive());
    let stats = DashboardStats::compute(&records, today);
    print!("{}", render_stats(&stats, today));
    Ok(())
}

pub(crate) async fn run_window_status(args: WindowStatusArgs) -> Result<(), AppError> {
    let backend = connect()?;
    let config = backend.fetch_config().await;
    let now = args.at.unwrap_or_else(Local::now);
    print!("{}", render_window(&WindowStatus::describe(&config, now)));
    Ok(())
}

fn connect() -> Result<HttpBackend, AppError> {
    let config = AppConfig::load()?;
    Ok(HttpBackend::new(&config.backend)?)
}

fn render_stats(stats: &DashboardStats, today: NaiveDate) -> String {
    let mut out = String::new();
    out.push_str("=== Dashboard ===\n");
    out.push_str(&format!("Total codes issued: {}\n", stats.total));
    out.push_str(&format!("Active codes:       {}\n", stats.active));
    out.push_str(&format!("Issued on {today}: {}\n", stats.today));
    out.push_str(&format!("With scores:        {}\n", stats.with_scores));

    push_shares(&mut out, "Regions", &stats.regions);
    push_shares(&mut out, "Identities", &stats.identities);

    if stats.with_scores > 0 {
        out.push_str("\nGrades:\n");
        for subject in &stats.grades {
            let counts: Vec<String> = subject
                .counts
                .iter()
                .map(|grade| format!("{} {}", grade.grade, grade.count))
                .collect();
            out.push_str(&format!("  {:<8} {}\n", subject.subject.label(), counts.join(" · ")));
        }
        push_buckets(&mut out, "Rank (percent)", &stats.rank_percent);
        push_buckets(&mut out, "Rank (position)", &stats.rank_count);
    }
    out
}

fn push_shares(out: &mut String, title: &str, shares: &[Share]) {
    if shares.is_empty() {
        return;
    }
    out.push_str(&format!("\n{title}:\n"));
    for share in shares {
        out.push_str(&format!(
            "  - {:<12} {:>4} ({}%)\n",
            share.label, share.value, share.percent
        ));
    }
}

fn push_buckets(out: &mut String, title: &str, buckets: &[BucketCount]) {
    out.push_str(&format!("\n{title}:\n"));
    for bucket in buckets {
        out.push_str(&format!("  - {:<10} {}\n", bucket.label, bucket.count));
    }
}

fn render_window(status: &WindowStatus) -> String {
    format!(
        "Score entry: {}\n  Start: {}\n  End:   {}\n  Checked at {}\n",
        if status.open { "OPEN" } else { "CLOSED" },
        status.start,
        status.end,
        status.evaluated_at.format("%Y/%m/%d %H:%M:%S"),
    )
}
