use crate::commands::{
    run_admin_export, run_admin_stats, run_captcha_sample, run_window_status, AdminExportArgs,
    AdminStatsArgs, CaptchaSampleArgs, WindowStatusArgs,
};
use crate::server;
use clap::{Args, Parser, Subcommand};
use invite_portal::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Invite Portal",
    about = "Run the invitation portal or inspect its backend from the command line",
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
    /// Render CAPTCHA challenges
    Captcha {
        #[command(subcommand)]
        command: CaptchaCommand,
    },
    /// Operator tasks against the issuing backend
    Admin {
        #[command(subcommand)]
        command: AdminCommand,
    },
    /// Inspect the score-entry window
    Window {
        #[command(subcommand)]
        command: WindowCommand,
    },
}

#[derive(Subcommand, Debug)]
enum CaptchaCommand {
    /// Write a sample challenge image and print its answer
    Sample(CaptchaSampleArgs),
}

#[derive(Subcommand, Debug)]
enum AdminCommand {
    /// Download every record as CSV
    Export(AdminExportArgs),
    /// Print the dashboard summary
    Stats(AdminStatsArgs),
}

#[derive(Subcommand, Debug)]
enum WindowCommand {
    /// Show the configured window and whether it is open
    Status(WindowStatusArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Captcha {
            command: CaptchaCommand::Sample(args),
        } => run_captcha_sample(args),
        Command::Admin {
            command: AdminCommand::Export(args),
        } => run_admin_export(args).await,
        Command::Admin {
            command: AdminCommand::Stats(args),
        } => run_admin_stats(args).await,
        Command::Window {
            command: WindowCommand::Status(args),
        } => run_window_status(args).await,
    }
}
