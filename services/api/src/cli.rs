use crate::demo::{run_camp_report, run_demo, CampReportArgs, DemoArgs};
use crate::server;
use camp_eval::error::AppError;
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "Camp Evaluation Engine",
    about = "Score, classify, and close youth evaluation camps from the command line",
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
    /// Summarize evaluator score sheets without running the service
    Camp {
        #[command(subcommand)]
        command: CampCommand,
    },
    /// Run a scripted camp end to end, including the closure workflow
    Demo(DemoArgs),
}

#[derive(Subcommand, Debug)]
enum CampCommand {
    /// Print player summaries for one event of a CSV score sheet
    Report(CampReportArgs),
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
        Command::Camp {
            command: CampCommand::Report(args),
        } => run_camp_report(args),
        Command::Demo(args) => run_demo(args).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_is_the_default_command() {
        let cli = Cli::try_parse_from(["camp-eval-api"]).expect("parses");
        assert!(cli.command.is_none());
    }

    #[test]
    fn camp_report_requires_a_score_sheet() {
        assert!(Cli::try_parse_from(["camp-eval-api", "camp", "report"]).is_err());

        let cli = Cli::try_parse_from([
            "camp-eval-api",
            "camp",
            "report",
            "--scores",
            "week-2.csv",
            "--event",
            "Week 2",
        ])
        .expect("parses");
        match cli.command {
            Some(Command::Camp {
                command: CampCommand::Report(args),
            }) => {
                assert_eq!(args.scores.to_string_lossy(), "week-2.csv");
                assert_eq!(args.event.as_deref(), Some("Week 2"));
                assert!(!args.json);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
