use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "sqlmcp", version, about = "SQLite MCP server")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the MCP server over HTTP.
    Serve(commands::serve::ServeArgs),

    /// Print the tool catalog as JSON.
    Tools {
        /// One line per tool instead of JSON.
        #[arg(long, default_value_t = false)]
        summary: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.cmd {
        Command::Serve(args) => commands::serve::execute(args).await?,
        Command::Tools { summary } => commands::tools::list(summary)?,
    }

    Ok(())
}
