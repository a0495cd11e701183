use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "filerelay")]
#[command(author, version, about = "Telegram bot that relays files to a channel and returns share links", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Run the bot and the HTTP server (default)
    Run {
        /// Register <WEBHOOK_URL>/webhook with Telegram before serving
        #[arg(long)]
        register_webhook: bool,
    },

    /// Register <WEBHOOK_URL>/webhook with Telegram and exit
    SetWebhook,

    /// Remove the registered webhook and exit
    DeleteWebhook,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_subcommands() {
        let cli = Cli::try_parse_from(["filerelay"]).unwrap();
        assert_eq!(cli.command, None);

        let cli = Cli::try_parse_from(["filerelay", "run", "--register-webhook"]).unwrap();
        assert_eq!(cli.command, Some(Commands::Run { register_webhook: true }));

        let cli = Cli::try_parse_from(["filerelay", "set-webhook"]).unwrap();
        assert_eq!(cli.command, Some(Commands::SetWebhook));
    }
}
