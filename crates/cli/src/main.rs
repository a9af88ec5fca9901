use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use payagent_agents::PaymentAgent;
use payagent_core::ConversationContext;
use payagent_gateway::{
    Gateway, HttpGatewayConfig, DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS,
};
use payagent_observability::{init_tracing, AppMetrics};

#[derive(Debug, Parser)]
#[command(name = "payagent")]
#[command(about = "Conversational payments assistant")]
struct Cli {
    /// Which payment provider to talk to.
    #[arg(long, value_enum, env = "PAYAGENT_GATEWAY", default_value_t = GatewayKind::Http)]
    gateway: GatewayKind,

    #[arg(long, env = "PAYAGENT_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    #[arg(long, env = "PAYAGENT_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    #[arg(long, env = "PAYAGENT_API_SECRET", hide_env_values = true)]
    api_secret: Option<String>,

    #[arg(long, env = "PAYAGENT_TIMEOUT_SECONDS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout_seconds: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum GatewayKind {
    Http,
    Memory,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Interactive conversation.
    Chat {
        /// Print turn counters on exit.
        #[arg(long)]
        stats: bool,
    },
    /// Send a single message and print the reply.
    Ask {
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("payagent_cli");
    let cli = Cli::parse();

    let agent = build_agent(&cli)?;

    match cli.command {
        Command::Chat { stats } => run_chat(&agent, stats).await?,
        Command::Ask { text, json } => {
            let mut context = ConversationContext::new();
            let report = agent
                .handle_turn(&mut context, &text.join(" "))
                .await
                .context("turn failed")?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", report.reply);
            }
        }
    }

    Ok(())
}

fn build_agent(cli: &Cli) -> Result<PaymentAgent<Gateway>> {
    let gateway = match cli.gateway {
        GatewayKind::Memory => Gateway::memory(),
        GatewayKind::Http => {
            let config = HttpGatewayConfig::new(
                cli.api_key.clone().unwrap_or_default(),
                cli.api_secret.clone().unwrap_or_default(),
            )
            .with_base_url(cli.base_url.clone())
            .with_timeout(Duration::from_secs(cli.timeout_seconds));
            Gateway::http(config).context(
                "failed to configure the payment provider (set PAYAGENT_API_KEY and PAYAGENT_API_SECRET, or use --gateway memory)",
            )?
        }
    };

    Ok(PaymentAgent::new(Arc::new(gateway), AppMetrics::shared()))
}

async fn run_chat(agent: &PaymentAgent<Gateway>, stats: bool) -> Result<()> {
    let mut context = ConversationContext::new();

    println!("Payments assistant. Type 'help' for examples, 'reset' to start over, 'exit' to quit.");

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if io::stdin().read_line(&mut line)? == 0 {
            break;
        }

        let message = line.trim();
        if message.eq_ignore_ascii_case("exit") || message.eq_ignore_ascii_case("quit") {
            break;
        }

        if message.is_empty() {
            continue;
        }

        if message.eq_ignore_ascii_case("reset") {
            context.reset();
            println!("\nConversation cleared.\n");
            continue;
        }

        match agent.handle_message(&mut context, message).await {
            Ok(reply) => println!("\n{reply}\n"),
            Err(error) => eprintln!("\nSorry, {error}\n"),
        }
    }

    if stats {
        println!(
            "{}",
            serde_json::to_string_pretty(&agent.metrics().snapshot())?
        );
    }

    Ok(())
}
