//! `event-agent` command-line client
//!
//! Sends commands to event agents over NATS and prints the reply envelope,
//! or tails the events they publish.

mod request;

use std::process::ExitCode;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_nats::{Client, ConnectOptions};
use bytes::Bytes;
use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser, Subcommand};
use futures::StreamExt;
use serde_json::Value;
use tracing::{debug, Level};

use event_agent_core::config::DEFAULT_URL;
use event_agent_core::context::DEFAULT_SUBJECT_PREFIX;
use event_agent_core::logging::{setup_logging, LoggingConfig};

#[derive(Parser, Debug)]
#[command(name = "event-agent", author, version, about = "Send commands to event agents and tail their events over NATS")]
pub struct Cli {
    /// NATS server URL
    #[arg(long, global = true, env = "EVENT_AGENT_URL", default_value = DEFAULT_URL)]
    pub url: String,

    /// Subject prefix the agents use
    #[arg(long, global = true, env = "EVENT_AGENT_SUBJECT_PREFIX", default_value = DEFAULT_SUBJECT_PREFIX)]
    pub prefix: String,

    /// Address a single node instead of every agent on the API subject
    #[arg(long, global = true)]
    pub node: Option<String>,

    /// Seconds to wait for a reply
    #[arg(long, global = true, default_value_t = 5)]
    pub timeout: u64,

    /// Authentication token
    #[arg(long, global = true, env = "EVENT_AGENT_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Send without waiting for a reply
    #[arg(long = "async", global = true)]
    pub fire_and_forget: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Agent version, uptime and counters; optionally change the log level
    Status {
        #[arg(long)]
        log_level: Option<String>,
    },
    /// Place a call from an endpoint to an extension
    Originate {
        endpoint: String,
        extension: String,
        #[arg(long)]
        context: Option<String>,
    },
    /// Hang up a channel
    Hangup {
        uuid: String,
        #[arg(long)]
        cause: Option<String>,
    },
    /// Run any engine API command
    Api {
        command: String,
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Control the park dialplan
    Dialplan {
        #[command(subcommand)]
        action: DialplanAction,
    },
    /// Print published events until interrupted
    Events {
        /// Event name pattern, NATS wildcards allowed
        #[arg(default_value = ">")]
        pattern: String,
        /// Stop after this many events
        #[arg(long)]
        count: Option<usize>,
    },
}

#[derive(Subcommand, Debug)]
pub enum DialplanAction {
    Enable,
    Disable,
    Status,
    /// Early media while parked: silence, ringback or music
    Audio {
        mode: String,
        #[arg(long)]
        music_class: Option<String>,
    },
    Autoanswer {
        #[arg(action = ArgAction::Set, value_parser = BoolishValueParser::new())]
        enabled: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let logging = if cli.verbose {
        LoggingConfig::new(Level::DEBUG, "event-agent-cli").with_file_info()
    } else {
        LoggingConfig::new(Level::WARN, "event-agent-cli")
    };
    if let Err(e) = setup_logging(logging) {
        eprintln!("warning: {}", e);
    }

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let client = connect(&cli).await?;

    if let Command::Events { pattern, count } = &cli.command {
        tail_events(&client, &request::events_subject(&cli.prefix, pattern), *count).await?;
        return Ok(ExitCode::SUCCESS);
    }

    let payload = request::build_payload(&cli.command, cli.node.as_deref(), cli.fire_and_forget)
        .ok_or_else(|| anyhow!("command does not send a request"))?;
    let subject = request::target_subject(&cli.prefix, cli.node.as_deref());
    let body = Bytes::from(serde_json::to_vec(&payload)?);
    debug!("Sending {} to {}", payload, subject);

    if cli.fire_and_forget {
        client.publish(subject.clone(), body).await?;
        client.flush().await?;
        println!("Sent to {}", subject);
        return Ok(ExitCode::SUCCESS);
    }

    let reply = tokio::time::timeout(Duration::from_secs(cli.timeout), client.request(subject.clone(), body))
        .await
        .map_err(|_| anyhow!("no reply on {} within {}s", subject, cli.timeout))?
        .with_context(|| format!("request to {} failed", subject))?;

    let reply: Value = serde_json::from_slice(&reply.payload).context("reply is not JSON")?;
    println!("{}", serde_json::to_string_pretty(&reply)?);

    if reply.get("success").and_then(Value::as_bool).unwrap_or(false) {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

async fn connect(cli: &Cli) -> Result<Client> {
    let options = match &cli.token {
        Some(token) => ConnectOptions::with_token(token.clone()),
        None => ConnectOptions::new(),
    };
    options
        .name("event-agent-cli")
        .connection_timeout(Duration::from_secs(cli.timeout))
        .connect(cli.url.as_str())
        .await
        .with_context(|| format!("cannot connect to {}", cli.url))
}

async fn tail_events(client: &Client, subject: &str, count: Option<usize>) -> Result<()> {
    let mut subscriber = client.subscribe(subject.to_string()).await?;
    eprintln!("Listening on {} (Ctrl+C to stop)", subject);

    let mut seen = 0usize;
    loop {
        tokio::select! {
            message = subscriber.next() => {
                let Some(message) = message else { break };
                match serde_json::from_slice::<Value>(&message.payload) {
                    Ok(event) => println!("{} {}", message.subject, serde_json::to_string_pretty(&event)?),
                    Err(_) => println!("{} {}", message.subject, String::from_utf8_lossy(&message.payload)),
                }
                seen += 1;
                if count.is_some_and(|limit| seen >= limit) {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    Ok(())
}
