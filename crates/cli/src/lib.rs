use anyhow::{Context as AnyhowContext, Result};
use clap::{Args, Parser, Subcommand};
use reqforge_assistant::Assistant;
use reqforge_protocol::{
    serialize_json, serialize_json_pretty, AiContext, AiMode, AiRequest, LlmOverrides,
};
use reqforge_relay::{inject, parse_raw_request, render_raw_request, Location, Relay};
use serde::Serialize;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

mod access;
mod config;
mod http_api;
mod server;

fn print_stdout(text: &str) -> Result<()> {
    use std::io::Write;

    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.write_all(b"\n"))
        .and_then(|_| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let output = if pretty {
        serialize_json_pretty(value)?
    } else {
        serialize_json(value)?
    };
    print_stdout(&output)
}

#[derive(Parser)]
#[command(name = "reqforge")]
#[command(
    about = "HTTP request workbench with an LLM assistant for security testing",
    long_about = None
)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors (stdout is reserved for JSON)
    #[arg(long, global = true)]
    quiet: bool,

    /// Path to reqforge.toml
    #[arg(long, global = true, env = "REQFORGE_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the relay and assistant API over HTTP
    Serve(ServeArgs),

    /// Normalize a model reply read from a file or stdin
    Normalize(NormalizeArgs),

    /// Ask the model about a request/response and print the normalized answer
    Ask(AskArgs),

    /// Send a raw HTTP request, optionally with a payload injected
    Send(SendArgs),
}

#[derive(Args)]
struct ServeArgs {
    /// Bind address, e.g. 127.0.0.1:7700
    #[arg(long, default_value = "127.0.0.1:7700")]
    bind: String,

    /// Allow binding to non-loopback addresses (requires --auth-token)
    #[arg(long)]
    public: bool,

    /// Require Authorization: Bearer <token> on all requests
    #[arg(long, env = "REQFORGE_AUTH_TOKEN", hide_env_values = true)]
    auth_token: Option<String>,
}

#[derive(Args)]
struct NormalizeArgs {
    /// File containing the model reply (default: stdin)
    #[arg(long)]
    file: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,
}

#[derive(Args)]
struct AskArgs {
    /// Question or instruction for the model
    #[arg(long)]
    prompt: String,

    /// discovery|payloads|combined|analysis|general (inferred from the prompt when omitted)
    #[arg(long, value_parser = parse_mode)]
    mode: Option<AiMode>,

    /// Raw HTTP request to attach as context
    #[arg(long)]
    request_file: Option<PathBuf>,

    /// Raw HTTP response to attach as context
    #[arg(long)]
    response_file: Option<PathBuf>,

    /// Override the model name
    #[arg(long)]
    model: Option<String>,

    /// Override the chat-completions endpoint
    #[arg(long)]
    endpoint: Option<String>,

    /// Override the sampling temperature
    #[arg(long)]
    temperature: Option<f32>,

    /// Override the completion token limit
    #[arg(long)]
    max_tokens: Option<u32>,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,
}

#[derive(Args)]
struct SendArgs {
    /// File containing the raw HTTP request
    #[arg(long)]
    file: PathBuf,

    /// Scheme for origin-form request targets
    #[arg(long, default_value = "https")]
    scheme: String,

    /// Parameter to inject into
    #[arg(long, requires_all = ["location", "payload"])]
    param: Option<String>,

    /// query|body|header|cookie|path
    #[arg(long, requires = "param")]
    location: Option<Location>,

    /// Payload to substitute for the parameter
    #[arg(long, requires = "param")]
    payload: Option<String>,

    /// Print the (injected) raw request instead of sending it
    #[arg(long)]
    dry_run: bool,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,
}

fn parse_mode(raw: &str) -> std::result::Result<AiMode, String> {
    AiMode::parse(raw).ok_or_else(|| {
        let known = AiMode::ALL.map(AiMode::as_str).join(", ");
        format!("unknown mode '{raw}' (expected one of: {known})")
    })
}

pub async fn main_entry() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    // reqwest/hyper are chatty at debug level
    if !cli.verbose {
        builder.filter_module("hyper", log::LevelFilter::Warn);
        builder.filter_module("reqwest", log::LevelFilter::Warn);
    }
    builder.target(env_logger::Target::Stderr).init();

    let app_config = config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve(args) => server::serve_http(args, app_config).await?,
        Commands::Normalize(args) => run_normalize(args)?,
        Commands::Ask(args) => run_ask(args, app_config).await?,
        Commands::Send(args) => run_send(args, app_config).await?,
    }

    Ok(())
}

fn run_normalize(args: NormalizeArgs) -> Result<()> {
    let raw = match &args.file {
        Some(path) => read_file(path)?,
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read model reply from stdin")?;
            buffer
        }
    };
    if raw.trim().is_empty() {
        anyhow::bail!("Model reply is empty. Provide --file or pipe the reply via stdin.");
    }

    let reply = http_api::ai_reply(&raw, None);
    if let Some(warning) = &reply.warning {
        log::warn!("{warning}");
    }
    print_json(&reply, args.pretty)
}

async fn run_ask(args: AskArgs, app_config: config::AppConfig) -> Result<()> {
    let context = AiContext {
        request: args.request_file.as_deref().map(read_file).transpose()?,
        response: args.response_file.as_deref().map(read_file).transpose()?,
    };
    let overrides = LlmOverrides {
        endpoint: args.endpoint,
        api_key: None,
        model: args.model,
        temperature: args.temperature,
        max_tokens: args.max_tokens,
    };
    let request = AiRequest {
        prompt: args.prompt,
        mode: args.mode,
        context,
        config: Some(overrides),
    };

    let assistant = Assistant::new(app_config.llm).context("Failed to build the model client")?;
    let answer = assistant
        .ask(&request)
        .await
        .map_err(|err| anyhow::anyhow!("{err}\nHint: {}", err.hint()))?;

    let reply = http_api::ai_reply(&answer.content, Some(answer.mode));
    if let Some(warning) = &reply.warning {
        log::warn!("{warning}");
    }
    print_json(&reply, args.pretty)
}

async fn run_send(args: SendArgs, app_config: config::AppConfig) -> Result<()> {
    let raw = read_file(&args.file)?;
    let mut request = parse_raw_request(&raw, &args.scheme)
        .with_context(|| format!("Failed to parse raw request {}", args.file.display()))?;

    if let (Some(param), Some(location), Some(payload)) =
        (&args.param, args.location, &args.payload)
    {
        request = inject(&request, param, location, payload)?;
        log::info!("injected payload into {location} parameter '{param}'");
    }

    if args.dry_run {
        return print_stdout(&render_raw_request(&request)?);
    }

    let relay = Relay::new(app_config.proxy.relay_config())?;
    let response = relay
        .send(&request)
        .await
        .map_err(|err| anyhow::anyhow!("{err}\nHint: {}", err.hint()))?;
    print_json(&response, args.pretty)
}

fn read_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}
