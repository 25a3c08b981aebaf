//! `glean` CLI - mine posts and forum articles from saved pages

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use glean::json::JsonNode;
use glean::site::{facebook, ptt};
use glean::{Config, ExtractedArticle, ExtractedPost};

#[derive(Parser)]
#[command(name = "glean")]
#[command(about = "Extract posts and articles from saved social and forum pages")]
#[command(version)]
struct Cli {
    /// Config file (default: ~/.config/glean/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format
    #[arg(long, value_enum, default_value = "text", global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract a social post from a saved page
    Post {
        /// Saved page, or `-` for stdin
        input: String,

        /// Input is the post's JSON blob rather than the page
        #[arg(long)]
        raw_json: bool,
    },

    /// Extract a forum article from a saved page
    Article {
        /// Saved page, or `-` for stdin
        input: String,

        /// URL the page was fetched from, used to resolve relative links
        #[arg(long)]
        url: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Post { input, raw_json } => {
            let post = cmd_post(&read_input(&input)?, raw_json, &config)?;
            print_post(&post, cli.format)?;
        }
        Commands::Article { input, url } => {
            let html = read_input(&input)?;
            let article = reasoned(ptt::sanitize(&html, &url, &config.forum))?;
            print_article(&article, cli.format)?;
        }
    }

    Ok(())
}

fn cmd_post(input: &str, raw_json: bool, config: &Config) -> Result<ExtractedPost> {
    if raw_json {
        let blob = JsonNode::parse(input).context("input is not valid JSON")?;
        reasoned(facebook::extract(&blob))
    } else {
        reasoned(facebook::extract_from_html(input, &config.post))
    }
}

/// Keep the machine-readable reason in the reported error.
fn reasoned<T>(result: glean::Result<T>) -> Result<T> {
    result.map_err(|e| anyhow!("{}: {e}", e.reason()))
}

fn read_input(input: &str) -> Result<String> {
    if input == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read stdin")?;
        return Ok(buf);
    }
    let path = Path::new(input);
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn print_post(post: &ExtractedPost, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(post)?),
        OutputFormat::Text => print!("{}", facebook::format_post_markdown(post)),
    }
    Ok(())
}

fn print_article(article: &ExtractedArticle, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(article)?),
        OutputFormat::Text => {
            if let Some(title) = &article.title {
                println!("# {title}\n");
            }
            let body = article.markdown_body.as_deref().unwrap_or(article.description());
            if !body.is_empty() {
                println!("{body}");
            }
            if !article.image_links.is_empty() {
                println!();
                for link in &article.image_links {
                    println!("![]({link})");
                }
            }
        }
    }
    Ok(())
}
