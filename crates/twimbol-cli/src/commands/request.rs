//! Request command implementation.

use anyhow::{Context, Result, bail};
use clap::Args;
use colored::Colorize;

use twimbol_core::{ApiPath, ApiRequest, Method};

use crate::cli::GlobalArgs;
use crate::output;
use crate::session;

#[derive(Args, Debug)]
pub struct RequestArgs {
    /// HTTP method (GET, POST, PUT, PATCH, DELETE, ...)
    pub method: String,

    /// Request path, e.g. /api/reels/
    pub path: String,

    /// JSON request body
    #[arg(long)]
    pub json: Option<String>,

    /// Query parameter as key=value (repeatable)
    #[arg(long = "query", value_parser = parse_query_pair)]
    pub query: Vec<(String, String)>,
}

fn parse_query_pair(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{s}'"))?;
    if key.is_empty() {
        return Err(format!("empty query key in '{s}'"));
    }
    Ok((key.to_string(), value.to_string()))
}

fn parse_method(s: &str) -> Result<Method> {
    Method::from_bytes(s.to_ascii_uppercase().as_bytes())
        .with_context(|| format!("Invalid HTTP method '{s}'"))
}

pub async fn run(args: RequestArgs, global: &GlobalArgs) -> Result<()> {
    let method = parse_method(&args.method)?;
    let path = ApiPath::new(&args.path).context("Invalid request path")?;

    let mut request = ApiRequest::new(method, path);
    for (key, value) in args.query {
        request = request.query(key, value);
    }
    if let Some(body) = &args.json {
        let body: serde_json::Value =
            serde_json::from_str(body).context("--json is not valid JSON")?;
        request = request.json(&body)?;
    }

    let (client, _store) = session::client(global)?;
    let was_authenticated = client.is_authenticated();

    let response = client.request(request).await.context("Request failed")?;
    let status = response.status();

    let status_line = format!("HTTP {status}");
    if response.is_success() {
        eprintln!("{}", status_line.green());
    } else {
        eprintln!("{}", status_line.red());
    }

    if !response.bytes().is_empty() {
        match response.json::<serde_json::Value>() {
            Ok(value) => output::json_pretty(&value)?,
            Err(_) => println!("{}", response.text()),
        }
    }

    if was_authenticated && !client.is_authenticated() {
        output::warning("Session expired. Run 'twimbol login' again.");
    }

    if !response.is_success() {
        bail!("Request returned {status}");
    }

    Ok(())
}
