//! mailgen_invoke - run a single pipeline invocation
//!
//! Prints the invocation response JSON on success; exits non-zero on failure.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use mailgen::{Config, InvocationRequest, InvocationResponse, Pipeline};
use tracing::info;

/// One-shot personalized email generation
#[derive(Parser, Debug)]
#[command(
    name = "mailgen_invoke",
    version,
    about = "Generate one personalized image and email"
)]
struct Args {
    /// Source product image, `s3://bucket/key`
    #[arg(long)]
    s3_uri: String,

    /// Bucket receiving the generated image and email
    #[arg(long)]
    bucket: String,

    /// TOML config file (defaults to ./mailgen.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::load(args.config.as_deref())?;

    mailgen::init_tracing(&config.log);

    let pipeline = Pipeline::from_config(&config)?;
    let request = InvocationRequest {
        s3_uri: args.s3_uri,
        s3_bucket_name: args.bucket,
    };

    let outcome = pipeline.invoke(&request).await?;
    info!(
        "Stored image {} and email {}",
        outcome.image_key, outcome.email_key
    );

    println!("{}", serde_json::to_string(&InvocationResponse::ok())?);
    Ok(())
}
