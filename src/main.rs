//! Ingress replay - run a captured envelope through the incoming pipeline.
//!
//! Reads an envelope document:
//! ```json
//! { "id": "...", "headers": { "NServiceBus.EnclosedMessageTypes": "..." }, "body": "..." }
//! ```
//! and prints one JSON line per logical message produced.

use clap::Parser;
use indexmap::IndexMap;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;

use ingress_core::envelope::{headers, IncomingMessage};
use ingress_core::pipeline::{IncomingLogicalMessageContext, IncomingPipeline, NextFn};
use ingress_core::registry::MessageMetadataRegistry;
use ingress_core::serialization::{
    ContentTypeDeserializerResolver, JsonMessageDeserializer, MessageDeserializer,
};
use ingress_core::{Config, MessageId};

#[derive(Debug, Parser)]
#[command(
    name = "ingress-replay",
    about = "Replay a captured envelope through the incoming pipeline"
)]
struct Args {
    /// Envelope JSON file.
    envelope: PathBuf,

    /// Message type known to this endpoint (repeatable).
    #[arg(long = "message-type", short = 't')]
    message_types: Vec<String>,

    /// Configuration file (JSON). Environment overrides still apply.
    #[arg(long, env = "INGRESS_CONFIG")]
    config: Option<PathBuf>,

    /// Treat messages without a resolvable type as fatal.
    #[arg(long)]
    no_inference: bool,
}

#[derive(Debug, Deserialize)]
struct EnvelopeFile {
    id: Option<String>,
    #[serde(default)]
    headers: IndexMap<String, String>,
    #[serde(default)]
    body: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Load configuration
    let config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    let mut config = config.with_overrides(|key| std::env::var(key).ok())?;
    if args.no_inference {
        config.pipeline.allow_content_type_inference = false;
    }

    // Initialize observability
    ingress_core::observability::init_tracing_with(&config.observability);

    let registry = Arc::new(MessageMetadataRegistry::new());
    for name in &args.message_types {
        registry.register_type(name);
    }

    let json: Arc<dyn MessageDeserializer> =
        Arc::new(JsonMessageDeserializer::new(registry.clone()));
    let resolver = Arc::new(ContentTypeDeserializerResolver::from_config(
        &config.pipeline,
        [json],
    )?);
    let pipeline =
        IncomingPipeline::with_deserialization(&config.pipeline, resolver, registry).build();

    let raw: EnvelopeFile =
        serde_json::from_str(&tokio::fs::read_to_string(&args.envelope).await?)?;
    let id = match raw.id.or_else(|| raw.headers.get(headers::MESSAGE_ID).cloned()) {
        Some(id) => MessageId::from_string(id)?,
        None => MessageId::new(),
    };
    let message = IncomingMessage::new(id, raw.headers, raw.body.into_bytes());

    tracing::info!(message_id = %message.id(), "Replaying envelope");

    let printer = NextFn(|ctx: IncomingLogicalMessageContext| {
        let line = serde_json::json!({
            "message_id": ctx.message_id().as_str(),
            "message_type": ctx.message().message_type(),
            "hierarchy": ctx.message().metadata().message_hierarchy(),
            "instance": ctx.message().downcast_ref::<serde_json::Value>(),
        });
        println!("{}", line);
        std::future::ready(Ok::<(), ingress_core::Error>(()))
    });

    let tags = pipeline.process_message(message.clone(), &printer).await?;

    tracing::info!(
        tags = ?tags.snapshot(),
        headers = ?message.headers().snapshot(),
        "Replay complete"
    );

    Ok(())
}
