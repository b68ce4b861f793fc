use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tribuna_common::{CandidateProfile, Config, SystemClock};
use tribuna_pipeline::arbiter::{HttpFeedReader, NewsdataIndex, SourceArbiter};
use tribuna_pipeline::authorization::AuthorizationService;
use tribuna_pipeline::generation::GenerationEngine;
use tribuna_pipeline::images::{CommonsMediaIndex, ImagePicker};
use tribuna_pipeline::pipeline::Pipeline;
use tribuna_pipeline::publish::{HttpWorkflowHook, PublishGate};
use tribuna_pipeline::store::MemoryStore;

/// Run one editorial pipeline invocation for a candidate.
#[derive(Parser, Debug)]
#[command(name = "tribuna-pipeline")]
struct Args {
    /// Candidate display name.
    #[arg(long)]
    name: String,

    /// Office the candidate runs for.
    #[arg(long)]
    office: String,

    /// Region of the race.
    #[arg(long)]
    region: String,

    /// Ballot number, when assigned.
    #[arg(long)]
    ballot_number: Option<u32>,

    /// Regional RSS/Atom feeds consulted before the headline index.
    #[arg(long = "feed")]
    feeds: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("tribuna=info".parse()?))
        .init();

    let args = Args::parse();

    info!("Tribuna pipeline starting...");

    let config = Config::from_env();
    config.log_redacted();

    let newsdata_key = config
        .newsdata_api_key
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("NEWSDATA_API_KEY is required to select sources"))?;

    let candidate = CandidateProfile {
        id: uuid::Uuid::new_v4(),
        display_name: args.name,
        office: args.office,
        region: args.region,
        ballot_number: args.ballot_number,
        biography: None,
        proposals: None,
    };

    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(SystemClock);

    let arbiter = SourceArbiter::new(
        Arc::new(NewsdataIndex::new(newsdata_key)),
        Arc::new(HttpFeedReader::new()),
        args.feeds,
    );
    let images = ImagePicker::new(Arc::new(CommonsMediaIndex::new()));
    let engine = GenerationEngine::from_config(&config);
    let authorization = Arc::new(AuthorizationService::new(
        store.clone(),
        clock.clone(),
        &config.site_base_url,
        &config.phone_country_prefix,
    ));
    let gate = PublishGate::new(authorization);
    let hook = Arc::new(HttpWorkflowHook::new(
        config.workflow_hook_enabled,
        config.workflow_hook_url.clone(),
        config.workflow_hook_secret.clone(),
    ));

    let pipeline = Pipeline::new(arbiter, images, engine, gate, hook, store, clock);

    match pipeline.run_for_candidate(&candidate).await {
        Ok(outcome) => {
            info!(
                draft = %outcome.draft.id,
                destinations = outcome.eligible_destinations.len(),
                dispatched = outcome.dispatched,
                "Invocation finished"
            );
            println!("{}", serde_json::to_string_pretty(&outcome.draft)?);
            Ok(())
        }
        Err(e) => {
            anyhow::bail!("pipeline failed ({}): {e}", e.reason());
        }
    }
}
