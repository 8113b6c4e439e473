use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};

use coach_pipeline::actions::UiResource;
use coach_pipeline::intent::Mode;
use coach_pipeline::llm::{ChatMessage, create_provider};
use coach_pipeline::onboarding::{ProfileDraft, Step, welcome};
use coach_pipeline::store::{MemoryStore, Store, import_profile};
use coach_pipeline::{ChatPipeline, LlmSettings, PipelineConfig, TurnRequest};

/// Local REPL over the turn pipeline. State lives here, not in the pipeline.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr through a non-blocking writer so they don't interleave with replies.
    let (writer, _log_guard) = tracing_appender::non_blocking(std::io::stderr());
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(writer)
        .with_target(false)
        .init();

    let config = PipelineConfig::from_env()?;
    let llm = match LlmSettings::from_env() {
        Some(settings) => Some(create_provider(&settings)),
        None => {
            tracing::warn!("COACH_LLM_API_KEY not set, running on deterministic rules only");
            None
        }
    };
    let owner_id = std::env::var("COACH_OWNER_ID").unwrap_or_else(|_| "local-user".to_string());

    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let pipeline = ChatPipeline::new(llm, store.clone(), &config);

    let mut draft = ProfileDraft::default();
    let mut step = Step::Greeting;
    let mut history: Vec<ChatMessage> = Vec::new();
    let mut pending: Option<UiResource> = None;

    println!("\n{}\n", welcome());
    history.push(ChatMessage::assistant(welcome()));
    eprint!("> ");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim().to_string();
        if line.is_empty() {
            eprint!("> ");
            continue;
        }

        if let Some(resource) = pending.take() {
            if is_yes(&line) {
                let outcome = pipeline
                    .confirm(resource.action_id().as_str(), &resource.values(), &owner_id)
                    .await?;
                if outcome.success
                    && let Some(profile) = store.get_profile(&owner_id).await?
                {
                    draft = profile;
                }
                println!("\n{}\n", outcome.message);
            } else {
                println!("\nOkay, I left everything as it was.\n");
            }
            eprint!("> ");
            continue;
        }

        let request = TurnRequest::new(line.as_str(), step)
            .with_context(draft.clone())
            .with_history(history.clone());
        let response = pipeline.handle_turn(request).await?;

        draft.overlay(&response.extracted_data);
        let edited = response
            .intent
            .as_ref()
            .is_some_and(|intent| intent.mode == Mode::ProfileEdit);
        if edited && !response.extracted_data.is_empty() {
            store.save_profile(&owner_id, &draft).await?;
        }
        if !step.is_terminal() && response.next_step.is_terminal() {
            import_profile(store.as_ref(), &owner_id, &draft).await?;
        }
        step = response.next_step;

        println!("\n{}", response.response);
        if let Some(resource) = response.ui_resource {
            println!("{}", resource.render_text());
            if resource.is_confirmation() {
                pending = Some(resource);
            }
        }
        println!();

        history.push(ChatMessage::user(line));
        history.push(ChatMessage::assistant(response.response));
        eprint!("> ");
    }

    Ok(())
}

fn is_yes(answer: &str) -> bool {
    matches!(
        answer.to_lowercase().trim_end_matches(['.', '!']),
        "y" | "yes" | "yeah" | "sure" | "ok" | "okay" | "go ahead" | "oui" | "d'accord" | "vas-y"
    )
}
