use clap::{Parser, Subcommand};
use glaskugel_datastore::{DataStore, PgDataStore};
use glaskugel_pipeline::{
    openai::OpenAIClient, tracing::init_tracing_subscriber, yt::fetcher::YtDlpFetcher,
    BusMessage, ChunkSummarizer, EventBus, ProgressStep, SubmitRequest, SummaryPipelineBuilder,
};

#[derive(Parser)]
#[command(name = "glaskugel", about = "YouTube summary and prediction pipeline")]
struct Cli {
    /// Database connection URL
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    /// OpenAI API key
    #[arg(long, env = "OPENAI_API_KEY")]
    openai_key: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Summarize one video and tail its progress
    Submit {
        /// Video URL or bare video id
        url: String,
        /// Subtitle language to request (falls back to the settings default)
        #[arg(long)]
        lang: Option<String>,
        /// Display title to use until metadata is fetched
        #[arg(long)]
        title: Option<String>,
        /// Channel name hint
        #[arg(long)]
        channel: Option<String>,
    },
    /// List all jobs
    Jobs,
    /// List all extracted predictions
    Predictions,
    /// Inspect or change persisted settings
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print the current settings snapshot
    Show,
    /// Set one settings key
    Set { key: String, value: String },
}

async fn run_submit(
    store: PgDataStore,
    openai_key: Option<String>,
    url: String,
    lang: Option<String>,
    title: Option<String>,
    channel: Option<String>,
) -> anyhow::Result<()> {
    let existing = store.summarized_video_ids().await?;
    let video_id = glaskugel_pipeline::yt::extract_video_id(&url);
    if let Some(job_id) = existing.get(&video_id) {
        println!("Hinweis: Video bereits zusammengefasst (Job {job_id}), erstelle neuen Job.");
    }

    let bus = EventBus::default();
    let pipeline = SummaryPipelineBuilder::new()
        .store(store)
        .fetcher(YtDlpFetcher::new())
        .summarizer(ChunkSummarizer::new(OpenAIClient::new(openai_key)))
        .event_bus(bus.clone())
        .build();

    // subscribe before submitting, the bus keeps no backlog
    let mut rx = bus.subscribe();
    let keepalive = bus.spawn_keepalive(EventBus::KEEPALIVE_PERIOD);

    let job_id = pipeline.submit(SubmitRequest {
        video_url: url,
        lang,
        video_title: title,
        channel_name: channel,
        thumbnail_url: None,
    })
    .await?;
    tracing::info!(job_id, "Job submitted");

    let failed = loop {
        match rx.recv().await? {
            BusMessage::Event(event) if event.job_id == job_id => {
                println!("[{}] {}", event.step.as_str(), event.message);
                match event.step {
                    ProgressStep::Done => break false,
                    ProgressStep::Error => break true,
                    _ => {}
                }
            }
            _ => {}
        }
    };
    keepalive.abort();

    if failed {
        anyhow::bail!("Job {job_id} failed");
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let _guard = sentry::init((
        std::env::var("SENTRY_DSN").unwrap_or_default(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: Some("production".into()),
            ..Default::default()
        },
    ));

    let cli = Cli::parse();
    init_tracing_subscriber()?;

    let store = PgDataStore::init(&cli.database_url).await?;

    match cli.command {
        Command::Submit {
            url,
            lang,
            title,
            channel,
        } => {
            run_submit(store, cli.openai_key, url, lang, title, channel).await?;
        }
        Command::Jobs => {
            for job in store.list_jobs().await? {
                println!(
                    "{}\t{}\t{}\t{}\t{}",
                    job.id,
                    job.status.as_str(),
                    job.lang,
                    job.created_at.to_rfc3339(),
                    job.video_title,
                );
            }
        }
        Command::Predictions => {
            for p in store.list_predictions().await? {
                println!(
                    "{}\t{}\t{}\t{}\t{}\t{}",
                    p.id, p.asset_name, p.direction, p.price_target, p.author, p.video_title,
                );
            }
        }
        Command::Config(ConfigCommand::Show) => {
            let settings = store.load_settings().await?;
            println!("default_lang: {}", settings.default_lang);
            println!("cookie_browser: {}", settings.cookie_browser);
            println!("openai_model: {}", settings.openai_model);
            println!(
                "blocked_channels: {}",
                serde_json::to_string(&settings.blocked_channels)?
            );
            println!("summary_prompt:\n{}", settings.summary_prompt);
        }
        Command::Config(ConfigCommand::Set { key, value }) => {
            store.update_settings(&[(key.as_str(), value)]).await?;
            println!("OK");
        }
    }

    Ok(())
}
