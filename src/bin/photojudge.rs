#![forbid(unsafe_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use photojudge::gateway::{ChatModel, ImageData, NoopUsageSink, ProviderGateway, StderrUsageSink};
use photojudge::judging::{default_criteria, Criterion, ScoreRevision};
use photojudge::pipeline::{JudgingPipeline, JudgingRequest, PipelineConfig};
use photojudge::ModelClient;

#[derive(Parser)]
#[command(name = "photojudge", version, about = "Vision-LLM photo judging CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Judge a single photo and write the judgement JSON
    Judge {
        /// Path to the photograph
        #[arg(long)]
        image: PathBuf,
        /// Criteria JSON file (array of {name, description, weight}); omit for the stock set
        #[arg(long)]
        criteria: Option<PathBuf>,
        /// Inline competition rules text
        #[arg(long, group = "rules_input")]
        rules: Option<String>,
        /// Read competition rules from file
        #[arg(long, group = "rules_input")]
        rules_file: Option<PathBuf>,
        /// OpenRouter model ID (vision-capable)
        #[arg(long)]
        model: Option<String>,
        /// Leave the aggregated score untouched instead of letting synthesis revise it
        #[arg(long)]
        keep_score: bool,
        /// Output judgement JSON (stdout when omitted)
        #[arg(long)]
        out: Option<PathBuf>,
        /// Log per-call usage records to stderr
        #[arg(long)]
        log_usage: bool,
    },
    /// Judge several photos concurrently, one judgement JSON per photo
    JudgeBatch {
        /// Paths to the photographs
        #[arg(long, value_delimiter = ',', required = true)]
        images: Vec<PathBuf>,
        #[arg(long)]
        criteria: Option<PathBuf>,
        #[arg(long, group = "rules_input")]
        rules: Option<String>,
        #[arg(long, group = "rules_input")]
        rules_file: Option<PathBuf>,
        #[arg(long)]
        model: Option<String>,
        #[arg(long)]
        keep_score: bool,
        /// Directory for the per-photo judgement JSON files
        #[arg(long)]
        out_dir: PathBuf,
        #[arg(long)]
        log_usage: bool,
    },
    /// Print the stock criteria set as JSON
    Criteria,
}

fn media_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        // jpg/jpeg and anything unrecognized: the upload path validated it
        _ => "image/jpeg",
    }
}

fn load_image(path: &Path) -> Result<ImageData, Box<dyn std::error::Error>> {
    let bytes = std::fs::read(path)
        .map_err(|e| format!("failed to read image {}: {e}", path.display()))?;
    Ok(ImageData::new(media_type_for(path), bytes))
}

fn load_criteria(path: Option<&Path>) -> Result<Vec<Criterion>, Box<dyn std::error::Error>> {
    match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .map_err(|e| format!("failed to read criteria {}: {e}", path.display()))?;
            Ok(serde_json::from_str(&raw)?)
        }
        None => Ok(default_criteria()),
    }
}

fn load_rules(
    inline: Option<String>,
    file: Option<&Path>,
) -> Result<Option<String>, Box<dyn std::error::Error>> {
    match (inline, file) {
        (Some(text), _) => Ok(Some(text)),
        (None, Some(path)) => Ok(Some(std::fs::read_to_string(path).map_err(|e| {
            format!("failed to read rules {}: {e}", path.display())
        })?)),
        (None, None) => Ok(None),
    }
}

fn build_pipeline(
    model: Option<String>,
    keep_score: bool,
    log_usage: bool,
) -> Result<JudgingPipeline, Box<dyn std::error::Error>> {
    let client: Arc<dyn ModelClient> = if log_usage {
        Arc::new(ProviderGateway::from_env(Arc::new(StderrUsageSink))?)
    } else {
        Arc::new(ProviderGateway::from_env(Arc::new(NoopUsageSink))?)
    };

    let mut config = PipelineConfig::default();
    if let Some(model) = model {
        config.model = ChatModel::openrouter(model);
    }
    if keep_score {
        config.score_revision = ScoreRevision::Keep;
    }

    Ok(JudgingPipeline::with_config(client, config))
}

fn build_request(
    image_path: &Path,
    criteria: &[Criterion],
    rules: Option<&str>,
) -> Result<JudgingRequest, Box<dyn std::error::Error>> {
    let filename = image_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("photo")
        .to_string();
    let mut request =
        JudgingRequest::new(filename, load_image(image_path)?).criteria(criteria.to_vec());
    if let Some(rules) = rules {
        request = request.rules(rules);
    }
    Ok(request)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Judge {
            image,
            criteria,
            rules,
            rules_file,
            model,
            keep_score,
            out,
            log_usage,
        } => {
            let criteria = load_criteria(criteria.as_deref())?;
            let rules = load_rules(rules, rules_file.as_deref())?;
            let pipeline = build_pipeline(model, keep_score, log_usage)?;
            let request = build_request(&image, &criteria, rules.as_deref())?;

            eprintln!(
                "[judge] evaluating {} against {} criteria with {}...",
                request.filename,
                criteria.len(),
                pipeline.config().model.model_id()
            );
            let judgement = pipeline.judge_photo(&request).await?;
            eprintln!(
                "[judge] {} scored {}/10",
                judgement.filename, judgement.overall_score
            );

            let json = serde_json::to_string_pretty(&judgement)?;
            match out {
                Some(path) => {
                    std::fs::write(&path, json)?;
                    eprintln!("[judge] judgement written to {}", path.display());
                }
                None => println!("{json}"),
            }
        }
        Commands::JudgeBatch {
            images,
            criteria,
            rules,
            rules_file,
            model,
            keep_score,
            out_dir,
            log_usage,
        } => {
            let criteria = load_criteria(criteria.as_deref())?;
            let rules = load_rules(rules, rules_file.as_deref())?;
            let pipeline = build_pipeline(model, keep_score, log_usage)?;

            let requests = images
                .iter()
                .map(|path| build_request(path, &criteria, rules.as_deref()))
                .collect::<Result<Vec<_>, _>>()?;

            std::fs::create_dir_all(&out_dir)?;
            eprintln!("[judge] judging {} photos concurrently...", requests.len());
            let results = pipeline.judge_batch(&requests).await;

            let mut failed = 0usize;
            for (request, result) in requests.iter().zip(results) {
                match result {
                    Ok(judgement) => {
                        let out_path = out_dir.join(format!("{}.json", request.filename));
                        std::fs::write(&out_path, serde_json::to_string_pretty(&judgement)?)?;
                        eprintln!(
                            "[judge]   {} — {}/10 -> {}",
                            judgement.filename,
                            judgement.overall_score,
                            out_path.display()
                        );
                    }
                    Err(err) => {
                        failed += 1;
                        eprintln!(
                            "[judge]   {} — FAILED in {} stage: {err}",
                            request.filename,
                            err.failed_stage().as_str()
                        );
                    }
                }
            }
            eprintln!(
                "[judge] done — {} succeeded, {failed} failed",
                requests.len() - failed
            );
            if failed > 0 {
                return Err(format!("{failed} judgement(s) failed").into());
            }
        }
        Commands::Criteria => {
            println!("{}", serde_json::to_string_pretty(&default_criteria())?);
        }
    }

    Ok(())
}
