use std::env;
use std::io::{self, BufRead, Write};

use tracing_subscriber::EnvFilter;

use versed_core::config::Settings;
use versed_core::document::Document;
use versed_core::error::{Error, Result};
use versed_core::traits::{Embedder, LanguageModel, VectorIndex};
use versed_core::types::Answer;
use versed_embed::default_embedder;
use versed_rag::{cited_indices, generate, ingest, retrieve, OllamaGenerator};
use versed_vector::VectorStore;

fn parse_args() -> (bool, Option<usize>) {
    let args: Vec<String> = env::args().skip(1).collect();
    let mut reindex = false;
    let mut k = None;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--reindex" | "-r" => reindex = true,
            "--k" => {
                if i + 1 < args.len() {
                    if let Ok(n) = args[i + 1].parse::<usize>() {
                        k = Some(n);
                        i += 1;
                    } else {
                        eprintln!("Error: --k requires a number");
                        std::process::exit(1);
                    }
                } else {
                    eprintln!("Error: --k requires a number");
                    std::process::exit(1);
                }
            }
            other => {
                eprintln!("Unknown argument: {other}");
                eprintln!("Usage: versed [--reindex] [--k N]");
                std::process::exit(1);
            }
        }
        i += 1;
    }
    (reindex, k)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = Settings::load().map_err(|e| {
        eprintln!("Error loading config: {e}");
        e
    })?;
    let (reindex, k_override) = parse_args();
    let k = k_override.unwrap_or(settings.retrieval.top_k);
    if k == 0 {
        return Err(Error::InvalidConfig("--k must be > 0".to_string()).into());
    }

    let embedder = default_embedder(&settings.embedding)?;
    let store = VectorStore::open(
        &settings.db_dir(),
        &settings.store.collection,
        settings.embedding.dim,
        settings.store.max_batch_size,
    )
    .await?;
    if reindex {
        println!("Reindex requested, clearing '{}'", settings.store.collection);
        store.clear().await?;
    }

    let corpus_path = settings.corpus_path();
    let document = Document::from_file(&corpus_path)?;
    // Ingestion failures are startup-fatal; a half-built index is never served.
    let report = ingest(&document, &settings.chunking, embedder.as_ref(), &store).await?;
    if report.skipped {
        println!("📚 Using existing index at {}", settings.db_dir().display());
    } else {
        println!("✅ Indexed {} chunks in {} batches", report.chunks, report.batches);
    }

    let llm = OllamaGenerator::from_settings(&settings.llm);

    let stdin = io::stdin();
    loop {
        print!("Ask a question (q to quit): ");
        io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if question.eq_ignore_ascii_case("q") {
            break;
        }

        // One bad question or provider hiccup must not kill the session.
        match answer_question(question, embedder.as_ref(), &store, &llm, k).await {
            Ok(answer) => print_answer(&answer),
            Err(Error::EmptyContext) => println!("\nNo relevant passage found.\n"),
            Err(e) => eprintln!("\n⚠️  {e}\n"),
        }
    }
    Ok(())
}

async fn answer_question(
    question: &str,
    embedder: &dyn Embedder,
    store: &dyn VectorIndex,
    llm: &dyn LanguageModel,
    k: usize,
) -> Result<Answer> {
    let hits = retrieve(question, embedder, store, k).await?;
    generate(question, &hits, llm).await
}

fn print_answer(answer: &Answer) {
    println!("\n=== Answer ===\n");
    println!("{}", answer.text);
    println!("\n=== References used ===\n");
    let cited = cited_indices(&answer.text);
    if cited.is_empty() {
        println!("No bracketed citations detected in the answer. Showing all candidate passages:");
        for r in &answer.references {
            println!("[{}] {} (chars {}..{})", r.index, r.chunk_id, r.start, r.end);
        }
    } else {
        for r in answer.references.iter().filter(|r| cited.contains(&r.index)) {
            println!("[{}] {} (chars {}..{})", r.index, r.chunk_id, r.start, r.end);
        }
    }
    println!();
}
