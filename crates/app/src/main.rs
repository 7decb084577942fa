use anyhow::Context;
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use pdf_rag_core::{
    answer_question, ingest, reset_store, IngestionOptions, Provider, QueryOptions, QuerySession,
    RagConfig, ResetOutcome,
};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const QUIT_COMMANDS: [&str; 4] = ["\\q", ":q", "quit", "exit"];

/// Settings not given on the command line come from the environment
/// (RAG_COLLECTION, RAG_STORE_DIR, RAG_K, LLM_PROVIDER, OLLAMA_MODEL, ...).
#[derive(Parser)]
#[command(name = "pdf-rag", version, about = "Mini RAG over PDF documents")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct StoreArgs {
    /// Collection name inside the store
    #[arg(long)]
    collection: Option<String>,

    /// Directory holding the vector store
    #[arg(long)]
    store_dir: Option<PathBuf>,
}

#[derive(Args)]
struct RetrievalArgs {
    /// Only search chunks from this file name, e.g. ModuleHandbook.pdf
    #[arg(long)]
    source: Option<String>,

    /// Number of chunks to retrieve
    #[arg(short = 'k')]
    k: Option<usize>,

    /// Language model provider: ollama or openai
    #[arg(long)]
    provider: Option<Provider>,

    /// Model name; defaults per provider
    #[arg(long)]
    model: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest a PDF into the vector store
    Ingest {
        /// Path to the PDF
        pdf: PathBuf,
        #[command(flatten)]
        store: StoreArgs,
        /// Target chunk length in characters
        #[arg(long, default_value_t = 1000)]
        chunk_size: usize,
        /// Characters shared by neighbouring chunks
        #[arg(long, default_value_t = 150)]
        chunk_overlap: usize,
    },
    /// Ask a question grounded in the ingested PDFs
    Ask {
        /// Your question, in quotes
        question: String,
        #[command(flatten)]
        store: StoreArgs,
        #[command(flatten)]
        retrieval: RetrievalArgs,
    },
    /// Interactive question loop (type \q to quit)
    Chat {
        #[command(flatten)]
        store: StoreArgs,
        #[command(flatten)]
        retrieval: RetrievalArgs,
    },
    /// Delete the vector store directory
    Reset {
        /// Directory holding the vector store
        #[arg(long)]
        store_dir: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();
    let config = RagConfig::from_env();
    info!(
        version = env!("CARGO_PKG_VERSION"),
        started_at = %Utc::now().to_rfc3339(),
        "pdf-rag boot"
    );

    match cli.command {
        Command::Ingest {
            pdf,
            store,
            chunk_size,
            chunk_overlap,
        } => {
            let config = apply_store_args(config, store);
            let options = IngestionOptions {
                chunk_size,
                chunk_overlap,
            };
            let count = ingest(&pdf, &config, options)
                .with_context(|| format!("failed to ingest {}", pdf.display()))?;
            println!("Ingested {count} chunks into '{}'", config.collection);
        }
        Command::Ask {
            question,
            store,
            retrieval,
        } => {
            let (config, options) = apply_retrieval_args(apply_store_args(config, store), retrieval);
            let answer = answer_question(&question, &config, options)?;
            println!("{answer}");
        }
        Command::Chat { store, retrieval } => {
            let (config, options) = apply_retrieval_args(apply_store_args(config, store), retrieval);
            let session = QuerySession::open(&config, options)?;
            ctrlc::set_handler(|| {
                println!("\nBye.");
                std::process::exit(0);
            })
            .context("failed to install the Ctrl+C handler")?;
            run_chat(&session, io::stdin().lock(), &mut io::stdout())?;
        }
        Command::Reset { store_dir } => {
            let store_dir = store_dir.unwrap_or(config.store_dir);
            match reset_store(&store_dir)
                .with_context(|| format!("failed to delete {}", store_dir.display()))?
            {
                ResetOutcome::Deleted(path) => println!("Deleted store: {}", path.display()),
                ResetOutcome::NothingToDelete => println!("Nothing to delete"),
            }
        }
    }

    Ok(())
}

fn apply_store_args(mut config: RagConfig, args: StoreArgs) -> RagConfig {
    if let Some(collection) = args.collection {
        config.collection = collection;
    }
    if let Some(store_dir) = args.store_dir {
        config.store_dir = store_dir;
    }
    config
}

fn apply_retrieval_args(mut config: RagConfig, args: RetrievalArgs) -> (RagConfig, QueryOptions) {
    if let Some(provider) = args.provider {
        config.llm.provider = provider;
    }
    if args.model.is_some() {
        config.llm.model = args.model;
    }
    let options = QueryOptions::new(args.k.unwrap_or(config.k), args.source);
    (config, options)
}

/// Answers one chat turn.
trait Answerer {
    fn answer(&self, question: &str) -> anyhow::Result<String>;
}

impl Answerer for QuerySession {
    fn answer(&self, question: &str) -> anyhow::Result<String> {
        Ok(self.ask(question)?)
    }
}

fn run_chat<A, R, W>(session: &A, mut input: R, output: &mut W) -> anyhow::Result<()>
where
    A: Answerer + ?Sized,
    R: BufRead,
    W: Write,
{
    writeln!(output, "RAG chat ready. Type your question and press enter.")?;
    writeln!(output, "Type \\q to quit.\n")?;

    let mut line = String::new();
    loop {
        write!(output, "Ask >> ")?;
        output.flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            writeln!(output, "\nBye.")?;
            break;
        }

        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if QUIT_COMMANDS.contains(&question) {
            writeln!(output, "Bye.")?;
            break;
        }

        let answer = session.answer(question)?;
        writeln!(output, "\n{answer}\n")?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::io::Cursor;

    #[derive(Default)]
    struct RecordingAnswerer {
        questions: RefCell<Vec<String>>,
    }

    impl Answerer for RecordingAnswerer {
        fn answer(&self, question: &str) -> anyhow::Result<String> {
            self.questions.borrow_mut().push(question.to_string());
            Ok(format!("answer to {question}"))
        }
    }

    fn chat(input: &str) -> anyhow::Result<(String, Vec<String>)> {
        let answerer = RecordingAnswerer::default();
        let mut output = Vec::new();
        run_chat(&answerer, Cursor::new(input.as_bytes()), &mut output)?;
        Ok((String::from_utf8(output)?, answerer.questions.into_inner()))
    }

    #[test]
    fn every_quit_command_ends_the_loop() -> anyhow::Result<()> {
        for quit in QUIT_COMMANDS {
            let (output, asked) = chat(&format!("first?\n  {quit}  \nnever asked\n"))?;
            assert_eq!(asked, vec!["first?".to_string()]);
            assert!(output.ends_with("Ask >> Bye.\n"), "{quit}: {output:?}");
        }
        Ok(())
    }

    #[test]
    fn end_of_input_says_bye() -> anyhow::Result<()> {
        let (output, asked) = chat("")?;
        assert!(asked.is_empty());
        assert!(output.starts_with("RAG chat ready."));
        assert!(output.ends_with("Ask >> \nBye.\n"));
        Ok(())
    }

    #[test]
    fn blank_lines_are_skipped() -> anyhow::Result<()> {
        let (output, asked) = chat("\n   \nweight?\n")?;
        assert_eq!(asked, vec!["weight?".to_string()]);
        assert_eq!(output.matches("Ask >> ").count(), 4);
        Ok(())
    }

    #[test]
    fn answers_are_followed_by_a_blank_line() -> anyhow::Result<()> {
        let (output, _) = chat("weight?\n\\q\n")?;
        assert!(output.contains("Ask >> \nanswer to weight?\n\nAsk >> Bye.\n"));
        Ok(())
    }
}
