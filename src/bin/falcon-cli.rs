//! Falcon command-line front-end
//!
//! Indexes documents given on the command line or in input files (one
//! `<title> <content>` per line), runs queries, serves HTTP, and dumps the
//! stored index or documents for inspection.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{bail, ensure, Context};
use clap::Parser;
use rusqlite::Connection;
use tracing_subscriber::EnvFilter;

use falcon::{
    store, DocumentStore, IndexStore, Indexer, NgramTokenizer, PostingList, SearchOutcome,
    Searcher, TokenizerKind, DEFAULT_HTTP_PORT,
};

#[derive(Parser, Debug)]
#[command(name = "falcon", version, about = "Falcon full text search engine")]
struct Args {
    /// SQLite database file
    #[arg(short = 'd', long = "databasefile")]
    database_file: Option<PathBuf>,

    /// Query string
    #[arg(short = 'q', long)]
    query: Option<String>,

    /// Document title to be stored and indexed
    #[arg(short = 't', long)]
    title: Option<String>,

    /// Document content to be stored and indexed
    #[arg(short = 'c', long)]
    content: Option<String>,

    /// Type of tokenizer [Bigram, Trigram]
    #[arg(short = 'z', long, default_value = "Bigram")]
    tokenizer: String,

    /// Build the index in memory, persisting to the database file at the end
    #[arg(short = 'M', long = "in-memory")]
    in_memory: bool,

    /// Serve HTTP requests
    #[arg(short = 'H', long = "http")]
    http: bool,

    /// HTTP port
    #[arg(short = 'p', long, default_value_t = DEFAULT_HTTP_PORT)]
    port: u16,

    /// Show the stored index
    #[arg(short = 'I', long = "showindex")]
    show_index: bool,

    /// Show the stored document(s)
    #[arg(short = 'C', long = "showdocument")]
    show_documents: bool,

    /// Run the built-in self tests
    #[arg(short = 'T', long = "test")]
    test: bool,

    /// Enable debug traces
    #[arg(short = 'D', long)]
    debug: bool,

    /// Input file(s), one `<title> <content>` document per line
    files: Vec<PathBuf>,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.debug);

    let kind = TokenizerKind::from_name(&args.tokenizer)?;

    if args.test {
        return run_self_tests();
    }

    if args.http {
        let db = args
            .database_file
            .as_deref()
            .context("-H needs a database file (-d)")?;
        falcon::http::serve(db, kind, args.port)?;
        return Ok(());
    }

    if args.in_memory {
        run_in_memory(&args, kind)
    } else if let Some(db) = args.database_file.clone() {
        run_on_file(&args, kind, &db)
    } else if wants_work(&args) {
        bail!("a database file (-d) or in-memory mode (-M) is required");
    } else {
        Ok(())
    }
}

fn wants_work(args: &Args) -> bool {
    args.query.is_some()
        || args.title.is_some()
        || args.content.is_some()
        || !args.files.is_empty()
        || args.show_index
        || args.show_documents
}

fn run_on_file(args: &Args, kind: TokenizerKind, db: &Path) -> anyhow::Result<()> {
    if let Some(query) = &args.query {
        let searcher = Searcher::open(db, kind)?;
        print_results(searcher.search(query)?);
    } else if has_documents(args) {
        let mut indexer = Indexer::open(db, kind)?;
        ingest(&mut indexer, args)?;
        indexer.close()?;
    }

    if args.show_index || args.show_documents {
        let conn = store::open(db)?;
        if args.show_index {
            show_index(&conn)?;
        }
        if args.show_documents {
            show_documents(&conn)?;
        }
    }
    Ok(())
}

fn run_in_memory(args: &Args, kind: TokenizerKind) -> anyhow::Result<()> {
    let mut indexer = Indexer::open_in_memory(kind)?;
    ingest(&mut indexer, args)?;

    if let Some(db) = args.database_file.as_deref() {
        indexer.flush_to_file(db)?;
    }

    if let Some(query) = &args.query {
        let searcher = indexer.into_searcher()?;
        print_results(searcher.search(query)?);
    } else {
        indexer.close()?;
    }

    if args.show_index || args.show_documents {
        let db = args
            .database_file
            .as_deref()
            .context("-I/-C in memory mode needs a database file (-d) to read back")?;
        let conn = store::open(db)?;
        if args.show_index {
            show_index(&conn)?;
        }
        if args.show_documents {
            show_documents(&conn)?;
        }
    }
    Ok(())
}

fn has_documents(args: &Args) -> bool {
    args.title.is_some() || args.content.is_some() || !args.files.is_empty()
}

fn ingest(indexer: &mut Indexer, args: &Args) -> anyhow::Result<usize> {
    let mut added = 0;
    match (&args.title, &args.content) {
        (Some(title), Some(content)) => {
            indexer.add(title, content)?;
            added += 1;
        }
        (None, None) => {}
        _ => bail!("-t and -c must be given together"),
    }

    for file in &args.files {
        let reader = BufReader::new(
            File::open(file).with_context(|| format!("cannot open {}", file.display()))?,
        );
        for (lineno, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let (title, content) = line.split_once(char::is_whitespace).with_context(|| {
                format!(
                    "{}:{}: expected '<title> <content>'",
                    file.display(),
                    lineno + 1
                )
            })?;
            indexer.add(title, content)?;
            added += 1;
        }
    }
    Ok(added)
}

fn print_results(outcome: SearchOutcome) {
    if let SearchOutcome::Found(hits) = outcome {
        for hit in hits {
            println!("{} {}", hit.id, hit.title);
        }
    }
}

fn show_index(conn: &Connection) -> anyhow::Result<()> {
    for list in IndexStore::new(conn).dump()? {
        println!(
            "{} {} {}",
            list.token(),
            list.positions_count(),
            format_postings(&list)
        );
    }
    Ok(())
}

fn format_postings(list: &PostingList) -> String {
    let entries: Vec<String> = list
        .iter()
        .map(|(doc_id, positions)| format!("{doc_id}: {positions:?}"))
        .collect();
    format!("{{{}}}", entries.join(", "))
}

fn show_documents(conn: &Connection) -> anyhow::Result<()> {
    for (doc_id, title, content) in DocumentStore::new(conn).dump_all()? {
        println!("{doc_id} {title} {content}");
    }
    Ok(())
}

fn init_tracing(debug: bool) {
    let default = if debug { "falcon=debug" } else { "falcon=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

// Built-in self tests: quick end-to-end checks against an in-memory store,
// runnable from a deployed binary without a test harness.

fn run_self_tests() -> anyhow::Result<()> {
    let checks: [(&str, fn() -> anyhow::Result<()>); 5] = [
        ("bigram tokenizer", check_bigram_tokenizer),
        ("trigram tokenizer", check_trigram_tokenizer),
        ("posting list round trip", check_posting_round_trip),
        ("phrase search", check_phrase_search),
        ("and across words", check_and_semantics),
    ];

    let mut failures = 0;
    for (name, check) in checks {
        match check() {
            Ok(()) => println!("ok     {name}"),
            Err(e) => {
                println!("FAILED {name}: {e}");
                failures += 1;
            }
        }
    }
    if failures > 0 {
        bail!("{failures} self test(s) failed");
    }
    println!("all self tests passed");
    Ok(())
}

fn emitted(tokenizer: &NgramTokenizer, text: &str) -> Vec<(u32, String)> {
    tokenizer
        .tokenize(text, None)
        .into_iter()
        .map(|token| (token.position, token.text))
        .collect()
}

fn pairs(expected: &[(u32, &str)]) -> Vec<(u32, String)> {
    expected.iter().map(|&(p, g)| (p, g.to_string())).collect()
}

fn check_bigram_tokenizer() -> anyhow::Result<()> {
    let tokenizer = NgramTokenizer::new(TokenizerKind::Bigram);
    let tokens = emitted(&tokenizer, "abcd");
    ensure!(
        tokens == pairs(&[(0, "ab"), (1, "bc"), (2, "cd")]),
        "tokenize(abcd) = {tokens:?}"
    );
    let tokens = emitted(&tokenizer, "a cd");
    ensure!(tokens == pairs(&[(2, "cd")]), "tokenize(a cd) = {tokens:?}");
    Ok(())
}

fn check_trigram_tokenizer() -> anyhow::Result<()> {
    let tokenizer = NgramTokenizer::new(TokenizerKind::Trigram);
    let tokens = emitted(&tokenizer, "abcde");
    ensure!(
        tokens == pairs(&[(0, "abc"), (1, "bcd"), (2, "cde")]),
        "tokenize(abcde) = {tokens:?}"
    );
    let tokens = emitted(&tokenizer, "ab def");
    ensure!(tokens == pairs(&[(3, "def")]), "tokenize(ab def) = {tokens:?}");
    Ok(())
}

fn check_posting_round_trip() -> anyhow::Result<()> {
    let mut list = PostingList::new("ab", 1, 0);
    list.add(1, 7);
    list.add(5, 2);
    let restored = PostingList::deserialize(&list.serialize())?;
    ensure!(restored == list, "round trip changed the posting list");
    ensure!(restored.positions_count() == 3, "positions_count mismatch");
    Ok(())
}

fn check_phrase_search() -> anyhow::Result<()> {
    let mut indexer = Indexer::open_in_memory(TokenizerKind::Bigram)?;
    indexer.add("greeting", "Good morning everyone")?;
    indexer.add("intro", "My name is Taro")?;
    let searcher = indexer.into_searcher()?;

    match searcher.search("morning")? {
        SearchOutcome::Found(hits) => {
            ensure!(
                hits.len() == 1 && hits[0].title == "greeting",
                "search(morning) = {hits:?}"
            );
        }
        SearchOutcome::NotFound => bail!("search(morning) found nothing"),
    }
    match searcher.search("evening")? {
        SearchOutcome::Found(hits) => ensure!(hits.is_empty(), "search(evening) = {hits:?}"),
        SearchOutcome::NotFound => {}
    }
    Ok(())
}

fn check_and_semantics() -> anyhow::Result<()> {
    let mut indexer = Indexer::open_in_memory(TokenizerKind::Bigram)?;
    indexer.add("both", "cats and dogs")?;
    indexer.add("cats", "only cats here")?;
    let searcher = indexer.into_searcher()?;

    match searcher.search("dogs cats")? {
        SearchOutcome::Found(hits) => {
            ensure!(
                hits.len() == 1 && hits[0].title == "both",
                "search(dogs cats) = {hits:?}"
            );
        }
        SearchOutcome::NotFound => bail!("search(dogs cats) found nothing"),
    }
    Ok(())
}
