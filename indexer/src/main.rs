use anyhow::{Context, Result};
use cinematch_core::persist::{load_meta, load_matrix, save_artifacts, IndexPaths};
use cinematch_core::vectorizer::{TfidfBuilder, TfidfOptions};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// One movie record. Every text field feeds the description that gets vectorized.
#[derive(Debug, Deserialize)]
struct InputMovie {
    title: String,
    #[serde(default, alias = "body")]
    overview: Option<String>,
    #[serde(default)]
    genres: Vec<String>,
    #[serde(default)]
    keywords: Vec<String>,
    #[serde(default)]
    tags: Option<String>,
}

impl InputMovie {
    fn description(&self) -> String {
        let mut parts: Vec<&str> = Vec::new();
        if let Some(o) = &self.overview { parts.push(o); }
        parts.extend(self.genres.iter().map(String::as_str));
        parts.extend(self.keywords.iter().map(String::as_str));
        if let Some(t) = &self.tags { parts.push(t); }
        parts.join(" ")
    }
}

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Fit TF-IDF over movie descriptions and write recommendation artifacts", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build artifacts from input JSON/JSONL files or a directory
    Build {
        /// Input path (file or directory)
        #[arg(long)]
        input: String,
        /// Output artifact directory
        #[arg(long)]
        output: String,
        /// Use smoothed IDF = ln((1+N)/(1+df)) + 1 instead of ln(N/df)
        #[arg(long, default_value_t = false)]
        smoothed_idf: bool,
        /// Use raw term counts instead of 1 + ln(tf)
        #[arg(long, default_value_t = false)]
        raw_tf: bool,
        /// Drop terms that occur in fewer documents
        #[arg(long, default_value_t = 1)]
        min_df: u32,
        /// Skip L2 row normalization (scores become plain dot products)
        #[arg(long, default_value_t = false)]
        no_normalize: bool,
    },
    /// Print the shape and metadata of an artifact directory
    Inspect {
        #[arg(long, default_value = "./index")]
        index: String,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { input, output, smoothed_idf, raw_tf, min_df, no_normalize } => {
            let opts = TfidfOptions { smoothed_idf, sublinear_tf: !raw_tf, min_df, l2_normalize: !no_normalize };
            build_index(Path::new(&input), &output, opts)
        }
        Commands::Inspect { index } => inspect(&index),
    }
}

fn collect_inputs(input: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = Vec::new();
    if input.is_dir() {
        for entry in WalkDir::new(input).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() && matches!(p.extension().and_then(|s| s.to_str()), Some("json" | "jsonl")) {
                files.push(p.to_path_buf());
            }
        }
    } else if input.is_file() {
        files.push(input.to_path_buf());
    }
    files
}

fn build_index(input: &Path, output: &str, opts: TfidfOptions) -> Result<()> {
    let files = collect_inputs(input);
    if files.is_empty() {
        anyhow::bail!("no .json or .jsonl inputs under {}", input.display());
    }

    let mut builder = TfidfBuilder::new();
    for file in &files {
        let movies = read_movies(file).with_context(|| format!("reading {}", file.display()))?;
        tracing::debug!(file = %file.display(), count = movies.len(), "read movies");
        for m in movies {
            builder.add(&m.title, &m.description());
        }
    }
    tracing::info!(num_docs = builder.num_docs(), num_terms = builder.num_terms(), "ingested movies");

    let created_at = time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_default();
    let artifacts = builder.finish(opts, created_at)?;
    save_artifacts(&IndexPaths::new(output), &artifacts)?;

    tracing::info!(output, "artifact build complete");
    Ok(())
}

fn read_movies(file: &Path) -> Result<Vec<InputMovie>> {
    let reader = BufReader::new(File::open(file)?);
    if file.extension().and_then(|s| s.to_str()) == Some("jsonl") {
        let mut out = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() { continue; }
            out.push(serde_json::from_str(&line)?);
        }
        return Ok(out);
    }
    match serde_json::from_reader(reader)? {
        serde_json::Value::Array(arr) => {
            arr.into_iter().map(|v| serde_json::from_value(v).map_err(Into::into)).collect()
        }
        obj @ serde_json::Value::Object(_) => Ok(vec![serde_json::from_value(obj)?]),
        _ => Ok(Vec::new()),
    }
}

fn inspect(index: &str) -> Result<()> {
    let paths = IndexPaths::new(index);
    let meta = load_meta(&paths)?;
    let space = load_matrix(&paths)?;
    println!("{}", serde_json::to_string_pretty(&meta)?);
    println!(
        "matrix: {} x {}, {} stored entries, unit rows: {}",
        space.row_count(),
        space.column_count(),
        space.nnz(),
        space.is_l2_normalized(1e-4)
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cinematch_core::persist::load_engine;
    use cinematch_core::CollisionPolicy;
    use std::fs;

    #[test]
    fn description_joins_text_fields() {
        let m: InputMovie = serde_json::from_str(
            r#"{"title":"Heat","overview":"a crew of thieves","genres":["Crime","Drama"],"tags":"heist"}"#,
        )
        .unwrap();
        assert_eq!(m.description(), "a crew of thieves Crime Drama heist");
    }

    #[test]
    fn builds_from_mixed_directory() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        fs::write(
            input.path().join("a.json"),
            r#"[{"title":"Alien","overview":"creature hunts a spaceship crew"},
               {"title":"Aliens","overview":"marines fight the creature colony"}]"#,
        )
        .unwrap();
        fs::write(
            input.path().join("b.jsonl"),
            "{\"title\":\"Amelie\",\"body\":\"a shy waitress in paris\"}\n\n",
        )
        .unwrap();
        fs::write(input.path().join("notes.txt"), "ignored").unwrap();

        let out = output.path().to_string_lossy().to_string();
        build_index(input.path(), &out, TfidfOptions::default()).unwrap();

        let engine = load_engine(&IndexPaths::new(&out), CollisionPolicy::Reject).unwrap();
        assert_eq!(engine.documents().len(), 3);
        assert_eq!(engine.recommend("alien", 1).unwrap()[0].title, "Aliens");
    }

    #[test]
    fn empty_input_is_an_error() {
        let input = tempfile::tempdir().unwrap();
        assert!(build_index(input.path(), "unused", TfidfOptions::default()).is_err());
    }
}
