//! RFP commands: ingest, requirement extraction, retrieval and packaging

use super::{parse_filters, spinner};
use crate::config::Config;
use crate::producer;
use crate::rag::{Metadata, RagClient, Record};
use crate::requirements::{self, Obligation, Requirement};
use crate::rfp;
use anyhow::{Context, Result};
use colored::Colorize;
use serde_json::Value;
use std::fs;
use std::path::Path;

pub fn ingest_command(path: &Path, json: bool) -> Result<()> {
    let doc = rfp::ingest(path)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&doc)?);
        return Ok(());
    }

    println!("{} ({} pages)", path.display(), doc.page_count());
    for (page, chars) in &doc.page_map {
        println!("  page {:>3}: {} chars", page, chars);
    }
    Ok(())
}

pub fn extract_command(path: &Path, json: bool, matrix: Option<&Path>) -> Result<()> {
    let doc = rfp::ingest(path)?;
    let reqs = requirements::extract(&doc.instructions);

    if let Some(matrix_path) = matrix {
        fs::write(matrix_path, requirements::compliance_matrix_csv(&reqs))
            .with_context(|| format!("Failed to write {}", matrix_path.display()))?;
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&reqs)?);
    } else {
        print_requirements(&reqs);
        if let Some(matrix_path) = matrix {
            println!("\n{} Compliance matrix written to {}", "✓".green(), matrix_path.display());
        }
    }
    Ok(())
}

fn print_requirements(reqs: &[Requirement]) {
    if reqs.is_empty() {
        println!("No obligations found.");
        return;
    }

    let must = reqs
        .iter()
        .filter(|r| r.must_or_should == Obligation::Must)
        .count();
    println!(
        "Requirements ({}: {} must, {} should)",
        reqs.len(),
        must,
        reqs.len() - must
    );
    for req in reqs {
        let tag = match req.must_or_should {
            Obligation::Must => "must".red().bold(),
            Obligation::Should => "should".yellow(),
        };
        let section = req.section.as_deref().unwrap_or("-");
        println!();
        println!("  {} [{}] {}", req.req_id.bold(), tag, section.dimmed());
        println!("    {}", req.verbatim);
    }
}

/// Extract requirements, then pull similar passages for each from the index
pub async fn similar_command(
    config: &Config,
    path: &Path,
    top_k: Option<usize>,
    filters: &[String],
    json: bool,
) -> Result<()> {
    let doc = rfp::ingest(path)?;
    let reqs = requirements::extract(&doc.instructions);
    let filter: Metadata = parse_filters(filters)?
        .into_iter()
        .map(|(k, v)| (k, Value::String(v)))
        .collect();
    let k = top_k.unwrap_or(config.rag.top_k);

    let pb = spinner("Connecting to vector index...");
    let client = RagClient::from_config(config)
        .await
        .context("Failed to set up retrieval")?;

    let mut report = Vec::with_capacity(reqs.len());
    for (i, req) in reqs.iter().enumerate() {
        pb.set_message(format!("Searching {}/{}: {}", i + 1, reqs.len(), req.req_id));
        let passages = client.search(&req.verbatim, &filter, k).await?;
        report.push((req, passages));
    }
    pb.finish_and_clear();

    if json {
        let value: Vec<Value> = report
            .iter()
            .map(|(req, passages)| {
                serde_json::json!({ "requirement": req, "similar": passages })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    for (req, passages) in &report {
        println!("{} {}", req.req_id.bold(), req.verbatim);
        if passages.is_empty() {
            println!("    {}", "no similar passages".dimmed());
        }
        for p in passages {
            println!("    {:.3}  {}  {}", p.score, p.title, p.source_url.dimmed());
            println!("           {}", p.verbatim);
        }
        println!();
    }
    Ok(())
}

/// Embed and upsert records from a JSON array file
pub async fn index_command(config: &Config, path: &Path) -> Result<()> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let records: Vec<Record> = serde_json::from_str(&contents)
        .with_context(|| format!("{} is not a JSON array of records", path.display()))?;

    let pb = spinner(&format!("Indexing {} records...", records.len()));
    let client = RagClient::from_config(config)
        .await
        .context("Failed to set up retrieval")?;
    let count = client.upsert(&records).await?;
    pb.finish_with_message(format!("Upserted {} vectors into {}", count, config.rag.index));
    Ok(())
}

pub fn package_command(
    path: &Path,
    out_dir: &Path,
    sections: &[String],
    annexes: &[String],
) -> Result<()> {
    let doc = rfp::ingest(path)?;
    let reqs = requirements::extract(&doc.instructions);
    let result = producer::package(out_dir, sections, &reqs, annexes)?;

    println!("{} Packaged {} requirements", "✓".green(), reqs.len());
    println!("  {}", result.bundle.display());
    println!("  {}", result.matrix.display());
    Ok(())
}
