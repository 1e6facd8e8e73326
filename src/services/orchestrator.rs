use std::sync::Arc;

use anyhow::bail;
use tokio::task::JoinSet;

use crate::{
    domain::{
        company::CompanyEntry,
        report::{BatchOutput, BatchSummary, CompanyRecord, SkippedEntry, Status},
    },
    services::pipeline::process_single_company,
    startup::ScrapeContext,
};

// Both caches flush after every sub-batch; an interruption loses at most one
// sub-batch of progress.
pub async fn scrape_companies(
    ctx: Arc<ScrapeContext>,
    entries: &[CompanyEntry],
    start: Option<usize>,
    end: Option<usize>,
) -> anyhow::Result<BatchOutput> {
    let total = entries.len();
    if let Some(start) = start {
        if start < 1 {
            bail!("start must be >= 1, got {}", start);
        }
    }
    if let Some(end) = end {
        if end > total {
            bail!("end must be <= {} (total entries), got {}", total, end);
        }
    }
    if let (Some(start), Some(end)) = (start, end) {
        if start > end {
            bail!("start ({}) must be <= end ({})", start, end);
        }
    }

    // defaulted bounds never fail; an empty or out-of-range slice just runs nothing
    let start = start.unwrap_or(1);
    let end = end.unwrap_or(total);
    let lo = (start - 1).min(total);
    let hi = end.min(total).max(lo);
    let selected = &entries[lo..hi];
    log::info!(
        "Scraping {} of {} entries (range {}-{})",
        selected.len(),
        total,
        start,
        end
    );

    let mut results = Vec::with_capacity(selected.len());
    let mut skipped = Vec::new();
    let mut success_count = 0usize;
    let mut partial_count = 0usize;
    let mut failed_count = 0usize;

    for (chunk_index, chunk) in selected.chunks(ctx.internal_batch_size).enumerate() {
        let chunk_start = start + chunk_index * ctx.internal_batch_size;
        let chunk_end = chunk_start + chunk.len() - 1;
        log::info!(
            "--- Sub-batch {} (entries {}-{}) ---",
            chunk_index + 1,
            chunk_start,
            chunk_end
        );

        let mut records: Vec<Option<CompanyRecord>> = vec![None; chunk.len()];
        let mut tasks = JoinSet::new();
        for (offset, entry) in chunk.iter().enumerate() {
            let ctx = ctx.clone();
            let entry = entry.clone();
            tasks.spawn(async move {
                let _permit = ctx
                    .admission
                    .clone()
                    .acquire_owned()
                    .await
                    .expect("admission semaphore closed");
                // a panic anywhere in the pipeline must still yield a record
                let worker = tokio::spawn({
                    let ctx = ctx.clone();
                    let entry = entry.clone();
                    async move { process_single_company(&ctx, &entry).await }
                });
                let record = match worker.await {
                    Ok(record) => record,
                    Err(e) => {
                        log::error!("Entity task for '{}' panicked: {}", entry.fname, e);
                        aborted_record(&entry, &e.to_string())
                    }
                };
                (offset, record)
            });
        }
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((offset, record)) => records[offset] = Some(record),
                Err(e) => log::error!("Company task aborted: {}", e),
            }
        }
        for (offset, slot) in records.iter_mut().enumerate() {
            if slot.is_none() {
                *slot = Some(aborted_record(&chunk[offset], "task aborted unexpectedly"));
            }
        }

        for record in records.into_iter().flatten() {
            ctx.results_cache.insert(record.id.clone(), record.clone());
            match record.status {
                Status::Skipped => {
                    let reason = record
                        .error
                        .clone()
                        .unwrap_or_else(|| "unknown".to_string());
                    skipped.push(SkippedEntry {
                        id: record.id,
                        fname: record.fname,
                        reason,
                    });
                }
                Status::Success => {
                    success_count += 1;
                    results.push(record);
                }
                Status::Partial => {
                    partial_count += 1;
                    results.push(record);
                }
                Status::Failed => {
                    failed_count += 1;
                    results.push(record);
                }
            }
        }

        ctx.url_cache.flush()?;
        ctx.results_cache.flush()?;
        log::info!(
            "Running totals: {} success, {} partial, {} failed, {} skipped",
            success_count,
            partial_count,
            failed_count,
            skipped.len()
        );
    }

    let summary = BatchSummary {
        total_input: total,
        processed_range: format!("{}-{}", start, end),
        range_count: selected.len(),
        skipped: skipped.len(),
        success: success_count,
        partial: partial_count,
        failed: failed_count,
    };
    Ok(BatchOutput {
        results,
        skipped,
        summary,
    })
}

fn aborted_record(entry: &CompanyEntry, reason: &str) -> CompanyRecord {
    let mut record = CompanyRecord::new(&entry.id, &entry.fname);
    record.error = Some(reason.to_string());
    record
}
