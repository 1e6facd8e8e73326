use crate::{
    domain::{
        company::{clean_company_name, junk_name_reason, CompanyEntry},
        report::{CompanyRecord, Status, REASON_COULD_NOT_FETCH_PAGES, REASON_NO_WEBSITE_FOUND},
    },
    services::extractor::extract_all_info,
    startup::ScrapeContext,
};

// Never fails the batch: every outcome, including junk names and dead ends,
// comes back as a record with its status and error reason filled in.
pub async fn process_single_company(ctx: &ScrapeContext, entry: &CompanyEntry) -> CompanyRecord {
    if let Some(existing) = ctx.results_cache.get(&entry.id) {
        log::info!("Results cache hit for '{}' ({})", entry.fname, entry.id);
        return existing;
    }

    let mut record = CompanyRecord::new(&entry.id, &entry.fname);
    let cleaned = clean_company_name(&entry.fname);

    if let Some(reason) = junk_name_reason(&cleaned) {
        log::info!("Skipping '{}': {}", entry.fname, reason);
        record.status = Status::Skipped;
        record.error = Some(reason.to_string());
        return record;
    }

    scrape_contacts(ctx, &cleaned, &mut record).await;
    record
}

async fn scrape_contacts(ctx: &ScrapeContext, company_name: &str, record: &mut CompanyRecord) {
    let resolution = ctx.resolver.resolve(company_name).await;
    if resolution.cached {
        log::debug!("Url cache hit for '{}'", company_name);
    }

    let mut had_official = false;
    if let Some(url) = resolution.record.url.clone() {
        record.website_url = Some(url.clone());
        let pages = ctx.gatherer.gather(&url).await;
        match pages.any() {
            true => {
                record.apply_official(extract_all_info(&pages));
                had_official = true;
            }
            false => {
                record.status = Status::Partial;
                record.error = Some(REASON_COULD_NOT_FETCH_PAGES.to_string());
            }
        }
    }

    let wants_fallback = matches!(record.status, Status::Failed | Status::Partial)
        && record.emails.is_empty()
        && record.phone_numbers.is_empty();
    if wants_fallback {
        let directory_url = match resolution.record.directory_url.clone() {
            Some(url) => Some(url),
            None => ctx.resolver.directory_lookup(company_name).await,
        };
        if let Some(url) = directory_url {
            log::info!("Trying directory listing for '{}': {}", company_name, url);
            // the listing counts as the website even when it turns out unfetchable
            if record.website_url.is_none() {
                record.website_url = Some(url.clone());
            }
            let pages = ctx.gatherer.gather(&url).await;
            if pages.any() {
                record.merge_directory(extract_all_info(&pages), had_official);
            }
        }
    }

    if record.website_url.is_none() {
        record.error = Some(REASON_NO_WEBSITE_FOUND.to_string());
    }
}
