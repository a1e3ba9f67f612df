use anyhow::Result;
use tracing::info;

use crate::config::Config;
use crate::db::Catalog;
use crate::extractor::Extractor;
use crate::fetcher::{Fetcher, HttpPageSource, PageSource};
use crate::merger::{merge, MergeStats};
use crate::models::JobCandidate;

#[derive(Debug, Default, Clone)]
pub struct CrawlReport {
    pub keyword: String,
    pub pages_requested: u32,
    pub pages_fetched: u32,
    pub failed_pages: Vec<u32>,
    pub candidates: usize,
    pub companies_created: usize,
    pub jobs_created: usize,
    pub jobs_skipped: usize,
    pub errors: usize,
}

impl CrawlReport {
    fn record_merge(&mut self, stats: &MergeStats) {
        self.companies_created += stats.companies_created;
        self.jobs_created += stats.jobs_created;
        self.jobs_skipped += stats.jobs_skipped;
        self.errors += stats.errors;
    }
}

// Fetch, extract and merge, one page at a time.
pub struct Crawler<S: PageSource> {
    fetcher: Fetcher<S>,
    extractor: Extractor,
}

impl Crawler<HttpPageSource> {
    pub fn from_config(config: &Config) -> Result<Self> {
        let source = HttpPageSource::new(&config.user_agent, config.request_timeout)?;
        let fetcher = Fetcher::new(source, &config.search_url, config.request_delay)?;
        let extractor = Extractor::new(&config.site_origin)?;
        Ok(Self::new(fetcher, extractor))
    }
}

impl<S: PageSource> Crawler<S> {
    pub fn new(fetcher: Fetcher<S>, extractor: Extractor) -> Self {
        Self { fetcher, extractor }
    }

    // Crawl `pages` result pages for `keyword` and save what is found.
    pub fn run(&self, keyword: &str, pages: u32, catalog: &dyn Catalog) -> CrawlReport {
        self.crawl(keyword, pages, |candidates| merge(catalog, candidates))
    }

    // Crawl without saving; returns every candidate seen.
    pub fn preview(&self, keyword: &str, pages: u32) -> (CrawlReport, Vec<JobCandidate>) {
        let mut seen = Vec::new();
        let report = self.crawl(keyword, pages, |candidates| {
            seen.extend_from_slice(candidates);
            MergeStats::default()
        });
        (report, seen)
    }

    fn crawl(
        &self,
        keyword: &str,
        pages: u32,
        mut sink: impl FnMut(&[JobCandidate]) -> MergeStats,
    ) -> CrawlReport {
        let mut report = CrawlReport {
            keyword: keyword.to_string(),
            pages_requested: pages,
            ..Default::default()
        };

        let mut results = self.fetcher.fetch(keyword, pages);
        for page in results.by_ref() {
            let candidates = self.extractor.extract(&page.html);
            info!(page = page.number, listings = candidates.len(), "crawled page");

            report.pages_fetched += 1;
            report.candidates += candidates.len();
            let stats = sink(&candidates);
            report.record_merge(&stats);
        }
        report.failed_pages = results.failed_pages().to_vec();

        info!(
            keyword,
            fetched = report.pages_fetched,
            failed = report.failed_pages.len(),
            jobs_created = report.jobs_created,
            "crawl finished"
        );
        report
    }
}
