use anyhow::{anyhow, Context, Result};
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};
use url::Url;

use crate::models::{ConditionFields, JobCandidate};

// Structure of the search-result markup
const ITEM: &str = ".item_recruit";
const COMPANY: &str = ".corp_name a";
const TITLE: &str = ".job_tit a";
const CONDITIONS: &str = ".job_condition span";
const DEADLINE: &str = ".job_date .date";
const SECTOR: &str = ".job_sector";
const SALARY: &str = ".area_badge .badge";

// Turns a search-result page into job candidates.
pub struct Extractor {
    origin: Url,
    item: Selector,
    company: Selector,
    title: Selector,
    conditions: Selector,
    deadline: Selector,
    sector: Selector,
    salary: Selector,
}

impl Extractor {
    pub fn new(site_origin: &str) -> Result<Self> {
        let origin = Url::parse(site_origin)
            .with_context(|| format!("Invalid site origin: {}", site_origin))?;
        Ok(Self {
            origin,
            item: selector(ITEM)?,
            company: selector(COMPANY)?,
            title: selector(TITLE)?,
            conditions: selector(CONDITIONS)?,
            deadline: selector(DEADLINE)?,
            sector: selector(SECTOR)?,
            salary: selector(SALARY)?,
        })
    }

    // Every well-formed listing on the page, in document order. Malformed
    // listings are logged and left out; they never fail the whole page.
    pub fn extract(&self, html: &str) -> Vec<JobCandidate> {
        let document = Html::parse_document(html);
        let mut candidates = Vec::new();

        for (index, item) in document.select(&self.item).enumerate() {
            match self.extract_item(item) {
                Ok(candidate) => candidates.push(candidate),
                Err(e) => {
                    warn!(item = index, error = %format!("{:#}", e), "skipping malformed listing");
                }
            }
        }

        debug!(count = candidates.len(), "extracted listings");
        candidates
    }

    fn extract_item(&self, item: ElementRef) -> Result<JobCandidate> {
        let title_link = item
            .select(&self.title)
            .next()
            .ok_or_else(|| anyhow!("listing has no title link"))?;
        let href = title_link
            .value()
            .attr("href")
            .ok_or_else(|| anyhow!("title link has no href"))?;
        let link = self.resolve_link(href)?;

        let spans: Vec<String> = item
            .select(&self.conditions)
            .map(|span| trimmed(span.text()))
            .collect();
        let conditions = ConditionFields::from_positional(&spans);

        Ok(JobCandidate {
            company_name: self.text_of(item, &self.company),
            title: trimmed(title_link.text()),
            link: link.to_string(),
            location: conditions.location,
            experience: conditions.experience,
            education: conditions.education,
            employment_type: conditions.employment_type,
            deadline: self.text_of(item, &self.deadline),
            // Several anchors separated by source-formatting newlines
            sector: collapsed(item.select(&self.sector).flat_map(|el| el.text())),
            salary: self.text_of(item, &self.salary),
        })
    }

    // Text of all matches under `item`, concatenated; empty if none match.
    fn text_of(&self, item: ElementRef, selector: &Selector) -> String {
        trimmed(item.select(selector).flat_map(|el| el.text()))
    }

    // Listing links must stay on the site: same host, http(s) only.
    fn resolve_link(&self, href: &str) -> Result<Url> {
        let href = href.trim();
        if href.is_empty() || href.starts_with('#') {
            return Err(anyhow!("title link has no target: {:?}", href));
        }
        let link = self
            .origin
            .join(href)
            .with_context(|| format!("Bad listing href: {}", href))?;
        if !matches!(link.scheme(), "http" | "https") {
            return Err(anyhow!("listing href is not a web link: {}", href));
        }
        if link.host_str() != self.origin.host_str() {
            return Err(anyhow!("listing href leaves {}: {}", self.origin, href));
        }
        Ok(link)
    }
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("Invalid selector {}: {:?}", css, e))
}

fn trimmed<'a>(text: impl Iterator<Item = &'a str>) -> String {
    text.collect::<String>().trim().to_string()
}

fn collapsed<'a>(text: impl Iterator<Item = &'a str>) -> String {
    let joined: String = text.collect();
    joined.split_whitespace().collect::<Vec<_>>().join(" ")
}
