use anyhow::{anyhow, Context, Result};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

// Turns a URL into an HTML document
pub trait PageSource {
    fn get(&self, url: &Url) -> Result<String>;
}

pub struct HttpPageSource {
    client: reqwest::blocking::Client,
}

impl HttpPageSource {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client })
    }
}

impl PageSource for HttpPageSource {
    fn get(&self, url: &Url) -> Result<String> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .with_context(|| format!("Request to {} failed", url))?;

        if !response.status().is_success() {
            return Err(anyhow!("{} returned status {}", url, response.status()));
        }

        response
            .text()
            .with_context(|| format!("Failed to read body of {}", url))
    }
}

#[derive(Debug, Clone)]
pub struct Page {
    pub number: u32,
    pub html: String,
}

pub struct Fetcher<S: PageSource> {
    source: S,
    search_url: Url,
    delay: Duration,
}

impl<S: PageSource> Fetcher<S> {
    pub fn new(source: S, search_url: &str, delay: Duration) -> Result<Self> {
        let search_url = Url::parse(search_url)
            .with_context(|| format!("Invalid search URL: {}", search_url))?;
        Ok(Self {
            source,
            search_url,
            delay,
        })
    }

    #[cfg(test)]
    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn page_url(&self, keyword: &str, page: u32) -> Url {
        let mut url = self.search_url.clone();
        url.query_pairs_mut()
            .append_pair("searchword", keyword)
            .append_pair("recruitPage", &page.to_string());
        url
    }

    // Pages 1..=page_count, fetched one at a time as the iterator is advanced
    pub fn fetch(&self, keyword: &str, page_count: u32) -> SearchPages<'_, S> {
        SearchPages {
            fetcher: self,
            keyword: keyword.to_string(),
            next_page: 1,
            page_count,
            failed_pages: Vec::new(),
        }
    }
}

pub struct SearchPages<'a, S: PageSource> {
    fetcher: &'a Fetcher<S>,
    keyword: String,
    next_page: u32,
    page_count: u32,
    failed_pages: Vec<u32>,
}

impl<S: PageSource> SearchPages<'_, S> {
    pub fn failed_pages(&self) -> &[u32] {
        &self.failed_pages
    }
}

impl<S: PageSource> Iterator for SearchPages<'_, S> {
    type Item = Page;

    fn next(&mut self) -> Option<Page> {
        while self.next_page <= self.page_count {
            let number = self.next_page;
            self.next_page += 1;

            // Fixed pause between consecutive requests, whether or not the last one worked
            if number > 1 && !self.fetcher.delay.is_zero() {
                thread::sleep(self.fetcher.delay);
            }

            let url = self.fetcher.page_url(&self.keyword, number);
            debug!(page = number, %url, "requesting search page");

            match self.fetcher.source.get(&url) {
                Ok(html) => {
                    info!(page = number, bytes = html.len(), "fetched search page");
                    return Some(Page { number, html });
                }
                Err(e) => {
                    warn!(page = number, error = %format!("{:#}", e), "failed to fetch search page");
                    self.failed_pages.push(number);
                }
            }
        }
        None
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::sync::mpsc;
    use std::time::Instant;

    // Serves canned HTML per page number; pages without an entry fail.
    #[derive(Default)]
    pub(crate) struct ScriptedSource {
        pub pages: HashMap<u32, String>,
        pub requests: RefCell<Vec<Url>>,
    }

    impl ScriptedSource {
        pub fn with_pages(pages: &[(u32, &str)]) -> Self {
            Self {
                pages: pages.iter().map(|(n, html)| (*n, html.to_string())).collect(),
                requests: RefCell::new(Vec::new()),
            }
        }
    }

    impl PageSource for ScriptedSource {
        fn get(&self, url: &Url) -> Result<String> {
            self.requests.borrow_mut().push(url.clone());
            let page: u32 = url
                .query_pairs()
                .find(|(k, _)| k == "recruitPage")
                .and_then(|(_, v)| v.parse().ok())
                .ok_or_else(|| anyhow!("no page parameter"))?;
            self.pages
                .get(&page)
                .cloned()
                .ok_or_else(|| anyhow!("connection reset"))
        }
    }

    fn fetcher(source: ScriptedSource) -> Fetcher<ScriptedSource> {
        Fetcher::new(source, "https://jobs.example/search", Duration::ZERO).unwrap()
    }

    #[test]
    fn test_page_url_encodes_keyword_and_page() {
        let f = fetcher(ScriptedSource::default());
        let url = f.page_url("백엔드 개발", 3);
        assert!(url.as_str().starts_with("https://jobs.example/search?searchword=%EB%B0%B1"));
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("searchword".to_string(), "백엔드 개발".to_string()),
                ("recruitPage".to_string(), "3".to_string()),
            ]
        );
    }

    #[test]
    fn test_invalid_search_url_is_rejected() {
        assert!(Fetcher::new(ScriptedSource::default(), "not a url", Duration::ZERO).is_err());
    }

    #[test]
    fn test_fetch_zero_pages_issues_no_requests() {
        let f = fetcher(ScriptedSource::with_pages(&[(1, "<html></html>")]));
        assert_eq!(f.fetch("backend", 0).count(), 0);
        assert!(f.source().requests.borrow().is_empty());
    }

    #[test]
    fn test_fetch_skips_failed_pages_and_continues() {
        let f = fetcher(ScriptedSource::with_pages(&[(1, "one"), (3, "three")]));
        let mut pages = f.fetch("backend", 3);
        let docs: Vec<Page> = pages.by_ref().collect();

        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].number, 1);
        assert_eq!(docs[0].html, "one");
        assert_eq!(docs[1].number, 3);
        assert_eq!(pages.failed_pages(), &[2]);
        assert_eq!(f.source().requests.borrow().len(), 3);
    }

    #[test]
    fn test_fetch_requests_pages_in_order() {
        let f = fetcher(ScriptedSource::default());
        assert_eq!(f.fetch("backend", 4).count(), 0);

        let requested: Vec<String> = f
            .source()
            .requests
            .borrow()
            .iter()
            .map(|u| u.query_pairs().find(|(k, _)| k == "recruitPage").unwrap().1.into_owned())
            .collect();
        assert_eq!(requested, vec!["1", "2", "3", "4"]);
    }

    #[test]
    fn test_fetch_is_lazy() {
        let f = fetcher(ScriptedSource::with_pages(&[(1, "a"), (2, "b"), (3, "c")]));
        let first = f.fetch("backend", 3).next().unwrap();
        assert_eq!(first.html, "a");
        assert_eq!(f.source().requests.borrow().len(), 1);
    }

    #[test]
    fn test_fetch_waits_between_requests() {
        let source = ScriptedSource::with_pages(&[(1, "a"), (3, "c")]);
        let f = Fetcher::new(source, "https://jobs.example/search", Duration::from_millis(20)).unwrap();

        let start = Instant::now();
        let fetched = f.fetch("backend", 3).count();
        assert_eq!(fetched, 2);
        assert!(start.elapsed() >= Duration::from_millis(40));
    }

    // Answers `connections` requests: 500 for /fail, 200 with a body otherwise.
    // Sends back the User-Agent header of each request.
    fn serve(connections: usize) -> (Url, mpsc::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = Url::parse(&format!("http://{}/", listener.local_addr().unwrap())).unwrap();
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            for stream in listener.incoming().take(connections) {
                let mut stream = stream.unwrap();
                let mut reader = BufReader::new(stream.try_clone().unwrap());

                let mut request_line = String::new();
                reader.read_line(&mut request_line).unwrap();
                let path = request_line.split_whitespace().nth(1).unwrap_or("/").to_string();

                let mut user_agent = String::new();
                loop {
                    let mut header = String::new();
                    reader.read_line(&mut header).unwrap();
                    let header = header.trim_end();
                    if header.is_empty() {
                        break;
                    }
                    if let Some((name, value)) = header.split_once(':') {
                        if name.eq_ignore_ascii_case("user-agent") {
                            user_agent = value.trim().to_string();
                        }
                    }
                }
                tx.send(user_agent).unwrap();

                let response = if path == "/fail" {
                    "HTTP/1.1 500 Internal Server Error\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
                        .to_string()
                } else {
                    let body = "<html>ok</html>";
                    format!(
                        "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        body.len(),
                        body
                    )
                };
                stream.write_all(response.as_bytes()).unwrap();
                stream.flush().unwrap();
            }
        });

        (base, rx)
    }

    #[test]
    fn test_http_source_rejects_error_status_and_sends_user_agent() {
        let (base, user_agents) = serve(2);
        let source = HttpPageSource::new("jobboard-test-agent", Duration::from_secs(5)).unwrap();

        let err = source.get(&base.join("fail").unwrap()).unwrap_err();
        assert!(err.to_string().contains("500"), "unexpected error: {}", err);

        let body = source.get(&base.join("ok").unwrap()).unwrap();
        assert_eq!(body, "<html>ok</html>");

        let seen: Vec<String> = user_agents.iter().take(2).collect();
        assert_eq!(seen, vec!["jobboard-test-agent", "jobboard-test-agent"]);
    }
}
