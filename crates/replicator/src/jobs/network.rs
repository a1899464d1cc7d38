//! HTTP endpoint jobs

use std::fmt;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use rand::seq::SliceRandom;
use regex::Regex;

use crate::error::ConfigError;
use crate::job::{Job, JobContext, JobError, Payload};
use crate::stats::DomainCounters;

fn http_url() -> &'static Regex {
    static HTTP_URL: OnceLock<Regex> = OnceLock::new();
    HTTP_URL.get_or_init(|| Regex::new("^https?://").expect("static regex is valid"))
}

/// Split positional URL arguments given comma- or space-separated
pub fn split_url_args<S: AsRef<str>>(args: &[S]) -> Vec<String> {
    args.iter()
        .flat_map(|arg| arg.as_ref().split(','))
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(str::to_string)
        .collect()
}

/// Extract usable URLs from the contents of a URL file
///
/// Blank lines, `#` comments and lines that are not `http(s)://` URLs are
/// skipped.
pub fn parse_url_list(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter(|line| http_url().is_match(line))
        .map(str::to_string)
        .collect()
}

/// Read and filter a URL file
pub fn load_url_file(path: &Path) -> Result<Vec<String>, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::UrlFile {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_url_list(&contents))
}

/// Resolve the target list: a URL file, when given, replaces positional URLs
pub fn resolve_targets<S: AsRef<str>>(
    args: &[S],
    url_file: Option<&Path>,
) -> Result<Vec<String>, ConfigError> {
    let targets = match url_file {
        Some(path) => load_url_file(path)?,
        None => split_url_args(args),
    };

    if targets.is_empty() {
        return Err(ConfigError::EmptyTargets);
    }
    Ok(targets)
}

/// Response to one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub url: String,
    pub status: u16,
}

impl fmt::Display for HttpResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.status, self.url)
    }
}

impl Payload for HttpResponse {
    fn tally(&self, counters: &mut DomainCounters) {
        counters.record_status(self.status);
    }
}

/// Issues one GET per dispatch against a uniformly chosen target
///
/// Any HTTP response counts as a success and lands in the status histogram;
/// only transport failures (refused, DNS, timeout) are errors.
#[derive(Debug, Clone)]
pub struct NetworkJob {
    client: reqwest::Client,
    targets: Vec<String>,
}

impl NetworkJob {
    pub fn new(targets: Vec<String>, timeout: Duration) -> Result<Self, ConfigError> {
        if targets.is_empty() {
            return Err(ConfigError::EmptyTargets);
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self { client, targets })
    }

    pub fn targets(&self) -> &[String] {
        &self.targets
    }
}

#[async_trait]
impl Job for NetworkJob {
    const KIND: &'static str = "network";
    type Input = String;
    type Output = HttpResponse;

    fn next_input(&self) -> Self::Input {
        // Non-empty by construction.
        self.targets
            .choose(&mut rand::thread_rng())
            .cloned()
            .unwrap_or_default()
    }

    async fn execute(&self, _ctx: &JobContext, url: String) -> Result<HttpResponse, JobError> {
        let response = self.client.get(&url).send().await?;
        let status = response.status().as_u16();

        Ok(HttpResponse { url, status })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tokio_util::sync::CancellationToken;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_split_url_args() {
        let args = ["http://a.test,http://b.test", "http://c.test", " , "];
        assert_eq!(
            split_url_args(&args),
            vec!["http://a.test", "http://b.test", "http://c.test"]
        );
    }

    #[test]
    fn test_parse_url_list_filters_lines() {
        let contents = "\
# staging targets
http://one.test/health

  https://two.test/
ftp://three.test/
not a url
#http://commented.test
";
        assert_eq!(
            parse_url_list(contents),
            vec!["http://one.test/health", "https://two.test/"]
        );
    }

    #[test]
    fn test_resolve_targets_prefers_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "http://from-file.test").unwrap();

        let targets = resolve_targets(&["http://from-args.test"], Some(file.path())).unwrap();
        assert_eq!(targets, vec!["http://from-file.test"]);
    }

    #[test]
    fn test_resolve_targets_errors() {
        let empty: [&str; 0] = [];
        assert!(matches!(
            resolve_targets(&empty, None),
            Err(ConfigError::EmptyTargets)
        ));
        assert!(matches!(
            resolve_targets(&empty, Some(Path::new("/nonexistent/urls.txt"))),
            Err(ConfigError::UrlFile { .. })
        ));
    }

    #[test]
    fn test_empty_targets_rejected() {
        assert!(matches!(
            NetworkJob::new(vec![], Duration::from_secs(1)),
            Err(ConfigError::EmptyTargets)
        ));
    }

    #[tokio::test]
    async fn test_status_is_success_payload() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let url = format!("{}/missing", server.uri());
        let job = NetworkJob::new(vec![url.clone()], Duration::from_secs(5)).unwrap();
        let ctx = JobContext::new(1, CancellationToken::new());

        assert_eq!(job.next_input(), url);
        let response = job.execute(&ctx, job.next_input()).await.unwrap();
        assert_eq!(response.status, 404);
    }

    #[tokio::test]
    async fn test_unreachable_is_job_error() {
        let job = NetworkJob::new(
            vec!["http://127.0.0.1:1/".to_string()],
            Duration::from_secs(2),
        )
        .unwrap();
        let ctx = JobContext::new(1, CancellationToken::new());

        let err = job.execute(&ctx, job.next_input()).await.unwrap_err();
        assert!(matches!(err, JobError::Http(_)));
    }
}
