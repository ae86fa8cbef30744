use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use clap::Parser;
use parking_lot::Mutex;
use reqwest::blocking::Client;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use scoped_scraper::{
    format_bytes, format_duration, CanonicalUrl, Error, FetchResponse, FilterConfig, Frontier,
    LinkScraper, PageLog, Report, StatsAggregator, TrapFilter,
};

#[derive(Debug)]
struct CrawlCommand {
    url: CanonicalUrl,
}

#[derive(Debug)]
struct FoundUrls {
    url: CanonicalUrl,
    links: Vec<CanonicalUrl>,
}

#[derive(Parser, Debug)]
#[command(name = "scoped-scraper")]
#[command(about = "Crawl a fixed set of domains, avoid crawler traps and report word statistics")]
#[command(version)]
struct Args {
    /// URLs to start crawling from
    #[arg(
        long = "seed",
        env = "SCRAPER_SEEDS",
        value_delimiter = ',',
        default_values = [
            "https://www.ics.uci.edu",
            "https://www.cs.uci.edu",
            "https://www.informatics.uci.edu",
            "https://www.stat.uci.edu",
        ]
    )]
    seeds: Vec<String>,

    /// Number of fetch workers
    #[arg(long, env = "SCRAPER_THREADS", default_value_t = 8)]
    threads: u32,

    /// Pause each worker takes after every fetch, in milliseconds
    #[arg(long, env = "SCRAPER_DELAY_MS", default_value_t = 500)]
    delay_ms: u64,

    /// Stop queueing new pages after this many
    #[arg(long, env = "SCRAPER_MAX_PAGES")]
    max_pages: Option<usize>,

    /// Per-request timeout, in seconds
    #[arg(long, env = "SCRAPER_TIMEOUT_SECS", default_value_t = 10)]
    timeout_secs: u64,

    #[arg(long, env = "SCRAPER_USER_AGENT", default_value = "scoped-scraper/0.1")]
    user_agent: String,

    /// JSON file overriding the trap filter settings
    #[arg(long, env = "SCRAPER_FILTER_CONFIG")]
    filter_config: Option<PathBuf>,

    /// Where to write the final text report
    #[arg(long, env = "SCRAPER_REPORT", default_value = "report.txt")]
    report: PathBuf,

    /// Also write the report as JSON
    #[arg(long, env = "SCRAPER_REPORT_JSON")]
    report_json: Option<PathBuf>,

    /// Append every parsed page and its word frequencies to this file
    #[arg(long, env = "SCRAPER_PAGE_LOG")]
    page_log: Option<PathBuf>,
}

fn fetch(client: &Client, url: &CanonicalUrl) -> Result<FetchResponse, Error> {
    // Retry logic for 5xx errors with exponential backoff
    let mut attempts = 0;
    let max_retries = 3;

    loop {
        let response = client.get(url.as_str()).send()?;
        let status = response.status();
        if status.is_server_error() && attempts < max_retries {
            attempts += 1;
            let delay = Duration::from_millis(100 * (2_u64.pow(attempts - 1)));
            warn!(%url, %status, ?delay, attempt = attempts, "server error, retrying");
            thread::sleep(delay);
            continue;
        }

        let final_url = response.url().to_string();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let error = (!status.is_success()).then(|| status.to_string());
        let body = response.bytes()?.to_vec();

        return Ok(FetchResponse {
            requested_url: url.to_string(),
            final_url,
            status: status.as_u16(),
            error,
            body: Some(body),
            headers,
        });
    }
}

fn visit_page(
    client: &Client,
    scraper: &LinkScraper,
    command: &CrawlCommand,
    total_bytes: &AtomicUsize,
) -> Vec<CanonicalUrl> {
    let response = match fetch(client, &command.url) {
        Ok(response) => response,
        Err(err) => {
            warn!(url = %command.url, error = %err, "fetch failed");
            return scraper.scrape(command.url.as_str(), None);
        }
    };

    let size = response.body.as_ref().map_or(0, Vec::len);
    total_bytes.fetch_add(size, Ordering::Relaxed);
    info!(
        url = %command.url,
        status = response.status,
        size = %format_bytes(size),
        "fetched"
    );

    scraper.scrape(command.url.as_str(), Some(&response))
}

fn spawn_crawler_threads(
    command_receiver: mpsc::Receiver<CrawlCommand>,
    result_sender: mpsc::Sender<FoundUrls>,
    thread_count: u32,
    client: Client,
    scraper: Arc<LinkScraper>,
    delay: Duration,
    shutdown_flag: Arc<AtomicBool>,
    total_bytes: Arc<AtomicUsize>,
) -> Vec<JoinHandle<()>> {
    let command_receiver = Arc::new(Mutex::new(command_receiver));

    (0..thread_count)
        .map(|_| {
            let result_sender = result_sender.clone();
            let command_receiver = command_receiver.clone();
            let client = client.clone();
            let scraper = scraper.clone();
            let shutdown_flag = shutdown_flag.clone();
            let total_bytes = total_bytes.clone();
            thread::spawn(move || loop {
                if shutdown_flag.load(Ordering::Relaxed) {
                    break;
                }

                let command_result = command_receiver
                    .lock()
                    .recv_timeout(Duration::from_millis(100));
                let crawl_command = match command_result {
                    Ok(command) => command,
                    Err(mpsc::RecvTimeoutError::Timeout) => continue,
                    Err(mpsc::RecvTimeoutError::Disconnected) => break,
                };

                let links = visit_page(&client, &scraper, &crawl_command, &total_bytes);
                if result_sender
                    .send(FoundUrls {
                        url: crawl_command.url,
                        links,
                    })
                    .is_err()
                {
                    break;
                }
                thread::sleep(delay);
            })
        })
        .collect()
}

fn control_crawl(
    seeds: Vec<CanonicalUrl>,
    frontier: &mut Frontier,
    command_sender: mpsc::Sender<CrawlCommand>,
    result_receiver: mpsc::Receiver<FoundUrls>,
    shutdown_flag: &AtomicBool,
) {
    let mut pending_urls = 0;
    for url in seeds {
        if frontier.mark_queued(&url) && command_sender.send(CrawlCommand { url }).is_ok() {
            pending_urls += 1;
        }
    }

    while pending_urls > 0 {
        if shutdown_flag.load(Ordering::Relaxed) {
            info!("shutdown requested, finishing current requests");
            break;
        }

        let found_urls = match result_receiver.recv_timeout(Duration::from_millis(100)) {
            Ok(found_urls) => found_urls,
            Err(mpsc::RecvTimeoutError::Timeout) => continue,
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        };
        pending_urls -= 1;

        let mut queued = 0;
        for url in found_urls.links {
            if frontier.mark_queued(&url) && command_sender.send(CrawlCommand { url }).is_ok() {
                pending_urls += 1;
                queued += 1;
            }
        }
        info!(
            url = %found_urls.url,
            queued,
            pending = pending_urls,
            total = frontier.queued_count(),
            "processed page"
        );
    }
}

fn parse_seeds(seeds: &[String]) -> Vec<CanonicalUrl> {
    seeds
        .iter()
        .filter_map(|seed| match CanonicalUrl::parse(seed) {
            Ok(url) => Some(url),
            Err(err) => {
                warn!(%seed, error = %err, "ignored invalid seed");
                None
            }
        })
        .collect()
}

fn run(args: Args) -> Result<(), Error> {
    let start_time = Instant::now();

    let filter_config = match &args.filter_config {
        Some(path) => FilterConfig::from_json_file(path)?,
        None => FilterConfig::default(),
    };
    let stats = Arc::new(StatsAggregator::new());
    let mut scraper = LinkScraper::new(TrapFilter::new(filter_config), stats.clone());
    if let Some(path) = &args.page_log {
        scraper = scraper.with_page_log(PageLog::open(path)?);
    }
    let client = Client::builder()
        .user_agent(args.user_agent.clone())
        .timeout(Duration::from_secs(args.timeout_secs))
        .build()?;

    // Set up shutdown flag for graceful interruption handling
    let shutdown_flag = Arc::new(AtomicBool::new(false));
    let handler_flag = shutdown_flag.clone();
    if let Err(err) = ctrlc::set_handler(move || {
        info!("received interrupt signal, stopping crawl");
        handler_flag.store(true, Ordering::Relaxed);
    }) {
        warn!(error = %err, "could not install Ctrl+C handler");
    }

    let (result_sender, result_receiver) = mpsc::channel::<FoundUrls>();
    let (command_sender, command_receiver) = mpsc::channel::<CrawlCommand>();
    let total_bytes = Arc::new(AtomicUsize::new(0));
    let workers = spawn_crawler_threads(
        command_receiver,
        result_sender,
        args.threads.max(1),
        client,
        Arc::new(scraper),
        Duration::from_millis(args.delay_ms),
        shutdown_flag.clone(),
        total_bytes.clone(),
    );

    let mut frontier = Frontier::new(args.max_pages);
    control_crawl(
        parse_seeds(&args.seeds),
        &mut frontier,
        command_sender,
        result_receiver,
        &shutdown_flag,
    );

    // Statistics are only read once every worker is gone.
    shutdown_flag.store(true, Ordering::Relaxed);
    for worker in workers {
        if worker.join().is_err() {
            error!("crawler thread panicked");
        }
    }

    let report = Report::from_statistics(&stats.snapshot());
    report.write_text(&args.report)?;
    if let Some(path) = &args.report_json {
        report.write_json(path)?;
    }

    let downloaded = total_bytes.load(Ordering::Relaxed);
    info!(
        pages = report.unique_pages,
        queued = frontier.queued_count(),
        downloaded = %format_bytes(downloaded),
        report = %args.report.display(),
        "crawl took {}",
        format_duration(start_time.elapsed().as_secs())
    );
    println!("{}", report);
    Ok(())
}

fn main() {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(err) = run(args) {
        error!(error = %err, "crawl failed");
        std::process::exit(1);
    }
}
