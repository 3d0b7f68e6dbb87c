// Native binary for Disaster Reports - command line front-end

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use disaster_reports::{
    config::{self, Config, ConfigArgs},
    contract::{ReportReader, ReportWriter},
    models::{format_long_date, short_reporter, IndexedReport, Report, SeverityClass},
    notify::{Notifier, Toast, ToastVariant},
    pages::{CreateReportPage, ReportDetailPage, ReportsPage, ReportsView},
    pinning::{self, ImageFile, PinningClient},
    provider::{RpcWalletProvider, WalletProvider},
    router::{self, Route},
    rpc::HttpTransport,
    session::{format_address, WalletSession},
    storage::FileStore,
    submission::{ReportForm, SubmissionFlow},
    verification::{SelfAppConfig, VerificationGate, VerificationResult},
};

#[derive(Parser, Debug)]
#[command(name = "disaster-reports", version, about = "File and browse on-chain disaster reports")]
struct Cli {
    #[command(flatten)]
    config: ConfigArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show configuration and wallet state
    Status,
    /// Connect the wallet (switching or adding the network if needed)
    Connect,
    /// Disconnect the wallet and stop auto-reconnecting
    Disconnect,
    /// Follow wallet account / network changes until interrupted
    Watch,
    /// List all reports, newest first
    List,
    /// Show one report with its images
    Show { index: u64 },
    /// Open a route such as `/reports/3` or `#/reports`
    Open { route: String },
    /// File a new report
    Create(CreateArgs),
    /// Attach an image to one of your reports
    AddImage {
        index: u64,
        /// Image URL to attach
        #[arg(long, conflicts_with = "file", required_unless_present = "file")]
        url: Option<String>,
        /// Local image to pin first
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Remove an image from one of your reports
    DeleteImage { index: u64, image_index: u64 },
    /// Delete one of your reports
    Delete {
        index: u64,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Pin an image and print its gateway URL
    Upload { path: PathBuf },
}

#[derive(clap::Args, Debug)]
struct CreateArgs {
    #[arg(long)]
    reporter_name: Option<String>,
    #[arg(long)]
    email: Option<String>,
    /// One of the known disaster types (free text accepted)
    #[arg(long)]
    disaster_type: Option<String>,
    #[arg(long)]
    img_url: Option<String>,
    #[arg(long)]
    latitude: Option<String>,
    #[arg(long)]
    longitude: Option<String>,
    #[arg(long)]
    city: Option<String>,
    #[arg(long)]
    state: Option<String>,
    /// YYYY-MM-DD, defaults to today
    #[arg(long)]
    date: Option<String>,
    /// Low, Medium, High or Critical
    #[arg(long)]
    severity: Option<String>,
    #[arg(long)]
    impact: Option<String>,
    /// Local image to pin and use as the report image
    #[arg(long, conflicts_with = "img_url")]
    image: Option<PathBuf>,
    /// Result file saved by the verification app after the identity proof
    #[arg(long, env = "VERIFICATION_RESULT")]
    verification_result: Option<PathBuf>,
}

impl CreateArgs {
    fn fill(&self, form: &mut ReportForm) -> Result<()> {
        let fields = [
            ("reporter_name", &self.reporter_name),
            ("email", &self.email),
            ("disaster_type", &self.disaster_type),
            ("img_url", &self.img_url),
            ("latitude", &self.latitude),
            ("longitude", &self.longitude),
            ("city", &self.city),
            ("state", &self.state),
            ("date", &self.date),
            ("severity", &self.severity),
            ("impact", &self.impact),
        ];
        for (name, value) in fields {
            if let Some(v) = value {
                form.set(name, v.as_str())?;
            }
        }
        Ok(())
    }
}

/// Prints toasts to stderr so stdout stays clean for data.
struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, toast: Toast) {
        let marker = match toast.variant {
            ToastVariant::Default => "•",
            ToastVariant::Destructive => "✗",
        };
        eprintln!("{marker} {}: {}", toast.title, toast.description);
    }
}

struct Ctx {
    cfg: Config,
    wallet: Option<Arc<RpcWalletProvider>>,
    notifier: Arc<dyn Notifier>,
    reader: Arc<ReportReader>,
    writer: Arc<ReportWriter>,
}

impl Ctx {
    async fn new(cfg: Config) -> Result<Self> {
        let wallet = RpcWalletProvider::detect(cfg.wallet_rpc_url.clone(), cfg.rpc_timeout_ms).await;
        let provider = wallet.clone().map(|w| w as Arc<dyn WalletProvider>);
        let notifier: Arc<dyn Notifier> = Arc::new(ConsoleNotifier);

        let transport = Arc::new(HttpTransport::new(
            cfg.network.rpc_url.clone(),
            cfg.rpc_timeout_ms,
        ));
        let reader = Arc::new(ReportReader::new(transport, &cfg.contract_address)?);
        let writer = Arc::new(ReportWriter::from_config(provider, &cfg)?);

        Ok(Self {
            cfg,
            wallet,
            notifier,
            reader,
            writer,
        })
    }

    fn provider(&self) -> Option<Arc<dyn WalletProvider>> {
        self.wallet.clone().map(|w| w as Arc<dyn WalletProvider>)
    }

    /// A mounted session (restores an existing authorization).
    async fn session(&self) -> WalletSession {
        let balance_reader = Arc::new(HttpTransport::new(
            self.cfg.network.rpc_url.clone(),
            self.cfg.rpc_timeout_ms,
        ));
        let mut session = WalletSession::new(
            self.provider(),
            balance_reader,
            self.cfg.network.clone(),
            Arc::new(FileStore::new(&self.cfg.state_file)),
            self.notifier.clone(),
        );
        session.mount().await;
        session
    }

    fn pinning(&self) -> PinningClient {
        PinningClient::from_config(&self.cfg)
    }

    async fn pin(&self, path: &std::path::Path) -> Result<String> {
        let file = ImageFile::from_path(path)?;
        match pinning::upload_image(&self.pinning(), &file, self.notifier.as_ref()).await {
            Some(url) => Ok(url),
            None => bail!("Image upload failed"),
        }
    }
}

fn severity_label(report: &Report) -> &'static str {
    match report.severity_class() {
        SeverityClass::Danger => "!!",
        SeverityClass::Warning => "! ",
        SeverityClass::Calm => "  ",
        SeverityClass::Neutral => "? ",
    }
}

fn print_report_line(item: &IndexedReport) {
    let r = &item.report;
    println!(
        "#{:<4} {} {:<18} {:<9} {:<28} {}",
        item.index,
        severity_label(r),
        r.disaster_type,
        r.severity,
        r.location(),
        format_long_date(&r.date)
    );
}

fn print_detail(page: &ReportDetailPage) {
    let Some(r) = page.report() else {
        return;
    };
    println!("Report #{}: {} ({})", page.index(), r.disaster_type, r.severity);
    println!("  Location:  {}", r.location());
    if let Some(url) = r.maps_url() {
        println!("  Map:       {url}");
    }
    println!("  Date:      {}", format_long_date(&r.date));
    println!("  Reporter:  {} <{}>", r.reporter_name, r.email);
    println!("  Address:   {}", short_reporter(&r.reporter));
    if !r.img_url.is_empty() {
        println!("  Image:     {}", r.img_url);
    }
    if !r.impact.is_empty() {
        println!("  Impact:    {}", r.impact);
    }
    if page.images().is_empty() {
        println!("  No additional images");
    } else {
        println!("  Images ({}):", page.images().len());
        for (i, img) in page.images().iter().enumerate() {
            println!(
                "    [{i}] {} (added {} by {})",
                img.image_url,
                format_long_date(&img.timestamp),
                format_address(&img.reporter)
            );
        }
    }
    if page.is_owner() {
        println!("  You own this report");
    }
}

fn confirm(prompt: &str) -> bool {
    eprint!("{prompt} [y/N] ");
    let _ = io::stderr().flush();
    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line).is_err() {
        return false;
    }
    matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

async fn list(ctx: &Ctx) -> Result<()> {
    let mut page = ReportsPage::new(ctx.reader.clone(), ctx.notifier.clone());
    match page.load().await {
        ReportsView::Loaded(reports) => reports.iter().for_each(print_report_line),
        ReportsView::Empty => println!("No reports yet. Be the first: disaster-reports create"),
        ReportsView::Error(msg) => bail!("{msg}"),
        ReportsView::Loading => {}
    }
    Ok(())
}

async fn detail_page(ctx: &Ctx, index: u64, account: Option<&str>) -> Result<ReportDetailPage> {
    let mut page = ReportDetailPage::new(
        ctx.reader.clone(),
        ctx.writer.clone(),
        ctx.notifier.clone(),
        index,
    );
    if let Some(next) = page.load().await {
        bail!("Report #{index} not found (see {next})");
    }
    page.set_account(account);
    Ok(page)
}

fn require_owner(page: &ReportDetailPage) -> Result<()> {
    if !page.is_owner() {
        bail!("Only the reporter of #{} can change it", page.index());
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let cfg = config::resolve(cli.config).context("Failed to load configuration")?;
    let ctx = Ctx::new(cfg).await?;

    match cli.command {
        Command::Status => {
            for line in ctx.cfg.summary_lines() {
                println!("{line}");
            }
            let session = ctx.session().await;
            let state = session.state();
            if state.is_connected {
                println!("Wallet: {}", format_address(&state.account));
                println!("Network: {}", state.current_network);
                println!("Balance: {} {}", state.balance, ctx.cfg.network.ticker);
            } else if ctx.wallet.is_some() {
                println!("Wallet: not connected");
            } else {
                println!("Wallet: not found at {}", ctx.cfg.wallet_rpc_url);
            }
        }
        Command::Connect => {
            let mut session = ctx.session().await;
            if !session.connect().await.is_connected() {
                bail!("Wallet connection failed");
            }
            let state = session.state();
            println!(
                "{} on {} ({} {})",
                format_address(&state.account),
                state.current_network,
                state.balance,
                ctx.cfg.network.ticker
            );
        }
        Command::Disconnect => {
            let mut session = ctx.session().await;
            session.disconnect().await;
        }
        Command::Watch => {
            let Some(wallet) = ctx.wallet.clone() else {
                bail!("No wallet provider available");
            };
            let poller = wallet.start_event_poller(ctx.cfg.event_poll_ms);
            let mut session = ctx.session().await;
            println!("Watching wallet events (Ctrl-C to stop)");
            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => break,
                    event = session.next_event() => {
                        let Some(event) = event else { break };
                        let state = session.state();
                        println!(
                            "{event:?} -> account={} network={} balance={}",
                            if state.account.is_empty() { "-".to_string() } else { format_address(&state.account) },
                            state.current_network,
                            state.balance
                        );
                    }
                }
            }
            session.unmount();
            poller.abort();
        }
        Command::List => list(&ctx).await?,
        Command::Show { index } => {
            let session = ctx.session().await;
            let page = detail_page(&ctx, index, session.account()).await?;
            print_detail(&page);
        }
        Command::Open { route } => match router::parse(&route) {
            Some(Route::Landing) => {
                println!("Disaster Reports on {}", ctx.cfg.network.name);
                println!("  list     browse reports");
                println!("  create   file a report");
            }
            Some(Route::Reports) => list(&ctx).await?,
            Some(Route::ReportDetail { index }) => {
                let session = ctx.session().await;
                let page = detail_page(&ctx, index, session.account()).await?;
                print_detail(&page);
            }
            Some(Route::CreateReport) => {
                println!("Fill the form with: disaster-reports create --help");
                println!("Required: reporter_name, email, disaster_type, city, state, severity");
            }
            None => bail!("Unknown route '{route}'"),
        },
        Command::Create(args) => {
            let session = ctx.session().await;
            let account = session.account().map(str::to_string);

            let gate = VerificationGate::new(ctx.cfg.require_verification);
            let flow = SubmissionFlow::new(
                ReportWriter::from_config(ctx.provider(), &ctx.cfg)?,
                ctx.notifier.clone(),
                gate,
            );
            let mut page = CreateReportPage::new(flow);
            args.fill(page.flow_mut().form_mut())?;
            if let Some(path) = &args.image {
                let url = ctx.pin(path).await?;
                page.flow_mut().form_mut().set("img_url", url)?;
            }

            page.flow_mut().sync_connection(account.as_deref());
            if ctx.cfg.require_verification {
                if let Some(account) = &account {
                    let app = SelfAppConfig::new(&ctx.cfg.network, &ctx.cfg.contract_address, account);
                    log::info!("🪪 Verification request: {}", serde_json::to_string(&app)?);
                }
                if let (Some(path), Some(account)) = (&args.verification_result, &account) {
                    let raw = std::fs::read_to_string(path)
                        .with_context(|| format!("Failed to read {}", path.display()))?;
                    let event = VerificationResult::from_json(&raw)?.into_event(account);
                    page.flow_mut().on_verification(&event);
                }
            }

            match page.submit(account.as_deref()).await {
                Some(next) => println!("Report filed. Next: {next}"),
                None => bail!("Report was not filed"),
            }
        }
        Command::AddImage { index, url, file } => {
            let session = ctx.session().await;
            let mut page = detail_page(&ctx, index, session.account()).await?;
            require_owner(&page)?;
            let url = match (url, file) {
                (Some(url), _) => url,
                (None, Some(path)) => ctx.pin(&path).await?,
                (None, None) => bail!("Pass --url or --file"),
            };
            page.set_new_image_url(url);
            if !page.add_image().await {
                bail!("Image was not added");
            }
            print_detail(&page);
        }
        Command::DeleteImage { index, image_index } => {
            let session = ctx.session().await;
            let mut page = detail_page(&ctx, index, session.account()).await?;
            require_owner(&page)?;
            if image_index >= page.images().len() as u64 {
                bail!("Report #{index} has no image [{image_index}]");
            }
            if !page.delete_image(image_index).await {
                bail!("Image was not deleted");
            }
            print_detail(&page);
        }
        Command::Delete { index, yes } => {
            let session = ctx.session().await;
            let mut page = detail_page(&ctx, index, session.account()).await?;
            require_owner(&page)?;
            match page.delete_report(|prompt| yes || confirm(prompt)).await {
                Some(next) => println!("Deleted. Next: {next}"),
                None => println!("Report kept"),
            }
        }
        Command::Upload { path } => {
            let url = ctx.pin(&path).await?;
            println!("{url}");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (safe to ignore if not found)
    let _ = dotenvy::dotenv();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    run(Cli::parse()).await
}
