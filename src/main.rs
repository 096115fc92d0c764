use std::error::Error;
use std::time::Duration;

use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use textbook_exchange::catalog::{self, CourseSearchQuery, ListingDraft, SearchField};
use textbook_exchange::config;
use textbook_exchange::network::ApiClient;
use textbook_exchange::notifications::{self, FeedSource};
use textbook_exchange::session::SessionController;
use textbook_exchange::ui::{ChatApp, TerminalView};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

#[derive(Parser)]
#[command(
    name = "textbook_exchange",
    version,
    about = "Client for the campus textbook marketplace"
)]
struct Cli {
    /// Path to JSON config file
    #[arg(long, default_value = config::DEFAULT_CONFIG_PATH, value_name = "FILE")]
    config: String,
    /// Backend base URL, overrides config and environment
    #[arg(long, value_name = "URL")]
    server: Option<String>,
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand)]
enum Mode {
    /// Chat with another user
    Chat {
        /// Your user id
        #[arg(long)]
        user: i64,
        /// The other participant's user id
        #[arg(long)]
        with: i64,
        /// Read messages from stdin instead of opening a window
        #[arg(long)]
        headless: bool,
    },
    /// Print message notifications
    Notifications {
        /// Include messages that were already read
        #[arg(long)]
        all: bool,
    },
    /// Show details for a book listing
    Book {
        #[arg(long)]
        isbn: String,
        /// Course id to show department and professor for
        #[arg(long)]
        course: Option<String>,
    },
    /// Check a listing before it is posted; looks the ISBN up when valid
    Listing {
        #[arg(long, default_value = "")]
        isbn: String,
        #[arg(long, default_value = "")]
        price: String,
        /// 1 (poor) to 5 (new)
        #[arg(long, default_value = "")]
        condition: String,
    },
    /// Course suggestions for one field of the listing form
    Courses {
        /// department, course_id or professor
        #[arg(long)]
        field: SearchField,
        #[arg(long, default_value = "")]
        term: String,
        #[arg(long, default_value = "")]
        department: String,
        #[arg(long, default_value = "")]
        course_id: String,
        #[arg(long, default_value = "")]
        professor: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv().ok();
    // RUST_LOG may come from .env
    env_logger::init();

    let cli = Cli::parse();
    let mut app_config = config::load_config(&cli.config);
    if let Some(server) = cli.server {
        app_config.server_url = server;
    }
    let api = ApiClient::with_timeout(
        &app_config.server_url,
        &app_config.books_api_url,
        Duration::from_secs(app_config.request_timeout_secs.max(1)),
    )?;
    log::info!("Using backend {}", api.base_url());

    match cli.mode {
        Mode::Chat {
            user,
            with,
            headless: true,
        } => run_headless_chat(api, app_config.ws_endpoint(), user, with).await,
        Mode::Chat { user, with, .. } => {
            let poll_interval = Duration::from_secs(app_config.poll_interval_secs.max(1));
            run_chat_window(api, app_config.ws_endpoint(), user, with, poll_interval).await?;
        }
        Mode::Notifications { all } => {
            let source = if all { FeedSource::All } else { FeedSource::Unread };
            let feed = notifications::load_notifications(&api, source).await?;
            println!("{} unread", feed.unread_count);
            for entry in feed.entries {
                let marker = if entry.read { " " } else { "*" };
                println!(
                    "{marker} {} ({}): {}",
                    entry.sender_name, entry.link, entry.message
                );
            }
        }
        Mode::Book { isbn, course } => {
            let book = catalog::lookup_book(&api, &isbn).await?;
            println!("{}", book.title);
            println!("Author(s): {}", book.authors.join(", "));
            println!("Image: {}", book.thumbnail);
            if let Some(course) = course {
                match catalog::course_details(&api, &course).await {
                    Ok(details) => {
                        println!("Department: {}", details.department);
                        println!("Class: {}", details.course_id);
                        println!("Professor: {}", details.professor);
                    }
                    Err(err) => log::warn!("Course {course} unavailable: {err}"),
                }
            }
        }
        Mode::Listing {
            isbn,
            price,
            condition,
        } => {
            let draft = ListingDraft {
                isbn,
                price,
                condition,
            };
            let listing = draft.validate()?;
            let book = catalog::lookup_book(&api, &listing.isbn).await?;
            println!(
                "{} for ${:.2}, condition {}/5",
                book.title, listing.price, listing.condition
            );
        }
        Mode::Courses {
            field,
            term,
            department,
            course_id,
            professor,
        } => {
            let query = CourseSearchQuery {
                department,
                course_id,
                professor,
            };
            log::debug!("Course search template: {}", query.url_for(field));
            for hit in query.search(&api, field, &term).await? {
                println!("{}\t{}\t{}", hit.department, hit.course_id, hit.professor);
            }
        }
    }

    Ok(())
}

async fn run_chat_window(
    api: ApiClient,
    ws_endpoint: String,
    sender_id: i64,
    receiver_id: i64,
    poll_interval: Duration,
) -> Result<(), eframe::Error> {
    // Poller -> UI
    let (feed_tx, feed_rx) = mpsc::channel(4);
    let poller = notifications::spawn_poller(api.clone(), poll_interval, feed_tx);

    let options = eframe::NativeOptions::default();
    let result = eframe::run_native(
        "Textbook Exchange",
        options,
        Box::new(move |cc| {
            log::info!("Opening chat between {sender_id} and {receiver_id}");
            Ok(Box::new(ChatApp::new(
                cc,
                api,
                ws_endpoint,
                sender_id,
                receiver_id,
                feed_rx,
            )))
        }),
    );

    poller.abort();
    result
}

async fn run_headless_chat(api: ApiClient, ws_endpoint: String, sender_id: i64, receiver_id: i64) {
    let mut view = TerminalView::stdout();
    let mut controller =
        SessionController::start(sender_id, receiver_id, &api, &ws_endpoint, &mut view);
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut session_live = true;

    // Once the session has nothing left to receive, input is still read so
    // that sends keep reporting their error.
    loop {
        tokio::select! {
            line = stdin.next_line() => match line {
                Ok(Some(line)) => {
                    view.input = line;
                    controller.submit(&mut view);
                }
                Ok(None) => break,
                Err(err) => {
                    log::warn!("Failed to read stdin: {err}");
                    break;
                }
            },
            more = controller.step(&mut view), if session_live => session_live = more,
        }
    }

    controller.shutdown();
}
