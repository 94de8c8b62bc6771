//! codepair — collaborative code pad in the terminal.
//!
//! Reads stdin line by line (see [`commands`]) and prints status changes,
//! remote updates and suggestions as they arrive. Set `RUST_LOG=debug` for
//! protocol traces.

mod commands;

use std::time::Duration;

use clap::Parser;
use log::{info, warn};
use tokio::io::{AsyncBufReadExt, BufReader};

use codepair_collab::config::DEFAULT_PAGE_URL;
use codepair_collab::{ApplyOutcome, ClientConfig, CollabEditor, EditorEvent};
use commands::{passthrough_text, Command};

#[derive(Parser, Debug)]
#[command(name = "codepair")]
#[command(about = "Edit code together in a shared room", long_about = None)]
struct Args {
    /// Page URL of the server; a `room` query key joins that room on start
    #[arg(short, long, default_value = DEFAULT_PAGE_URL)]
    server: String,

    /// Room to join
    #[arg(short, long)]
    room: Option<String>,

    /// Create a new room and join it
    #[arg(long, conflicts_with = "room")]
    create: bool,

    /// Language tag sent with completion requests
    #[arg(long, default_value = "python")]
    language: String,

    /// Quiet period before a completion is requested
    #[arg(long, default_value_t = 600)]
    debounce_ms: u64,

    /// Prefix for the HTTP endpoints, e.g. /api
    #[arg(long)]
    api_prefix: Option<String>,
}

impl Args {
    fn client_config(&self) -> codepair_collab::Result<ClientConfig> {
        let mut config = ClientConfig::from_page_url(&self.server)?
            .with_language(self.language.clone())
            .with_debounce(Duration::from_millis(self.debounce_ms));
        if let Some(prefix) = &self.api_prefix {
            config = config.with_api_prefix(prefix);
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let mut editor = CollabEditor::with_http(args.client_config()?)?;
    info!("Client id {}", editor.client_id());

    let joined = if let Some(room) = &args.room {
        editor.join_room(room).await.map(|_| true)
    } else if args.create {
        editor.create_room(None).await.map(|_| true)
    } else {
        editor.start().await
    };
    match joined {
        Ok(false) => println!("No room yet. Use :join <id> or :create [name]."),
        Ok(true) => {}
        Err(e) => warn!("{e}"),
    }
    print_status(&editor);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match Command::parse(&line) {
                    Command::Quit => break,
                    command => run(&mut editor, command).await,
                }
            }
            event = editor.next_event() => report(&editor, event),
        }
    }

    editor.disconnect().await;
    Ok(())
}

async fn run(editor: &mut CollabEditor, command: Command) {
    match command {
        Command::Join(room) => {
            if let Err(e) = editor.join_room(&room).await {
                warn!("{e}");
            }
            print_status(editor);
        }
        Command::Create(name) => {
            match editor.create_room(name.as_deref()).await {
                Ok(room) => info!("Created room {room}"),
                Err(e) => warn!("{e}"),
            }
            print_status(editor);
        }
        Command::Key(key) => {
            if !editor.handle_key(key) {
                if let Some(text) = passthrough_text(key) {
                    editor.type_text(text);
                }
            }
        }
        Command::Caret(offset) => editor.set_caret_offset(offset),
        Command::Show => println!("{}", editor.text()),
        Command::Leave => editor.disconnect().await,
        Command::Type(text) => {
            editor.type_text(&text);
        }
        Command::Unknown(line) => println!("Unknown command: {line}"),
        Command::Quit => {}
    }
}

fn report(editor: &CollabEditor, event: EditorEvent) {
    match event {
        EditorEvent::Connected { join_link, .. } => {
            print_status(editor);
            println!("Share: {join_link}");
        }
        EditorEvent::Remote(ApplyOutcome::Applied(_)) => {
            println!("--- remote update ---\n{}", editor.text());
        }
        EditorEvent::ConnectionError { .. } | EditorEvent::Disconnected { .. } => {
            print_status(editor);
        }
        EditorEvent::SuggestionShown(text) => {
            println!("Suggestion: {text:?} (:tab to accept, :esc to dismiss)");
        }
        EditorEvent::SuggestionFailed(reason) => warn!("Suggestion failed: {reason}"),
        other => log::debug!("{other:?}"),
    }
}

fn print_status(editor: &CollabEditor) {
    if !editor.status().is_empty() {
        println!("[{}]", editor.status());
    }
}
