use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::Arc;

use history_store::{store_root, FileStore, KeyValueStore};
use scout_chat::backends::backend_from_config;
use scout_chat::commands::{parse_slash_command, SlashCommand, HELP_TEXT};
use scout_chat::{
    logging, ChatEvent, ChatOrchestrator, CounterService, EnvConfig, Phase, Role, SEND_COUNTER,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::info;

fn main() -> ExitCode {
    let config = EnvConfig::from_env();
    if let Err(error) = logging::init(config.log_filter.as_deref(), config.log_file.as_deref()) {
        eprintln!("scout_chat: failed to open log file: {error}");
    }

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(error) => {
            eprintln!("scout_chat: failed to start runtime: {error}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("scout_chat: {error}");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: EnvConfig) -> io::Result<()> {
    let backend = backend_from_config(&config).map_err(io::Error::other)?;
    let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(store_root(&config.data_dir)));
    let counter = Arc::new(CounterService::load(Arc::clone(&store), SEND_COUNTER).await);

    let orchestrator = ChatOrchestrator::new(backend, store).with_send_counter(Arc::clone(&counter));
    let restored = orchestrator.hydrate().await.map_err(io::Error::other)?;
    info!(
        backend = %orchestrator.backend_profile().backend_id,
        restored,
        "scout_chat started"
    );

    println!(
        "scout_chat ({} backend). {restored} message(s) restored, {} sent so far. /help for commands.",
        orchestrator.backend_profile().backend_id,
        counter.get()
    );

    let mut events = orchestrator.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        prompt()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };

        match parse_slash_command(&line) {
            None => send_and_render(&orchestrator, &mut events, &line).await?,
            Some(SlashCommand::Help) => println!("{HELP_TEXT}"),
            Some(SlashCommand::Strategy(Some(text))) => {
                orchestrator.set_strategy(&text).await;
                println!("strategy updated");
            }
            Some(SlashCommand::Strategy(None)) => {
                let strategy = orchestrator.strategy();
                if strategy.trim().is_empty() {
                    println!("(no strategy set)");
                } else {
                    println!("{strategy}");
                }
            }
            Some(SlashCommand::History) => {
                for message in orchestrator.snapshot().await {
                    println!("[{}] {}", message.role, message.content);
                }
            }
            Some(SlashCommand::Clear) => match orchestrator.clear().await {
                Ok(()) => println!("conversation cleared"),
                Err(error) => eprintln!("error: {error}"),
            },
            Some(SlashCommand::Quit) => break,
            Some(SlashCommand::Unknown(command)) => {
                println!("unknown command {command}\n{HELP_TEXT}");
            }
        }

        // Commands emit events nobody renders.
        while events.try_recv().is_ok() {}
    }

    Ok(())
}

/// Tracks how much of the streaming placeholder has been printed.
#[derive(Default)]
struct StreamView {
    placeholder: Option<String>,
    printed: usize,
}

impl StreamView {
    fn render(&mut self, event: ChatEvent, out: &mut impl Write) -> io::Result<()> {
        match event {
            ChatEvent::MessageAppended(message) if message.role == Role::Assistant => {
                if message.content.is_empty() {
                    self.placeholder = Some(message.id);
                    self.printed = 0;
                } else {
                    writeln!(out, "{}", message.content)?;
                }
            }
            ChatEvent::ContentUpdated { id, content } => {
                if self.placeholder.as_deref() == Some(id.as_str()) {
                    if let Some(fresh) = content.get(self.printed..) {
                        write!(out, "{fresh}")?;
                    }
                    self.printed = content.len();
                }
            }
            ChatEvent::PhaseChanged(Phase::StreamFailed) => {
                if self.printed > 0 {
                    writeln!(out)?;
                }
                writeln!(out, "(stream interrupted, asking again without streaming)")?;
            }
            ChatEvent::PhaseChanged(Phase::StreamOk) => {
                if self.printed > 0 {
                    writeln!(out)?;
                }
            }
            _ => {}
        }
        out.flush()
    }
}

async fn send_and_render(
    orchestrator: &ChatOrchestrator,
    events: &mut UnboundedReceiver<ChatEvent>,
    line: &str,
) -> io::Result<()> {
    let mut view = StreamView::default();
    let mut stdout = io::stdout();

    let send = orchestrator.send(line);
    tokio::pin!(send);

    let result = loop {
        tokio::select! {
            result = &mut send => break result,
            Some(event) = events.recv() => view.render(event, &mut stdout)?,
        }
    };

    while let Ok(event) = events.try_recv() {
        view.render(event, &mut stdout)?;
    }

    if let Err(error) = result {
        eprintln!("error: {error}");
    }

    Ok(())
}

fn prompt() -> io::Result<()> {
    let mut stdout = io::stdout();
    write!(stdout, "> ")?;
    stdout.flush()
}
