//! Console stand-in for the proxy network.
//!
//! Lines typed on stdin are treated as proxy chat (`[server] player: text`)
//! or as operator commands; messages arriving from Discord are printed.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

use crate::common::messages::{ChatEvent, RichContent};
use crate::config::store::ConfigStore;
use crate::relay::adapter::ProxySideAdapter;
use crate::relay::controller::RelayController;
use crate::relay::formatter::{FormatContext, MessageFormatter};

const USAGE: &str = "Commands: [server] player: text | /online N | /topic TEXT | /private TEXT | \
                     /announce TITLE | BODY | /tick | /presence | /status | /reload | /quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Chat {
        server: Option<String>,
        player: String,
        text: String,
    },
    Online(usize),
    Topic(String),
    Private(String),
    Announce {
        title: String,
        body: String,
    },
    Tick,
    Presence,
    Status,
    Reload,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty line")]
    Empty,

    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("usage: {0}")]
    Usage(&'static str),
}

/// Parse one console line.
pub fn parse_line(line: &str) -> Result<ConsoleCommand, ParseError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(ParseError::Empty);
    }

    if let Some(command) = line.strip_prefix('/') {
        let (name, args) = command
            .split_once(char::is_whitespace)
            .map_or((command, ""), |(name, args)| (name, args.trim()));

        return match name.to_ascii_lowercase().as_str() {
            "online" => args
                .parse()
                .map(ConsoleCommand::Online)
                .map_err(|_| ParseError::Usage("/online N")),
            "topic" if !args.is_empty() => Ok(ConsoleCommand::Topic(args.to_string())),
            "topic" => Err(ParseError::Usage("/topic TEXT")),
            "private" if !args.is_empty() => Ok(ConsoleCommand::Private(args.to_string())),
            "private" => Err(ParseError::Usage("/private TEXT")),
            "announce" => match args.split_once('|') {
                Some((title, body)) if !title.trim().is_empty() => Ok(ConsoleCommand::Announce {
                    title: title.trim().to_string(),
                    body: body.trim().to_string(),
                }),
                _ => Err(ParseError::Usage("/announce TITLE | BODY")),
            },
            "tick" => Ok(ConsoleCommand::Tick),
            "presence" => Ok(ConsoleCommand::Presence),
            "status" => Ok(ConsoleCommand::Status),
            "reload" => Ok(ConsoleCommand::Reload),
            "quit" | "exit" => Ok(ConsoleCommand::Quit),
            _ => Err(ParseError::UnknownCommand(name.to_string())),
        };
    }

    let (server, rest) = match line.strip_prefix('[').and_then(|rest| rest.split_once(']')) {
        Some((server, rest)) => (Some(server.trim().to_string()), rest.trim_start()),
        None => (None, line),
    };

    match rest.split_once(':') {
        Some((player, text)) if !player.trim().is_empty() && !player.contains(char::is_whitespace) => {
            Ok(ConsoleCommand::Chat {
                server,
                player: player.trim().to_string(),
                text: text.trim().to_string(),
            })
        }
        _ => Err(ParseError::Usage("[server] player: text")),
    }
}

/// Proxy side backed by the terminal.
pub struct ConsoleProxy {
    config: ConfigStore,
    online: AtomicUsize,
    max_players: usize,
}

impl ConsoleProxy {
    pub fn new(config: ConfigStore, max_players: usize) -> Self {
        Self {
            config,
            online: AtomicUsize::new(0),
            max_players,
        }
    }

    pub fn set_online(&self, online: usize) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// How a Discord message is shown to players.
    pub fn render(&self, event: &ChatEvent) -> String {
        let template = self.config.current().messages.discord_to_proxy.clone();
        let ctx = FormatContext::new(event.sender_display_name(), event.raw_text())
            .with_counts(self.online_player_count(), self.max_player_count());
        MessageFormatter::new(template).format(&ctx)
    }
}

impl ProxySideAdapter for ConsoleProxy {
    fn online_player_count(&self) -> usize {
        self.online.load(Ordering::SeqCst)
    }

    fn max_player_count(&self) -> usize {
        self.max_players
    }

    fn dispatch_to_proxy_network(&self, event: ChatEvent) {
        println!("{}", self.render(&event));
    }
}

/// Read commands from stdin until `/quit` or end of input.
pub async fn run_console(
    controller: Arc<RelayController>,
    proxy: Arc<ConsoleProxy>,
    store: ConfigStore,
    config_path: PathBuf,
) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    info!("{}", USAGE);

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                error!("Failed to read from stdin: {}", e);
                break;
            }
        };

        let command = match parse_line(&line) {
            Ok(command) => command,
            Err(ParseError::Empty) => continue,
            Err(e) => {
                warn!("{}", e);
                continue;
            }
        };

        match command {
            ConsoleCommand::Chat {
                server,
                player,
                text,
            } => {
                let event = ChatEvent::from_proxy(player, text);
                let event = match server {
                    Some(server) => event.with_server(server),
                    None => event,
                };
                controller.relay_from_proxy(event);
            }
            ConsoleCommand::Online(online) => {
                proxy.set_online(online);
                controller.update_presence();
            }
            ConsoleCommand::Topic(topic) => controller.set_topic(topic),
            ConsoleCommand::Private(text) => controller.relay_private(text),
            ConsoleCommand::Announce { title, body } => {
                let mut content = RichContent::new().title(title);
                if !body.is_empty() {
                    content = content.description(body);
                }
                controller.relay_rich(content);
            }
            ConsoleCommand::Tick => controller.on_tick(),
            ConsoleCommand::Presence => controller.update_presence(),
            ConsoleCommand::Status => info!(
                "Discord: {:?}, {} of {} players online",
                controller.state(),
                proxy.online_player_count(),
                proxy.max_player_count()
            ),
            ConsoleCommand::Reload => {
                if let Err(e) = store.reload_from(&config_path) {
                    error!("Reload failed, keeping current configuration: {}", e);
                }
            }
            ConsoleCommand::Quit => break,
        }
    }

    info!("Console closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::testing::test_config;

    #[test]
    fn test_chat_with_server() {
        assert_eq!(
            parse_line("[Lobby] Bob: hello there"),
            Ok(ConsoleCommand::Chat {
                server: Some("Lobby".to_string()),
                player: "Bob".to_string(),
                text: "hello there".to_string(),
            })
        );
    }

    #[test]
    fn test_chat_without_server() {
        assert_eq!(
            parse_line("Bob: time is 12:30"),
            Ok(ConsoleCommand::Chat {
                server: None,
                player: "Bob".to_string(),
                text: "time is 12:30".to_string(),
            })
        );
    }

    #[test]
    fn test_plain_text_is_rejected() {
        assert!(matches!(parse_line("just words"), Err(ParseError::Usage(_))));
        assert!(matches!(parse_line("two words: hi"), Err(ParseError::Usage(_))));
        assert_eq!(parse_line("   "), Err(ParseError::Empty));
    }

    #[test]
    fn test_commands() {
        assert_eq!(parse_line("/online 12"), Ok(ConsoleCommand::Online(12)));
        assert_eq!(parse_line("/QUIT"), Ok(ConsoleCommand::Quit));
        assert_eq!(
            parse_line("/topic Server restarting"),
            Ok(ConsoleCommand::Topic("Server restarting".to_string()))
        );
        assert_eq!(
            parse_line("/announce Event | Starts at 8"),
            Ok(ConsoleCommand::Announce {
                title: "Event".to_string(),
                body: "Starts at 8".to_string(),
            })
        );
        assert!(matches!(parse_line("/online many"), Err(ParseError::Usage(_))));
        assert!(matches!(parse_line("/private"), Err(ParseError::Usage(_))));
        assert_eq!(
            parse_line("/ignore Bob"),
            Err(ParseError::UnknownCommand("ignore".to_string()))
        );
    }

    #[test]
    fn test_render_uses_template() {
        let proxy = ConsoleProxy::new(ConfigStore::new(test_config()), 10);
        let event = ChatEvent::from_external("100", "Alice", "hi");
        assert_eq!(proxy.render(&event), "[Discord] Alice: hi");
    }
}
