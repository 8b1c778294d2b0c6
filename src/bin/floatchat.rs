//! Terminal host for the floating chat widget.
//!
//! Mounts the widget onto the terminal, opens the panel and relays each line
//! typed at the prompt as a user message. Replies are typed out as they
//! stream in.
//!
//! # Usage
//!
//! ```bash
//! # Chat against the default endpoint
//! floatchat
//!
//! # Load options from a document and force English
//! floatchat --config widget.yaml --lang en
//!
//! # Print the mounted widget as a static page
//! floatchat --theme light --html > widget.html
//! ```
//!
//! # Commands
//!
//! - `/suggest <n>` - Send the n-th suggestion
//! - `/toggle` - Open or close the panel
//! - `/reset` - Start a new conversation
//! - `/session` - Show the session identifier
//! - `/help` - Show available commands
//! - `/quit` - Exit

use std::collections::HashMap;
use std::io::{self, Stdout, Write};
use std::time::Duration;

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing_subscriber::EnvFilter;

use floatchat::markdown::plain_text;
use floatchat::view::{BUBBLE_TEXT_OPEN, WidgetMarkup};
use floatchat::{
    Key, KeyOutcome, MemorySurface, Modifiers, NodeId, RenderMode, Surface, Widget, WidgetArgs,
};

const REPLY_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Prints bot messages as the widget renders them.
struct TerminalSurface<W: Write + Send> {
    out: W,
    title: String,
    /// Rows with no content yet, mapped to the characters printed so far.
    /// `None` until the first streamed text arrives.
    streaming: HashMap<NodeId, Option<usize>>,
}

impl TerminalSurface<Stdout> {
    fn stdout(title: impl Into<String>) -> Self {
        Self::new(io::stdout(), title)
    }
}

impl<W: Write + Send> TerminalSurface<W> {
    fn new(out: W, title: impl Into<String>) -> Self {
        Self {
            out,
            title: title.into(),
            streaming: HashMap::new(),
        }
    }

    fn line(&mut self, text: &str) {
        let _ = writeln!(self.out, "{text}");
    }

    fn partial(&mut self, text: &str) {
        let _ = write!(self.out, "{text}");
        let _ = self.out.flush();
    }

    fn is_typing(&self) -> bool {
        self.streaming.values().any(Option::is_some)
    }
}

impl<W: Write + Send> Surface for TerminalSurface<W> {
    fn has_element(&self, _: &str) -> bool {
        false
    }

    fn install_stylesheet(&mut self, _: &str, _: &str) {}

    fn mount(&mut self, _: &WidgetMarkup) {}

    fn set_open(&mut self, _: bool) {}

    fn set_unread_badge(&mut self, text: Option<&str>) {
        if let Some(text) = text {
            self.line(&format!("[{text} unread]"));
        }
    }

    fn append_node(&mut self, id: NodeId, markup: &str) {
        if !markup.contains("fcw-message bot") || markup.contains("fcw-loading") {
            return;
        }
        let content = markup
            .split_once(BUBBLE_TEXT_OPEN)
            .map(|(_, rest)| plain_text(rest))
            .unwrap_or_default();
        if content.is_empty() {
            // Either a streaming row or an empty message; only typed text
            // or a final markup tells them apart.
            self.streaming.insert(id, None);
        } else {
            self.line(&format!("{}: {}", self.title, content));
        }
    }

    fn remove_node(&mut self, id: NodeId) {
        if let Some(Some(_)) = self.streaming.remove(&id) {
            self.line("");
        }
    }

    fn clear_log(&mut self) {
        if self.is_typing() {
            self.line("");
        }
        self.streaming.clear();
        self.line("--- new conversation ---");
    }

    fn set_node_text(&mut self, id: NodeId, text: &str) {
        let Some(printed) = self.streaming.get(&id).copied() else {
            return;
        };
        let printed = match printed {
            Some(printed) => printed,
            None => {
                let prefix = format!("{}: ", self.title);
                self.partial(&prefix);
                0
            }
        };
        let fresh: String = text.chars().skip(printed).collect();
        self.streaming
            .insert(id, Some(printed + fresh.chars().count()));
        self.partial(&fresh);
    }

    fn set_node_markup(&mut self, id: NodeId, markup: &str) {
        match self.streaming.remove(&id) {
            Some(Some(_)) => self.line(""),
            Some(None) => {
                let text = plain_text(markup);
                self.line(&format!("{}: {}", self.title, text));
            }
            None => {}
        }
    }

    fn scroll_to_bottom(&mut self) {}

    fn clear_input(&mut self) {}

    fn focus_input(&mut self) {}

    fn show_welcome_popup(&mut self, markup: &str) {
        let text = plain_text(markup);
        self.line(&format!("({})", text.trim()));
    }

    fn hide_welcome_popup(&mut self) {}
}

/// REPL commands.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ReplCommand {
    Suggest(usize),
    Toggle,
    Reset,
    Session,
    Help,
    Quit,
    Invalid(String),
}

fn parse_command(input: &str) -> Option<ReplCommand> {
    let input = input.trim();
    let rest = input.strip_prefix('/')?;
    let mut parts = rest.splitn(2, ' ');
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "suggest" => match argument.map(str::parse::<usize>) {
            Some(Ok(n)) if n > 0 => ReplCommand::Suggest(n - 1),
            _ => ReplCommand::Invalid("/suggest requires a suggestion number".to_string()),
        },
        "toggle" | "open" | "minimize" => ReplCommand::Toggle,
        "reset" | "close" => ReplCommand::Reset,
        "session" => ReplCommand::Session,
        "help" | "?" => ReplCommand::Help,
        "quit" | "exit" | "q" => ReplCommand::Quit,
        other => ReplCommand::Invalid(format!("Unknown command: /{other}")),
    };
    Some(result)
}

fn help_text() -> &'static str {
    r#"Available commands:
  /suggest <n>           Send the n-th suggestion
  /toggle                Open or close the panel
  /reset                 Start a new conversation
  /session               Show the session identifier
  /help                  Show this help message
  /quit                  Exit"#
}

fn print_suggestions(widget: &Widget) {
    if !widget.has_suggestions() {
        return;
    }
    for (idx, suggestion) in widget.config().suggestions.iter().enumerate() {
        println!("  [{}] {}", idx + 1, suggestion.label);
    }
}

/// Waits until no reply is pending or still being typed.
async fn wait_for_reply(widget: &Widget) {
    loop {
        let busy = widget
            .messages()
            .iter()
            .any(|m| m.mode == RenderMode::Loading || !m.settled);
        if !busy {
            break;
        }
        tokio::time::sleep(REPLY_POLL_INTERVAL).await;
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (args, _) = WidgetArgs::from_command_line_relaxed("floatchat [OPTIONS]");
    let default_filter = if args.debug {
        "floatchat=debug"
    } else {
        "floatchat=warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(io::stderr)
        .init();

    let options = args.options()?;

    if args.html {
        let surface = MemorySurface::new();
        let _widget = Widget::builder(options).surface(surface.clone()).build()?;
        print!("{}", surface.render_document());
        return Ok(());
    }

    let title = options
        .title
        .clone()
        .filter(|title| !title.trim().is_empty())
        .unwrap_or_else(|| "WiseBot".to_string());
    let widget = Widget::builder(options)
        .surface(TerminalSurface::stdout(title))
        .build()?;
    widget.toggle();
    let mut rl = DefaultEditor::new()?;

    println!(
        "{} ({}, session {})",
        widget.config().title,
        widget.config().online_text,
        widget.session_id()
    );
    print_suggestions(&widget);
    println!("Type /help for commands, /quit to exit\n");

    loop {
        match rl.readline("You: ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line);

                if let Some(cmd) = parse_command(line) {
                    match cmd {
                        ReplCommand::Quit => {
                            println!("Goodbye!");
                            break;
                        }
                        ReplCommand::Help => {
                            for line in help_text().lines() {
                                println!("    {}", line);
                            }
                        }
                        ReplCommand::Suggest(idx) => {
                            if widget.choose_suggestion(idx) {
                                wait_for_reply(&widget).await;
                            } else {
                                eprintln!("No such suggestion.");
                            }
                        }
                        ReplCommand::Toggle => {
                            widget.toggle();
                            let state = if widget.is_open() { "open" } else { "closed" };
                            println!("Panel {state}.");
                        }
                        ReplCommand::Reset => {
                            widget.close();
                            print_suggestions(&widget);
                        }
                        ReplCommand::Session => {
                            println!("Session: {}", widget.session_id());
                        }
                        ReplCommand::Invalid(msg) => {
                            eprintln!("{msg}");
                        }
                    }
                    continue;
                }

                widget.set_draft(line);
                if widget.handle_key(Key::Enter, Modifiers::NONE) == KeyOutcome::Submitted {
                    wait_for_reply(&widget).await;
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("Goodbye!");
                break;
            }
            Err(err) => {
                eprintln!("Error: {:?}", err);
                break;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use floatchat::Sender;
    use floatchat::view::message_markup;

    use super::*;

    fn output(surface: &TerminalSurface<Vec<u8>>) -> String {
        String::from_utf8(surface.out.clone()).unwrap()
    }

    #[test]
    fn plain_rows_print_whole_lines() {
        let mut surface = TerminalSurface::new(Vec::new(), "Bot");
        surface.append_node(0, &message_markup(Sender::User, "hi"));
        surface.append_node(1, &message_markup(Sender::Bot, "<b>hello</b>"));
        assert_eq!(output(&surface), "Bot: hello\n");
    }

    #[test]
    fn empty_plain_row_leaves_no_open_line() {
        let mut surface = TerminalSurface::new(Vec::new(), "Bot");
        surface.append_node(0, &message_markup(Sender::Bot, ""));
        surface.append_node(1, &message_markup(Sender::Bot, "next"));
        assert_eq!(output(&surface), "Bot: next\n");
    }

    #[test]
    fn streamed_rows_type_only_new_text() {
        let mut surface = TerminalSurface::new(Vec::new(), "Bot");
        surface.append_node(3, &message_markup(Sender::Bot, ""));
        surface.set_node_text(3, "he");
        surface.set_node_text(3, "hello");
        surface.set_node_markup(3, "hello");
        assert_eq!(output(&surface), "Bot: hello\n");
    }

    #[test]
    fn stream_finished_at_once_prints_full_line() {
        let mut surface = TerminalSurface::new(Vec::new(), "Bot");
        surface.append_node(4, &message_markup(Sender::Bot, ""));
        surface.set_node_markup(4, "<b>done</b>");
        assert_eq!(output(&surface), "Bot: done\n");
    }

    #[test]
    fn commands_parse() {
        assert_eq!(parse_command("/suggest 2"), Some(ReplCommand::Suggest(1)));
        assert!(matches!(
            parse_command("/suggest 0"),
            Some(ReplCommand::Invalid(_))
        ));
        assert_eq!(parse_command("/QUIT"), Some(ReplCommand::Quit));
        assert_eq!(parse_command("hello"), None);
    }
}
