//! Terminal rendering of chat events.

use std::io::{self, Write};

use chat_agent::ChatEvent;
use colored::Colorize;
use tokio::sync::broadcast;

use crate::progress::Progress;

pub struct View {
    progress: Box<dyn Progress>,
}

impl View {
    pub fn new(progress: Box<dyn Progress>) -> Self {
        Self { progress }
    }

    pub fn render(&self, event: &ChatEvent) {
        match event {
            // Echoed by the terminal already.
            ChatEvent::UserMessage(_) => {}
            ChatEvent::Thinking => self.progress.start("Thinking..."),
            ChatEvent::AssistantMessage { text, model } => {
                self.progress.finish();
                println!("{} {}", "assistant".green().bold(), format!("({model})").dimmed());
                println!("{text}\n");
            }
            ChatEvent::ModelPromoted { from, to } => {
                self.progress.finish();
                println!(
                    "{}",
                    format!("Model {from} did not answer; {to} is now the default.").yellow()
                );
            }
            ChatEvent::SystemNotice { text, is_error } => {
                self.progress.finish();
                if *is_error {
                    println!("{} {}\n", "error".red().bold(), text);
                } else {
                    println!("{}\n", text.cyan());
                }
            }
        }
    }

    /// Renders everything already queued on `rx`.
    pub fn drain(&self, rx: &mut broadcast::Receiver<ChatEvent>) {
        while let Ok(event) = rx.try_recv() {
            self.render(&event);
        }
    }

    pub fn prompt(&self, continuation: bool) {
        let label = if continuation { "...> " } else { "you> " };
        print!("{}", label.blue().bold());
        let _ = io::stdout().flush();
    }
}
