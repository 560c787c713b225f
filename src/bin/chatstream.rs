//! Interactive chat application for a streaming chat service.
//!
//! This binary provides a REPL that sends each line to the service and prints the reply as
//! it streams in.
//!
//! # Usage
//!
//! ```bash
//! # Talk to the service on localhost:8094
//! chatstream
//!
//! # Point at another deployment
//! chatstream --url https://chat.example.com/api/
//!
//! # Give up on a reply that stalls for 30 seconds
//! chatstream --idle-timeout 30
//!
//! # Disable colors (useful for piping output)
//! chatstream --no-color
//! ```
//!
//! # Commands
//!
//! While chatting, you can use slash commands:
//! - `/help` - Show available commands
//! - `/clear` - Clear conversation history
//! - `/history` - Print the conversation so far
//! - `/stats` - Show session statistics
//! - `/quit` - Exit the application
//!
//! Ctrl-C while a reply is streaming stops it and keeps what was received.

use std::sync::Arc;

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use chatstream::chat::{
    ChatArgs, ChatCommand, ChatConfig, ChatSession, PlainTextRenderer, StreamEnd, TurnOutcome,
    help_text, parse_command,
};
use chatstream::{ChatClient, Transport};

/// Main entry point for the chatstream application.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (args, _) = ChatArgs::from_command_line_relaxed("chatstream [OPTIONS]");
    let config = ChatConfig::from(args);

    let client = ChatClient::new(&config)?;
    let endpoint = client.stream_url().to_string();
    let session = ChatSession::new(client);
    let renderer = Arc::new(PlainTextRenderer::with_color(config.use_color));
    session.subscribe(renderer.clone());
    session.watch(renderer.clone());
    let mut rl = DefaultEditor::new()?;

    // Ctrl-C stops the reply in progress; at the prompt rustyline reports it instead.
    let stop = session.stop_handle();
    ctrlc::set_handler(move || {
        stop.stop();
    })?;

    println!("chatstream ({endpoint})");
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
                        ChatCommand::Quit => {
                            println!("Goodbye!");
                            break;
                        }
                        ChatCommand::Clear => {
                            if session.clear() {
                                renderer.print_info("Conversation cleared.");
                            } else {
                                renderer.print_error("A reply is still streaming.");
                            }
                        }
                        ChatCommand::History => {
                            renderer.print_history(&session.messages());
                        }
                        ChatCommand::Help => {
                            for line in help_text().lines() {
                                println!("    {}", line);
                            }
                        }
                        ChatCommand::Stats => {
                            print_stats(&session);
                        }
                        ChatCommand::Invalid(message) => {
                            renderer.print_error(&message);
                        }
                    }
                    continue;
                }

                println!("Assistant:");
                match session.send(line).await {
                    TurnOutcome::Finished(summary) if summary.end == StreamEnd::Cancelled => {
                        renderer.print_interrupted();
                    }
                    TurnOutcome::Failed(err) if !err.is_connection() && !err.is_api() => {
                        renderer.print_error(&err.to_string());
                    }
                    _ => {}
                }
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl+C at prompt - soft interrupt
                println!();
                continue;
            }
            Err(ReadlineError::Eof) => {
                // Ctrl+D - exit
                println!("\nGoodbye!");
                break;
            }
            Err(err) => {
                renderer.print_error(&format!("Input error: {}", err));
                break;
            }
        }
    }

    Ok(())
}

fn print_stats<T: Transport>(session: &ChatSession<T>) {
    let stats = session.stats();
    println!("    Session Statistics:");
    println!("      Messages: {}", stats.message_count);
    println!("      Turns: {}", stats.turns_started);
    println!("        completed: {}", stats.turns_completed);
    println!("        stopped: {}", stats.turns_cancelled);
    println!("        failed: {}", stats.turns_failed);
    println!("      Fragments received: {}", stats.fragments);
}
