//! Interactive chat application for asking EcoBot questions.
//!
//! This binary is a terminal front end for the EcoBot answering service.  Lines
//! typed at the prompt are submitted as questions; answers are printed as they
//! arrive, so several questions may be outstanding at once and their answers
//! may come back in a different order.
//!
//! # Usage
//!
//! ```bash
//! # Talk to a local service on the default endpoint
//! ecobot-chat
//!
//! # Point at another deployment with a shorter timeout
//! ecobot-chat --endpoint https://ecobot.example.com/query/ --timeout-secs 20
//!
//! # Send document context with every question
//! ecobot-chat --context "$(cat survey.txt)"
//! ```
//!
//! # Commands
//!
//! - `/history` - Show the conversation so far
//! - `/context <text>` - Set the document context (`/context clear` removes it)
//! - `/stats` - Show session statistics
//! - `/help` - Show available commands
//! - `/quit` - Exit once outstanding answers arrive

use std::thread;

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tokio::sync::mpsc;

use ecobot::chat::{
    ChatArgs, ChatCommand, ChatConfig, ChatSession, PlainTextRenderer, help_text, parse_command,
};

/// Events delivered from the input thread to the session loop.
enum Input {
    Line(String),
    Eof,
    Terminate,
    Failed(String),
}

/// Main entry point for the ecobot-chat application.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (args, _) = ChatArgs::from_command_line_relaxed("ecobot-chat [OPTIONS]");
    let config = ChatConfig::try_from(args)?;

    let mut session = config.session()?;
    session.subscribe(Box::new(PlainTextRenderer::with_color(config.use_color)));
    let mut renderer = PlainTextRenderer::with_color(config.use_color);

    let (input_tx, mut input_rx) = mpsc::unbounded_channel();

    // SIGINT outside the prompt and SIGTERM end the session without waiting.
    let terminate_tx = input_tx.clone();
    ctrlc::set_handler(move || {
        let _ = terminate_tx.send(Input::Terminate);
    })?;

    thread::spawn(move || read_lines(input_tx));

    println!("EcoBot Chat (endpoint: {})", config.endpoint);
    println!("Ask about ecology, biology, or species. Type /help for commands.\n");

    loop {
        tokio::select! {
            input = input_rx.recv() => match input {
                Some(Input::Line(line)) => {
                    if let Some(cmd) = parse_command(&line) {
                        if !run_command(cmd, &mut session, &mut renderer) {
                            break;
                        }
                        continue;
                    }
                    session.set_input(line);
                    session.submit();
                }
                Some(Input::Failed(message)) => {
                    renderer.print_error(&format!("Input error: {message}"));
                    break;
                }
                Some(Input::Terminate) => {
                    println!("\nGoodbye!");
                    return Ok(());
                }
                Some(Input::Eof) | None => {
                    println!();
                    break;
                }
            },
            Some(settled) = session.next_settled(), if session.in_flight() > 0 => {
                if let Some(reply) = settled.reply {
                    renderer.print_sources(&reply.sources);
                }
            }
        }
    }

    let outstanding = session.in_flight();
    if outstanding > 0 {
        renderer.print_info(&format!("Waiting for {outstanding} outstanding answer(s)..."));
        for settled in session.settle_all().await {
            if let Some(reply) = settled.reply {
                renderer.print_sources(&reply.sources);
            }
        }
    }
    println!("Goodbye!");
    Ok(())
}

/// Reads prompt lines on a dedicated thread so the session loop never blocks.
fn read_lines(tx: mpsc::UnboundedSender<Input>) {
    let mut rl = match DefaultEditor::new() {
        Ok(rl) => rl,
        Err(err) => {
            let _ = tx.send(Input::Failed(err.to_string()));
            return;
        }
    };
    loop {
        match rl.readline("You: ") {
            Ok(line) => {
                if !line.trim().is_empty() {
                    let _ = rl.add_history_entry(line.as_str());
                }
                if tx.send(Input::Line(line)).is_err() {
                    return;
                }
            }
            // Ctrl+C at the prompt discards the line.
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => {
                let _ = tx.send(Input::Eof);
                return;
            }
            Err(err) => {
                let _ = tx.send(Input::Failed(err.to_string()));
                return;
            }
        }
    }
}

/// Runs one slash command.  Returns false when the session should end.
fn run_command(
    cmd: ChatCommand,
    session: &mut ChatSession,
    renderer: &mut PlainTextRenderer,
) -> bool {
    match cmd {
        ChatCommand::Quit => return false,
        ChatCommand::Help => {
            for line in help_text().lines() {
                println!("    {}", line);
            }
        }
        ChatCommand::History => {
            if session.transcript().is_empty() {
                renderer.print_info("(no messages yet)");
            }
            for turn in session.transcript() {
                renderer.print_turn(turn);
            }
        }
        ChatCommand::Context(context) => {
            session.set_context(Some(context));
            renderer.print_info("Document context set for later questions.");
        }
        ChatCommand::ClearContext => {
            session.set_context(None);
            renderer.print_info("Document context cleared.");
        }
        ChatCommand::AdoptContext => match session.adopt_reply_context() {
            Some(context) => renderer.print_info(&format!(
                "Document context set from the latest reply ({} chars).",
                context.chars().count()
            )),
            None => renderer.print_info("No reply has carried document text yet."),
        },
        ChatCommand::ShowContext => match session.context() {
            Some(context) => renderer.print_info(&format!("Document context: {context}")),
            None => renderer.print_info("Document context: (none)"),
        },
        ChatCommand::Stats => print_stats(session),
        ChatCommand::Invalid(message) => renderer.print_error(&message),
    }
    true
}

fn print_stats(session: &ChatSession) {
    let stats = session.stats();
    println!("    Session Statistics:");
    println!("      Turns: {}", stats.turn_count);
    println!("      Questions submitted: {}", stats.submitted);
    println!("      Answered: {}", stats.answered);
    println!("      Failed: {}", stats.failed);
    println!("      Outstanding: {}", stats.in_flight);
    match session.context() {
        Some(context) => println!("      Document context: {} chars", context.chars().count()),
        None => println!("      Document context: (none)"),
    }
}
