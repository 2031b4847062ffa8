//! `doki chat`: interactive or single-message study session.

use crate::runtime;
use doki_brain::Brain;
use doki_core::message::Turn;
use std::io::Write;
use tokio::io::{self, AsyncBufReadExt, BufReader};

pub async fn run(user: &str, message: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = runtime::load_config()?;
    let brain = runtime::build_brain(&config).await?;

    if let Some(msg) = message {
        eprint!("  Pensando...");
        let reply = brain.respond(user, &msg, &[]).await;
        eprint!("\r              \r");
        println!("{}", reply.response);
        return Ok(());
    }

    println!();
    println!("  ╔══════════════════════════════════════════════╗");
    println!("  ║            Doki, modo interativo             ║");
    println!("  ╚══════════════════════════════════════════════╝");
    println!();
    println!("  Assistente: {} {}", config.assistant.name, config.assistant.version);
    println!("  Backend:    {}", brain.generator().backend());
    println!("  Modelo:     {}", brain.generator().model());
    println!("  Usuário:    {user}");
    println!();
    println!("  Digite sua pergunta e pressione Enter.");
    println!("  Digite 'sair' ou Ctrl+C para encerrar.");
    println!();

    let mut history: Vec<Turn> = Vec::new();
    let mut lines = BufReader::new(io::stdin()).lines();

    prompt()?;
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            prompt()?;
            continue;
        }
        if matches!(line, "sair" | "exit" | "quit" | "/exit" | "/quit" | ":q") {
            break;
        }

        turn(&brain, user, line, &mut history).await;
        prompt()?;
    }

    let tokens = brain.generator().tokens_used();
    if tokens > 0 {
        println!();
        println!("  Tokens usados nesta sessão: {tokens}");
    }
    println!();
    println!("  Até mais! 👋");
    println!();
    Ok(())
}

async fn turn(brain: &Brain, user: &str, text: &str, history: &mut Vec<Turn>) {
    eprint!("  ...");
    let reply = brain.respond(user, text, history).await;
    eprint!("\r     \r");
    println!();

    let studied = reply.subject.as_deref().filter(|s| *s != doki_subjects::GENERAL);
    if let (Some(_), Some(display), Some(icon)) = (
        studied,
        reply.subject_display.as_deref(),
        reply.subject_icon.as_deref(),
    ) {
        println!("  [{icon} {display}]");
    }
    for line in reply.response.lines() {
        println!("  Doki > {line}");
    }
    println!();

    // Refused messages stay out of the conversation.
    if !reply.blocked {
        history.push(Turn::user(text));
        history.push(Turn::assistant(reply.response));
    }
}

fn prompt() -> std::io::Result<()> {
    print!("  Você > ");
    std::io::stdout().flush()
}
