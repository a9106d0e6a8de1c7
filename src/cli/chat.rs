use std::sync::Arc;

use anyhow::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use crate::ai::chat::{ChatBuilder, ChatError};
use crate::core::AppConfig;
use crate::gemini::GeminiClient;

pub async fn run(config: AppConfig) -> Result<()> {
    let mut rl = DefaultEditor::new()?;

    let client = GeminiClient::new(&config)?;
    let chat = ChatBuilder::new(Arc::new(client), &config.system_message)
        .greeting(&config.greeting)
        .session_mode(config.session_mode)
        .build()?;

    if let Some(greeting) = chat.transcript().first() {
        println!("{}", greeting.content);
    }

    loop {
        let readline = rl.readline(">>> ");
        match readline {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line.as_str());

                println!("...");
                match chat.submit(&line).await {
                    Ok(msg) => println!("{}", msg.content),
                    Err(ChatError::EmptyInput) => {}
                    Err(e) => eprintln!("Error: {}", e),
                }
            }
            Err(ReadlineError::Interrupted) => break,
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                println!("Error: {:?}", err);
                break;
            }
        }
    }

    Ok(())
}
