use super::agent::{Agent, TurnEvent, TurnOutcome};
use crate::model::ModelProvider;
use crate::tooling::ToolRegistry;
use crate::types::Transcript;
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, warn};

/// Interactive line-oriented prompt. An empty line or `exit`/`quit`
/// (case-insensitive) terminates the loop; the transcript accumulates
/// across turns for the life of the session.
pub async fn run<P>(
    agent: &Agent<P>,
    registry: &ToolRegistry,
    transcript: &mut Transcript,
) -> io::Result<()>
where
    P: ModelProvider,
{
    let stdin = BufReader::new(io::stdin());
    let mut lines = stdin.lines();
    let mut stdout = io::stdout();

    loop {
        stdout.write_all(b"\nYou: ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let user = line.trim().to_string();
        if user.is_empty() || user.eq_ignore_ascii_case("exit") || user.eq_ignore_ascii_case("quit")
        {
            debug!("Leaving interactive prompt");
            break;
        }

        match agent
            .run_turn(transcript, registry, user, print_progress)
            .await
        {
            Ok(TurnOutcome::Answered(answer)) => {
                println!("Agent: {answer}");
            }
            Ok(TurnOutcome::Exhausted) => {
                // No answer to show; prompt again with the turn dropped.
                debug!("Turn ended without a final answer");
            }
            Err(error) => {
                warn!(%error, "Turn failed");
                println!("[error] {}", error.user_message());
            }
        }
    }

    stdout.flush().await?;
    Ok(())
}

fn print_progress(event: TurnEvent) {
    match event {
        TurnEvent::Thinking => println!("Thinking..."),
        TurnEvent::CallingTool { name } => println!("Calling tool: {name}..."),
    }
}
