use async_std::io::{self, BufReader};
use futures::channel::mpsc;
use futures::io::AsyncBufReadExt;
use futures::sink::SinkExt;
use futures::StreamExt;
use log::{debug, warn};
use snatcher_core::{EngineInput, Reply};

/// What an operator line on stdin stands for.
#[derive(Debug, PartialEq)]
pub enum Line {
    Reply(Reply),
    Input(EngineInput),
    Blank,
    Invalid(String),
}

/// Lines starting with `{` are captured replies; anything else is an
/// interrupt word.
pub fn classify(line: &str) -> Line {
    let line = line.trim();
    if line.is_empty() {
        return Line::Blank;
    }
    if line.starts_with('{') {
        return match serde_json::from_str::<Reply>(line) {
            Ok(reply) => Line::Reply(reply),
            Err(e) => Line::Invalid(format!("reply is not valid JSON: {}", e)),
        };
    }
    match EngineInput::parse(line) {
        Some(input) => Line::Input(input),
        None => Line::Invalid(format!(
            "unknown command {:?} (expected skip, stop, info, redo or a JSON reply)",
            line
        )),
    }
}

/// Reads stdin until EOF, routing replies to the responder inbox and
/// interrupts to the engine.
pub async fn forward_stdin(
    mut inputs: mpsc::Sender<EngineInput>,
    mut replies: mpsc::Sender<Reply>,
) {
    let mut lines = BufReader::new(io::stdin()).lines();
    while let Some(line) = lines.next().await {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("Could not read stdin: {}", e);
                break;
            }
        };
        match classify(&line) {
            Line::Reply(reply) => {
                debug!("Captured reply with {} unit(s)", reply.len());
                if replies.send(reply).await.is_err() {
                    break;
                }
            }
            Line::Input(input) => {
                if inputs.send(input).await.is_err() {
                    break;
                }
            }
            Line::Blank => {}
            Line::Invalid(reason) => warn!("Ignoring input: {}", reason),
        }
    }
    debug!("stdin closed");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interrupt_words() {
        assert_eq!(classify("skip"), Line::Input(EngineInput::Skip));
        assert_eq!(classify("  !stop\n"), Line::Input(EngineInput::Stop));
        assert_eq!(classify("retry"), Line::Input(EngineInput::Redo));
        assert_eq!(classify("   "), Line::Blank);
        assert!(matches!(classify("hello"), Line::Invalid(_)));
    }

    #[test]
    fn test_json_reply_line() {
        let line = r#"{"units":[{"fields":[{"name":"Ultra HD:","value":"[Link](http://x/u.webm)"}]}]}"#;
        match classify(line) {
            Line::Reply(reply) => {
                assert_eq!(reply.len(), 1);
                assert_eq!(reply.units[0].field("ultra hd:"), Some("[Link](http://x/u.webm)"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_broken_json_is_not_an_interrupt() {
        assert!(matches!(classify("{\"units\": ["), Line::Invalid(_)));
    }
}
