//! Command-line sender for MLLP endpoints.
//!
//! Reads HL7 messages from files (or standard input), sends each over one
//! persistent session and prints the acknowledgment content. The `mllp-send`
//! binary is a thin wrapper around [`run`].

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod args;
pub mod error;
pub mod message;
pub mod tls;

use std::{io::Write, time::Duration};

pub use args::Args;
pub use error::CliError;
use mllp_client::{Client, SendOptions};

/// Send every message `args.repeat` times and write one line per reply.
///
/// # Errors
///
/// Fails on the first message that cannot be read or sent, or whose reply
/// cannot be written to `out`.
pub async fn run<W: Write>(args: &Args, out: &mut W) -> Result<(), CliError> {
    let messages = args.load_messages()?;
    let config = args.client_config()?;
    let endpoint = args.endpoint();

    tracing::info!(%endpoint, messages = messages.len(), repeat = args.repeat, "sending");
    let client = Client::connect(endpoint, config);

    let result = send_all(args, &client, &messages, out).await;
    client.stop().await?;
    result
}

async fn send_all<W: Write>(
    args: &Args,
    client: &Client,
    messages: &[bytes::Bytes],
    out: &mut W,
) -> Result<(), CliError> {
    let write_timeout = args.reply_timeout().as_duration().unwrap_or(Duration::MAX);

    for _ in 0..args.repeat {
        for message in messages {
            if args.fire_and_forget {
                client.send_async(message.clone(), write_timeout).await?;
                writeln!(out, "accepted")?;
            } else {
                let reply = client.send(message.clone(), SendOptions::default()).await?;
                writeln!(out, "{}", message::display(&reply))?;
            }
        }
    }
    Ok(())
}
