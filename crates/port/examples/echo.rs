//! Echo server for an Erlang port opened with `{packet, 4}`:
//!
//! ```erlang
//! Port = open_port({spawn, "target/debug/examples/echo"}, [{packet, 4}, binary]),
//! port_command(Port, term_to_binary(hello)),
//! receive {Port, {data, Data}} -> binary_to_term(Data) end.
//! %% {echo, hello}
//! ```
//!
//! Logs go to stderr, since stdout carries the frames.

use std::env;

use etf::Term;
use futures::{SinkExt, StreamExt};
use port::TermCodec;
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            env::var("RUST_LOG").unwrap_or_else(|_| "info,port=debug".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut input = FramedRead::new(tokio::io::stdin(), TermCodec::default());
    let mut output = FramedWrite::new(tokio::io::stdout(), TermCodec::default());

    tracing::info!("echo port started");
    while let Some(term) = input.next().await {
        let term = term?;
        if term.as_atom().map(|a| a.as_str()) == Some("stop") {
            break;
        }
        output.send(Term::tuple([Term::atom("echo"), term])).await?;
    }
    tracing::info!("echo port stopped");
    Ok(())
}
