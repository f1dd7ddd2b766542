//! Example 2: Server-sent events
//!
//! This example demonstrates:
//! - Streaming a `Payload::Stream` as `text/event-stream`
//! - The same stream collected into a JSON list when SSE is not accepted
//! - A request timeout from `RenderConfig` ending the stream with an
//!   error frame
//! - A channel-fed stream from a background task
//!
//! Run with: cargo run --bin event-stream

use axum::Router;
use axum::response::Response;
use axum::routing::get;
use render_axum::prelude::*;
use render_axum_examples::sample_books;
use serde::Serialize;
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Serialize)]
struct Tick {
    seq: u32,
    title: String,
}

/// Five ticks, one every 500ms.
async fn ticks(responder: Responder) -> Response {
    let books = sample_books();
    let ticks = async_stream::stream! {
        for seq in 0..5u32 {
            tokio::time::sleep(Duration::from_millis(500)).await;
            let book = &books[seq as usize % books.len()];
            yield Item::value(Tick { seq, title: book.title.clone() });
        }
        yield Item::from(Data::error("no more ticks"));
    };
    responder.respond(Payload::stream(ticks)).await
}

/// Never ends on its own; the layer's timeout stops it.
async fn forever(responder: Responder) -> Response {
    let (tx, rx) = mpsc::channel(8);
    tokio::spawn(async move {
        let mut seq = 0u64;
        loop {
            if tx.send(seq).await.is_err() {
                tracing::info!(seq, "client gone, producer stopping");
                return;
            }
            seq += 1;
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
    });
    responder.respond(Payload::channel(rx)).await
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    render_axum_examples::init_tracing();

    let config = RenderConfig::new().timeout(Duration::from_secs(10));
    let app = Router::new()
        .route("/ticks", get(ticks))
        .route("/forever", get(forever))
        .layer(RenderLayer::with_config(config));

    let addr = render_axum_examples::server_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    println!("=== Example 2: Server-sent events ===");
    println!("Server listening on http://{}", addr);
    println!();
    println!("Test with:");
    println!("  curl -N -H 'Accept: text/event-stream' http://localhost:3000/ticks");
    println!("  curl http://localhost:3000/ticks");
    println!("  curl -N -H 'Accept: text/event-stream' http://localhost:3000/forever");

    axum::serve(listener, app).await?;
    Ok(())
}
