//! Example 3: Custom encoder and content-type middleware
//!
//! This example demonstrates:
//! - Registering an HTML encoder in the global registry
//! - A `Render` value that sets headers before it is encoded
//! - `SetContentTypeLayer` pinning a route to one format
//! - `AllowedContentTypesLayer` rejecting unexpected request bodies
//!
//! Run with: cargo run --bin custom-codec

use axum::Router;
use axum::http::{HeaderValue, header::CACHE_CONTROL};
use axum::response::Response;
use axum::routing::{get, post};
use render_axum::codec::text;
use render_axum::prelude::*;
use render_axum::{BoxError, Encoder, Registry, ResponseSink};
use render_axum_examples::{Book, NewBook, sample_books};
use serde::Serialize;

/// The book list, cached by clients for a minute.
#[derive(Serialize)]
struct Shelf {
    books: Vec<Book>,
}

impl Render for Shelf {
    fn render(&mut self, sink: &mut dyn ResponseSink, _ctx: &RequestContext) -> Result<(), BoxError> {
        sink.set_header(CACHE_CONTROL, HeaderValue::from_static("public, max-age=60"));
        Ok(())
    }
}

async fn shelf(responder: Responder) -> Response {
    responder
        .respond(Payload::render(Shelf { books: sample_books() }))
        .await
}

async fn banner(responder: Responder) -> Response {
    responder
        .respond(Payload::text("<h1>render-axum</h1>"))
        .await
}

async fn echo(responder: Responder, Decoded(book): Decoded<NewBook>) -> Response {
    let text = format!("{} by {}", book.title, book.author);
    responder.respond(Payload::text(text)).await
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    render_axum_examples::init_tracing();

    Registry::global().register_encoder(ContentType::HTML, Encoder::value(text::html));

    let app = Router::new()
        .route("/shelf", get(shelf))
        .merge(
            Router::new()
                .route("/banner", get(banner))
                .layer(SetContentTypeLayer::new(ContentType::HTML)),
        )
        .merge(
            Router::new().route("/echo", post(echo)).layer(
                AllowedContentTypesLayer::new([ContentType::JSON, ContentType::FORM]),
            ),
        )
        .layer(RenderLayer::default());

    let addr = render_axum_examples::server_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    println!("=== Example 3: Custom encoder and middleware ===");
    println!("Server listening on http://{}", addr);
    println!();
    println!("Supported response types: {}", Registry::global().supported_encode_types());
    println!();
    println!("Test with:");
    println!("  curl -i http://localhost:3000/shelf");
    println!("  curl -i http://localhost:3000/banner");
    println!("  curl -X POST http://localhost:3000/echo -d 'title=Dune&author=Herbert'");
    println!("  curl -i -X POST http://localhost:3000/echo \\");
    println!("    -H 'Content-Type: application/xml' -d '<b/>'");

    axum::serve(listener, app).await?;
    Ok(())
}
