//! Example 1: Negotiated responses and request decoding
//!
//! This example demonstrates:
//! - One handler answering JSON, XML or plain text depending on `Accept`
//! - Decoding JSON, XML and URL-encoded bodies with `Decoded<T>`
//! - Setting the response status through the `Responder` context
//!
//! Run with: cargo run --bin negotiate

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use render_axum::prelude::*;
use render_axum_examples::{Book, NewBook, sample_books};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone, Default)]
struct AppState {
    books: Arc<RwLock<Vec<Book>>>,
}

async fn list_books(State(state): State<AppState>, responder: Responder) -> Response {
    let books = state.books.read().await.clone();
    responder.respond(Payload::value(books)).await
}

async fn get_book(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    mut responder: Responder,
) -> Response {
    let book = state.books.read().await.iter().find(|b| b.id == id).cloned();
    match book {
        Some(book) => responder.respond(Payload::value(book)).await,
        None => {
            responder.context_mut().set_status(StatusCode::NOT_FOUND);
            responder
                .respond(Payload::text(format!("no book with id {id}")))
                .await
        }
    }
}

async fn create_book(
    State(state): State<AppState>,
    mut responder: Responder,
    Decoded(new): Decoded<NewBook>,
) -> Response {
    let mut books = state.books.write().await;
    let book = Book {
        id: books.iter().map(|b| b.id).max().unwrap_or(0) + 1,
        title: new.title,
        author: new.author,
    };
    books.push(book.clone());
    tracing::info!(id = book.id, "book created");

    responder.context_mut().set_status(StatusCode::CREATED);
    responder.respond(Payload::value(book)).await
}

async fn count(State(state): State<AppState>, responder: Responder) -> Response {
    let count = state.books.read().await.len();
    responder.respond(Payload::display(count)).await
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    render_axum_examples::init_tracing();

    let state = AppState {
        books: Arc::new(RwLock::new(sample_books())),
    };
    let app = Router::new()
        .route("/books", get(list_books).post(create_book))
        .route("/books/count", get(count))
        .route("/books/{id}", get(get_book))
        .layer(RenderLayer::default())
        .with_state(state);

    let addr = render_axum_examples::server_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    println!("=== Example 1: Negotiated responses ===");
    println!("Server listening on http://{}", addr);
    println!();
    println!("Test with:");
    println!("  curl http://localhost:3000/books");
    println!("  curl -H 'Accept: application/xml' http://localhost:3000/books/1");
    println!("  curl -H 'Accept: text/plain' http://localhost:3000/books/count");
    println!("  curl -X POST http://localhost:3000/books \\");
    println!("    -d 'title=Solaris&author=Stanislaw+Lem'");
    println!("  curl -X POST http://localhost:3000/books \\");
    println!("    -H 'Content-Type: application/json' \\");
    println!("    -d '{{\"title\": \"Solaris\", \"author\": \"Stanislaw Lem\"}}'");

    axum::serve(listener, app).await?;
    Ok(())
}
