//! Thin HTTP routing layer over the engine
//!
//! - `GET /search?w=<query>` → JSON array of `[docId, title]` pairs
//! - `GET /add?t=<title>&c=<content>` → `Added:<title> <content>`
//!
//! A fresh Searcher or Indexer is opened per request, so concurrent
//! requests become concurrent connections to the backing store. Engine
//! errors map to 500; missing parameters to 400; unknown paths to 404.

use std::io::Cursor;
use std::path::Path;

use tiny_http::{Header, Method, Response, Server};
use tracing::{debug, error, info};

use crate::config::TokenizerKind;
use crate::error::{FalconError, Result};
use crate::index::{DocId, Indexer, SearchOutcome, Searcher};

/// Serve requests forever on `port`.
pub fn serve(db_path: &Path, kind: TokenizerKind, port: u16) -> Result<()> {
    let server = Server::http(("0.0.0.0", port))
        .map_err(|e| FalconError::Config(format!("cannot bind port {port}: {e}")))?;
    info!(port, db = %db_path.display(), "serving HTTP requests");

    let db_path = db_path.to_path_buf();
    for request in server.incoming_requests() {
        let response = route(&db_path, kind, request.method(), request.url());
        if let Err(e) = request.respond(response) {
            debug!("client connection dropped: {e}");
        }
    }
    Ok(())
}

fn route(db_path: &Path, kind: TokenizerKind, method: &Method, url: &str) -> Response<Cursor<Vec<u8>>> {
    if *method != Method::Get {
        return plain(404, "not found");
    }
    let (path, query) = url.split_once('?').unwrap_or((url, ""));
    match path {
        "/search" => match param(query, "w") {
            Some(word) => handle_search(db_path, kind, &word),
            None => plain(400, "missing parameter: w"),
        },
        "/add" => match (param(query, "t"), param(query, "c")) {
            (Some(title), Some(content)) => handle_add(db_path, kind, &title, &content),
            _ => plain(400, "missing parameter: t and c are required"),
        },
        _ => plain(404, "not found"),
    }
}

fn handle_search(db_path: &Path, kind: TokenizerKind, word: &str) -> Response<Cursor<Vec<u8>>> {
    let outcome = Searcher::open(db_path, kind).and_then(|searcher| searcher.search(word));
    match outcome {
        Ok(SearchOutcome::Found(hits)) => {
            let pairs: Vec<(DocId, String)> =
                hits.into_iter().map(|hit| (hit.id, hit.title)).collect();
            match serde_json::to_string(&pairs) {
                Ok(body) => json(body),
                Err(e) => {
                    error!("response encoding failed: {e}");
                    plain(500, "internal error")
                }
            }
        }
        Ok(SearchOutcome::NotFound) => json("[]".to_string()),
        Err(e) => {
            error!("search failed: {e}");
            plain(500, "internal error")
        }
    }
}

fn handle_add(
    db_path: &Path,
    kind: TokenizerKind,
    title: &str,
    content: &str,
) -> Response<Cursor<Vec<u8>>> {
    let added = (|| {
        let mut indexer = Indexer::open(db_path, kind)?;
        indexer.add(title, content)?;
        indexer.close()
    })();
    match added {
        Ok(()) => plain(200, &format!("Added:{title} {content}")),
        Err(e) => {
            error!("add failed: {e}");
            plain(500, "internal error")
        }
    }
}

/// Extract and percent-decode one query-string parameter. `+` decodes to a
/// space, as browsers encode form values.
fn param(query: &str, name: &str) -> Option<String> {
    query.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        if key != name {
            return None;
        }
        let value = value.replace('+', " ");
        urlencoding::decode(&value).ok().map(|decoded| decoded.into_owned())
    })
}

fn plain(status: u16, body: &str) -> Response<Cursor<Vec<u8>>> {
    Response::from_string(body).with_status_code(status)
}

fn json(body: String) -> Response<Cursor<Vec<u8>>> {
    let mut response = Response::from_string(body);
    if let Ok(header) = Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]) {
        response.add_header(header);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_extraction() {
        assert_eq!(param("w=hello", "w"), Some("hello".to_string()));
        assert_eq!(param("t=a&c=b", "c"), Some("b".to_string()));
        assert_eq!(param("t=a&c=b", "w"), None);
        assert_eq!(param("", "w"), None);
    }

    #[test]
    fn test_param_decoding() {
        assert_eq!(param("w=good+morning", "w"), Some("good morning".to_string()));
        assert_eq!(param("w=%E6%9D%B1%E4%BA%AC", "w"), Some("東京".to_string()));
        assert_eq!(param("w=a%20b", "w"), Some("a b".to_string()));
    }

    #[test]
    fn test_routing_status_codes() {
        let dir = tempfile::TempDir::new().unwrap();
        let db = dir.path().join("http.db");

        let add = route(
            &db,
            TokenizerKind::Bigram,
            &Method::Get,
            "/add?t=greeting&c=good+morning",
        );
        assert_eq!(add.status_code().0, 200);

        let hit = route(&db, TokenizerKind::Bigram, &Method::Get, "/search?w=morn");
        assert_eq!(hit.status_code().0, 200);

        let missing = route(&db, TokenizerKind::Bigram, &Method::Get, "/search");
        assert_eq!(missing.status_code().0, 400);

        let partial = route(&db, TokenizerKind::Bigram, &Method::Get, "/add?t=only");
        assert_eq!(partial.status_code().0, 400);

        let unknown = route(&db, TokenizerKind::Bigram, &Method::Get, "/nope");
        assert_eq!(unknown.status_code().0, 404);
    }
}
