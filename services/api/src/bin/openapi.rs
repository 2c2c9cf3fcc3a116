//! services/api/src/bin/openapi.rs
//!
//! Writes the OpenAPI document of the report assistant API to disk, by
//! default to `openapi.json`. Pass a path as the first argument to override it.

use api_lib::web::rest::ApiDoc;
use utoipa::OpenApi;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "openapi.json".to_string());

    let api_doc = ApiDoc::openapi();
    let route_count = api_doc.paths.paths.len();
    std::fs::write(&path, api_doc.to_pretty_json()?)?;

    println!("Wrote OpenAPI document with {} paths to {}", route_count, path);
    Ok(())
}
