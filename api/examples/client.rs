//! Uploads a PDF and a rules file to a running compliance API.
//!
//! cargo run -p compliance_api --example client -- policy.pdf rules.txt

use reqwest::multipart::{Form, Part};
use reqwest::Client;
use std::path::Path;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let (Some(pdf_path), Some(rules_path)) = (args.next(), args.next()) else {
        eprintln!("usage: client <document.pdf> <rules.txt> [base_url]");
        std::process::exit(2);
    };
    let base_url = args.next().unwrap_or_else(|| "http://127.0.0.1:8000".to_string());
    let client = Client::new();

    println!("Health check:");
    let health_response = client.get(format!("{}/health", base_url)).send().await?;
    println!("Status: {}", health_response.status());
    let health_json: serde_json::Value = health_response.json().await?;
    println!("Response: {}", serde_json::to_string_pretty(&health_json)?);

    let form = Form::new()
        .part("pdf_file", file_part(&pdf_path, "application/pdf").await?)
        .part("rules_file", file_part(&rules_path, "text/plain").await?);

    println!("\nCompliance check:");
    let response = client
        .post(format!("{}/compliance-check", base_url))
        .multipart(form)
        .send()
        .await?;

    println!("Status: {}", response.status());
    let body: serde_json::Value = response.json().await?;

    match body["results"].as_object() {
        Some(results) => {
            for (rule, answer) in results {
                println!("\n{}\n{}", rule, answer.as_str().unwrap_or_default());
            }
        }
        None => println!("Response: {}", serde_json::to_string_pretty(&body)?),
    }

    Ok(())
}

async fn file_part(path: &str, mime: &str) -> Result<Part, Box<dyn std::error::Error>> {
    let bytes = tokio::fs::read(path).await?;
    let filename = Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string());

    Ok(Part::bytes(bytes).file_name(filename).mime_str(mime)?)
}
