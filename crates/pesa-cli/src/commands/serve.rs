//! Server command implementation

use std::path::Path;

use anyhow::Result;

use super::open_db;

pub async fn cmd_serve(
    db_path: &Path,
    host: &str,
    port: u16,
    allowed_origins: Vec<String>,
    no_encrypt: bool,
) -> Result<()> {
    println!("🚀 Starting Pesa web server...");
    println!("   Database: {}", db_path.display());
    println!("   Listening: http://{}:{}", host, port);
    if !allowed_origins.is_empty() {
        println!("   🌐 Allowed origins: {}", allowed_origins.join(", "));
    }
    if no_encrypt {
        println!("   ⚠️  Encryption DISABLED (--no-encrypt)");
    }
    println!();
    println!("   Press Ctrl+C to stop");

    let db = open_db(db_path, no_encrypt)?;

    let config = pesa_server::ServerConfig { allowed_origins };
    pesa_server::serve_with_config(db, host, port, config).await?;

    Ok(())
}
