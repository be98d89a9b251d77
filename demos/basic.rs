use backendless_rt::{RtClient, RtClientOptions};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Create client
    let client = RtClient::new(RtClientOptions::new("your-app-id", "your-api-key"))?;

    // Connect
    println!("Connecting to Backendless realtime...");
    client.connect().await?;
    println!("Connected!");

    // Keep connection alive
    tokio::signal::ctrl_c().await?;

    // Disconnect
    println!("Disconnecting...");
    client.disconnect().await?;
    println!("Disconnected!");

    Ok(())
}
