use backendless_rt::{ConnectionEvent, RtClient, RtClientOptions};
use std::time::Duration;

/// Watch reconnection behavior against a live server
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let client = RtClient::new(RtClientOptions::from_env()?)?;
    let mut events = client.connection_events();
    let mut errors = client.add_error_listener().await;

    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                ConnectionEvent::ReconnectAttempt { attempt, delay_ms } => {
                    println!("reconnect attempt {} in {}ms", attempt, delay_ms)
                }
                other => println!("connection event: {:?}", other),
            }
        }
    });
    tokio::spawn(async move {
        while let Some(fault) = errors.recv().await {
            println!("error: {}", fault);
        }
    });

    // Subscriptions survive reconnects
    let mut created = client.data("Person").add_create_listener(None).await?;
    tokio::spawn(async move {
        while let Some(Ok(person)) = created.recv().await {
            println!("created: {:?}", person);
        }
    });

    client.connect().await?;
    println!("Connected. Manual disconnect should not reconnect...");
    client.disconnect().await?;
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(!client.is_connected().await, "should stay disconnected");

    client.connect().await?;
    println!("Reconnected. Interrupt your network to watch automatic reconnection.");

    for i in 1..=30 {
        tokio::time::sleep(Duration::from_secs(1)).await;
        if i % 5 == 0 {
            println!("[{}s] state: {:?}", i, client.connection_state().await);
        }
    }

    client.disconnect().await?;
    Ok(())
}
