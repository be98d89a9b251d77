use backendless_rt::{RtClient, RtClientOptions};
use serde_json::json;

/// Join a channel, watch its users and publish a message
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let client = RtClient::new(RtClientOptions::from_env()?)?;
    client.connect().await?;

    let channel = client.channel("default").await;

    // Listeners added before join are registered with it
    let mut messages = channel.add_message_listener(None).await?;
    let mut commands = channel.add_command_listener().await?;
    let mut users = channel.add_user_status_listener().await?;

    channel.join().await?;
    println!("Joined channel {}\n", channel.name());

    let status = channel
        .publish(json!({ "text": "hello from rust" }), None)
        .await?;
    println!("Published: {:?}", status);

    channel
        .send_command("TYPING_START", json!({ "field": "message" }))
        .await?;

    loop {
        tokio::select! {
            Some(message) = messages.recv() => {
                let message = message?;
                println!("message from {:?}: {}", message.publisher_id, message.data);
            }
            Some(command) = commands.recv() => {
                let command = command?;
                println!("command {} from {:?}", command.command_type, command.user_id);
            }
            Some(event) = users.recv() => {
                println!("{:?}: {} users now present", event?.status, channel.users().len());
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    channel.leave().await?;
    client.disconnect().await?;
    Ok(())
}
