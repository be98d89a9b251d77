use backendless_rt::{RtClient, RtClientOptions};

/// Listen for changes to a Backendless table
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "backendless_rt=info".into()),
        )
        .init();

    let table = std::env::var("BACKENDLESS_TABLE").unwrap_or_else(|_| "Person".to_string());

    let client = RtClient::new(RtClientOptions::from_env()?)?;
    client.connect().await?;
    println!("Connected, listening on table {}\n", table);

    let people = client.data(&table);
    let mut created = people.add_create_listener(None).await?;
    let mut updated = people.add_update_listener(None).await?;
    let mut deleted = people.add_delete_listener(None).await?;
    let mut bulk_deleted = people.add_bulk_delete_listener(None).await?;

    loop {
        tokio::select! {
            Some(object) = created.recv() => println!("created: {:?}", object?),
            Some(object) = updated.recv() => println!("updated: {:?}", object?),
            Some(object) = deleted.recv() => println!("deleted: {:?}", object?),
            Some(bulk) = bulk_deleted.recv() => {
                let bulk = bulk?;
                println!("bulk delete of {} objects where {:?}", bulk.count, bulk.where_clause);
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    people.remove_all_listeners().await?;
    client.disconnect().await?;
    Ok(())
}
