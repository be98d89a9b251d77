use super::changes::{BulkEvent, DataEvent, DataObject, ObjectsChangesOptions};
use crate::listener::{EventReceiver, RtListener};
use crate::messaging::ListenerType;
use crate::types::Result;
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Data-change listeners for one table.
///
/// Each listener is an `OBJECTS_CHANGES` subscription. Listeners added while
/// disconnected are sent on the next connect.
///
/// # Example
///
/// ```no_run
/// use backendless_rt::{RtClient, RtClientOptions};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// # let client = RtClient::new(RtClientOptions::new("app-id", "api-key"))?;
/// client.connect().await?;
///
/// let people = client.data("Person");
/// let mut created = people.add_create_listener(Some("age > 20")).await?;
///
/// tokio::spawn(async move {
///     while let Some(Ok(person)) = created.recv().await {
///         println!("New person: {:?}", person);
///     }
/// });
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct EventHandler {
    table: String,
    listener: Arc<RtListener>,
}

impl EventHandler {
    pub fn new(table: String, listener: Arc<RtListener>) -> Self {
        Self { table, listener }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    async fn add_listener<T: DeserializeOwned>(
        &self,
        event: DataEvent,
        where_clause: Option<&str>,
    ) -> Result<EventReceiver<T>> {
        let mut options = ObjectsChangesOptions::new(self.table.clone(), event);
        if let Some(clause) = where_clause {
            options = options.where_clause(clause);
        }

        let (handle, rx) = self
            .listener
            .subscribe(ListenerType::ObjectsChanges, serde_json::to_value(&options)?)
            .await?;
        tracing::debug!(
            "Listening for {} on {} as {}",
            event,
            self.table,
            handle.id()
        );

        Ok(EventReceiver::new(rx))
    }

    pub async fn add_create_listener(
        &self,
        where_clause: Option<&str>,
    ) -> Result<EventReceiver<DataObject>> {
        self.add_listener(DataEvent::Created, where_clause).await
    }

    pub async fn add_update_listener(
        &self,
        where_clause: Option<&str>,
    ) -> Result<EventReceiver<DataObject>> {
        self.add_listener(DataEvent::Updated, where_clause).await
    }

    pub async fn add_delete_listener(
        &self,
        where_clause: Option<&str>,
    ) -> Result<EventReceiver<DataObject>> {
        self.add_listener(DataEvent::Deleted, where_clause).await
    }

    /// Receives the ids of objects created in bulk
    pub async fn add_bulk_create_listener(&self) -> Result<EventReceiver<Vec<String>>> {
        self.add_listener(DataEvent::BulkCreated, None).await
    }

    pub async fn add_bulk_update_listener(
        &self,
        where_clause: Option<&str>,
    ) -> Result<EventReceiver<BulkEvent>> {
        self.add_listener(DataEvent::BulkUpdated, where_clause).await
    }

    pub async fn add_bulk_delete_listener(
        &self,
        where_clause: Option<&str>,
    ) -> Result<EventReceiver<BulkEvent>> {
        self.add_listener(DataEvent::BulkDeleted, where_clause).await
    }

    /// Stops listeners for `event`; with `where_clause` only those registered
    /// with that exact clause. Returns how many were stopped.
    pub async fn remove_listeners(
        &self,
        event: DataEvent,
        where_clause: Option<&str>,
    ) -> Result<usize> {
        let table = self.table.as_str();
        self.listener
            .stop_matching(ListenerType::ObjectsChanges, |options| {
                ObjectsChangesOptions::matches(options, table, event, where_clause)
            })
            .await
    }

    /// Stops every listener on this table
    pub async fn remove_all_listeners(&self) -> Result<usize> {
        let table = self.table.as_str();
        self.listener
            .stop_matching(ListenerType::ObjectsChanges, |options| {
                options.get("tableName").and_then(|t| t.as_str()) == Some(table)
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ConnectionManager, ConnectionState};
    use crate::messaging::ProtocolEvent;
    use crate::types::{RtMessage, SubscriptionResult};
    use serde_json::json;
    use tokio::sync::mpsc;
    use tokio_tungstenite::tungstenite::Message;

    async fn open_handler(table: &str) -> (EventHandler, mpsc::UnboundedReceiver<Message>) {
        let connection = Arc::new(ConnectionManager::new());
        let (tx, rx) = mpsc::unbounded_channel();
        connection.set_outbox(tx).await;
        connection.set_state(ConnectionState::Open).await;
        let listener = Arc::new(RtListener::new(connection));
        (EventHandler::new(table.to_string(), listener), rx)
    }

    fn drain_frames(rx: &mut mpsc::UnboundedReceiver<Message>) -> Vec<RtMessage> {
        let mut frames = Vec::new();
        while let Ok(Message::Text(text)) = rx.try_recv() {
            frames.push(serde_json::from_str(&text).unwrap());
        }
        frames
    }

    #[tokio::test]
    async fn test_create_listener_subscribes_with_where_clause() {
        let (people, mut frames) = open_handler("Person").await;
        people.add_create_listener(Some("age > 20")).await.unwrap();

        let frames = drain_frames(&mut frames);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].event, ProtocolEvent::SubOn);
        assert_eq!(frames[0].data["name"], "OBJECTS_CHANGES");
        assert_eq!(
            frames[0].data["options"],
            json!({ "tableName": "Person", "event": "created", "whereClause": "age > 20" })
        );
    }

    #[tokio::test]
    async fn test_typed_delivery() {
        let (people, mut frames) = open_handler("Person").await;
        let mut created = people.add_create_listener(None).await.unwrap();
        let mut bulk = people.add_bulk_delete_listener(None).await.unwrap();

        let ids: Vec<String> = drain_frames(&mut frames)
            .iter()
            .map(|frame| frame.data["id"].as_str().unwrap().to_string())
            .collect();

        people
            .listener
            .handle_subscription_result(SubscriptionResult {
                id: ids[0].clone(),
                data: Some(json!({ "objectId": "A1", "name": "Bob" })),
                error: None,
            })
            .await;
        people
            .listener
            .handle_subscription_result(SubscriptionResult {
                id: ids[1].clone(),
                data: Some(json!({ "whereClause": "age > 90", "count": 2 })),
                error: None,
            })
            .await;

        let person = created.recv().await.unwrap().unwrap();
        assert_eq!(person["name"], "Bob");

        let deleted = bulk.recv().await.unwrap().unwrap();
        assert_eq!(deleted.count, 2);
    }

    #[tokio::test]
    async fn test_remove_listeners_by_event_and_clause() {
        let (people, mut frames) = open_handler("Person").await;
        people.add_update_listener(Some("age > 20")).await.unwrap();
        people.add_update_listener(None).await.unwrap();
        people.add_delete_listener(None).await.unwrap();
        drain_frames(&mut frames);

        let stopped = people
            .remove_listeners(DataEvent::Updated, Some("age > 20"))
            .await
            .unwrap();
        assert_eq!(stopped, 1);

        let stopped = people.remove_listeners(DataEvent::Updated, None).await.unwrap();
        assert_eq!(stopped, 1);

        let offs = drain_frames(&mut frames);
        assert_eq!(offs.len(), 2);
        assert!(offs.iter().all(|f| f.event == ProtocolEvent::SubOff));
        assert_eq!(people.listener.subscription_count().await, 1);
    }

    #[tokio::test]
    async fn test_remove_all_listeners_leaves_other_tables() {
        let (people, _frames) = open_handler("Person").await;
        let orders = EventHandler::new("Order".to_string(), Arc::clone(&people.listener));

        people.add_create_listener(None).await.unwrap();
        people.add_bulk_create_listener().await.unwrap();
        orders.add_create_listener(None).await.unwrap();

        assert_eq!(people.remove_all_listeners().await.unwrap(), 2);
        assert_eq!(people.listener.subscription_count().await, 1);
    }
}
