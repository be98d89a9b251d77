use crate::types::Result;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::marker::PhantomData;
use tokio::sync::mpsc;

/// Typed view over a listener's raw delivery channel.
///
/// Each payload is decoded on receipt; a payload that does not match `T`
/// yields an error for that item without closing the stream.
#[derive(Debug)]
pub struct EventReceiver<T> {
    rx: mpsc::Receiver<Value>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> EventReceiver<T> {
    pub fn new(rx: mpsc::Receiver<Value>) -> Self {
        Self {
            rx,
            _marker: PhantomData,
        }
    }

    /// Receives the next payload, or `None` once the listener is stopped.
    pub async fn recv(&mut self) -> Option<Result<T>> {
        let value = self.rx.recv().await?;
        Some(serde_json::from_value(value).map_err(Into::into))
    }

    pub fn into_inner(self) -> mpsc::Receiver<Value> {
        self.rx
    }
}
