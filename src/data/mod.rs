// Data module - Table change listeners
mod changes;
mod event_handler;

pub use changes::{BulkEvent, DataEvent, DataObject, ObjectsChangesOptions};
pub use event_handler::EventHandler;
