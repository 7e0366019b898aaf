mod alert;
mod item;

pub use alert::{AlertKind, AlertRecord, DeliveryStatus};
pub use item::{Item, Snapshot};
