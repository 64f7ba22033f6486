mod camera;
pub mod kv;
mod location;
mod notifications;
mod permission;
mod timer;

pub use self::camera::{
    AspectRatio, Camera, CameraError, CameraOperation, CameraOutput, CapturedAsset,
    DevicePermission, LibraryPickConfig, PhotoConfig, VideoConfig,
};
pub use self::kv::{KeyNamespace, KvKey, StoreError, StoreKey};
pub use self::location::{
    Accuracy, Location, LocationError, LocationOperation, LocationOutput, Position,
};
pub use self::notifications::{
    Notifications, NotificationsError, NotificationsOperation, PermissionState,
};
pub use self::permission::PermissionStatus;
pub use self::timer::{Timer, TimerOperation, TimerOutput};

// Crux's built-in capabilities cover rendering, HTTP and the key-value store.
pub use crux_core::render::Render;
pub use crux_http::Http;
pub use crux_kv::KeyValue;

use crate::event::Event;

#[derive(crux_core::macros::Effect)]
pub struct Capabilities {
    pub render: Render<Event>,
    pub http: Http<Event>,
    pub key_value: KeyValue<Event>,
    pub location: Location<Event>,
    pub notifications: Notifications<Event>,
    pub camera: Camera<Event>,
    pub timer: Timer<Event>,
}
