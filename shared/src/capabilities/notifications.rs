use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum PermissionState {
    #[default]
    NotDetermined,
    Denied,
    Authorized,
    Provisional,
    Ephemeral,
}

impl PermissionState {
    #[must_use]
    pub const fn is_authorized(self) -> bool {
        matches!(self, Self::Authorized | Self::Provisional | Self::Ephemeral)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "op", content = "data")]
pub enum NotificationsOperation {
    RequestPermission,
}

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum NotificationsError {
    #[error("notifications not available on this platform")]
    NotAvailable,

    #[error("operation timed out")]
    Timeout,

    #[error("unknown error: {message}")]
    Unknown { message: String },
}

impl Operation for NotificationsOperation {
    type Output = Result<PermissionState, NotificationsError>;
}

pub struct Notifications<Ev> {
    context: CapabilityContext<NotificationsOperation, Ev>,
}

impl<Ev> Capability<Ev> for Notifications<Ev> {
    type Operation = NotificationsOperation;
    type MappedSelf<MappedEv> = Notifications<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        Notifications::new(self.context.map_event(f))
    }
}

impl<Ev> Notifications<Ev>
where
    Ev: 'static,
{
    pub fn new(context: CapabilityContext<NotificationsOperation, Ev>) -> Self {
        Self { context }
    }

    pub fn request_permission<F>(&self, make_event: F)
    where
        F: FnOnce(Result<PermissionState, NotificationsError>) -> Ev + Send + 'static,
    {
        let context = self.context.clone();
        self.context.spawn(async move {
            let state = context
                .request_from_shell(NotificationsOperation::RequestPermission)
                .await;
            context.update_app(make_event(state));
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_state_checks() {
        assert!(PermissionState::Authorized.is_authorized());
        assert!(PermissionState::Provisional.is_authorized());
        assert!(PermissionState::Ephemeral.is_authorized());
        assert!(!PermissionState::Denied.is_authorized());
        assert!(!PermissionState::NotDetermined.is_authorized());
    }

    #[test]
    fn test_operation_serialization() {
        let json = serde_json::to_string(&NotificationsOperation::RequestPermission).unwrap();
        assert_eq!(json, r#"{"op":"RequestPermission"}"#);
    }
}
