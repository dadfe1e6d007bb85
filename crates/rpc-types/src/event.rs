pub use runtime::event::{EventSink, IEventSink};
use serde::Serialize;
use ts_rs::TS;

use crate::notification::NotificationType;
use crate::RpcJobId;

/// A notification the host should display once a job reaches its outcome.
#[derive(Serialize, Clone, Debug, PartialEq, Eq, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NotificationEvent {
    pub job_id: RpcJobId,
    pub kind: NotificationType,
    pub title: String,
    pub success: bool,
}

/// Every job is done and the host may let the background service exit.
#[derive(Serialize, Clone, Debug, PartialEq, Eq, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ServiceStoppedEvent {
    #[serde(skip)]
    #[ts(skip)]
    _private: (),
}

#[derive(Serialize, Clone, Debug, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LogEvent {
    pub log: String,
}

#[derive(Serialize, Clone, Debug, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PanicEvent {
    pub message: String,
}

#[derive(Debug, TS)]
#[ts(export)]
#[ts(rename_all = "camelCase")]
pub enum Event {
    Notification(NotificationEvent),
    ServiceStopped(ServiceStoppedEvent),
    Log(LogEvent),
    Panic(PanicEvent),
}

impl Event {
    pub fn notification(
        job_id: RpcJobId,
        kind: NotificationType,
        title: String,
        success: bool,
    ) -> Self {
        Self::Notification(NotificationEvent {
            job_id,
            kind,
            title,
            success,
        })
    }
    pub fn service_stopped() -> Self {
        Self::ServiceStopped(ServiceStoppedEvent { _private: () })
    }
    pub fn log(log: String) -> Self {
        Self::Log(LogEvent { log })
    }
    pub fn panic(message: String) -> Self {
        Self::Panic(PanicEvent { message })
    }
}

pub trait TypedEventExt: IEventSink {
    fn typed_event(&self, event: &Event) {
        match event {
            Event::Notification(event) => {
                let body = serde_json::to_string(&event).expect("failed to json serialize");
                IEventSink::event(self, "notification".into(), body);
            }
            Event::ServiceStopped(event) => {
                let body = serde_json::to_string(&event).expect("failed to json serialize");
                IEventSink::event(self, "serviceStopped".into(), body);
            }
            Event::Log(event) => {
                let body = serde_json::to_string(&event).expect("failed to json serialize");
                IEventSink::event(self, "log".into(), body);
            }
            Event::Panic(event) => {
                let body = serde_json::to_string(&event).expect("failed to json serialize");
                IEventSink::event(self, "panic".into(), body);
            }
        }
    }
}

impl<T: IEventSink + ?Sized> TypedEventExt for T {}
