use std::sync::Arc;
use std::time::Duration;

use async_broadcast::{broadcast, InactiveReceiver, Receiver, Sender, TrySendError};
use tracing::{debug, warn};

use crate::domain::entities::Party;
use crate::infrastructure::persistence::Debouncer;
use crate::infrastructure::stores::PartyStore;

/// Event pushed to SSE subscribers
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartyEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub party_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member_id: Option<String>,
    #[serde(flatten)]
    pub data: serde_json::Value,
    pub timestamp: i64,
}

impl PartyEvent {
    pub fn new(event_type: &str, party_id: Option<String>) -> Self {
        Self {
            event_type: event_type.to_string(),
            party_id,
            member_id: None,
            data: serde_json::Value::Object(serde_json::Map::new()),
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn with_member(mut self, member_id: &str) -> Self {
        self.member_id = Some(member_id.to_string());
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }
}

/// Fan-out of party events to SSE subscribers.
///
/// Party-scoped events (`partyUpdated`, `memberKicked`) go out immediately.
/// The global list event (`partiesUpdated`) is debounced: any burst of
/// mutations inside the window collapses into one broadcast carrying the
/// current listing.
pub struct Broadcaster {
    sender: Sender<PartyEvent>,
    // Keeps the channel open with zero SSE subscribers, without buffering
    _receiver: InactiveReceiver<PartyEvent>,
    list_update: Debouncer,
}

impl Broadcaster {
    pub fn new(debounce: Duration, store: Arc<PartyStore>) -> Self {
        let (sender, receiver) = broadcast(1000);

        let list_update = {
            let sender = sender.clone();
            Debouncer::new(debounce, move || {
                let parties = store.list_parties();
                let event = PartyEvent::new("partiesUpdated", None)
                    .with_data(serde_json::json!({ "parties": parties }));
                dispatch(&sender, event);
            })
        };

        Self {
            sender,
            _receiver: receiver.deactivate(),
            list_update,
        }
    }

    pub fn subscribe(&self) -> Receiver<PartyEvent> {
        self.sender.new_receiver()
    }

    /// Schedule the coalesced listing broadcast. Called after any mutation
    /// that changes what the lobby shows.
    pub fn schedule_list_update(&self) {
        self.list_update.arm();
    }

    /// Push the party's fresh detail to its members, then schedule the
    /// listing update.
    pub fn party_updated(&self, party: &Party) {
        let event = PartyEvent::new("partyUpdated", Some(party.id.clone()))
            .with_data(serde_json::json!({ "party": party.detail() }));
        self.send(event);
        self.schedule_list_update();
    }

    /// Tell a kicked member's client it was removed, ahead of the general
    /// party update.
    pub fn member_kicked(&self, party_id: &str, member_id: &str) {
        let event =
            PartyEvent::new("memberKicked", Some(party_id.to_string())).with_member(member_id);
        self.send(event);
    }

    /// Signal that a party is gone (expired or emptied).
    pub fn party_removed(&self, party_id: &str) {
        let event = PartyEvent::new("partyRemoved", Some(party_id.to_string()));
        self.send(event);
        self.schedule_list_update();
    }

    fn send(&self, event: PartyEvent) {
        debug!(event_type = %event.event_type, "broadcasting");
        dispatch(&self.sender, event);
    }
}

fn dispatch(sender: &Sender<PartyEvent>, event: PartyEvent) {
    match sender.try_broadcast(event) {
        Ok(_) => {}
        // Nobody listening right now; the event is moot anyway
        Err(TrySendError::Inactive(_)) => {}
        Err(err) => warn!(error = ?err, "event broadcast failed"),
    }
}
