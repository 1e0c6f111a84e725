use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The single on-the-wire shape: one JSON object per UDP datagram, no
/// framing. `data` is opaque for anything other than `event == "hello"`,
/// where it must decode into [`HelloData`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub event: String,
    pub pid: String,
    pub iid: String,
    #[serde(rename = "hostName")]
    pub host_name: String,
    pub data: Value,
}

impl Envelope {
    pub const HELLO_EVENT: &'static str = "hello";

    pub fn is_hello(&self) -> bool {
        self.event == Self::HELLO_EVENT
    }
}

/// The `data` object carried by a `"hello"` envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelloData {
    #[serde(rename = "isMaster")]
    pub is_master: bool,
    #[serde(rename = "isMasterEligible")]
    pub is_master_eligible: bool,
    pub weight: f64,
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advertisement: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hello_envelope_round_trips() {
        let env = Envelope {
            event: "hello".to_string(),
            pid: "p1".to_string(),
            iid: "i1".to_string(),
            host_name: "host-a".to_string(),
            data: serde_json::to_value(HelloData {
                is_master: true,
                is_master_eligible: true,
                weight: 1.5,
                address: "10.0.0.1".to_string(),
                advertisement: Some(serde_json::json!({"role": "worker"})),
            })
            .unwrap(),
        };
        let bytes = serde_json::to_vec(&env).unwrap();
        let back: Envelope = serde_json::from_slice(&bytes).unwrap();
        assert!(back.is_hello());
        let data: HelloData = serde_json::from_value(back.data).unwrap();
        assert!(data.is_master);
        assert_eq!(data.advertisement.unwrap()["role"], "worker");
    }

    #[test]
    fn channel_event_keeps_opaque_data() {
        let env = Envelope {
            event: "sensor.temp".to_string(),
            pid: "p1".to_string(),
            iid: "i1".to_string(),
            host_name: "host-a".to_string(),
            data: serde_json::json!({"celsius": 21.5}),
        };
        let bytes = serde_json::to_vec(&env).unwrap();
        let back: Envelope = serde_json::from_slice(&bytes).unwrap();
        assert!(!back.is_hello());
        assert_eq!(back.data["celsius"], 21.5);
    }
}
