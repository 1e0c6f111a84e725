/// The routing mode selected at bind time. Precedence when a caller
/// configures more than one: unicast beats multicast beats broadcast —
/// callers build this enum after applying that precedence themselves
/// (see `discover_types::Options::transport_mode`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindMode {
    Broadcast { destination: String },
    Multicast { group: String, ttl: u8 },
    Unicast { destinations: Vec<String> },
}

/// Everything needed to bind one UDP endpoint.
#[derive(Debug, Clone)]
pub struct BindConfig {
    pub address: String,
    pub port: u16,
    pub mode: BindMode,
    pub reuse_addr: bool,
}
