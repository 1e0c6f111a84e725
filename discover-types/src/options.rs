use std::time::Duration;

use serde_json::Value;

use crate::error::DiscoverError;
use crate::identity::{default_weight, local_hostname};

/// The bit-exact-compatible configuration table of the interface this
/// core is wire-compatible with. Every field here corresponds to one
/// row of that table; [`Options::set_option`]/[`Options::get_option`]
/// expose the same string-keyed surface the reference implementation's
/// API uses, routed internally to these typed fields.
#[derive(Debug, Clone)]
pub struct Options {
    pub hello_interval: Duration,
    pub check_interval: Duration,
    pub node_timeout: Duration,
    pub master_timeout: Duration,
    pub address: String,
    pub port: u16,
    pub broadcast: String,
    pub multicast: Option<String>,
    pub multicast_ttl: u8,
    pub unicast: Vec<String>,
    /// Reserved. Accepted and stored; never used for encryption.
    pub key: Option<String>,
    pub masters_required: u32,
    pub weight: f64,
    pub client: bool,
    pub reuse_addr: bool,
    pub ignore_process: bool,
    pub ignore_instance: bool,
    pub advertisement: Option<Value>,
    pub hostname: String,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            hello_interval: Duration::from_millis(1000),
            check_interval: Duration::from_millis(2000),
            node_timeout: Duration::from_millis(2000),
            master_timeout: Duration::from_millis(2000),
            address: "0.0.0.0".to_string(),
            port: 12345,
            broadcast: "255.255.255.255".to_string(),
            multicast: None,
            multicast_ttl: 1,
            unicast: Vec::new(),
            key: None,
            masters_required: 1,
            weight: default_weight(),
            client: false,
            reuse_addr: true,
            ignore_process: true,
            ignore_instance: true,
            advertisement: None,
            hostname: local_hostname(),
        }
    }
}

impl Options {
    pub fn builder() -> OptionsBuilder {
        OptionsBuilder::default()
    }

    /// `checkInterval ≤ nodeTimeout ≤ masterTimeout`, per the
    /// configuration table. Checked on construction and on every
    /// mutating `set_option` call; a violation leaves the previous
    /// state untouched.
    pub fn validate(&self) -> Result<(), DiscoverError> {
        if self.check_interval > self.node_timeout {
            return Err(DiscoverError::ConfigurationInvalid(format!(
                "checkInterval ({:?}) must be <= nodeTimeout ({:?})",
                self.check_interval, self.node_timeout
            )));
        }
        if self.node_timeout > self.master_timeout {
            return Err(DiscoverError::ConfigurationInvalid(format!(
                "nodeTimeout ({:?}) must be <= masterTimeout ({:?})",
                self.node_timeout, self.master_timeout
            )));
        }
        Ok(())
    }

    /// Selected transport mode, by the precedence rule: unicast beats
    /// multicast beats broadcast.
    pub fn transport_mode(&self) -> TransportMode {
        if !self.unicast.is_empty() {
            TransportMode::Unicast(self.unicast.clone())
        } else if let Some(group) = &self.multicast {
            TransportMode::Multicast(group.clone())
        } else {
            TransportMode::Broadcast(self.broadcast.clone())
        }
    }

    /// String-keyed option write, for wire/API compatibility with the
    /// reference implementation. Rejected (state unchanged) if the
    /// value fails to parse for that key or would violate the interval
    /// ordering invariant.
    pub fn set_option(&mut self, name: &str, value: OptionValue) -> Result<(), DiscoverError> {
        let mut next = self.clone();
        match name {
            "helloInterval" => next.hello_interval = Duration::from_millis(value.as_u64(name)?),
            "checkInterval" => next.check_interval = Duration::from_millis(value.as_u64(name)?),
            "nodeTimeout" => next.node_timeout = Duration::from_millis(value.as_u64(name)?),
            "masterTimeout" => next.master_timeout = Duration::from_millis(value.as_u64(name)?),
            "address" => next.address = value.as_string(name)?,
            "port" => next.port = value.as_u64(name)? as u16,
            "broadcast" => next.broadcast = value.as_string(name)?,
            "multicast" => next.multicast = Some(value.as_string(name)?),
            "multicastTTL" => next.multicast_ttl = value.as_u64(name)? as u8,
            "unicast" => {
                next.unicast = value
                    .as_string(name)?
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect();
            }
            "key" => next.key = Some(value.as_string(name)?),
            "mastersRequired" => next.masters_required = value.as_u64(name)? as u32,
            "weight" => next.weight = value.as_f64(name)?,
            "client" => next.client = value.as_bool(name)?,
            "reuseAddr" => next.reuse_addr = value.as_bool(name)?,
            "ignoreProcess" => next.ignore_process = value.as_bool(name)?,
            "ignoreInstance" => next.ignore_instance = value.as_bool(name)?,
            "advertisement" => next.advertisement = Some(value.as_json(name)?),
            "hostname" => next.hostname = value.as_string(name)?,
            other => {
                return Err(DiscoverError::ConfigurationInvalid(format!(
                    "unknown option `{other}`"
                )))
            }
        }
        next.validate()?;
        *self = next;
        Ok(())
    }

    pub fn get_option(&self, name: &str) -> Option<OptionValue> {
        Some(match name {
            "helloInterval" => OptionValue::UInt(self.hello_interval.as_millis() as u64),
            "checkInterval" => OptionValue::UInt(self.check_interval.as_millis() as u64),
            "nodeTimeout" => OptionValue::UInt(self.node_timeout.as_millis() as u64),
            "masterTimeout" => OptionValue::UInt(self.master_timeout.as_millis() as u64),
            "address" => OptionValue::Str(self.address.clone()),
            "port" => OptionValue::UInt(self.port as u64),
            "broadcast" => OptionValue::Str(self.broadcast.clone()),
            "multicast" => OptionValue::Str(self.multicast.clone()?),
            "multicastTTL" => OptionValue::UInt(self.multicast_ttl as u64),
            "unicast" => OptionValue::Str(self.unicast.join(",")),
            "key" => OptionValue::Str(self.key.clone()?),
            "mastersRequired" => OptionValue::UInt(self.masters_required as u64),
            "weight" => OptionValue::Float(self.weight),
            "client" => OptionValue::Bool(self.client),
            "reuseAddr" => OptionValue::Bool(self.reuse_addr),
            "ignoreProcess" => OptionValue::Bool(self.ignore_process),
            "ignoreInstance" => OptionValue::Bool(self.ignore_instance),
            "advertisement" => OptionValue::Json(self.advertisement.clone()?),
            "hostname" => OptionValue::Str(self.hostname.clone()),
            _ => return None,
        })
    }
}

/// Selected bind/send mode, precedence resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportMode {
    Broadcast(String),
    Multicast(String),
    Unicast(Vec<String>),
}

/// A value passed to [`Options::set_option`] / returned from
/// [`Options::get_option`]. Keeps the string-keyed API boundary typed
/// without forcing every caller through JSON.
#[derive(Debug, Clone)]
pub enum OptionValue {
    UInt(u64),
    Float(f64),
    Bool(bool),
    Str(String),
    Json(Value),
}

impl OptionValue {
    fn as_u64(&self, name: &str) -> Result<u64, DiscoverError> {
        match self {
            OptionValue::UInt(v) => Ok(*v),
            OptionValue::Float(v) if *v >= 0.0 => Ok(*v as u64),
            _ => Err(DiscoverError::ConfigurationInvalid(format!(
                "`{name}` expects a non-negative integer"
            ))),
        }
    }

    fn as_f64(&self, name: &str) -> Result<f64, DiscoverError> {
        match self {
            OptionValue::Float(v) => Ok(*v),
            OptionValue::UInt(v) => Ok(*v as f64),
            _ => Err(DiscoverError::ConfigurationInvalid(format!(
                "`{name}` expects a number"
            ))),
        }
    }

    fn as_bool(&self, name: &str) -> Result<bool, DiscoverError> {
        match self {
            OptionValue::Bool(v) => Ok(*v),
            _ => Err(DiscoverError::ConfigurationInvalid(format!(
                "`{name}` expects a bool"
            ))),
        }
    }

    fn as_string(&self, name: &str) -> Result<String, DiscoverError> {
        match self {
            OptionValue::Str(v) => Ok(v.clone()),
            _ => Err(DiscoverError::ConfigurationInvalid(format!(
                "`{name}` expects a string"
            ))),
        }
    }

    fn as_json(&self, name: &str) -> Result<Value, DiscoverError> {
        match self {
            OptionValue::Json(v) => Ok(v.clone()),
            OptionValue::Str(v) => Ok(Value::String(v.clone())),
            _ => Err(DiscoverError::ConfigurationInvalid(format!(
                "`{name}` expects a JSON value"
            ))),
        }
    }
}

/// Ergonomic, typed alternative to the string-keyed API for
/// constructing [`Options`] at `Instance::create` time.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub struct OptionsBuilder {
    opts: Options,
}

impl Default for OptionsBuilder {
    fn default() -> Self {
        Self {
            opts: Options::default(),
        }
    }
}

macro_rules! builder_field {
    ($name:ident, $ty:ty) => {
        pub fn $name(mut self, value: $ty) -> Self {
            self.opts.$name = value;
            self
        }
    };
}

impl OptionsBuilder {
    builder_field!(hello_interval, Duration);
    builder_field!(check_interval, Duration);
    builder_field!(node_timeout, Duration);
    builder_field!(master_timeout, Duration);
    builder_field!(address, String);
    builder_field!(port, u16);
    builder_field!(broadcast, String);
    builder_field!(multicast_ttl, u8);
    builder_field!(masters_required, u32);
    builder_field!(weight, f64);
    builder_field!(client, bool);
    builder_field!(reuse_addr, bool);
    builder_field!(ignore_process, bool);
    builder_field!(ignore_instance, bool);
    builder_field!(hostname, String);

    pub fn multicast(mut self, group: impl Into<String>) -> Self {
        self.opts.multicast = Some(group.into());
        self
    }

    pub fn unicast(mut self, addrs: Vec<String>) -> Self {
        self.opts.unicast = addrs;
        self
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.opts.key = Some(key.into());
        self
    }

    pub fn advertisement(mut self, value: Value) -> Self {
        self.opts.advertisement = Some(value);
        self
    }

    pub fn build(self) -> Result<Options, DiscoverError> {
        self.opts.validate()?;
        Ok(self.opts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_are_valid() {
        Options::default().validate().unwrap();
    }

    #[test]
    fn interval_ordering_is_enforced() {
        let mut opts = Options::default();
        let err = opts.set_option(
            "nodeTimeout",
            OptionValue::UInt(100), // below checkInterval default of 2000
        );
        assert!(err.is_err());
        // state unchanged on rejection
        assert_eq!(opts.node_timeout, Duration::from_millis(2000));
    }

    #[test]
    fn set_then_get_round_trips() {
        let mut opts = Options::default();
        opts.set_option("weight", OptionValue::Float(3.5)).unwrap();
        match opts.get_option("weight") {
            Some(OptionValue::Float(v)) => assert_eq!(v, 3.5),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unicast_overrides_multicast_and_broadcast() {
        let mut opts = Options::default();
        opts.set_option("multicast", OptionValue::Str("239.1.1.1".into()))
            .unwrap();
        opts.set_option("unicast", OptionValue::Str("10.0.0.1,10.0.0.2".into()))
            .unwrap();
        match opts.transport_mode() {
            TransportMode::Unicast(list) => {
                assert_eq!(list, vec!["10.0.0.1".to_string(), "10.0.0.2".to_string()])
            }
            other => panic!("expected unicast, got {other:?}"),
        }
    }

    #[test]
    fn unknown_option_is_rejected() {
        let mut opts = Options::default();
        assert!(opts.set_option("bogus", OptionValue::Bool(true)).is_err());
    }
}
