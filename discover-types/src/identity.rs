use uuid::Uuid;

/// A fresh v4 UUID, textual. `processId`/`instanceId` generation is an
/// external collaborator per the interface this crate is wire-compatible
/// with; this is the default generator used when the caller does not
/// supply its own identity strings.
pub fn new_v4_id() -> String {
    Uuid::new_v4().to_string()
}

/// The default election weight: take the current wall-clock
/// seconds-since-epoch and repeatedly divide by 10 until the magnitude
/// is below 1, then negate. Lands in the open interval (-1, 0) so any
/// user-supplied positive weight dominates by default, while still
/// giving two default-weighted instances a deterministic (if unlikely)
/// tie-break.
pub fn default_weight() -> f64 {
    let secs = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0);
    let mut x = secs;
    while x.abs() >= 1.0 {
        x /= 10.0;
    }
    -x
}

/// Resolve the local hostname, falling back to `"unknown"` if the OS
/// call fails (e.g. sandboxed environments without `gethostname`).
pub fn local_hostname() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_weight_is_negative_and_small() {
        let w = default_weight();
        assert!(w > -1.0 && w < 0.0, "weight {w} out of (-1, 0)");
    }

    #[test]
    fn ids_are_unique() {
        assert_ne!(new_v4_id(), new_v4_id());
    }
}
