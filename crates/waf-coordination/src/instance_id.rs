//! Stable instance id resolution (spec §3 "Instance Record").
//!
//! Prefers the host's own name (what an operator sees in `hostname` or a
//! container's pod name); falls back to `unknown-<pid>` so two instances on
//! the same unnamed host never collide.

pub fn resolve() -> String {
    hostname_from_env().unwrap_or_else(|| format!("unknown-{}", std::process::id()))
}

fn hostname_from_env() -> Option<String> {
    std::env::var("HOSTNAME")
        .ok()
        .or_else(|| std::env::var("POD_NAME").ok())
        .filter(|s| !s.is_empty())
}
