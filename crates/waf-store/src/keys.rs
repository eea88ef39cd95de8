//! Key schema: a literal transcription of the persistent store layout
//! (spec §6.1, all keys prefixed `waf:`).

pub const VHOSTS_INDEX: &str = "waf:vhosts:index";
pub fn vhost_config(id: &str) -> String {
    format!("waf:vhosts:config:{id}")
}
pub const VHOSTS_HOSTS_EXACT: &str = "waf:vhosts:hosts:exact";
pub const VHOSTS_HOSTS_WILDCARD: &str = "waf:vhosts:hosts:wildcard";

pub const ENDPOINTS_INDEX: &str = "waf:endpoints:index";
pub fn endpoint_config(id: &str) -> String {
    format!("waf:endpoints:config:{id}")
}
pub const ENDPOINTS_PATHS_EXACT: &str = "waf:endpoints:paths:exact";
pub const ENDPOINTS_PATHS_PREFIX: &str = "waf:endpoints:paths:prefix";
pub const ENDPOINTS_PATHS_REGEX: &str = "waf:endpoints:paths:regex";

pub fn vhost_endpoints_index(vhost_id: &str) -> String {
    format!("waf:vhosts:endpoints:{vhost_id}:index")
}

pub const DEFENSE_PROFILES_INDEX: &str = "waf:defense_profiles:index";
pub fn defense_profile_config(id: &str) -> String {
    format!("waf:defense_profiles:config:{id}")
}
pub const DEFENSE_PROFILES_BUILTIN_VERSION: &str = "waf:defense_profiles:builtin_version";

pub const ATTACK_SIGNATURES_INDEX: &str = "waf:attack_signatures:index";
pub fn attack_signature_config(id: &str) -> String {
    format!("waf:attack_signatures:config:{id}")
}
pub const ATTACK_SIGNATURES_BUILTIN_VERSION: &str = "waf:attack_signatures:builtin_version";

pub const FINGERPRINT_PROFILES_INDEX: &str = "waf:fingerprint:profiles:index";
pub fn fingerprint_profile_config(id: &str) -> String {
    format!("waf:fingerprint:profiles:config:{id}")
}

pub const KEYWORDS_BLOCKED: &str = "waf:keywords:blocked";
pub const KEYWORDS_FLAGGED: &str = "waf:keywords:flagged";
pub const HASHES_BLOCKED: &str = "waf:hashes:blocked";
pub const WHITELIST_IPS: &str = "waf:whitelist:ips";

pub const CONFIG_THRESHOLDS: &str = "waf:config:thresholds";
pub const CONFIG_ROUTING: &str = "waf:config:routing";
pub const CONFIG_GEOIP: &str = "waf:config:geoip";
pub const CONFIG_REPUTATION: &str = "waf:config:reputation";
pub const CONFIG_TIMING_TOKEN: &str = "waf:config:timing_token";
pub const CONFIG_WEBHOOKS: &str = "waf:config:webhooks";

pub const CLUSTER_INSTANCES: &str = "waf:cluster:instances";
pub fn cluster_instance_heartbeat(id: &str) -> String {
    format!("waf:cluster:instance:{id}:heartbeat")
}
pub const CLUSTER_LEADER: &str = "waf:cluster:leader";

pub fn metrics_instance(id: &str) -> String {
    format!("waf:metrics:instance:{id}")
}
pub const METRICS_INSTANCE_PATTERN: &str = "waf:metrics:instance:*";
pub const METRICS_GLOBAL: &str = "waf:metrics:global";
pub const METRICS_GLOBAL_UPDATED: &str = "waf:metrics:global:updated";

pub fn fields_learned(vhost_id: &str, endpoint_id: &str) -> String {
    format!("waf:fields:{vhost_id}:{endpoint_id}")
}
