use std::path::PathBuf;
use std::time::Duration;

/// Dispatcher configuration, shared read-only by the [`crate::manager::Manager`].
///
/// Values here are the fully-merged result (CLI flags > JSON file > these
/// defaults); merging itself happens in the `stager` binary crate, not here.
/// This struct is plain data so `stager-core` doesn't need to know about
/// `clap` or config file formats.
#[derive(Debug, Clone)]
pub struct Config {
    /// Stripped from the tail of the Host header to obtain the tenant name.
    pub domain_suffix: String,
    /// `host:port` the front door listens on.
    pub listen: String,
    /// First port handed out by the port pool.
    pub base_port: u16,
    /// Size of the port pool / maximum concurrently-live workers.
    pub max_instances: usize,
    /// Text template (minijinja) rendered with `port`/`name` to produce a
    /// worker's `target_url`. Default renders `http://127.0.0.1:{{ port }}`.
    pub proxy_format: String,
    /// argv for the child process. `argv[0]` is the executable.
    pub init_command: Vec<String>,
    /// How long a worker may sit idle (no forwarded request) before the
    /// Supervisor Loop interrupts it.
    pub idle_time: Duration,
    /// Directory static assets and the loading-page template are served
    /// from. `None` falls back to the built-in loading page with no static
    /// asset serving.
    pub resource_dir: Option<PathBuf>,
    /// How long the Dispatch Handler blocks a non-idempotent request for a
    /// not-yet-ready worker before responding 504. Zero disables holding
    /// (falls back to the loading page for every method).
    pub hold_for: Duration,
    /// Readiness Prober cadence.
    pub check_delay: Duration,
    /// Readiness Prober attempt budget.
    pub check_attempts: u32,
    /// Supervisor Loop idle-scan period.
    pub idle_check: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            domain_suffix: ".stager:8000".to_string(),
            listen: "127.0.0.1:8000".to_string(),
            base_port: 4200,
            max_instances: 100,
            proxy_format: "http://127.0.0.1:{{ port }}".to_string(),
            init_command: Vec::new(),
            idle_time: Duration::from_secs(5 * 60),
            resource_dir: None,
            hold_for: Duration::ZERO,
            check_delay: Duration::from_millis(200),
            check_attempts: 1000,
            idle_check: Duration::from_secs(10),
        }
    }
}

impl Config {
    /// Derive the tenant name by stripping `domain_suffix` from the tail of
    /// `host`. Suffix match is by length only, no further validation.
    pub fn tenant_name<'a>(&self, host: &'a str) -> &'a str {
        let suffix_len = self.domain_suffix.len();
        if host.len() > suffix_len {
            &host[..host.len() - suffix_len]
        } else {
            host
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tenant_name_strips_suffix_by_length() {
        let cfg = Config {
            domain_suffix: ".t:80".to_string(),
            ..Default::default()
        };
        assert_eq!(cfg.tenant_name("a.t:80"), "a");
        assert_eq!(cfg.tenant_name("my-tenant.t:80"), "my-tenant");
    }

    #[test]
    fn tenant_name_falls_back_when_host_not_longer_than_suffix() {
        let cfg = Config {
            domain_suffix: ".t:80".to_string(),
            ..Default::default()
        };
        // Shorter than / equal to the suffix: nothing sensible to strip.
        assert_eq!(cfg.tenant_name(".t:80"), ".t:80");
        assert_eq!(cfg.tenant_name("x"), "x");
    }

    #[test]
    fn defaults_match_spec() {
        let cfg = Config::default();
        assert_eq!(cfg.domain_suffix, ".stager:8000");
        assert_eq!(cfg.listen, "127.0.0.1:8000");
        assert_eq!(cfg.base_port, 4200);
        assert_eq!(cfg.max_instances, 100);
        assert_eq!(cfg.idle_time, Duration::from_secs(300));
    }
}
