use rand::Rng;
use slidegrab_core::BrowserConfig;

/// Common desktop user agents
const USER_AGENTS: [&str; 3] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
];

/// Identity a session presents to the site
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FingerprintConfig {
    pub user_agent: String,
    pub viewport_width: u32,
    pub viewport_height: u32,
}

impl FingerprintConfig {
    /// Generate a randomized fingerprint configuration
    pub fn randomized() -> Self {
        let mut rng = rand::thread_rng();

        // Common viewport sizes
        let viewports = [(1920, 1080), (1366, 768), (1536, 864), (1440, 900)];

        let ua_idx = rng.gen_range(0..USER_AGENTS.len());
        let vp_idx = rng.gen_range(0..viewports.len());
        let (width, height) = viewports[vp_idx];

        Self {
            user_agent: USER_AGENTS[ua_idx].to_string(),
            viewport_width: width,
            viewport_height: height,
        }
    }

    /// Configured window size; the configured user agent, or a random one
    /// when none is set.
    pub fn from_config(config: &BrowserConfig) -> Self {
        let user_agent = if config.user_agent.trim().is_empty() {
            Self::randomized().user_agent
        } else {
            config.user_agent.clone()
        };

        Self {
            user_agent,
            viewport_width: config.window_width,
            viewport_height: config.window_height,
        }
    }
}
