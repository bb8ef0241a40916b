use std::net::IpAddr;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the server to
    pub bind_address: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Seed for the simulation RNG; fixed seeds reproduce combat rolls
    pub seed: u64,
    /// Bots spawned per team at startup (0 leaves the galaxy empty)
    pub initial_bots_per_team: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".parse().unwrap(),
            port: 8080,
            seed: 0xdead_beef,
            initial_bots_per_team: 0,
        }
    }
}

impl ServerConfig {
    /// Load config from environment or use defaults
    pub fn load_or_default() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("BIND_ADDRESS") {
            if let Ok(parsed) = addr.parse() {
                config.bind_address = parsed;
            }
        }

        if let Ok(port) = std::env::var("PORT") {
            if let Ok(parsed) = port.parse() {
                config.port = parsed;
            }
        }

        if let Ok(seed) = std::env::var("GAME_SEED") {
            if let Ok(parsed) = seed.parse() {
                config.seed = parsed;
            }
        }

        if let Ok(bots) = std::env::var("BOTS_PER_TEAM") {
            if let Ok(parsed) = bots.parse() {
                config.initial_bots_per_team = parsed;
            }
        }

        config
    }
}
