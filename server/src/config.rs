use clap::Parser;
use cinematch_core::CollisionPolicy;
use std::time::Duration;

#[derive(Parser, Debug, Clone)]
#[command(name = "server", about = "Movie recommendation API")]
pub struct Args {
    /// Artifact directory produced by the indexer
    #[arg(long, env = "CINEMATCH_INDEX", default_value = "./index")]
    pub index: String,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8000)]
    pub port: u16,
    /// TMDB v3 API key
    #[arg(long, env = "TMDB_API_KEY", hide_env_values = true)]
    pub tmdb_api_key: String,
    #[arg(long, env = "TMDB_BASE_URL", default_value = "https://api.themoviedb.org/3")]
    pub tmdb_base_url: String,
    /// Per-request timeout for TMDB calls
    #[arg(long, default_value_t = 20)]
    pub tmdb_timeout_secs: u64,
    /// Fail loading when two titles normalize to the same key
    #[arg(long, default_value_t = false)]
    pub reject_title_collisions: bool,
}

impl Args {
    pub fn collision_policy(&self) -> CollisionPolicy {
        if self.reject_title_collisions {
            CollisionPolicy::Reject
        } else {
            CollisionPolicy::LastWriteWins
        }
    }

    pub fn tmdb_timeout(&self) -> Duration {
        Duration::from_secs(self.tmdb_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flags() {
        let args = Args::try_parse_from([
            "server",
            "--tmdb-api-key",
            "k",
            "--port",
            "9000",
            "--reject-title-collisions",
        ])
        .unwrap();
        assert_eq!(args.port, 9000);
        assert_eq!(args.collision_policy(), CollisionPolicy::Reject);
        assert_eq!(args.tmdb_timeout(), Duration::from_secs(20));
    }
}
