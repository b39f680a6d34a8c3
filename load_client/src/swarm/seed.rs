use blake3::Hasher;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

/// 결정적 RNG 생성기: global_seed와 네임스페이스 문자열을 해시하여 32바이트 시드를 생성
pub fn rng_for(global_seed: u64, namespace: &str) -> ChaCha20Rng {
    let mut h = Hasher::new();
    h.update(&global_seed.to_le_bytes());
    h.update(namespace.as_bytes());
    let bytes = *h.finalize().as_bytes();
    ChaCha20Rng::from_seed(bytes)
}

/// RNG stream owned by the virtual user with the given spawn index.
pub fn rng_for_user(global_seed: u64, index: u64) -> ChaCha20Rng {
    rng_for(global_seed, &format!("vu/{}", index))
}

/// Explicit seed, then `SWARM_SEED`, then 42.
pub fn resolve_seed(explicit: Option<u64>) -> u64 {
    explicit
        .or_else(|| {
            std::env::var("SWARM_SEED")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
        })
        .unwrap_or(42)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use serial_test::serial;

    #[test]
    fn same_namespace_same_stream() {
        let mut a = rng_for(7, "vu/3");
        let mut b = rng_for(7, "vu/3");
        for _ in 0..8 {
            assert_eq!(a.gen::<u32>(), b.gen::<u32>());
        }
    }

    #[test]
    fn users_get_independent_streams() {
        let a: u64 = rng_for_user(7, 0).gen();
        let b: u64 = rng_for_user(7, 1).gen();
        let c: u64 = rng_for_user(8, 0).gen();
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn explicit_seed_wins() {
        assert_eq!(resolve_seed(Some(5)), 5);
    }

    #[test]
    #[serial]
    fn env_seed_then_default() {
        std::env::set_var("SWARM_SEED", "1234");
        assert_eq!(resolve_seed(None), 1234);
        std::env::set_var("SWARM_SEED", "not-a-number");
        assert_eq!(resolve_seed(None), 42);
        std::env::remove_var("SWARM_SEED");
        assert_eq!(resolve_seed(None), 42);
    }
}
