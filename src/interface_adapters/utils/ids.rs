use crate::domain::PlayerId;
use std::{
    sync::{
        OnceLock,
        atomic::{AtomicU64, Ordering},
    },
    time::{SystemTime, UNIX_EPOCH},
};

static NEXT_PLAYER_ID: AtomicU64 = AtomicU64::new(1);

/// Hands out player ids in connection order, starting at 1.
///
/// Small sequential ids keep display names such as `Player_3` readable.
pub fn next_player_id() -> PlayerId {
    NEXT_PLAYER_ID.fetch_add(1, Ordering::Relaxed)
}

/// Process-unique id for correlating connection logs before a player exists.
pub fn conn_id() -> u64 {
    static COUNTER: OnceLock<AtomicU64> = OnceLock::new();
    let counter = COUNTER.get_or_init(|| {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos() as u64;
        AtomicU64::new(seed)
    });
    counter.fetch_add(1, Ordering::Relaxed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn when_ids_are_requested_then_they_never_repeat() {
        let a = next_player_id();
        let b = next_player_id();
        assert!(b > a);
        assert_ne!(conn_id(), conn_id());
    }
}
