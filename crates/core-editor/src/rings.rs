//! The five named rings (§4.H): kill and delete accumulate killed/deleted
//! text (`TextRing`, shared mechanics with dedicated append/prepend
//! semantics); search, replace, and macro history are plain `Ring<String>`s
//! of the text the user actually typed — patterns are recompiled from that
//! text on use rather than cached here.

use core_config::RingConfig;
use core_rings::{Ring, TextRing};

pub struct RingSet {
    pub kill: TextRing,
    pub delete: TextRing,
    pub search: Ring<String>,
    pub replace: Ring<String>,
    pub macro_ring: Ring<String>,
}

impl RingSet {
    pub fn new(config: RingConfig) -> Self {
        Self {
            kill: TextRing::new(config.kill),
            delete: TextRing::new(config.delete),
            search: Ring::new(config.search),
            replace: Ring::new(config.replace),
            macro_ring: Ring::new(config.macro_ring),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rings_are_sized_from_config() {
        let cfg = RingConfig { kill: 3, delete: 3, search: 5, replace: 5, macro_ring: 5 };
        let rings = RingSet::new(cfg);
        assert_eq!(rings.kill.ring().max_size(), 3);
        assert_eq!(rings.search.max_size(), 5);
    }
}
