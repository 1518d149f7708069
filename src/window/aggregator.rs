// Fri Jan 16 2026 - Alex

use crate::config::ConfigError;
use crate::window::WindowEvent;
use ahash::AHashMap;

/// Count-based sliding window parameters. `slide <= size` is guaranteed by
/// construction, which keeps every count non-negative after a slide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowParams {
    size: u64,
    slide: u64,
}

impl WindowParams {
    pub fn new(size: u64, slide: u64) -> Result<Self, ConfigError> {
        if size == 0 {
            return Err(ConfigError::ZeroWindow);
        }
        if slide == 0 {
            return Err(ConfigError::ZeroSlide);
        }
        if slide > size {
            return Err(ConfigError::SlideExceedsWindow {
                window: size,
                slide,
            });
        }
        Ok(Self { size, slide })
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn slide(&self) -> u64 {
        self.slide
    }

    /// Crossings produced by `arrivals` tokens of one key.
    pub fn crossings(&self, arrivals: u64) -> u64 {
        if arrivals < self.size {
            0
        } else {
            (arrivals - self.size) / self.slide + 1
        }
    }

    /// Count left on a key after `arrivals` tokens.
    pub fn residual(&self, arrivals: u64) -> u64 {
        arrivals - self.crossings(arrivals) * self.slide
    }

    /// Windows the shutdown flush drains out of a residual count.
    pub fn flushed(&self, residual: u64) -> u64 {
        if residual <= self.slide {
            0
        } else {
            (residual - 1) / self.slide
        }
    }
}

/// Per-key running counts for the keys this rank owns.
///
/// Single writer: only the owning rank's control loop touches it, which is what
/// makes per-key event order follow arrival order.
pub struct WindowAggregator {
    params: WindowParams,
    counts: AHashMap<Vec<u8>, u64>,
    crossings: u64,
}

impl WindowAggregator {
    pub fn new(params: WindowParams) -> Self {
        Self {
            params,
            counts: AHashMap::new(),
            crossings: 0,
        }
    }

    /// Applies one arrival of `key`.
    pub fn observe(&mut self, key: &[u8]) -> Option<WindowEvent> {
        let params = self.params;
        let crossed = match self.counts.get_mut(key) {
            Some(count) => Self::arrive(count, params),
            None => {
                let mut count = 0;
                let crossed = Self::arrive(&mut count, params);
                self.counts.insert(key.to_vec(), count);
                crossed
            }
        };
        if crossed {
            self.crossings += 1;
            return Some(WindowEvent::crossing(key, params.size));
        }
        None
    }

    fn arrive(count: &mut u64, params: WindowParams) -> bool {
        *count += 1;
        if *count == params.size {
            *count -= params.slide;
            return true;
        }
        false
    }

    pub fn count(&self, key: &[u8]) -> Option<u64> {
        self.counts.get(key).copied()
    }

    pub fn keys(&self) -> usize {
        self.counts.len()
    }

    pub fn crossings(&self) -> u64 {
        self.crossings
    }

    /// Drains every key's residual count at shutdown.
    ///
    /// While a key's remainder exceeds the slide step a window is emitted and
    /// the remainder slides; a remainder at or below the slide step is
    /// discarded as an incomplete window. Consumes the state: nothing can be
    /// observed after the flush.
    pub fn flush(self) -> (Vec<WindowEvent>, FlushStats) {
        let params = self.params;
        let mut events = Vec::new();
        let mut discarded = 0u64;

        for (key, mut count) in self.counts {
            while count > params.slide {
                events.push(WindowEvent::flush(&key, count));
                count -= params.slide;
            }
            if count > 0 {
                discarded += 1;
            }
        }

        let stats = FlushStats {
            crossings: self.crossings,
            flushed: events.len() as u64,
            discarded_remainders: discarded,
        };
        (events, stats)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushStats {
    pub crossings: u64,
    pub flushed: u64,
    pub discarded_remainders: u64,
}
