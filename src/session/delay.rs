//! Injectable "thinking" delay applied before a reply is computed.

use crate::config::ThinkingConfig;
use rand::Rng;
use std::time::Duration;

/// Which kind of turn is about to be answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelayKind {
    Reply,
    Fulfillment,
}

pub trait ThinkingDelay: Send + Sync + 'static {
    fn delay_for(&self, kind: DelayKind) -> Duration;
}

/// Answer immediately. Used by tests and when thinking is disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDelay;

impl ThinkingDelay for NoDelay {
    fn delay_for(&self, _kind: DelayKind) -> Duration {
        Duration::ZERO
    }
}

/// Base delay plus uniform random jitter for replies; fixed delay for fulfillment.
#[derive(Debug, Clone, Copy)]
pub struct JitteredDelay {
    reply_base: Duration,
    reply_jitter_ms: u64,
    fulfillment: Duration,
}

impl JitteredDelay {
    pub fn new(config: &ThinkingConfig) -> Self {
        Self {
            reply_base: Duration::from_millis(config.reply_base_ms),
            reply_jitter_ms: config.reply_jitter_ms,
            fulfillment: Duration::from_millis(config.fulfillment_ms),
        }
    }
}

impl ThinkingDelay for JitteredDelay {
    fn delay_for(&self, kind: DelayKind) -> Duration {
        match kind {
            DelayKind::Fulfillment => self.fulfillment,
            DelayKind::Reply => {
                let jitter = if self.reply_jitter_ms == 0 {
                    0
                } else {
                    rand::thread_rng().gen_range(0..=self.reply_jitter_ms)
                };
                self.reply_base + Duration::from_millis(jitter)
            }
        }
    }
}

/// Build the delay strategy described by `config`.
pub fn delay_from_config(config: &ThinkingConfig) -> Box<dyn ThinkingDelay> {
    if config.enabled {
        Box::new(JitteredDelay::new(config))
    } else {
        Box::new(NoDelay)
    }
}
