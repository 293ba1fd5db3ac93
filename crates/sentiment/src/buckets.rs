//! Premium bucket accumulation.
//!
//! Sums dollar premium per (option type × order action). Rows whose size or
//! premium could not be read are skipped rather than counted as zero.

use optflow_core::{Bucket, ClassifiedTrade, OptionType, OrderAction};
use serde::{Deserialize, Serialize};

/// Which bucket a classified print lands in, if any.
pub fn bucket_for(option_type: OptionType, order_action: OrderAction) -> Option<Bucket> {
    match (option_type, order_action) {
        (OptionType::Call, OrderAction::BuyToOpen) => Some(Bucket::CallOpen),
        (OptionType::Put, OrderAction::BuyToOpen) => Some(Bucket::PutOpen),
        (OptionType::Call, OrderAction::SellToClose) => Some(Bucket::CallClose),
        (OptionType::Put, OrderAction::SellToClose) => Some(Bucket::PutClose),
        (OptionType::Call, OrderAction::SellToOpen) => Some(Bucket::CallSellToOpen),
        (OptionType::Put, OrderAction::SellToOpen) => Some(Bucket::PutSellToOpen),
        _ => None,
    }
}

/// Premium sums per bucket, plus passive (mid) premium per option type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PremiumBuckets {
    pub call_open: f64,
    pub put_open: f64,
    pub call_close: f64,
    pub put_close: f64,
    pub call_sell_to_open: f64,
    pub put_sell_to_open: f64,
    pub call_passive: f64,
    pub put_passive: f64,
    /// Rows that contributed to the sums.
    pub trades_counted: u64,
    /// Rows dropped because size or premium was unreadable.
    pub trades_skipped: u64,
}

impl PremiumBuckets {
    /// Accumulate a batch.
    pub fn from_trades<'a, I>(trades: I) -> Self
    where
        I: IntoIterator<Item = &'a ClassifiedTrade>,
    {
        let mut buckets = Self::default();
        for trade in trades {
            buckets.add(trade);
        }
        buckets
    }

    /// Add one classified print.
    pub fn add(&mut self, trade: &ClassifiedTrade) {
        let Some((_, premium)) = trade.size_and_premium() else {
            self.trades_skipped += 1;
            return;
        };
        self.trades_counted += 1;

        if let Some(bucket) = bucket_for(trade.option_type, trade.order_action) {
            *self.slot_mut(bucket) += premium;
        } else if trade.order_action == OrderAction::Passive {
            match trade.option_type {
                OptionType::Call => self.call_passive += premium,
                OptionType::Put => self.put_passive += premium,
                OptionType::Unknown => {}
            }
        }
    }

    fn slot_mut(&mut self, bucket: Bucket) -> &mut f64 {
        match bucket {
            Bucket::CallOpen => &mut self.call_open,
            Bucket::PutOpen => &mut self.put_open,
            Bucket::CallClose => &mut self.call_close,
            Bucket::PutClose => &mut self.put_close,
            Bucket::CallSellToOpen => &mut self.call_sell_to_open,
            Bucket::PutSellToOpen => &mut self.put_sell_to_open,
        }
    }

    /// Premium in one bucket.
    pub fn get(&self, bucket: Bucket) -> f64 {
        match bucket {
            Bucket::CallOpen => self.call_open,
            Bucket::PutOpen => self.put_open,
            Bucket::CallClose => self.call_close,
            Bucket::PutClose => self.put_close,
            Bucket::CallSellToOpen => self.call_sell_to_open,
            Bucket::PutSellToOpen => self.put_sell_to_open,
        }
    }

    /// Call mid premium minus put mid premium.
    pub fn passive_net(&self) -> f64 {
        self.call_passive - self.put_passive
    }

    /// Premium across the six directional buckets.
    pub fn directional_total(&self) -> f64 {
        Bucket::ALL.iter().map(|b| self.get(*b)).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.trades_counted == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use optflow_core::{FlowRecord, Sentiment};

    fn make_trade(option_type: OptionType, order_action: OrderAction, premium: Option<f64>) -> ClassifiedTrade {
        ClassifiedTrade {
            record: FlowRecord {
                put_call: option_type,
                size: Some(10.0),
                premium,
                ..Default::default()
            },
            option_type,
            order_action,
            sentiment: Sentiment::Neutral,
            description: String::new(),
            is_opening: false,
            is_unusual: false,
            is_adding: false,
            is_profit_taking: false,
            is_closing: false,
        }
    }

    #[test]
    fn test_bucket_mapping() {
        assert_eq!(bucket_for(OptionType::Call, OrderAction::BuyToOpen), Some(Bucket::CallOpen));
        assert_eq!(bucket_for(OptionType::Put, OrderAction::SellToOpen), Some(Bucket::PutSellToOpen));
        assert_eq!(bucket_for(OptionType::Call, OrderAction::Passive), None);
        assert_eq!(bucket_for(OptionType::Unknown, OrderAction::BuyToOpen), None);
    }

    #[test]
    fn test_accumulation() {
        let trades = vec![
            make_trade(OptionType::Call, OrderAction::BuyToOpen, Some(5_000.0)),
            make_trade(OptionType::Call, OrderAction::BuyToOpen, Some(5_000.0)),
            make_trade(OptionType::Put, OrderAction::SellToClose, Some(1_000.0)),
            make_trade(OptionType::Put, OrderAction::Passive, Some(700.0)),
            make_trade(OptionType::Unknown, OrderAction::Unknown, Some(900.0)),
        ];
        let buckets = PremiumBuckets::from_trades(&trades);
        assert_relative_eq!(buckets.call_open, 10_000.0);
        assert_relative_eq!(buckets.put_close, 1_000.0);
        assert_relative_eq!(buckets.put_passive, 700.0);
        assert_relative_eq!(buckets.passive_net(), -700.0);
        assert_relative_eq!(buckets.directional_total(), 11_000.0);
        assert_eq!(buckets.trades_counted, 5);
        assert_eq!(buckets.trades_skipped, 0);
    }

    #[test]
    fn test_unreadable_premium_is_skipped_not_zeroed() {
        let trades = vec![
            make_trade(OptionType::Call, OrderAction::BuyToOpen, Some(2_000.0)),
            make_trade(OptionType::Call, OrderAction::BuyToOpen, None),
            make_trade(OptionType::Call, OrderAction::BuyToOpen, Some(f64::NAN)),
        ];
        let buckets = PremiumBuckets::from_trades(&trades);
        assert_relative_eq!(buckets.call_open, 2_000.0);
        assert!(buckets.call_open.is_finite());
        assert_eq!(buckets.trades_counted, 1);
        assert_eq!(buckets.trades_skipped, 2);
    }

    #[test]
    fn test_empty() {
        let buckets = PremiumBuckets::from_trades(&Vec::<ClassifiedTrade>::new());
        assert!(buckets.is_empty());
        assert_eq!(buckets.directional_total(), 0.0);
    }
}
