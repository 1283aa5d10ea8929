//! Keyword rules mapping intent text to conditions.
//!
//! Each [`ConditionRule`] recognises one indicator family. New indicators are
//! added by registering another rule in a [`RuleTable`]; the scheduler and
//! dispatcher never see rules.

use std::sync::LazyLock;

use regex::Regex;

use crate::domain::{Comparator, Condition, CrossDirection, IndicatorKind};
use crate::port::inbound::control::ConditionTemplate;

pub const DEFAULT_MA_FAST: usize = 5;
pub const DEFAULT_MA_SLOW: usize = 10;
pub const DEFAULT_RSI_PERIOD: usize = 14;
pub const DEFAULT_RSI_OVERBOUGHT: f64 = 70.0;
pub const DEFAULT_RSI_OVERSOLD: f64 = 30.0;
pub const DEFAULT_BREAKOUT_LOOKBACK: usize = 20;
pub const DEFAULT_VOLUME_LOOKBACK: usize = 5;
pub const DEFAULT_VOLUME_MULTIPLIER: f64 = 2.0;
pub const DEFAULT_MACD: (usize, usize, usize) = (12, 26, 9);

pub(super) fn regex(pattern: &str) -> Regex {
    // Patterns are compile-time literals.
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid rule pattern {pattern}: {e}"))
}

static MACD_PHRASE: LazyLock<Regex> =
    LazyLock::new(|| regex(r"(?i)macd\s*(金叉|死叉|上穿|下穿|golden\s*cross|death\s*cross)"));
static MA_PERIODS: LazyLock<Regex> = LazyLock::new(|| {
    regex(r"(?i)(?:^|[^a-z])ma\s*(\d{1,3})|(\d{1,3})\s*(?:日|天)\s*(?:均线|线)")
});
static CROSS_UP: LazyLock<Regex> = LazyLock::new(|| regex(r"(?i)金叉|上穿|golden\s*cross"));
static CROSS_DOWN: LazyLock<Regex> = LazyLock::new(|| regex(r"(?i)死叉|下穿|death\s*cross"));
static RSI_MENTION: LazyLock<Regex> = LazyLock::new(|| regex(r"(?i)rsi|超买|超卖"));
static RSI_WORD: LazyLock<Regex> = LazyLock::new(|| regex(r"(?i)rsi"));
static RSI_PERIOD: LazyLock<Regex> = LazyLock::new(|| regex(r"(?i)rsi[(（]?(\d{1,3})[)）]?"));
static RSI_ABOVE: LazyLock<Regex> = LazyLock::new(|| {
    regex(r"(?:>=|≥|>|大于等于|大于|超过|高于|突破|above)\s*(\d+(?:\.\d+)?)")
});
static RSI_BELOW: LazyLock<Regex> =
    LazyLock::new(|| regex(r"(?:<=|≤|<|小于等于|小于|低于|跌破|below)\s*(\d+(?:\.\d+)?)"));
/// A whole "RSI ... 突破70" phrase, so its verb is not read as a price breakout.
static RSI_LEVEL: LazyLock<Regex> = LazyLock::new(|| {
    regex(
        r"(?i)rsi\s*(?:[(（]?\d{1,3}[)）]?)?\s*(?:值|指标)?\s*(?:>=|≥|>|<=|≤|<|大于等于|大于|超过|高于|突破|above|小于等于|小于|低于|跌破|below)\s*\d+(?:\.\d+)?",
    )
});
static PRICE_LEVEL: LazyLock<Regex> = LazyLock::new(|| {
    regex(
        r"(?P<prefix>股价|价格|价)?\s*(?P<op>突破|高于|超过|站上|涨到|涨至|大于|跌破|低于|跌到|跌至|小于)\s*(?P<value>\d+(?:\.\d+)?)\s*(?P<unit>元|块)?",
    )
});
static BREAKOUT_UP: LazyLock<Regex> = LazyLock::new(|| regex(r"(?i)突破|新高|breakout"));
static BREAKOUT_DOWN: LazyLock<Regex> = LazyLock::new(|| regex(r"(?i)跌破|新低|breakdown"));
static LOOKBACK_DAYS: LazyLock<Regex> = LazyLock::new(|| {
    regex(r"(?i)(\d{1,3})\s*(?:日|天|个交易日|days?)\s*(?:内)?\s*(?:的)?\s*(?:新高|新低|最高|最低|高点|低点)")
});
static VOLUME_MENTION: LazyLock<Regex> = LazyLock::new(|| {
    regex(r"(?i)放量|巨量|倍量|(?:成交量|量能).*(?:放大|倍|激增)|volume\s*spike")
});
static VOLUME_MULTIPLIER: LazyLock<Regex> = LazyLock::new(|| regex(r"(\d+(?:\.\d+)?)\s*倍"));
static VOLUME_LOOKBACK: LazyLock<Regex> =
    LazyLock::new(|| regex(r"(\d{1,3})\s*(?:日|天)\s*(?:均量|平均)"));

/// Recognises one indicator family in intent text.
pub trait ConditionRule: Send + Sync {
    fn kind(&self) -> IndicatorKind;

    fn template(&self) -> ConditionTemplate;

    /// Conditions this rule recognises in `intent`, possibly none.
    fn extract(&self, intent: &str) -> Vec<Condition>;
}

/// Ordered set of rules consulted for every intent.
pub struct RuleTable {
    rules: Vec<Box<dyn ConditionRule>>,
}

impl Default for RuleTable {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl RuleTable {
    #[must_use]
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Moving-average cross, MACD cross, RSI threshold, rolling breakout,
    /// price level and volume spike.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut table = Self::empty();
        table.register(Box::new(MacdCrossRule));
        table.register(Box::new(MaCrossRule));
        table.register(Box::new(RsiThresholdRule));
        table.register(Box::new(PriceLevelRule));
        table.register(Box::new(BreakoutRule));
        table.register(Box::new(VolumeSpikeRule));
        table
    }

    /// Add a rule. Rules run in registration order.
    pub fn register(&mut self, rule: Box<dyn ConditionRule>) {
        self.rules.push(rule);
    }

    /// Every condition any rule recognises, without duplicates.
    #[must_use]
    pub fn extract(&self, intent: &str) -> Vec<Condition> {
        let mut conditions: Vec<Condition> = Vec::new();
        for rule in &self.rules {
            for condition in rule.extract(intent) {
                if !conditions.contains(&condition) {
                    conditions.push(condition);
                }
            }
        }
        conditions
    }

    #[must_use]
    pub fn templates(&self) -> Vec<ConditionTemplate> {
        self.rules.iter().map(|r| r.template()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn keywords(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| (*w).to_string()).collect()
}

fn first_number<T: std::str::FromStr>(re: &Regex, text: &str) -> Option<T> {
    re.captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Price-level phrases such as "突破100元" or "股价低于9.5". A bare number
/// without a unit or price prefix is not a price level.
fn price_levels(intent: &str) -> Vec<(Comparator, f64, std::ops::Range<usize>)> {
    PRICE_LEVEL
        .captures_iter(intent)
        .filter(|c| c.name("prefix").is_some() || c.name("unit").is_some())
        .filter_map(|c| {
            let op = c.name("op")?.as_str();
            let value: f64 = c.name("value")?.as_str().parse().ok()?;
            let comparator = match op {
                "跌破" | "低于" | "跌到" | "跌至" | "小于" => Comparator::Below,
                _ => Comparator::Above,
            };
            Some((comparator, value, c.get(0)?.range()))
        })
        .collect()
}

fn without_price_levels(intent: &str) -> String {
    let mut text = intent.to_string();
    for (_, _, range) in price_levels(intent).into_iter().rev() {
        text.replace_range(range, " ");
    }
    text
}

/// 金叉 / 死叉 of two simple moving averages.
pub struct MaCrossRule;

impl ConditionRule for MaCrossRule {
    fn kind(&self) -> IndicatorKind {
        IndicatorKind::MaCross
    }

    fn template(&self) -> ConditionTemplate {
        ConditionTemplate {
            indicator: self.kind(),
            name: "均线交叉".into(),
            description: "短期均线上穿(金叉)或下穿(死叉)长期均线".into(),
            keywords: keywords(&["金叉", "死叉", "上穿", "下穿", "MA"]),
            example: Condition::golden_cross(DEFAULT_MA_FAST, DEFAULT_MA_SLOW),
            example_intent: "MA5上穿MA10金叉时通知我".into(),
        }
    }

    fn extract(&self, intent: &str) -> Vec<Condition> {
        let text = MACD_PHRASE.replace_all(intent, " ");
        let mut periods: Vec<usize> = MA_PERIODS
            .captures_iter(&text)
            .filter_map(|c| c.get(1).or_else(|| c.get(2))?.as_str().parse().ok())
            .filter(|p| *p > 0)
            .collect();
        periods.dedup();
        let (fast, slow) = match periods.as_slice() {
            [a, b, ..] if a != b => ((*a).min(*b), (*a).max(*b)),
            _ => (DEFAULT_MA_FAST, DEFAULT_MA_SLOW),
        };

        let mut out = Vec::new();
        if CROSS_UP.is_match(&text) {
            out.push(Condition::MaCross {
                fast,
                slow,
                direction: CrossDirection::Up,
            });
        }
        if CROSS_DOWN.is_match(&text) {
            out.push(Condition::MaCross {
                fast,
                slow,
                direction: CrossDirection::Down,
            });
        }
        out
    }
}

/// MACD line crossing its signal line.
pub struct MacdCrossRule;

impl ConditionRule for MacdCrossRule {
    fn kind(&self) -> IndicatorKind {
        IndicatorKind::MacdCross
    }

    fn template(&self) -> ConditionTemplate {
        let (fast, slow, signal) = DEFAULT_MACD;
        ConditionTemplate {
            indicator: self.kind(),
            name: "MACD交叉".into(),
            description: "DIF上穿(金叉)或下穿(死叉)DEA".into(),
            keywords: keywords(&["MACD金叉", "MACD死叉"]),
            example: Condition::MacdCross {
                fast,
                slow,
                signal,
                direction: CrossDirection::Up,
            },
            example_intent: "MACD金叉时提醒".into(),
        }
    }

    fn extract(&self, intent: &str) -> Vec<Condition> {
        let (fast, slow, signal) = DEFAULT_MACD;
        let mut out = Vec::new();
        for caps in MACD_PHRASE.captures_iter(intent) {
            let word = caps.get(1).map_or("", |m| m.as_str()).to_lowercase();
            let direction = if word.contains('死') || word.contains('下') || word.contains("death")
            {
                CrossDirection::Down
            } else {
                CrossDirection::Up
            };
            let condition = Condition::MacdCross {
                fast,
                slow,
                signal,
                direction,
            };
            if !out.contains(&condition) {
                out.push(condition);
            }
        }
        out
    }
}

/// RSI overbought / oversold thresholds.
pub struct RsiThresholdRule;

impl ConditionRule for RsiThresholdRule {
    fn kind(&self) -> IndicatorKind {
        IndicatorKind::RsiThreshold
    }

    fn template(&self) -> ConditionTemplate {
        ConditionTemplate {
            indicator: self.kind(),
            name: "RSI超买超卖".into(),
            description: "RSI达到超买(≥70)或超卖(≤30)阈值，阈值含边界".into(),
            keywords: keywords(&["RSI", "超买", "超卖"]),
            example: Condition::RsiThreshold {
                period: DEFAULT_RSI_PERIOD,
                comparator: Comparator::Above,
                value: DEFAULT_RSI_OVERBOUGHT,
            },
            example_intent: "RSI超买时提醒我".into(),
        }
    }

    fn extract(&self, intent: &str) -> Vec<Condition> {
        if !RSI_MENTION.is_match(intent) {
            return Vec::new();
        }
        let period = first_number::<usize>(&RSI_PERIOD, intent)
            .filter(|p| *p > 0)
            .unwrap_or(DEFAULT_RSI_PERIOD);

        // Thresholds are only read after the RSI mention so that a price
        // level earlier in the sentence is not mistaken for one.
        let tail = RSI_WORD.find(intent).map_or(intent, |m| &intent[m.start()..]);
        let tail = RSI_PERIOD.replace(tail, " ");

        let mut out = Vec::new();
        let above = first_number::<f64>(&RSI_ABOVE, &tail)
            .or_else(|| intent.contains("超买").then_some(DEFAULT_RSI_OVERBOUGHT));
        let below = first_number::<f64>(&RSI_BELOW, &tail)
            .or_else(|| intent.contains("超卖").then_some(DEFAULT_RSI_OVERSOLD));

        if let Some(value) = above.filter(|v| (0.0..=100.0).contains(v)) {
            out.push(Condition::RsiThreshold {
                period,
                comparator: Comparator::Above,
                value,
            });
        }
        if let Some(value) = below.filter(|v| (0.0..=100.0).contains(v)) {
            out.push(Condition::RsiThreshold {
                period,
                comparator: Comparator::Below,
                value,
            });
        }
        out
    }
}

/// Close breaking the highest high or lowest low of a rolling window.
pub struct BreakoutRule;

impl ConditionRule for BreakoutRule {
    fn kind(&self) -> IndicatorKind {
        IndicatorKind::PriceBreakout
    }

    fn template(&self) -> ConditionTemplate {
        ConditionTemplate {
            indicator: self.kind(),
            name: "区间突破".into(),
            description: "收盘价突破N日最高价或跌破N日最低价".into(),
            keywords: keywords(&["突破", "新高", "跌破", "新低"]),
            example: Condition::PriceBreakout {
                lookback: DEFAULT_BREAKOUT_LOOKBACK,
                comparator: Comparator::Above,
            },
            example_intent: "突破20日新高时提醒".into(),
        }
    }

    fn extract(&self, intent: &str) -> Vec<Condition> {
        let text = without_price_levels(intent);
        let text = RSI_LEVEL.replace_all(&text, " ");
        // "突破MA10" and similar belong to the moving-average rule.
        let text = MA_PERIODS.replace_all(&text, " ");
        let lookback = first_number::<usize>(&LOOKBACK_DAYS, &text)
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_BREAKOUT_LOOKBACK);

        let mut out = Vec::new();
        if BREAKOUT_UP.is_match(&text) {
            out.push(Condition::PriceBreakout {
                lookback,
                comparator: Comparator::Above,
            });
        }
        if BREAKOUT_DOWN.is_match(&text) {
            out.push(Condition::PriceBreakout {
                lookback,
                comparator: Comparator::Below,
            });
        }
        out
    }
}

/// Close against a fixed price, e.g. "突破100元".
pub struct PriceLevelRule;

impl ConditionRule for PriceLevelRule {
    fn kind(&self) -> IndicatorKind {
        IndicatorKind::Custom
    }

    fn template(&self) -> ConditionTemplate {
        ConditionTemplate {
            indicator: self.kind(),
            name: "价格提醒".into(),
            description: "收盘价高于或低于指定价格".into(),
            keywords: keywords(&["高于X元", "突破X元", "低于X元", "跌破X元"]),
            example: Condition::Custom {
                label: "价格".into(),
                comparator: Comparator::Above,
                value: 100.0,
            },
            example_intent: "股价突破100元时通知我".into(),
        }
    }

    fn extract(&self, intent: &str) -> Vec<Condition> {
        price_levels(intent)
            .into_iter()
            .filter(|(_, value, _)| *value > 0.0)
            .map(|(comparator, value, _)| Condition::Custom {
                label: "价格".into(),
                comparator,
                value,
            })
            .collect()
    }
}

/// Volume relative to a trailing average.
pub struct VolumeSpikeRule;

impl ConditionRule for VolumeSpikeRule {
    fn kind(&self) -> IndicatorKind {
        IndicatorKind::VolumeSpike
    }

    fn template(&self) -> ConditionTemplate {
        ConditionTemplate {
            indicator: self.kind(),
            name: "放量".into(),
            description: "成交量达到N日均量的指定倍数".into(),
            keywords: keywords(&["放量", "成交量放大", "倍量"]),
            example: Condition::VolumeSpike {
                lookback: DEFAULT_VOLUME_LOOKBACK,
                multiplier: DEFAULT_VOLUME_MULTIPLIER,
            },
            example_intent: "放量2倍时提醒".into(),
        }
    }

    fn extract(&self, intent: &str) -> Vec<Condition> {
        if !VOLUME_MENTION.is_match(intent) {
            return Vec::new();
        }
        let multiplier = first_number::<f64>(&VOLUME_MULTIPLIER, intent)
            .filter(|m| *m > 0.0)
            .unwrap_or(DEFAULT_VOLUME_MULTIPLIER);
        let lookback = first_number::<usize>(&VOLUME_LOOKBACK, intent)
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_VOLUME_LOOKBACK);
        vec![Condition::VolumeSpike {
            lookback,
            multiplier,
        }]
    }
}
