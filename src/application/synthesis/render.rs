//! Script rendering per dialect.
//!
//! Rendering is presentation only. Evaluation always uses the structured
//! conditions, never the script text.

use crate::domain::{CombineMode, Comparator, Condition, CrossDirection, ScriptDialect};

/// Everything a renderer needs.
#[derive(Debug, Clone, Copy)]
pub struct ScriptContext<'a> {
    pub stock_code: &'a str,
    pub stock_name: &'a str,
    pub intent: &'a str,
    pub conditions: &'a [Condition],
    pub combine: CombineMode,
}

/// Render `ctx` in `dialect`.
#[must_use]
pub fn render(dialect: ScriptDialect, ctx: &ScriptContext<'_>) -> String {
    match dialect {
        ScriptDialect::Python => render_python(ctx),
        ScriptDialect::PineScript => render_pine(ctx),
    }
}

/// Human-readable summary of one condition.
#[must_use]
pub fn describe(condition: &Condition) -> String {
    match condition {
        Condition::MaCross {
            fast,
            slow,
            direction: CrossDirection::Up,
        } => format!("MA{fast}上穿MA{slow}(金叉)"),
        Condition::MaCross {
            fast,
            slow,
            direction: CrossDirection::Down,
        } => format!("MA{fast}下穿MA{slow}(死叉)"),
        Condition::RsiThreshold {
            period,
            comparator: Comparator::Above,
            value,
        } => format!("RSI({period})≥{value}(超买)"),
        Condition::RsiThreshold {
            period,
            comparator: Comparator::Below,
            value,
        } => format!("RSI({period})≤{value}(超卖)"),
        Condition::PriceBreakout {
            lookback,
            comparator: Comparator::Above,
        } => format!("收盘价突破{lookback}日最高价"),
        Condition::PriceBreakout {
            lookback,
            comparator: Comparator::Below,
        } => format!("收盘价跌破{lookback}日最低价"),
        Condition::VolumeSpike {
            lookback,
            multiplier,
        } => format!("成交量≥{lookback}日均量的{multiplier}倍"),
        Condition::MacdCross {
            direction: CrossDirection::Up,
            ..
        } => "MACD金叉(DIF上穿DEA)".to_string(),
        Condition::MacdCross {
            direction: CrossDirection::Down,
            ..
        } => "MACD死叉(DIF下穿DEA)".to_string(),
        Condition::Custom {
            label,
            comparator,
            value,
        } => match comparator {
            Comparator::Above => format!("{label}≥{value}"),
            Comparator::Below => format!("{label}≤{value}"),
        },
    }
}

fn combine_label(combine: CombineMode) -> &'static str {
    match combine {
        CombineMode::All => "全部满足(AND)",
        CombineMode::Any => "任一满足(OR)",
    }
}

fn quote(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', " ")
}

fn python_body(condition: &Condition) -> Vec<String> {
    let ge_le = |comparator: &Comparator| match comparator {
        Comparator::Above => ">=",
        Comparator::Below => "<=",
    };
    match condition {
        Condition::MaCross {
            fast,
            slow,
            direction,
        } => {
            let (before, after) = match direction {
                CrossDirection::Up => ("<", ">="),
                CrossDirection::Down => (">", "<="),
            };
            vec![
                format!("fast = close.rolling({fast}).mean()"),
                format!("slow = close.rolling({slow}).mean()"),
                format!(
                    "return fast.iloc[-2] {before} slow.iloc[-2] and fast.iloc[-1] {after} slow.iloc[-1]"
                ),
            ]
        }
        Condition::RsiThreshold {
            period,
            comparator,
            value,
        } => vec![
            "delta = close.diff()".into(),
            format!("gain = delta.clip(lower=0).ewm(alpha=1 / {period}, adjust=False).mean()"),
            format!("loss = (-delta.clip(upper=0)).ewm(alpha=1 / {period}, adjust=False).mean()"),
            "rsi = 100 - 100 / (1 + gain / loss)".into(),
            format!("return rsi.iloc[-1] {} {value}", ge_le(comparator)),
        ],
        Condition::PriceBreakout {
            lookback,
            comparator,
        } => match comparator {
            Comparator::Above => vec![format!(
                "return close.iloc[-1] >= df[\"high\"].iloc[-{}:-1].max()",
                lookback + 1
            )],
            Comparator::Below => vec![format!(
                "return close.iloc[-1] <= df[\"low\"].iloc[-{}:-1].min()",
                lookback + 1
            )],
        },
        Condition::VolumeSpike {
            lookback,
            multiplier,
        } => vec![
            "volume = df[\"volume\"]".into(),
            format!(
                "return volume.iloc[-1] >= volume.iloc[-{}:-1].mean() * {multiplier}",
                lookback + 1
            ),
        ],
        Condition::MacdCross {
            fast,
            slow,
            signal,
            direction,
        } => {
            let (before, after) = match direction {
                CrossDirection::Up => ("<", ">="),
                CrossDirection::Down => (">", "<="),
            };
            vec![
                format!(
                    "dif = close.ewm(span={fast}, adjust=False).mean() - close.ewm(span={slow}, adjust=False).mean()"
                ),
                format!("dea = dif.ewm(span={signal}, adjust=False).mean()"),
                format!(
                    "return dif.iloc[-2] {before} dea.iloc[-2] and dif.iloc[-1] {after} dea.iloc[-1]"
                ),
            ]
        }
        Condition::Custom {
            comparator, value, ..
        } => vec![format!("return close.iloc[-1] {} {value}", ge_le(comparator))],
    }
}

fn render_python(ctx: &ScriptContext<'_>) -> String {
    let mut lines = vec![
        format!("# 监控脚本: {}({})", ctx.stock_name, ctx.stock_code),
        format!("# 用户意图: {}", ctx.intent.replace('\n', " ")),
        format!("# 条件组合: {}", combine_label(ctx.combine)),
        "import pandas as pd".into(),
        String::new(),
        format!("STOCK_CODE = \"{}\"", quote(ctx.stock_code)),
        format!("STOCK_NAME = \"{}\"", quote(ctx.stock_name)),
    ];

    for (i, condition) in ctx.conditions.iter().enumerate() {
        lines.push(String::new());
        lines.push(String::new());
        lines.push(format!("def condition_{}(df: pd.DataFrame) -> bool:", i + 1));
        lines.push(format!("    \"\"\"{condition}\"\"\""));
        lines.push("    close = df[\"close\"]".into());
        lines.extend(python_body(condition).into_iter().map(|l| format!("    {l}")));
    }

    lines.push(String::new());
    lines.push(String::new());
    lines.push("CONDITIONS = [".into());
    for (i, condition) in ctx.conditions.iter().enumerate() {
        lines.push(format!(
            "    (condition_{}, \"{}\"),",
            i + 1,
            quote(&describe(condition))
        ));
    }
    lines.push("]".into());
    lines.push(String::new());
    lines.push(String::new());
    lines.push("def check(df: pd.DataFrame) -> tuple[bool, list[str]]:".into());
    lines.push("    hits = [message for condition, message in CONDITIONS if condition(df)]".into());
    lines.push(match ctx.combine {
        CombineMode::All => "    return len(hits) == len(CONDITIONS), hits".into(),
        CombineMode::Any => "    return len(hits) > 0, hits".into(),
    });
    lines.push(String::new());
    lines.join("\n")
}

fn pine_expr(i: usize, condition: &Condition) -> Vec<String> {
    let c = format!("c{i}");
    let ge_le = |comparator: &Comparator| match comparator {
        Comparator::Above => ">=",
        Comparator::Below => "<=",
    };
    match condition {
        Condition::MaCross {
            fast,
            slow,
            direction,
        } => {
            let func = match direction {
                CrossDirection::Up => "ta.crossover",
                CrossDirection::Down => "ta.crossunder",
            };
            vec![format!(
                "{c} = {func}(ta.sma(close, {fast}), ta.sma(close, {slow}))"
            )]
        }
        Condition::RsiThreshold {
            period,
            comparator,
            value,
        } => vec![format!(
            "{c} = ta.rsi(close, {period}) {} {value}",
            ge_le(comparator)
        )],
        Condition::PriceBreakout {
            lookback,
            comparator,
        } => match comparator {
            Comparator::Above => vec![format!("{c} = close >= ta.highest(high, {lookback})[1]")],
            Comparator::Below => vec![format!("{c} = close <= ta.lowest(low, {lookback})[1]")],
        },
        Condition::VolumeSpike {
            lookback,
            multiplier,
        } => vec![format!(
            "{c} = volume >= ta.sma(volume, {lookback})[1] * {multiplier}"
        )],
        Condition::MacdCross {
            fast,
            slow,
            signal,
            direction,
        } => {
            let func = match direction {
                CrossDirection::Up => "ta.crossover",
                CrossDirection::Down => "ta.crossunder",
            };
            vec![
                format!("[dif{i}, dea{i}, _] = ta.macd(close, {fast}, {slow}, {signal})"),
                format!("{c} = {func}(dif{i}, dea{i})"),
            ]
        }
        Condition::Custom {
            comparator, value, ..
        } => vec![format!("{c} = close {} {value}", ge_le(comparator))],
    }
}

fn render_pine(ctx: &ScriptContext<'_>) -> String {
    let title = format!("{}({}) 监控", quote(ctx.stock_name), quote(ctx.stock_code));
    let mut lines = vec![
        "//@version=5".to_string(),
        format!("indicator(\"{title}\", overlay=true)"),
        format!("// 用户意图: {}", ctx.intent.replace('\n', " ")),
        format!("// 条件组合: {}", combine_label(ctx.combine)),
        String::new(),
    ];

    let mut names = Vec::with_capacity(ctx.conditions.len());
    for (i, condition) in ctx.conditions.iter().enumerate() {
        let i = i + 1;
        lines.push(format!("// {}", describe(condition)));
        lines.extend(pine_expr(i, condition));
        names.push(format!("c{i}"));
    }

    let joiner = match ctx.combine {
        CombineMode::All => " and ",
        CombineMode::Any => " or ",
    };
    let summary: Vec<String> = ctx.conditions.iter().map(describe).collect();
    lines.push(String::new());
    lines.push(format!("triggered = {}", names.join(joiner)));
    lines.push(
        "plotshape(triggered, style=shape.triangleup, location=location.belowbar, color=color.red)"
            .into(),
    );
    lines.push(format!(
        "alertcondition(triggered, title=\"{title}\", message=\"{}\")",
        quote(&summary.join("; "))
    ));
    lines.push(String::new());
    lines.join("\n")
}
