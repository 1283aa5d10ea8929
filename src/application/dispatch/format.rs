//! Notification text for browser and email channels.

use chrono::{DateTime, Duration, Utc};

use crate::domain::{Alert, EvaluationResult, Monitor, NotificationMessage};

/// Alerts shown in a browser notification body before the remainder is
/// summarised.
pub const BROWSER_MAX_ALERTS: usize = 3;

const EMAIL_FOOTER: &str = "此邮件由股票监控自动发送，请勿回复。";

fn local_time(at: DateTime<Utc>, utc_offset_minutes: i32) -> String {
    (at + Duration::minutes(i64::from(utc_offset_minutes)))
        .naive_utc()
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// First [`BROWSER_MAX_ALERTS`] messages, then a count of the rest.
#[must_use]
pub fn browser_body(messages: &[&str]) -> String {
    let mut body = messages
        .iter()
        .take(BROWSER_MAX_ALERTS)
        .copied()
        .collect::<Vec<_>>()
        .join("\n");
    if messages.len() > BROWSER_MAX_ALERTS {
        body.push_str(&format!(
            "\n...还有{}条告警",
            messages.len() - BROWSER_MAX_ALERTS
        ));
    }
    body
}

fn email_html(heading: &str, stock: Option<(&str, &str, f64)>, items: &[&str], time: &str) -> String {
    let stock_block = stock.map_or(String::new(), |(name, code, price)| {
        format!(
            "<p><strong>{}</strong> ({})<br>最新价：¥{price:.2}</p>",
            escape_html(name),
            escape_html(code)
        )
    });
    let items: String = items
        .iter()
        .map(|m| format!("<li>{}</li>", escape_html(m)))
        .collect();
    format!(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"></head>\n<body>\n\
         <h2>🔔 {heading}</h2>\n{stock_block}\n<ul>{items}</ul>\n\
         <p>触发时间：{time}</p>\n<p><small>{EMAIL_FOOTER}</small></p>\n</body>\n</html>\n"
    )
}

/// Format the alerts of one triggered check.
#[must_use]
pub fn alert_message(
    monitor: &Monitor,
    alerts: &[Alert],
    result: &EvaluationResult,
    now: DateTime<Utc>,
    utc_offset_minutes: i32,
) -> NotificationMessage {
    let name = monitor.stock_name();
    let code = monitor.stock_code();
    let messages: Vec<&str> = alerts.iter().map(|a| a.message.as_str()).collect();
    let time = local_time(now, utc_offset_minutes);
    let price = result.latest_price;

    let bullets: Vec<String> = messages.iter().map(|m| format!("• {m}")).collect();
    let email_text = format!(
        "您设置的股票监控已触发！\n\n股票：{name}({code})\n最新价：{price:.2}\n触发时间：{time}\n\n\
         告警详情：\n{}\n\n---\n{EMAIL_FOOTER}\n",
        bullets.join("\n")
    );

    NotificationMessage {
        monitor_id: Some(monitor.id().clone()),
        stock_code: code.to_string(),
        stock_name: name.to_string(),
        title: format!("🔔 {name}({code}) 监控触发"),
        body: browser_body(&messages),
        email_subject: format!("【股票监控】{name}({code}) 触发告警"),
        email_text,
        email_html: email_html("股票监控告警", Some((name, code, price)), &messages, &time),
        alerts: alerts.to_vec(),
        latest_price: Some(price),
        created_at: now,
    }
}

/// Canned message for checking a channel's configuration.
#[must_use]
pub fn test_message(now: DateTime<Utc>, utc_offset_minutes: i32) -> NotificationMessage {
    let time = local_time(now, utc_offset_minutes);
    let line = "这是一条测试通知，收到说明通知渠道配置正确。";
    NotificationMessage {
        monitor_id: None,
        stock_code: String::new(),
        stock_name: String::new(),
        title: "🔔 测试通知".into(),
        body: line.into(),
        email_subject: "【股票监控】测试通知".into(),
        email_text: format!("{line}\n\n发送时间：{time}\n\n---\n{EMAIL_FOOTER}\n"),
        email_html: email_html("测试通知", None, &[line], &time),
        alerts: Vec::new(),
        latest_price: None,
        created_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AlertKind, IndicatorKind, Severity};
    use crate::testkit::domain::monitor;
    use chrono::TimeZone;

    fn alert(message: &str) -> Alert {
        Alert {
            indicator: IndicatorKind::MaCross,
            kind: AlertKind::GoldenCross,
            severity: Severity::Warning,
            condition: "MA_CROSS(5,10,up)".into(),
            message: message.into(),
        }
    }

    fn result() -> EvaluationResult {
        EvaluationResult {
            triggered: true,
            alerts: Vec::new(),
            evaluated_at: Utc::now(),
            latest_price: 1688.5,
        }
    }

    #[test]
    fn browser_body_truncates_after_three() {
        let body = browser_body(&["a", "b", "c", "d", "e"]);
        assert_eq!(body, "a\nb\nc\n...还有2条告警");
        assert_eq!(browser_body(&["a", "b"]), "a\nb");
    }

    #[test]
    fn alert_message_titles() {
        let mut m = monitor("600519");
        m.stock_name = "贵州茅台".into();
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 1, 30, 0).unwrap();
        let msg = alert_message(&m, &[alert("MA5上穿MA10，形成金叉")], &result(), now, 480);
        assert_eq!(msg.title, "🔔 贵州茅台(600519) 监控触发");
        assert_eq!(msg.email_subject, "【股票监控】贵州茅台(600519) 触发告警");
        assert!(msg.email_text.contains("最新价：1688.50"));
        assert!(msg.email_text.contains("触发时间：2024-05-01 09:30:00"));
        assert!(msg.email_text.contains("• MA5上穿MA10，形成金叉"));
    }

    #[test]
    fn html_is_escaped() {
        let m = monitor("600519");
        let msg = alert_message(&m, &[alert("<b>x</b>")], &result(), Utc::now(), 0);
        assert!(msg.email_html.contains("&lt;b&gt;x&lt;/b&gt;"));
    }
}
