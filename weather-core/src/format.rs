//! Rendering fetched weather as short Chinese answer text. Pure, no I/O.

use chrono::{Datelike, Weekday};

use crate::model::{ResolvedLocation, Temperature, Weather, WeatherReport, Wind};

/// Renders `weather` for `location`.
///
/// Current conditions fit on one line; a forecast is a header followed by one
/// dated line per day. Absent optional fields are left out of the text.
pub fn format(location: &ResolvedLocation, weather: &Weather) -> String {
    match weather {
        Weather::Current(report) => current_line(&location.name, report),
        Weather::Forecast(reports) => forecast_text(&location.name, reports),
    }
}

fn current_line(name: &str, report: &WeatherReport) -> String {
    let mut line = format!("{name}：{}", report_parts(report).join("，"));

    if let Some(observed_at) = report.observed_at {
        line.push_str(&format!("（{} 发布）", observed_at.format("%m-%d %H:%M")));
    }

    line
}

fn forecast_text(name: &str, reports: &[WeatherReport]) -> String {
    let mut lines = vec![format!("{name}天气预报：")];

    if reports.is_empty() {
        lines.push("暂无预报数据".to_string());
    }

    for report in reports {
        let parts = report_parts(report).join("，");
        match report.date {
            Some(date) => lines.push(format!(
                "{}（{}）：{parts}",
                date.format("%Y-%m-%d"),
                weekday_name(date.weekday())
            )),
            None => lines.push(parts),
        }
    }

    lines.join("\n")
}

fn report_parts(report: &WeatherReport) -> Vec<String> {
    let condition = match &report.night_condition {
        Some(night) if *night != report.condition => format!("{}转{night}", report.condition),
        _ => report.condition.clone(),
    };

    let mut parts = vec![condition, temperature_phrase(&report.temperature)];

    if let Some(wind) = report.wind.as_ref().and_then(wind_phrase) {
        parts.push(wind);
    }
    if let Some(humidity) = report.humidity_pct {
        parts.push(format!("湿度{humidity}%"));
    }

    parts
}

fn temperature_phrase(temperature: &Temperature) -> String {
    match *temperature {
        Temperature::Current(value) => format!("{}°C", degrees(value)),
        Temperature::Range { low, high } => format!("{}~{}°C", degrees(low), degrees(high)),
    }
}

fn degrees(value: f64) -> String {
    if value.fract() == 0.0 { format!("{value:.0}") } else { format!("{value:.1}") }
}

fn wind_phrase(wind: &Wind) -> Option<String> {
    let direction = wind.direction.as_deref().map(|d| {
        // "无风向" and "旋转不定" already read as phrases.
        if d.ends_with('风') || d.contains("风向") || d == "旋转不定" {
            d.to_string()
        } else {
            format!("{d}风")
        }
    });
    let power = wind.power.as_deref().map(|p| {
        if p.ends_with('级') { p.to_string() } else { format!("{p}级") }
    });

    match (direction, power) {
        (Some(d), Some(p)) => Some(format!("{d}{p}")),
        (Some(d), None) => Some(d),
        (None, Some(p)) => Some(format!("风力{p}")),
        (None, None) => None,
    }
}

fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "周一",
        Weekday::Tue => "周二",
        Weekday::Wed => "周三",
        Weekday::Thu => "周四",
        Weekday::Fri => "周五",
        Weekday::Sat => "周六",
        Weekday::Sun => "周日",
    }
}
